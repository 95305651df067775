//! Auxiliary security header fields.
use bitfield_struct::bitfield;
use dot15d4_util::{Error, Result};

/// IEEE 802.15.4 security level.
///
/// The numeric value is the security level sub-field of the security control
/// field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityLevel {
    None = 0,
    Mic32 = 1,
    Mic64 = 2,
    Mic128 = 3,
    /// Encryption without authentication, reserved since IEEE 802.15.4-2015.
    Enc = 4,
    EncMic32 = 5,
    EncMic64 = 6,
    EncMic128 = 7,
}

impl SecurityLevel {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0 => Self::None,
            1 => Self::Mic32,
            2 => Self::Mic64,
            3 => Self::Mic128,
            4 => Self::Enc,
            5 => Self::EncMic32,
            6 => Self::EncMic64,
            _ => Self::EncMic128,
        }
    }

    /// Length of the message integrity code in bytes.
    pub const fn mic_length(&self) -> u8 {
        match self {
            Self::None | Self::Enc => 0,
            Self::Mic32 | Self::EncMic32 => 4,
            Self::Mic64 | Self::EncMic64 => 8,
            Self::Mic128 | Self::EncMic128 => 16,
        }
    }

    /// Whether the MAC payload is encrypted at this level.
    pub const fn is_encrypted(&self) -> bool {
        matches!(
            self,
            Self::Enc | Self::EncMic32 | Self::EncMic64 | Self::EncMic128
        )
    }

    /// Whether frames at this level are cryptographically protected at all.
    pub const fn is_protected(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// IEEE 802.15.4 key identifier mode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyIdMode {
    /// The key is determined implicitly from the originator and recipient.
    Implicit = 0,
    /// The key is determined from the key index and macDefaultKeySource.
    Index = 1,
    /// The key is determined from a 4-byte key source and the key index.
    Source4Byte = 2,
    /// The key is determined from an 8-byte key source and the key index.
    Source8Byte = 3,
}

impl KeyIdMode {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0 => Self::Implicit,
            1 => Self::Index,
            2 => Self::Source4Byte,
            _ => Self::Source8Byte,
        }
    }

    /// Length of the key identifier field in bytes.
    pub const fn key_id_length(&self) -> u8 {
        match self {
            Self::Implicit => 0,
            Self::Index => 1,
            Self::Source4Byte => 5,
            Self::Source8Byte => 9,
        }
    }
}

/// The security control field, first byte of the auxiliary security header.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct SecurityControl {
    #[bits(3)]
    pub security_level: SecurityLevel,
    #[bits(2)]
    pub key_id_mode: KeyIdMode,
    /// Since IEEE 802.15.4-2015, reserved before.
    pub frame_counter_suppression: bool,
    /// Since IEEE 802.15.4-2015, reserved before.
    pub asn_in_nonce: bool,
    #[bits(1)]
    __: u8,
}

impl SecurityControl {
    /// Clears the sub-fields that were reserved before IEEE 802.15.4-2015.
    pub const fn into_legacy(self) -> Self {
        self.with_frame_counter_suppression(false)
            .with_asn_in_nonce(false)
    }
}

/// A key identifier as found in the auxiliary security header.
///
/// The identifier bytes are kept in on-air order: the key source (if any)
/// followed by the key index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyId<Bytes> {
    mode: KeyIdMode,
    id: Bytes,
}

impl<Bytes: AsRef<[u8]>> KeyId<Bytes> {
    /// Creates a key identifier, failing if the identifier length does not
    /// match the mode.
    pub fn new(mode: KeyIdMode, id: Bytes) -> Result<Self> {
        if id.as_ref().len() != mode.key_id_length() as usize {
            return Err(Error);
        }
        Ok(Self { mode, id })
    }

    pub const fn mode(&self) -> KeyIdMode {
        self.mode
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.id.as_ref()
    }

    /// The key source, if the mode carries one.
    pub fn key_source(&self) -> Option<&[u8]> {
        let id = self.id.as_ref();
        match self.mode {
            KeyIdMode::Implicit | KeyIdMode::Index => None,
            KeyIdMode::Source4Byte | KeyIdMode::Source8Byte => Some(&id[..id.len() - 1]),
        }
    }

    /// The key index, if the mode carries one.
    pub fn key_index(&self) -> Option<u8> {
        match self.mode {
            KeyIdMode::Implicit => None,
            _ => self.id.as_ref().last().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_control() {
        let sec_ctrl = SecurityControl::from_bits(0x0d);
        assert_eq!(sec_ctrl.security_level(), SecurityLevel::EncMic32);
        assert_eq!(sec_ctrl.key_id_mode(), KeyIdMode::Index);
        assert!(!sec_ctrl.frame_counter_suppression());
        assert!(!sec_ctrl.asn_in_nonce());

        let sec_ctrl = SecurityControl::new()
            .with_security_level(SecurityLevel::Mic128)
            .with_key_id_mode(KeyIdMode::Source8Byte)
            .with_frame_counter_suppression(true)
            .with_asn_in_nonce(true);
        assert_eq!(sec_ctrl.into_bits(), 0x7b);
        assert_eq!(sec_ctrl.into_legacy().into_bits(), 0x1b);
    }

    #[test]
    fn lengths() {
        let mic_lengths = [0, 4, 8, 16, 0, 4, 8, 16];
        for (level, mic_length) in mic_lengths.into_iter().enumerate() {
            let level = SecurityLevel::from_bits(level as u8);
            assert_eq!(level.mic_length(), mic_length);
            assert_eq!(level.into_bits() >= 4, level.is_encrypted());
        }
        assert!(!SecurityLevel::None.is_protected());
        assert!(SecurityLevel::Enc.is_protected());

        let key_id_lengths = [0, 1, 5, 9];
        for (mode, key_id_length) in key_id_lengths.into_iter().enumerate() {
            assert_eq!(
                KeyIdMode::from_bits(mode as u8).key_id_length(),
                key_id_length
            );
        }
    }

    #[test]
    fn key_id() {
        let key_id = KeyId::new(KeyIdMode::Source4Byte, &[1u8, 2, 3, 4, 5][..]).unwrap();
        assert_eq!(key_id.key_source(), Some(&[1, 2, 3, 4][..]));
        assert_eq!(key_id.key_index(), Some(5));

        let key_id = KeyId::new(KeyIdMode::Implicit, &[] as &[u8]).unwrap();
        assert_eq!(key_id.key_source(), None);
        assert_eq!(key_id.key_index(), None);

        assert_eq!(KeyId::new(KeyIdMode::Index, &[1u8, 2][..]), Err(Error));
    }
}
