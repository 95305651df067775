//! Preparation of the authenticated encryption transformation.
//!
//! Preparing the transformation and running it are separate steps: the
//! acknowledgment is built before the radio starts transmitting while the
//! CCM* transformation typically runs on the fly in hardware.
use core::ops::Range;

use byteorder::{ByteOrder, BE};
use dot15d4_frame::{ExtendedAddress, MpduParser, MpduWithAllFields};

use crate::security::{Key, KeyStore};

/// Length of the CCM* nonce.
pub const NONCE_LEN: usize = 13;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CipherError {
    /// No key is known for the frame's key identifier.
    KeyNotFound,
    /// The nonce cannot be derived, e.g. the frame counter is suppressed.
    UnsupportedNonce,
    /// The frame does not require a cryptographic transformation.
    NotSecured,
}

impl core::fmt::Display for CipherError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CipherError::KeyNotFound => write!(f, "key not found"),
            CipherError::UnsupportedNonce => write!(f, "unsupported nonce"),
            CipherError::NotSecured => write!(f, "frame not secured"),
        }
    }
}

/// Readies a fully laid out frame for authenticated encryption.
pub trait CipherPreparer {
    fn prepare(
        &mut self,
        frame: &mut MpduParser<&mut [u8], MpduWithAllFields>,
    ) -> Result<(), CipherError>;
}

/// Nothing to prepare, e.g. when frames are secured elsewhere.
impl CipherPreparer for () {
    fn prepare(
        &mut self,
        _: &mut MpduParser<&mut [u8], MpduWithAllFields>,
    ) -> Result<(), CipherError> {
        Ok(())
    }
}

/// A CCM* transformation ready to be executed over a frame buffer.
///
/// All ranges index the frame buffer including the PHR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcmTransformation {
    pub key: Key,
    pub nonce: [u8; NONCE_LEN],
    /// Authenticated but unencrypted bytes.
    pub auth_data: Range<usize>,
    /// Bytes to be encrypted, empty for MIC-only security levels.
    pub plaintext: Range<usize>,
    /// Where the MIC goes, empty for encryption without authentication.
    pub mic: Range<usize>,
}

/// Prepares IEEE 802.15.4 CCM* transformations with keys from a key store.
///
/// Only the frame counter based nonce is supported, the ASN based nonce used
/// in TSCH networks is not.
#[derive(Debug)]
pub struct CcmStarPreparer<Keys> {
    keys: Keys,
    ext_addr: ExtendedAddress<[u8; 8]>,
    prepared: Option<CcmTransformation>,
}

impl<Keys: KeyStore> CcmStarPreparer<Keys> {
    /// `ext_addr` is the device's own extended address, i.e. the source of
    /// the secured frames.
    pub const fn new(keys: Keys, ext_addr: ExtendedAddress<[u8; 8]>) -> Self {
        Self {
            keys,
            ext_addr,
            prepared: None,
        }
    }

    pub fn set_ext_addr(&mut self, ext_addr: ExtendedAddress<[u8; 8]>) {
        self.ext_addr = ext_addr;
    }

    /// The transformation prepared for the last frame.
    pub fn prepared(&self) -> Option<&CcmTransformation> {
        self.prepared.as_ref()
    }

    pub fn take_prepared(&mut self) -> Option<CcmTransformation> {
        self.prepared.take()
    }

    fn transformation(
        &self,
        frame: &MpduParser<&mut [u8], MpduWithAllFields>,
    ) -> Result<CcmTransformation, CipherError> {
        let security_control = frame.security_control().ok_or(CipherError::NotSecured)?;
        let security_level = security_control.security_level();
        if !security_level.is_protected() {
            return Err(CipherError::NotSecured);
        }
        if security_control.asn_in_nonce() {
            return Err(CipherError::UnsupportedNonce);
        }
        let frame_counter = frame.frame_counter().ok_or(CipherError::UnsupportedNonce)?;
        let key_id = frame.key_id().ok_or(CipherError::NotSecured)?;
        let key = self.keys.key(&key_id).ok_or(CipherError::KeyNotFound)?;

        let mut nonce = [0; NONCE_LEN];
        nonce[..8].copy_from_slice(&self.ext_addr.into_be_bytes());
        BE::write_u32(&mut nonce[8..12], frame_counter);
        nonce[12] = security_level as u8;

        let mac_header = frame.range_mac_header();
        let mac_payload = frame.range_mac_payload();
        let (auth_data, plaintext) = if security_level.is_encrypted() {
            (mac_header, mac_payload)
        } else {
            (mac_header.start..mac_payload.end, mac_payload.end..mac_payload.end)
        };

        Ok(CcmTransformation {
            key,
            nonce,
            auth_data,
            plaintext,
            mic: frame.range_mic(),
        })
    }
}

impl<Keys: KeyStore> CipherPreparer for CcmStarPreparer<Keys> {
    fn prepare(
        &mut self,
        frame: &mut MpduParser<&mut [u8], MpduWithAllFields>,
    ) -> Result<(), CipherError> {
        self.prepared = None;
        self.prepared = Some(self.transformation(frame)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;
    use crate::security::{KeyTable, KEY_LEN};
    use dot15d4_frame::KeyIdMode;

    const KEY: Key = [0x5a; KEY_LEN];
    const EXT_ADDR: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    // Enh-Ack, level 5, key id mode 1, short destination and HT2.
    const ENC_MIC_32: [u8; 20] = [
        19, // PHR
        0x4a, 0x2a, // FCF
        0x09, // DSN
        0x34, 0x12, // dst address
        0x0d, // security control
        0x04, 0x03, 0x02, 0x01, // frame counter
        0x03, // key index
        0x80, 0x3f, // HT2
        0x00, 0x00, 0x00, 0x00, // MIC
        0x00, 0x00, // FCS
    ];

    fn key_table() -> RefCell<KeyTable<1>> {
        let table = RefCell::new(KeyTable::new());
        table
            .borrow_mut()
            .add_key(KeyIdMode::Index, &[3], KEY, false)
            .unwrap();
        table
    }

    fn prepare(
        preparer: &mut impl CipherPreparer,
        frame: &[u8],
    ) -> Result<(), CipherError> {
        let mut buffer = [0u8; 32];
        buffer[..frame.len()].copy_from_slice(frame);
        let mut frame = MpduParser::parse(&mut buffer[..]).unwrap();
        preparer.prepare(&mut frame)
    }

    #[test]
    fn prepare_encryption() {
        let keys = key_table();
        let mut preparer = CcmStarPreparer::new(&keys, ExtendedAddress::new_owned(EXT_ADDR));
        prepare(&mut preparer, &ENC_MIC_32).unwrap();

        let transformation = preparer.prepared().unwrap();
        assert_eq!(transformation.key, KEY);
        assert_eq!(
            transformation.nonce,
            [8, 7, 6, 5, 4, 3, 2, 1, 0x01, 0x02, 0x03, 0x04, 0x05]
        );
        assert_eq!(transformation.auth_data, 1..14);
        assert_eq!(transformation.plaintext, 14..14);
        assert_eq!(transformation.mic, 14..18);
        assert!(preparer.take_prepared().is_some());
        assert!(preparer.prepared().is_none());
    }

    #[test]
    fn prepare_authentication() {
        let keys = key_table();
        let mut preparer = CcmStarPreparer::new(&keys, ExtendedAddress::new_owned(EXT_ADDR));
        let mut frame = ENC_MIC_32;
        // Level 1, MIC only.
        frame[6] = 0x09;
        prepare(&mut preparer, &frame).unwrap();

        let transformation = preparer.prepared().unwrap();
        assert_eq!(transformation.nonce[12], 1);
        assert_eq!(transformation.auth_data, 1..14);
        assert!(transformation.plaintext.is_empty());
    }

    #[test]
    fn reject_unpreparable_frames() {
        let keys = key_table();
        let mut preparer = CcmStarPreparer::new(&keys, ExtendedAddress::new_owned(EXT_ADDR));

        let mut frame = ENC_MIC_32;
        frame[11] = 0x04;
        assert_eq!(prepare(&mut preparer, &frame), Err(CipherError::KeyNotFound));
        assert!(preparer.prepared().is_none());

        let mut frame = ENC_MIC_32;
        // ASN in nonce.
        frame[6] = 0x4d;
        assert_eq!(
            prepare(&mut preparer, &frame),
            Err(CipherError::UnsupportedNonce)
        );

        // Level 0 frames carry no MIC.
        let mut frame = ENC_MIC_32;
        frame[0] = 15;
        frame[6] = 0x08;
        assert_eq!(prepare(&mut preparer, &frame[..16]), Err(CipherError::NotSecured));

        assert_eq!(prepare(&mut (), &ENC_MIC_32), Ok(()));
    }
}
