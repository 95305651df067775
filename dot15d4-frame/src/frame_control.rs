//! IEEE 802.15.4 Frame Control field.
use bitfield_struct::bitfield;
use byteorder::{ByteOrder, LE};

use crate::{constants::FRAME_CONTROL_LEN, AddressingMode};

/// IEEE 802.15.4 frame type.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    Beacon = 0b000,
    Data = 0b001,
    Ack = 0b010,
    MacCommand = 0b011,
    Reserved = 0b100,
    Multipurpose = 0b101,
    FragmentOrFrak = 0b110,
    Extended = 0b111,
}

impl FrameType {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b111 {
            0b000 => Self::Beacon,
            0b001 => Self::Data,
            0b010 => Self::Ack,
            0b011 => Self::MacCommand,
            0b100 => Self::Reserved,
            0b101 => Self::Multipurpose,
            0b110 => Self::FragmentOrFrak,
            _ => Self::Extended,
        }
    }
}

/// IEEE 802.15.4 frame version.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameVersion {
    Ieee802154_2003 = 0b00,
    Ieee802154_2006 = 0b01,
    /// IEEE 802.15.4-2015 and later.
    Ieee802154 = 0b10,
    Unknown = 0b11,
}

impl FrameVersion {
    const fn into_bits(self) -> u8 {
        self as _
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Ieee802154_2003,
            0b01 => Self::Ieee802154_2006,
            0b10 => Self::Ieee802154,
            _ => Self::Unknown,
        }
    }

    /// Frame versions before IEEE 802.15.4-2015 use the legacy PAN ID
    /// compression rules and know no frame counter suppression.
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Ieee802154_2003 | Self::Ieee802154_2006)
    }
}

/// The frame control field.
///
/// Sub-fields are numbered from the least significant bit, the field is
/// transmitted little-endian.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct FrameControl {
    #[bits(3)]
    pub frame_type: FrameType,
    pub security_enabled: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    pub pan_id_compression: bool,
    #[bits(1)]
    __: u8,
    pub seq_nr_suppression: bool,
    pub ie_present: bool,
    #[bits(2)]
    pub dst_addr_mode: AddressingMode,
    #[bits(2)]
    pub frame_version: FrameVersion,
    #[bits(2)]
    pub src_addr_mode: AddressingMode,
}

impl FrameControl {
    /// Reads the frame control field from its little-endian representation.
    pub fn from_le_bytes(le_bytes: &[u8]) -> Self {
        Self::from_bits(LE::read_u16(&le_bytes[..FRAME_CONTROL_LEN]))
    }

    /// Writes the little-endian representation of the field.
    pub fn write_le_bytes(&self, le_bytes: &mut [u8]) {
        LE::write_u16(&mut le_bytes[..FRAME_CONTROL_LEN], self.into_bits());
    }

    pub fn to_le_bytes(&self) -> [u8; FRAME_CONTROL_LEN] {
        self.into_bits().to_le_bytes()
    }
}
