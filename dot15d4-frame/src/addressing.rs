//! Addresses, PAN IDs and the addressing fields they live in.
use core::ops::Range;

use dot15d4_util::{Error, Result};

use crate::{constants::PAN_ID_LEN, FrameControl, FrameVersion};

/// IEEE 802.15.4 addressing mode.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressingMode {
    Absent = 0b00,
    Short = 0b10,
    Extended = 0b11,
    /// Reserved.
    Unknown,
}

impl AddressingMode {
    /// Length of an address with this addressing mode.
    pub const fn length(&self) -> u8 {
        match self {
            AddressingMode::Short => 2,
            AddressingMode::Extended => 8,
            AddressingMode::Absent | AddressingMode::Unknown => 0,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        match self {
            AddressingMode::Unknown => 0b01,
            mode => mode as u8,
        }
    }

    pub(crate) const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Absent,
            0b10 => Self::Short,
            0b11 => Self::Extended,
            _ => Self::Unknown,
        }
    }
}

/// A short address, stored little-endian.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ShortAddress<Bytes>(Bytes);

impl<Bytes: AsRef<[u8]>> ShortAddress<Bytes> {
    pub fn into_u16(&self) -> u16 {
        let le_bytes = self.0.as_ref();
        u16::from_le_bytes([le_bytes[0], le_bytes[1]])
    }
}

/// An extended address, stored little-endian.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ExtendedAddress<Bytes>(Bytes);

impl ExtendedAddress<[u8; 8]> {
    pub const fn new_owned(le_bytes: [u8; 8]) -> Self {
        Self(le_bytes)
    }
}

impl<Bytes: AsRef<[u8]>> ExtendedAddress<Bytes> {
    /// The address most significant byte first, as used in CCM* nonces.
    pub fn into_be_bytes(&self) -> [u8; 8] {
        let mut be_bytes = [0; 8];
        be_bytes.copy_from_slice(self.0.as_ref());
        be_bytes.reverse();
        be_bytes
    }
}

/// A PAN ID, stored little-endian.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PanId<Bytes>(Bytes);

impl PanId<[u8; 2]> {
    pub const fn new_owned(le_bytes: [u8; 2]) -> Self {
        Self(le_bytes)
    }
}

impl<Bytes: AsRef<[u8]>> PanId<Bytes> {
    pub fn new(le_bytes: Bytes) -> Self {
        debug_assert_eq!(le_bytes.as_ref().len(), PAN_ID_LEN);
        Self(le_bytes)
    }

    pub fn into_u16(&self) -> u16 {
        let le_bytes = self.0.as_ref();
        u16::from_le_bytes([le_bytes[0], le_bytes[1]])
    }
}

impl<Bytes: AsRef<[u8]>> AsRef<[u8]> for PanId<Bytes> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<Bytes: AsMut<[u8]>> AsMut<[u8]> for PanId<Bytes> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.0.as_mut()
    }
}

/// A destination or source address of any addressing mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Address<Bytes> {
    Absent,
    Short(ShortAddress<Bytes>),
    Extended(ExtendedAddress<Bytes>),
}

impl<Bytes> Address<Bytes> {
    /// The addressing mode that announces this address in a frame control
    /// field.
    pub fn addressing_mode(&self) -> AddressingMode {
        match self {
            Address::Absent => AddressingMode::Absent,
            Address::Short(_) => AddressingMode::Short,
            Address::Extended(_) => AddressingMode::Extended,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Address::Absent)
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Address::Extended(_))
    }
}

impl<Bytes: AsRef<[u8]>> Address<Bytes> {
    /// The address as it appears on air, least significant byte first.
    pub fn as_le_bytes(&self) -> &[u8] {
        match self {
            Address::Absent => &[],
            Address::Short(ShortAddress(le_bytes)) => le_bytes.as_ref(),
            Address::Extended(ExtendedAddress(le_bytes)) => le_bytes.as_ref(),
        }
    }
}

impl<'bytes> Address<&'bytes [u8]> {
    /// Interprets 0, 2 or 8 little-endian bytes as an address.
    pub fn from_le_bytes(le_bytes: &'bytes [u8]) -> Result<Self> {
        match le_bytes.len() {
            0 => Ok(Address::Absent),
            2 => Ok(Address::Short(ShortAddress(le_bytes))),
            8 => Ok(Address::Extended(ExtendedAddress(le_bytes))),
            _ => Err(Error),
        }
    }
}

impl<Bytes: AsMut<[u8]>> Address<Bytes> {
    /// Overwrites this address field with an address of the same mode.
    pub fn set<Src: AsRef<[u8]>>(&mut self, src: &Address<Src>) -> Result<()> {
        let dst: &mut [u8] = match self {
            Address::Absent => &mut [],
            Address::Short(ShortAddress(le_bytes)) => le_bytes.as_mut(),
            Address::Extended(ExtendedAddress(le_bytes)) => le_bytes.as_mut(),
        };
        let src = src.as_le_bytes();
        if dst.len() != src.len() {
            return Err(Error);
        }
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// Derives the lengths of the destination PAN ID, destination address,
/// source PAN ID and source address fields from a frame control field.
///
/// Fails on reserved addressing modes, unknown frame versions and address
/// combinations the frame version does not define.
pub(crate) fn addressing_lengths(frame_control: FrameControl) -> Result<[u8; 4]> {
    use AddressingMode::*;

    let legacy = match frame_control.frame_version() {
        FrameVersion::Ieee802154_2003 | FrameVersion::Ieee802154_2006 => true,
        FrameVersion::Ieee802154 => false,
        FrameVersion::Unknown => return Err(Error),
    };
    let dst = frame_control.dst_addr_mode();
    let src = frame_control.src_addr_mode();
    let compressed = frame_control.pan_id_compression();

    let (dst_pan_id, src_pan_id) = match (legacy, dst, src) {
        (_, Unknown, _) | (_, _, Unknown) => return Err(Error),

        // Up to IEEE 802.15.4-2006 every address comes with a PAN ID. Only
        // the source PAN ID of a frame with both addresses can be elided.
        (true, Absent, Absent) => return Err(Error),
        (true, _, Absent) => (true, false),
        (true, Absent, _) => (false, true),
        (true, _, _) => (true, !compressed),

        // IEEE 802.15.4-2015, table 7-2.
        (false, Absent, Absent) => (compressed, false),
        (false, _, Absent) => (!compressed, false),
        (false, Absent, _) => (false, !compressed),
        (false, Extended, Extended) => (!compressed, false),
        (false, _, _) => (true, !compressed),
    };

    let pan_id_length = |present: bool| if present { PAN_ID_LEN as u8 } else { 0 };
    Ok([
        pan_id_length(dst_pan_id),
        dst.length(),
        pan_id_length(src_pan_id),
        src.length(),
    ])
}

/// A view of the addressing fields of a frame.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AddressingFields<Bytes> {
    /// End offsets of the destination PAN ID, destination address, source PAN
    /// ID and source address.
    ends: [u8; 4],
    le_bytes: Bytes,
}

impl<Bytes: AsRef<[u8]>> AddressingFields<Bytes> {
    /// Safety: `lengths` must have been derived by [`addressing_lengths`] and
    ///         must cover `le_bytes` exactly.
    pub(crate) const fn from_lengths(le_bytes: Bytes, lengths: [u8; 4]) -> Self {
        let mut ends = lengths;
        ends[1] += ends[0];
        ends[2] += ends[1];
        ends[3] += ends[2];
        Self { ends, le_bytes }
    }

    #[allow(clippy::len_without_is_empty)]
    pub const fn length(&self) -> usize {
        self.ends[3] as usize
    }

    pub fn dst_pan_id(&self) -> Option<PanId<&[u8]>> {
        pan_id(&self.le_bytes.as_ref()[self.range(0)])
    }

    pub fn dst_address(&self) -> Address<&[u8]> {
        address(&self.le_bytes.as_ref()[self.range(1)])
    }

    pub fn src_pan_id(&self) -> Option<PanId<&[u8]>> {
        pan_id(&self.le_bytes.as_ref()[self.range(2)])
    }

    pub fn src_address(&self) -> Address<&[u8]> {
        address(&self.le_bytes.as_ref()[self.range(3)])
    }

    /// Range of the given field, numbered in frame order.
    const fn range(&self, field: usize) -> Range<usize> {
        let start = if field == 0 { 0 } else { self.ends[field - 1] };
        start as usize..self.ends[field] as usize
    }
}

impl<'bytes> AddressingFields<&'bytes [u8]> {
    /// The source address, borrowing from the underlying frame rather than
    /// from this view.
    pub fn into_src_address(self) -> Address<&'bytes [u8]> {
        address(&self.le_bytes[self.range(3)])
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> AddressingFields<Bytes> {
    pub fn dst_pan_id_mut(&mut self) -> Option<PanId<&mut [u8]>> {
        let range = self.range(0);
        let pan_id = &mut self.le_bytes.as_mut()[range];
        (pan_id.len() == PAN_ID_LEN).then_some(PanId(pan_id))
    }

    pub fn dst_address_mut(&mut self) -> Address<&mut [u8]> {
        let range = self.range(1);
        let address = &mut self.le_bytes.as_mut()[range];
        match address.len() {
            2 => Address::Short(ShortAddress(address)),
            8 => Address::Extended(ExtendedAddress(address)),
            _ => Address::Absent,
        }
    }
}

// Field lengths are checked by `addressing_lengths`.
fn address(le_bytes: &[u8]) -> Address<&[u8]> {
    Address::from_le_bytes(le_bytes).unwrap_or(Address::Absent)
}

fn pan_id(le_bytes: &[u8]) -> Option<PanId<&[u8]>> {
    (le_bytes.len() == PAN_ID_LEN).then_some(PanId(le_bytes))
}
