//! Header Information Elements.
//!
//! Only the header IE list is interpreted here. Payload IEs are part of the
//! MAC payload and may be encrypted.
use bitfield_struct::bitfield;
use byteorder::{ByteOrder, LE};
use dot15d4_util::{Error, Result};

/// Length of a header IE descriptor.
pub const HEADER_IE_HDR_LEN: usize = 2;

/// Vendor Specific Header IE.
pub const VENDOR_SPECIFIC_IE_ID: u8 = 0x00;
/// CSL IE.
pub const CSL_IE_ID: u8 = 0x1a;
/// Time Correction IE.
pub const TIME_CORRECTION_IE_ID: u8 = 0x1e;
/// Header Termination 1 IE, payload IEs follow.
pub const HEADER_TERMINATION_1_IE_ID: u8 = 0x7e;
/// Header Termination 2 IE, the MAC payload follows.
pub const HEADER_TERMINATION_2_IE_ID: u8 = 0x7f;

/// On-air representation of the Header Termination 2 IE.
pub const HEADER_TERMINATION_IE_2: [u8; HEADER_IE_HDR_LEN] =
    HeaderIeHdr::for_content(HEADER_TERMINATION_2_IE_ID, 0)
        .into_bits()
        .to_le_bytes();

/// The descriptor of a header IE.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct HeaderIeHdr {
    #[bits(7)]
    pub length: u8,
    pub element_id: u8,
    /// Always zero for header IEs.
    pub payload_ie: bool,
}

impl HeaderIeHdr {
    /// The descriptor of a header IE with the given id and content length.
    pub const fn for_content(element_id: u8, length: u8) -> Self {
        Self::new().with_element_id(element_id).with_length(length)
    }

    pub fn from_le_bytes(le_bytes: &[u8]) -> Self {
        Self::from_bits(LE::read_u16(&le_bytes[..HEADER_IE_HDR_LEN]))
    }
}

/// The kind of termination that ends a header IE list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderTermination {
    /// HT1: payload IEs follow.
    PayloadIes,
    /// HT2: the MAC payload follows without payload IEs.
    Payload,
}

/// A single header IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIe<'ie> {
    element_id: u8,
    content: &'ie [u8],
}

impl<'ie> HeaderIe<'ie> {
    pub const fn element_id(&self) -> u8 {
        self.element_id
    }

    pub const fn content(&self) -> &'ie [u8] {
        self.content
    }

    /// The termination this IE represents, if any.
    pub const fn termination(&self) -> Option<HeaderTermination> {
        match self.element_id {
            HEADER_TERMINATION_1_IE_ID => Some(HeaderTermination::PayloadIes),
            HEADER_TERMINATION_2_IE_ID => Some(HeaderTermination::Payload),
            _ => None,
        }
    }

    /// Length of the IE including its descriptor.
    pub const fn length(&self) -> usize {
        HEADER_IE_HDR_LEN + self.content.len()
    }
}

/// Iterates over a header IE list.
///
/// Yields an error and stops if an IE is truncated or turns out to be a
/// payload IE.
#[derive(Debug, Clone)]
pub struct HeaderIeIter<'ie> {
    buffer: &'ie [u8],
    offset: usize,
}

impl<'ie> HeaderIeIter<'ie> {
    pub const fn new(buffer: &'ie [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Offset of the next IE relative to the start of the list.
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl<'ie> Iterator for HeaderIeIter<'ie> {
    type Item = Result<HeaderIe<'ie>>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = &self.buffer[self.offset..];
        if remaining.is_empty() {
            return None;
        }

        let ie = match parse_header_ie(remaining) {
            Ok(ie) => ie,
            Err(e) => {
                self.offset = self.buffer.len();
                return Some(Err(e));
            }
        };
        self.offset += ie.length();
        Some(Ok(ie))
    }
}

fn parse_header_ie(buffer: &[u8]) -> Result<HeaderIe<'_>> {
    if buffer.len() < HEADER_IE_HDR_LEN {
        return Err(Error);
    }
    let hdr = HeaderIeHdr::from_le_bytes(buffer);
    if hdr.payload_ie() {
        return Err(Error);
    }
    let end = HEADER_IE_HDR_LEN + hdr.length() as usize;
    if buffer.len() < end {
        return Err(Error);
    }
    Ok(HeaderIe {
        element_id: hdr.element_id(),
        content: &buffer[HEADER_IE_HDR_LEN..end],
    })
}

/// Result of walking a header IE list up to its termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeaderIeList {
    /// Length of the header IEs without termination.
    pub(crate) length: usize,
    pub(crate) termination: Option<HeaderTermination>,
}

/// Walks a header IE list. The list ends at the first termination IE or at
/// the end of the buffer.
pub(crate) fn scan_header_ies(buffer: &[u8]) -> Result<HeaderIeList> {
    let mut ies = HeaderIeIter::new(buffer);
    loop {
        let offset = ies.offset();
        match ies.next() {
            None => {
                return Ok(HeaderIeList {
                    length: offset,
                    termination: None,
                })
            }
            Some(ie) => {
                if let Some(termination) = ie?.termination() {
                    return Ok(HeaderIeList {
                        length: offset,
                        termination: Some(termination),
                    });
                }
            }
        }
    }
}

/// Checks that the given bytes form a complete list of header IEs without
/// termination IEs, i.e. content that may be placed in front of a
/// termination IE.
pub fn validate_header_ies(buffer: &[u8]) -> Result<()> {
    for ie in HeaderIeIter::new(buffer) {
        if ie?.termination().is_some() {
            return Err(Error);
        }
    }
    Ok(())
}

/// Writes a header IE into the given buffer and returns its length.
pub fn write_header_ie(buffer: &mut [u8], element_id: u8, content: &[u8]) -> Result<usize> {
    let length = HEADER_IE_HDR_LEN + content.len();
    if content.len() > 0x7f || buffer.len() < length {
        return Err(Error);
    }
    let hdr = HeaderIeHdr::for_content(element_id, content.len() as u8);
    LE::write_u16(&mut buffer[..HEADER_IE_HDR_LEN], hdr.into_bits());
    buffer[HEADER_IE_HDR_LEN..length].copy_from_slice(content);
    Ok(length)
}
