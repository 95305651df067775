//! Finalization of header IEs once their position in the acknowledgment is
//! fixed.
use core::ops::Range;

use byteorder::{ByteOrder, LE};
use dot15d4_frame::ie::{validate_header_ies, HeaderIeHdr, CSL_IE_ID, HEADER_IE_HDR_LEN};

/// Length of the CSL IE content without the optional rendezvous time.
const CSL_IE_CONTENT_LEN: usize = 4;

/// Rewrites IE content that depends on the IE's final position or the time of
/// transmission.
pub trait IeFinalizer {
    /// Finalizes the header IEs found at `ies` in the given frame buffer.
    fn finalize(&mut self, frame: &mut [u8], ies: Range<usize>);
}

/// Leaves IEs untouched.
impl IeFinalizer for () {
    fn finalize(&mut self, _: &mut [u8], _: Range<usize>) {}
}

/// Stamps the CSL phase and period into CSL IEs.
///
/// The phase is taken from the given closure when the IE is finalized and is
/// expected in units of 10 symbols, like the period.
#[derive(Debug, Clone)]
pub struct CslIeWriter<Phase> {
    period: u16,
    phase: Phase,
}

impl<Phase: FnMut() -> u16> CslIeWriter<Phase> {
    pub const fn new(period: u16, phase: Phase) -> Self {
        Self { period, phase }
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn set_period(&mut self, period: u16) {
        self.period = period;
    }
}

impl<Phase: FnMut() -> u16> IeFinalizer for CslIeWriter<Phase> {
    fn finalize(&mut self, frame: &mut [u8], ies: Range<usize>) {
        let ies = &mut frame[ies];
        if validate_header_ies(ies).is_err() {
            return;
        }

        let mut offset = 0;
        while offset < ies.len() {
            let hdr = HeaderIeHdr::from_le_bytes(&ies[offset..]);
            let content = offset + HEADER_IE_HDR_LEN;
            offset = content + hdr.length() as usize;

            if hdr.element_id() == CSL_IE_ID && hdr.length() as usize >= CSL_IE_CONTENT_LEN {
                LE::write_u16(&mut ies[content..content + 2], (self.phase)());
                LE::write_u16(&mut ies[content + 2..content + 4], self.period);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dot15d4_frame::ie::{write_header_ie, TIME_CORRECTION_IE_ID};

    #[test]
    fn stamp_csl_ies() {
        let mut frame = [0u8; 20];
        let mut length = 4;
        length += write_header_ie(&mut frame[length..], TIME_CORRECTION_IE_ID, &[1, 2]).unwrap();
        length += write_header_ie(&mut frame[length..], CSL_IE_ID, &[0; 4]).unwrap();
        // A CSL IE that is too short is left alone.
        length += write_header_ie(&mut frame[length..], CSL_IE_ID, &[0; 2]).unwrap();

        let mut calls = 0;
        let mut writer = CslIeWriter::new(0x0190, || {
            calls += 1;
            0x1234
        });
        writer.finalize(&mut frame, 4..length);
        drop(writer);

        assert_eq!(calls, 1);
        assert_eq!(
            &frame[..length],
            &[
                0, 0, 0, 0, // unrelated
                0x02, 0x0f, 1, 2, // time correction IE
                0x04, 0x0d, 0x34, 0x12, 0x90, 0x01, // CSL IE
                0x02, 0x0d, 0, 0, // short CSL IE
            ]
        );
    }

    #[test]
    fn ignore_malformed_ies() {
        let mut frame = [0x06, 0x0d, 0, 0, 0, 0];
        let mut writer = CslIeWriter::new(0x0190, || 0x1234);
        writer.finalize(&mut frame, 0..6);
        assert_eq!(frame, [0x06, 0x0d, 0, 0, 0, 0]);

        ().finalize(&mut frame, 0..6);
        assert_eq!(writer.period(), 0x0190);
    }
}
