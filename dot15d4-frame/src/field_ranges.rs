use core::{marker::PhantomData, ops::Range};

use dot15d4_util::{Error, Result};

use crate::{
    addressing::addressing_lengths,
    constants::{
        FCS_LEN, FRAME_CONTROL_LEN, FRAME_COUNTER_LEN, PHY_HDR_LEN, SECURITY_CONTROL_LEN,
        SEQ_NR_LEN,
    },
    ie::{HeaderIeList, HeaderTermination, HEADER_IE_HDR_LEN},
    FrameControl, FrameType, FrameVersion, MpduParsedUpToAuxSecHeader,
    MpduParsedUpToFrameControl, MpduParsedUpToSecurityControl, MpduUnparsed, MpduWithAllFields,
    MpduWithAuxSecHeader, MpduWithFrameControl, MpduWithSecurityControl, SecurityControl,
};

/// Field offsets successively collected while parsing or building an MPDU.
///
/// Offsets are acquired in stages. Each stage unlocks further fields through
/// the typestate of the parser. Fields belonging to a later stage keep their
/// zero defaults until that stage has been reached and must not be read
/// before.
///
/// All offsets are relative to the start of the buffer, i.e. the PHY header
/// sits at offset zero. As the PSDU never exceeds 127 bytes, all offsets fit
/// into a byte.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub(crate) struct MpduFieldRanges<State> {
    state: PhantomData<State>,

    // Known from the frame control stage on.
    seq_nr_present: bool,
    addressing_lengths: [u8; 4],
    security_enabled: bool,

    // Known from the security control stage on.
    length_frame_counter: u8,
    length_key_id: u8,
    length_mic: u8,

    // Known once all fields have been parsed.
    length_header_ies: u8,
    termination: Option<HeaderTermination>,
    offset_fcs: u8,
}

const OFFSET_FRAME_CONTROL: u8 = PHY_HDR_LEN as u8;
const OFFSET_SEQ_NR: u8 = OFFSET_FRAME_CONTROL + FRAME_CONTROL_LEN as u8;

impl MpduFieldRanges<MpduUnparsed> {
    pub(crate) const fn new() -> Self {
        Self {
            state: PhantomData,
            seq_nr_present: false,
            addressing_lengths: [0; 4],
            security_enabled: false,
            length_frame_counter: 0,
            length_key_id: 0,
            length_mic: 0,
            length_header_ies: 0,
            termination: None,
            offset_fcs: 0,
        }
    }

    /// Derives the layout of the sequence number and addressing fields.
    pub(crate) fn with_frame_control(
        &self,
        frame_control: FrameControl,
    ) -> Result<MpduFieldRanges<MpduWithFrameControl>> {
        if !matches!(
            frame_control.frame_type(),
            FrameType::Beacon | FrameType::Data | FrameType::Ack | FrameType::MacCommand
        ) {
            return Err(Error);
        }

        let security_enabled = frame_control.security_enabled();
        if security_enabled
            && matches!(frame_control.frame_version(), FrameVersion::Ieee802154_2003)
        {
            return Err(Error);
        }

        let mut next = self.next_state();
        next.seq_nr_present = !frame_control.seq_nr_suppression();
        next.addressing_lengths = addressing_lengths(frame_control)?;
        next.security_enabled = security_enabled;
        Ok(next)
    }
}

impl MpduFieldRanges<MpduWithFrameControl> {
    /// Derives the layout of the auxiliary security header from its security
    /// control field.
    ///
    /// Frame counter suppression is only honored for IEEE 802.15.4-2015
    /// frames.
    pub(crate) fn with_security_control(
        &self,
        security_control: Option<SecurityControl>,
        frame_version: FrameVersion,
    ) -> MpduFieldRanges<MpduWithSecurityControl> {
        let mut next = self.next_state();
        if let Some(security_control) = security_control {
            let frame_counter_suppressed =
                !frame_version.is_legacy() && security_control.frame_counter_suppression();
            next.length_frame_counter = if frame_counter_suppressed {
                0
            } else {
                FRAME_COUNTER_LEN as u8
            };
            next.length_key_id = security_control.key_id_mode().key_id_length();
            next.length_mic = security_control.security_level().mic_length();
        }
        next
    }
}

impl MpduFieldRanges<MpduWithSecurityControl> {
    pub(crate) fn with_aux_sec_header(&self) -> MpduFieldRanges<MpduWithAuxSecHeader> {
        self.next_state()
    }
}

impl MpduFieldRanges<MpduWithAuxSecHeader> {
    /// Derives the MAC footer position from the PSDU length and accepts the
    /// header IE list found between the auxiliary security header and the MIC.
    pub(crate) fn with_ies(
        &self,
        psdu_length: u8,
        header_ies: HeaderIeList,
    ) -> Result<MpduFieldRanges<MpduWithAllFields>> {
        let offset_end = PHY_HDR_LEN + psdu_length as usize;
        let offset_mic = self.offset_mic_for(offset_end)?;
        let termination_length = match header_ies.termination {
            Some(_) => HEADER_IE_HDR_LEN,
            None => 0,
        };
        if self.offset_ies() + header_ies.length + termination_length > offset_mic {
            return Err(Error);
        }

        let mut next = self.next_state();
        next.length_header_ies = header_ies.length as u8;
        next.termination = header_ies.termination;
        next.offset_fcs = (offset_end - FCS_LEN) as u8;
        Ok(next)
    }

    /// The MIC offset of a frame ending at the given offset.
    pub(crate) fn offset_mic_for(&self, offset_end: usize) -> Result<usize> {
        offset_end
            .checked_sub(FCS_LEN + self.length_mic as usize)
            .filter(|offset_mic| *offset_mic >= self.offset_ies())
            .ok_or(Error)
    }
}

impl<State> MpduFieldRanges<State> {
    const fn next_state<Next>(&self) -> MpduFieldRanges<Next> {
        MpduFieldRanges {
            state: PhantomData,
            seq_nr_present: self.seq_nr_present,
            addressing_lengths: self.addressing_lengths,
            security_enabled: self.security_enabled,
            length_frame_counter: self.length_frame_counter,
            length_key_id: self.length_key_id,
            length_mic: self.length_mic,
            length_header_ies: self.length_header_ies,
            termination: self.termination,
            offset_fcs: self.offset_fcs,
        }
    }

    /// The buffer range containing the frame control field.
    pub(crate) const fn range_frame_control(&self) -> Range<usize> {
        OFFSET_FRAME_CONTROL as usize..OFFSET_SEQ_NR as usize
    }
}

impl<State: MpduParsedUpToFrameControl> MpduFieldRanges<State> {
    /// The sequence number is a single byte, so we return its index.
    pub(crate) const fn offset_seq_nr(&self) -> Option<usize> {
        if self.seq_nr_present {
            Some(OFFSET_SEQ_NR as usize)
        } else {
            None
        }
    }

    pub(crate) const fn addressing_lengths(&self) -> [u8; 4] {
        self.addressing_lengths
    }

    pub(crate) const fn range_addressing(&self) -> Range<usize> {
        let offset_addressing = OFFSET_SEQ_NR as usize
            + if self.seq_nr_present {
                SEQ_NR_LEN
            } else {
                0
            };
        let [dst_pan_id_len, dst_addr_len, src_pan_id_len, src_addr_len] =
            self.addressing_lengths;
        let length = dst_pan_id_len + dst_addr_len + src_pan_id_len + src_addr_len;
        offset_addressing..offset_addressing + length as usize
    }

    /// The index of the security control field if security is enabled.
    pub(crate) const fn offset_security_control(&self) -> Option<usize> {
        if self.security_enabled {
            Some(self.range_addressing().end)
        } else {
            None
        }
    }
}

impl<State: MpduParsedUpToSecurityControl> MpduFieldRanges<State> {
    pub(crate) const fn range_aux_sec_header(&self) -> Option<Range<usize>> {
        match self.offset_security_control() {
            Some(offset) => Some(
                offset
                    ..offset
                        + SECURITY_CONTROL_LEN
                        + self.length_frame_counter as usize
                        + self.length_key_id as usize,
            ),
            None => None,
        }
    }

    pub(crate) const fn range_frame_counter(&self) -> Option<Range<usize>> {
        match self.offset_security_control() {
            Some(offset) if self.length_frame_counter > 0 => {
                let start = offset + SECURITY_CONTROL_LEN;
                Some(start..start + FRAME_COUNTER_LEN)
            }
            _ => None,
        }
    }

    pub(crate) const fn range_key_id(&self) -> Option<Range<usize>> {
        match self.offset_security_control() {
            Some(offset) => {
                let start = offset + SECURITY_CONTROL_LEN + self.length_frame_counter as usize;
                Some(start..start + self.length_key_id as usize)
            }
            None => None,
        }
    }

    pub(crate) const fn offset_aux_sec_header_end(&self) -> usize {
        match self.range_aux_sec_header() {
            Some(range) => range.end,
            None => self.range_addressing().end,
        }
    }

    pub(crate) const fn length_mic(&self) -> u8 {
        self.length_mic
    }
}

impl<State: MpduParsedUpToAuxSecHeader> MpduFieldRanges<State> {
    /// Information elements start right after the auxiliary security header.
    pub(crate) const fn offset_ies(&self) -> usize {
        self.offset_aux_sec_header_end()
    }
}

impl MpduFieldRanges<MpduWithAllFields> {
    pub(crate) const fn range_header_ies(&self) -> Range<usize> {
        let offset_ies = self.offset_ies();
        offset_ies..offset_ies + self.length_header_ies as usize
    }

    pub(crate) const fn termination(&self) -> Option<HeaderTermination> {
        self.termination
    }

    pub(crate) const fn offset_mac_payload(&self) -> usize {
        self.range_header_ies().end
            + match self.termination {
                Some(_) => HEADER_IE_HDR_LEN,
                None => 0,
            }
    }

    pub(crate) const fn range_mic(&self) -> Range<usize> {
        let offset_fcs = self.offset_fcs as usize;
        offset_fcs - self.length_mic as usize..offset_fcs
    }

    pub(crate) const fn range_mac_payload(&self) -> Range<usize> {
        self.offset_mac_payload()..self.range_mic().start
    }

    pub(crate) const fn range_fcs(&self) -> Range<usize> {
        let offset_fcs = self.offset_fcs as usize;
        offset_fcs..offset_fcs + FCS_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AddressingMode, KeyIdMode, SecurityLevel};

    #[test]
    fn staged_offsets() {
        let fc = FrameControl::new()
            .with_frame_type(FrameType::Data)
            .with_security_enabled(true)
            .with_frame_version(FrameVersion::Ieee802154)
            .with_pan_id_compression(true)
            .with_dst_addr_mode(AddressingMode::Short)
            .with_src_addr_mode(AddressingMode::Extended);
        let ranges = MpduFieldRanges::new().with_frame_control(fc).unwrap();
        assert_eq!(ranges.offset_seq_nr(), Some(3));
        assert_eq!(ranges.range_addressing(), 4..16);
        assert_eq!(ranges.offset_security_control(), Some(16));

        let sec_ctrl = SecurityControl::new()
            .with_security_level(SecurityLevel::EncMic64)
            .with_key_id_mode(KeyIdMode::Source4Byte);
        let ranges = ranges.with_security_control(Some(sec_ctrl), FrameVersion::Ieee802154);
        assert_eq!(ranges.range_frame_counter(), Some(17..21));
        assert_eq!(ranges.range_key_id(), Some(21..26));
        assert_eq!(ranges.range_aux_sec_header(), Some(16..26));
        assert_eq!(ranges.length_mic(), 8);

        let ranges = ranges.with_aux_sec_header();
        assert_eq!(ranges.offset_ies(), 26);

        let no_ies = HeaderIeList {
            length: 0,
            termination: None,
        };
        // 25 header bytes, the MIC and the FCS need at least 35 bytes.
        assert_eq!(ranges.with_ies(34, no_ies), Err(Error));
        let ranges = ranges.with_ies(37, no_ies).unwrap();
        assert_eq!(ranges.range_mac_payload(), 26..28);
        assert_eq!(ranges.range_mic(), 28..36);
        assert_eq!(ranges.range_fcs(), 36..38);
    }

    #[test]
    fn suppressed_fields() {
        let fc = FrameControl::new()
            .with_frame_type(FrameType::Ack)
            .with_security_enabled(true)
            .with_seq_nr_suppression(true)
            .with_frame_version(FrameVersion::Ieee802154);
        let ranges = MpduFieldRanges::new().with_frame_control(fc).unwrap();
        assert_eq!(ranges.offset_seq_nr(), None);
        assert_eq!(ranges.range_addressing(), 3..3);

        let sec_ctrl = SecurityControl::new()
            .with_security_level(SecurityLevel::Mic32)
            .with_frame_counter_suppression(true);
        let tsch = ranges.with_security_control(Some(sec_ctrl), FrameVersion::Ieee802154);
        assert_eq!(tsch.range_frame_counter(), None);
        assert_eq!(tsch.range_aux_sec_header(), Some(3..4));

        // Legacy frames know no frame counter suppression.
        let legacy = ranges.with_security_control(Some(sec_ctrl), FrameVersion::Ieee802154_2006);
        assert_eq!(legacy.range_frame_counter(), Some(4..8));
    }

    #[test]
    fn rejected_frame_controls() {
        let fc = FrameControl::new()
            .with_frame_type(FrameType::Multipurpose)
            .with_frame_version(FrameVersion::Ieee802154);
        assert_eq!(MpduFieldRanges::new().with_frame_control(fc), Err(Error));

        let fc = FrameControl::new()
            .with_frame_type(FrameType::Data)
            .with_security_enabled(true)
            .with_frame_version(FrameVersion::Ieee802154_2003)
            .with_dst_addr_mode(AddressingMode::Short);
        assert_eq!(MpduFieldRanges::new().with_frame_control(fc), Err(Error));
    }
}
