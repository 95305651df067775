use core::ops::Range;

use byteorder::{ByteOrder, LE};
use dot15d4_util::{Error, Result};

use crate::{
    constants::{PHY_HDR_LEN, PHY_HDR_OFFSET, PHY_MAX_PACKET_SIZE_127, SECURITY_CONTROL_LEN},
    field_ranges::MpduFieldRanges,
    ie::{scan_header_ies, HeaderIeIter, HeaderIeList, HeaderTermination},
    AddressingFields, FrameControl, KeyId, MpduIncomplete, MpduParsedUpToAuxSecHeader,
    MpduParsedUpToFrameControl, MpduParsedUpToSecurityControl, MpduUnparsed, MpduWithAllFields,
    MpduWithAuxSecHeader, MpduWithFrameControl, MpduWithSecurityControl, ParseLevel, ParseState,
    SecurityControl,
};

/// An MPDU parser that provides staged access to frame content depending on
/// its parsing state.
///
/// The buffer starts with the PHY header (PHR) which holds the length of the
/// PSDU that follows. The level of access (owned, read-only, read/write) is
/// defined by the `Bytes` generic.
///
/// Every transition to the next state takes the number of valid bytes at the
/// start of the buffer (PHR included) and fails if the fields required by the
/// next state are not covered. This allows a frame to be re-validated step by
/// step while it is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpduParser<Bytes, State> {
    field_ranges: MpduFieldRanges<State>,
    buffer: Bytes,
}

impl<Bytes: AsRef<[u8]>> MpduParser<Bytes, MpduUnparsed> {
    /// Wraps a PHR-prefixed buffer without validating any of its content.
    pub const fn new(buffer: Bytes) -> Self {
        Self {
            field_ranges: MpduFieldRanges::new(),
            buffer,
        }
    }

    /// Fully parses a received frame whose PHR covers the complete PSDU.
    pub fn parse(buffer: Bytes) -> Result<MpduParser<Bytes, MpduWithAllFields>> {
        let parser = Self::new(buffer);
        let valid_data_length = parser.valid_data_length();
        parser
            .parse_frame_control(valid_data_length)?
            .parse_security_control(valid_data_length)?
            .parse_aux_sec_header(valid_data_length)?
            .parse_ies(valid_data_length)
    }

    /// Reads the frame control field and derives the position of sequence
    /// number and addressing fields.
    pub fn parse_frame_control(
        self,
        valid_data_length: usize,
    ) -> Result<MpduParser<Bytes, MpduWithFrameControl>> {
        self.check_valid(valid_data_length, self.field_ranges.range_frame_control().end)?;
        let field_ranges = self
            .field_ranges
            .with_frame_control(self.frame_control())?;
        if field_ranges.range_addressing().end > self.buffer.as_ref().len() {
            return Err(Error);
        }
        Ok(MpduParser {
            field_ranges,
            buffer: self.buffer,
        })
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> MpduParser<Bytes, MpduUnparsed> {
    /// Writes the frame control field. Only possible before the frame control
    /// has been parsed as all other offsets depend on it.
    pub fn set_frame_control(&mut self, frame_control: FrameControl) {
        let range = self.field_ranges.range_frame_control();
        frame_control.write_le_bytes(&mut self.buffer.as_mut()[range]);
    }
}

impl<Bytes: AsRef<[u8]>> MpduParser<Bytes, MpduWithFrameControl> {
    /// Reads the security control field (if security is enabled) and derives
    /// the layout of the auxiliary security header.
    pub fn parse_security_control(
        self,
        valid_data_length: usize,
    ) -> Result<MpduParser<Bytes, MpduWithSecurityControl>> {
        let security_control = match self.field_ranges.offset_security_control() {
            Some(offset) => {
                self.check_valid(valid_data_length, offset + SECURITY_CONTROL_LEN)?;
                Some(SecurityControl::from_bits(self.buffer.as_ref()[offset]))
            }
            None => {
                self.check_valid(valid_data_length, self.field_ranges.range_frame_control().end)?;
                None
            }
        };
        let field_ranges = self
            .field_ranges
            .with_security_control(security_control, self.frame_control().frame_version());
        if field_ranges.offset_aux_sec_header_end() > self.buffer.as_ref().len() {
            return Err(Error);
        }
        Ok(MpduParser {
            field_ranges,
            buffer: self.buffer,
        })
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> MpduParser<Bytes, MpduWithFrameControl> {
    /// Writes the security control field. Only possible before the security
    /// control has been parsed as the auxiliary security header layout
    /// depends on it.
    pub fn set_security_control(&mut self, security_control: SecurityControl) -> Result<()> {
        let offset = self.field_ranges.offset_security_control().ok_or(Error)?;
        self.buffer.as_mut()[offset] = security_control.into_bits();
        Ok(())
    }
}

impl<Bytes: AsRef<[u8]>> MpduParser<Bytes, MpduWithSecurityControl> {
    /// Confirms that the complete auxiliary security header is valid.
    pub fn parse_aux_sec_header(
        self,
        valid_data_length: usize,
    ) -> Result<MpduParser<Bytes, MpduWithAuxSecHeader>> {
        self.check_valid(valid_data_length, self.field_ranges.offset_aux_sec_header_end())?;
        Ok(MpduParser {
            field_ranges: self.field_ranges.with_aux_sec_header(),
            buffer: self.buffer,
        })
    }
}

impl<Bytes: AsRef<[u8]>> MpduParser<Bytes, MpduWithAuxSecHeader> {
    /// Validates the complete PSDU: locates MIC and FCS from the PHR and walks
    /// the header IE list if the IE present bit is set.
    pub fn parse_ies(
        self,
        valid_data_length: usize,
    ) -> Result<MpduParser<Bytes, MpduWithAllFields>> {
        let psdu_length = self.psdu_length();
        if psdu_length as usize > PHY_MAX_PACKET_SIZE_127 {
            return Err(Error);
        }
        let offset_end = PHY_HDR_LEN + psdu_length as usize;
        self.check_valid(valid_data_length, offset_end)?;

        let offset_ies = self.field_ranges.offset_ies();
        let offset_mic = self.field_ranges.offset_mic_for(offset_end)?;
        let header_ies = if self.frame_control().ie_present() {
            scan_header_ies(&self.buffer.as_ref()[offset_ies..offset_mic])?
        } else {
            HeaderIeList {
                length: 0,
                termination: None,
            }
        };

        Ok(MpduParser {
            field_ranges: self.field_ranges.with_ies(psdu_length, header_ies)?,
            buffer: self.buffer,
        })
    }
}

/// Accessors available in all parsing states.
impl<Bytes: AsRef<[u8]>, State> MpduParser<Bytes, State> {
    /// The PSDU length as found in the PHR.
    pub fn psdu_length(&self) -> u8 {
        self.buffer.as_ref()[PHY_HDR_OFFSET]
    }

    /// The number of bytes covered by the PHR including the PHR itself.
    pub fn valid_data_length(&self) -> usize {
        PHY_HDR_LEN + self.psdu_length() as usize
    }

    /// The frame control field.
    pub fn frame_control(&self) -> FrameControl {
        FrameControl::from_le_bytes(&self.buffer.as_ref()[self.field_ranges.range_frame_control()])
    }

    /// The raw buffer including the PHR.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    /// The raw buffer including the PHR, cut off after the PSDU.
    pub fn as_frame(&self) -> &[u8] {
        let buffer = self.buffer.as_ref();
        &buffer[..self.valid_data_length().min(buffer.len())]
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer
    }

    fn check_valid(&self, valid_data_length: usize, required_end: usize) -> Result<()> {
        if valid_data_length < required_end || valid_data_length > self.buffer.as_ref().len() {
            return Err(Error);
        }
        Ok(())
    }
}

impl<Bytes, State: ParseState> MpduParser<Bytes, State> {
    pub const fn parse_level(&self) -> ParseLevel {
        State::LEVEL
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>, State> MpduParser<Bytes, State> {
    /// Raw mutable access to the buffer including the PHR.
    ///
    /// Writes through this accessor are not checked against the parsed
    /// structure.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

/// The PHR may only change while the frame is still incomplete. Once all
/// fields have been parsed, the MIC and FCS positions depend on it.
impl<Bytes: AsRef<[u8]> + AsMut<[u8]>, State: MpduIncomplete> MpduParser<Bytes, State> {
    pub fn set_psdu_length(&mut self, psdu_length: u8) {
        self.buffer.as_mut()[PHY_HDR_OFFSET] = psdu_length;
    }

    /// Accounts for bytes appended to the PSDU.
    pub fn add_psdu_length(&mut self, length: u8) {
        let psdu_length = self.psdu_length();
        self.set_psdu_length(psdu_length + length);
    }
}

/// Sequence number and addressing fields are available on all states
/// implementing [`MpduParsedUpToFrameControl`].
impl<Bytes: AsRef<[u8]>, State: MpduParsedUpToFrameControl> MpduParser<Bytes, State> {
    /// Reads the sequence number field unless suppressed.
    pub fn sequence_number(&self) -> Option<u8> {
        self.field_ranges
            .offset_seq_nr()
            .map(|offset| self.buffer.as_ref()[offset])
    }

    /// Read-only access to the addressing fields.
    pub fn addressing_fields(&self) -> AddressingFields<&[u8]> {
        AddressingFields::from_lengths(
            &self.buffer.as_ref()[self.field_ranges.range_addressing()],
            self.field_ranges.addressing_lengths(),
        )
    }

    /// The index of the first byte after the addressing fields.
    pub fn addressing_end_offset(&self) -> usize {
        self.field_ranges.range_addressing().end
    }

    /// The index of the auxiliary security header if security is enabled.
    pub fn aux_sec_header_offset(&self) -> Option<usize> {
        self.field_ranges.offset_security_control()
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>, State: MpduParsedUpToFrameControl> MpduParser<Bytes, State> {
    /// Writes the sequence number field.
    ///
    /// Fails if the sequence number is suppressed.
    pub fn set_sequence_number(&mut self, seq_nr: u8) -> Result<()> {
        let offset = self.field_ranges.offset_seq_nr().ok_or(Error)?;
        self.buffer.as_mut()[offset] = seq_nr;
        Ok(())
    }

    /// Mutable access to the addressing fields.
    pub fn addressing_fields_mut(&mut self) -> AddressingFields<&mut [u8]> {
        let range = self.field_ranges.range_addressing();
        AddressingFields::from_lengths(
            &mut self.buffer.as_mut()[range],
            self.field_ranges.addressing_lengths(),
        )
    }
}

/// Auxiliary security header fields are available on all states implementing
/// [`MpduParsedUpToSecurityControl`].
impl<Bytes: AsRef<[u8]>, State: MpduParsedUpToSecurityControl> MpduParser<Bytes, State> {
    /// The security control field if security is enabled.
    pub fn security_control(&self) -> Option<SecurityControl> {
        self.field_ranges
            .offset_security_control()
            .map(|offset| SecurityControl::from_bits(self.buffer.as_ref()[offset]))
    }

    /// The complete auxiliary security header if security is enabled.
    pub fn aux_sec_header(&self) -> Option<&[u8]> {
        let range = self.field_ranges.range_aux_sec_header()?;
        Some(&self.buffer.as_ref()[range])
    }

    /// The key identifier if security is enabled.
    pub fn key_id(&self) -> Option<KeyId<&[u8]>> {
        let security_control = self.security_control()?;
        let range = self.field_ranges.range_key_id()?;
        KeyId::new(security_control.key_id_mode(), &self.buffer.as_ref()[range]).ok()
    }

    /// The frame counter unless security is disabled or the frame counter is
    /// suppressed.
    pub fn frame_counter(&self) -> Option<u32> {
        let range = self.field_ranges.range_frame_counter()?;
        Some(LE::read_u32(&self.buffer.as_ref()[range]))
    }

    /// Length of the MIC in bytes, zero if security is disabled.
    pub fn mic_length(&self) -> u8 {
        self.field_ranges.length_mic()
    }

    /// The index of the first byte after the auxiliary security header or
    /// the addressing fields if security is disabled.
    pub fn aux_sec_header_end_offset(&self) -> usize {
        self.field_ranges.offset_aux_sec_header_end()
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>, State: MpduParsedUpToSecurityControl>
    MpduParser<Bytes, State>
{
    pub fn aux_sec_header_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.field_ranges.range_aux_sec_header()?;
        Some(&mut self.buffer.as_mut()[range])
    }

    pub fn key_id_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.field_ranges.range_key_id()?;
        Some(&mut self.buffer.as_mut()[range])
    }

    /// Writes the frame counter.
    ///
    /// Fails if security is disabled or the frame counter is suppressed.
    pub fn set_frame_counter(&mut self, frame_counter: u32) -> Result<()> {
        let range = self.field_ranges.range_frame_counter().ok_or(Error)?;
        LE::write_u32(&mut self.buffer.as_mut()[range], frame_counter);
        Ok(())
    }
}

impl<Bytes: AsRef<[u8]>, State: MpduParsedUpToAuxSecHeader> MpduParser<Bytes, State> {
    /// The index of the first information element.
    pub fn ies_offset(&self) -> usize {
        self.field_ranges.offset_ies()
    }
}

/// The [`MpduWithAllFields`] state represents a fully parsed frame with
/// access to all fields.
impl<Bytes: AsRef<[u8]>> MpduParser<Bytes, MpduWithAllFields> {
    /// The header IEs without termination, if the IE present bit is set.
    pub fn header_ies(&self) -> Option<&[u8]> {
        if !self.frame_control().ie_present() {
            return None;
        }
        Some(&self.buffer.as_ref()[self.field_ranges.range_header_ies()])
    }

    /// Iterates over the header IEs without termination.
    pub fn header_ie_iter(&self) -> HeaderIeIter<'_> {
        HeaderIeIter::new(self.header_ies().unwrap_or_default())
    }

    pub fn header_termination(&self) -> Option<HeaderTermination> {
        self.field_ranges.termination()
    }

    /// The MAC payload (including payload IEs), if any.
    pub fn mac_payload(&self) -> Option<&[u8]> {
        let range = self.field_ranges.range_mac_payload();
        if range.is_empty() {
            return None;
        }
        Some(&self.buffer.as_ref()[range])
    }

    pub fn mic(&self) -> Option<&[u8]> {
        let range = self.field_ranges.range_mic();
        if range.is_empty() {
            return None;
        }
        Some(&self.buffer.as_ref()[range])
    }

    pub fn fcs(&self) -> &[u8] {
        &self.buffer.as_ref()[self.field_ranges.range_fcs()]
    }

    /// The MAC header from the frame control field up to and including the
    /// header IE termination.
    pub fn range_mac_header(&self) -> Range<usize> {
        self.field_ranges.range_frame_control().start..self.field_ranges.offset_mac_payload()
    }

    pub fn range_mac_payload(&self) -> Range<usize> {
        self.field_ranges.range_mac_payload()
    }

    pub fn range_mic(&self) -> Range<usize> {
        self.field_ranges.range_mic()
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> MpduParser<Bytes, MpduWithAllFields> {
    pub fn mic_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.field_ranges.range_mic();
        if range.is_empty() {
            return None;
        }
        Some(&mut self.buffer.as_mut()[range])
    }
}
