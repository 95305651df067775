//! Auxiliary security header of the acknowledgment.
//!
//! The acknowledgment mirrors the security control field and key identifier
//! of the acknowledged frame. Its frame counter is either mirrored as well
//! (security level 0) or freshly issued.
use dot15d4_frame::{
    constants::SECURITY_CONTROL_LEN, KeyId, MpduParser, MpduWithAllFields, MpduWithAuxSecHeader,
    MpduWithFrameControl, SecurityLevel,
};

use crate::security::{SecurityDirectory, SecurityError};

/// Where the content of the acknowledgment's auxiliary security header comes
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxSecHeaderSource<'frame> {
    /// Security level 0: the frame is not cryptographically protected. The
    /// remainder of the header after the security control field (frame
    /// counter and key identifier) is mirrored verbatim.
    Unprotected(&'frame [u8]),
    /// The acknowledgment will be secured with the given key and needs its
    /// own frame counter.
    Protected {
        level: SecurityLevel,
        key_id: KeyId<&'frame [u8]>,
    },
}

impl<'frame> AuxSecHeaderSource<'frame> {
    /// Classifies the auxiliary security header of the acknowledged frame,
    /// `None` if security is disabled.
    pub fn from_frame(frame: &'frame MpduParser<&[u8], MpduWithAllFields>) -> Option<Self> {
        let security_control = frame.security_control()?;
        match security_control.security_level() {
            SecurityLevel::None => {
                let aux_sec_header = frame.aux_sec_header()?;
                Some(Self::Unprotected(&aux_sec_header[SECURITY_CONTROL_LEN..]))
            }
            level => Some(Self::Protected {
                level,
                key_id: frame.key_id()?,
            }),
        }
    }
}

/// How the frame counter of the acknowledgment was obtained.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCounterOrigin {
    /// The auxiliary security header carries no frame counter.
    Suppressed,
    /// Copied from an unprotected frame.
    Mirrored,
    /// Issued by the security directory.
    Issued(u32),
}

/// Writes the auxiliary security header (if any) and reserves space for the
/// MIC. Advances the acknowledgment to the end of the auxiliary security
/// header.
///
/// Returns `None` as frame counter origin if security is disabled.
pub(crate) fn write_aux_sec_header<'ack, Sec: SecurityDirectory>(
    frame: &MpduParser<&[u8], MpduWithAllFields>,
    mut ack: MpduParser<&'ack mut [u8], MpduWithFrameControl>,
    security_directory: &mut Sec,
) -> Result<
    (
        MpduParser<&'ack mut [u8], MpduWithAuxSecHeader>,
        Option<FrameCounterOrigin>,
    ),
    SecurityError,
> {
    let (Some(source), Some(frame_security_control)) =
        (AuxSecHeaderSource::from_frame(frame), frame.security_control())
    else {
        return Ok((advance_to_aux_sec_header_end(ack), None));
    };

    // Legacy frames know neither frame counter suppression nor ASN in nonce.
    // The bits are cleared so that the acknowledgment's header has the same
    // layout.
    let security_control = if frame.frame_control().frame_version().is_legacy() {
        frame_security_control.into_legacy()
    } else {
        frame_security_control
    };
    // Safety: The security enabled bit is mirrored from the acknowledged
    //         frame.
    ack.set_security_control(security_control)
        .expect("security disabled");
    ack.add_psdu_length(SECURITY_CONTROL_LEN as u8);

    let valid_data_length = ack.valid_data_length();
    // Safety: The security control field was just written.
    let mut ack = ack
        .parse_security_control(valid_data_length)
        .expect("invalid security control");

    let frame_counter_origin = match source {
        AuxSecHeaderSource::Unprotected(remainder) => {
            // The frame counter of an unprotected frame is mirrored without
            // checking it against any counter state.
            // Safety: Security is enabled, see above.
            let aux_sec_header = ack.aux_sec_header_mut().expect("security disabled");
            aux_sec_header[SECURITY_CONTROL_LEN..].copy_from_slice(remainder);
            if ack.frame_counter().is_some() {
                FrameCounterOrigin::Mirrored
            } else {
                FrameCounterOrigin::Suppressed
            }
        }
        AuxSecHeaderSource::Protected { key_id, .. } => {
            // Safety: Security is enabled and both headers share the key id
            //         mode.
            ack.key_id_mut()
                .expect("security disabled")
                .copy_from_slice(key_id.as_bytes());
            if ack.frame_counter().is_some() {
                // Safety: The key identifier was just copied.
                let ack_key_id = ack.key_id().expect("invalid key id");
                let frame_counter = security_directory.next_frame_counter(&ack_key_id)?;
                // Safety: Checked for presence above.
                ack.set_frame_counter(frame_counter)
                    .expect("frame counter suppressed");
                FrameCounterOrigin::Issued(frame_counter)
            } else {
                FrameCounterOrigin::Suppressed
            }
        }
    };

    let aux_sec_header_len = ack.aux_sec_header_end_offset() - ack.addressing_end_offset();
    let remainder_len = aux_sec_header_len - SECURITY_CONTROL_LEN;
    ack.add_psdu_length(remainder_len as u8 + ack.mic_length());

    let valid_data_length = ack.valid_data_length();
    // Safety: The complete auxiliary security header was just written.
    let ack = ack
        .parse_aux_sec_header(valid_data_length)
        .expect("invalid auxiliary security header");
    Ok((ack, Some(frame_counter_origin)))
}

fn advance_to_aux_sec_header_end(
    ack: MpduParser<&mut [u8], MpduWithFrameControl>,
) -> MpduParser<&mut [u8], MpduWithAuxSecHeader> {
    let valid_data_length = ack.valid_data_length();
    // Safety: Without security, the addressing fields end the auxiliary
    //         security header.
    ack.parse_security_control(valid_data_length)
        .and_then(|ack| ack.parse_aux_sec_header(valid_data_length))
        .expect("invalid addressing fields")
}
