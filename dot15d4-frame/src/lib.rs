//! Staged parsing and in-place building of IEEE 802.15.4 MPDUs.
//!
//! Frames live in a flat buffer that starts with the PHY header (PHR). The
//! [`MpduParser`] wraps such a buffer and unlocks field accessors step by
//! step as the frame is being parsed. The same staged API is used to build
//! frames: a field is written, the PHR is extended and the next parsing step
//! then re-validates the result.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod constants;
pub mod ie;

mod addressing;
mod field_ranges;
mod frame_control;
mod parser;
mod security;

pub use addressing::{
    Address, AddressingFields, AddressingMode, ExtendedAddress, PanId, ShortAddress,
};
pub use dot15d4_util::{Error, Result};
pub use frame_control::{FrameControl, FrameType, FrameVersion};
pub use ie::{HeaderIe, HeaderIeIter, HeaderTermination};
pub use parser::MpduParser;
pub use security::{KeyId, KeyIdMode, SecurityControl, SecurityLevel};

/// Nothing has been parsed, only the PHR may be accessed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduUnparsed;

/// The frame control field is valid. Sequence number and addressing offsets
/// are known.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduWithFrameControl;

/// The security control field is valid. The auxiliary security header layout
/// is known.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduWithSecurityControl;

/// The auxiliary security header is valid.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduWithAuxSecHeader;

/// The complete PSDU is valid.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpduWithAllFields;

/// How far an MPDU has been parsed.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseLevel {
    None,
    FrameControl,
    SecurityControl,
    AuxSecHeaderEnd,
    Full,
}

/// Associates each MPDU state with its parse level.
pub trait ParseState {
    const LEVEL: ParseLevel;
}

impl ParseState for MpduUnparsed {
    const LEVEL: ParseLevel = ParseLevel::None;
}
impl ParseState for MpduWithFrameControl {
    const LEVEL: ParseLevel = ParseLevel::FrameControl;
}
impl ParseState for MpduWithSecurityControl {
    const LEVEL: ParseLevel = ParseLevel::SecurityControl;
}
impl ParseState for MpduWithAuxSecHeader {
    const LEVEL: ParseLevel = ParseLevel::AuxSecHeaderEnd;
}
impl ParseState for MpduWithAllFields {
    const LEVEL: ParseLevel = ParseLevel::Full;
}

/// A marker trait that subsumes all MPDU states that provide access to the
/// sequence number and addressing fields.
pub trait MpduParsedUpToFrameControl {}
impl MpduParsedUpToFrameControl for MpduWithFrameControl {}
impl MpduParsedUpToFrameControl for MpduWithSecurityControl {}
impl MpduParsedUpToFrameControl for MpduWithAuxSecHeader {}
impl MpduParsedUpToFrameControl for MpduWithAllFields {}

/// A marker trait that subsumes all MPDU states that provide access to the
/// auxiliary security header fields.
pub trait MpduParsedUpToSecurityControl: MpduParsedUpToFrameControl {}
impl MpduParsedUpToSecurityControl for MpduWithSecurityControl {}
impl MpduParsedUpToSecurityControl for MpduWithAuxSecHeader {}
impl MpduParsedUpToSecurityControl for MpduWithAllFields {}

/// A marker trait that subsumes all MPDU states that know where information
/// elements start.
pub trait MpduParsedUpToAuxSecHeader: MpduParsedUpToSecurityControl {}
impl MpduParsedUpToAuxSecHeader for MpduWithAuxSecHeader {}
impl MpduParsedUpToAuxSecHeader for MpduWithAllFields {}

/// A marker trait for MPDU states in which the PHR may still change.
pub trait MpduIncomplete {}
impl MpduIncomplete for MpduUnparsed {}
impl MpduIncomplete for MpduWithFrameControl {}
impl MpduIncomplete for MpduWithSecurityControl {}
impl MpduIncomplete for MpduWithAuxSecHeader {}
