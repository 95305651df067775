//! This crate contains generic utilities other dot15d4 crates depend upon but
//! not directly related to the IEEE 802.15.4 standard.
//!
//! Currently this is the shared error type and a logging facade that lets the
//! frame and acknowledgment crates log through either `log` or `defmt`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod log;

#[cfg(any(feature = "defmt", feature = "log"))]
pub use self::log::*;

/// A generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid frame structure")
    }
}

/// A type alias for `Result<T, dot15d4-util::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
