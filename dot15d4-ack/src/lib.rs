//! Enhanced Acknowledgment (Enh-Ack) generation for IEEE 802.15.4-2015.
//!
//! Enh-Acks must be on air within the acknowledgment turnaround time after a
//! frame was received. [`EnhAckGenerator`] therefore builds them in place,
//! without allocation, in a buffer it owns:
//! - addressing is derived from the acknowledged frame,
//! - the auxiliary security header mirrors the frame's security settings
//!   with a freshly issued frame counter,
//! - header IEs and the frame pending bit are looked up per source address,
//! - secured acknowledgments are readied for CCM* before transmission.
//!
//! The MIC and FCS are reserved but left to the radio and the cipher.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod const_config;

mod aux_sec;
mod cipher;
mod generator;
mod ies;
mod policy;
mod security;

pub use aux_sec::{AuxSecHeaderSource, FrameCounterOrigin};
pub use cipher::{CcmStarPreparer, CcmTransformation, CipherError, CipherPreparer, NONCE_LEN};
pub use generator::{AckError, EnhAckGenerator};
pub use ies::{CslIeWriter, IeFinalizer};
pub use policy::{AckDataError, AckDataTable, AckPolicy, SourceMatch};
pub use security::{Key, KeyStore, KeyTable, SecurityDirectory, SecurityError, KEY_LEN};
