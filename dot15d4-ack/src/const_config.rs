//! Build-time configuration, see `build.rs`.
//!
//! Values are taken from `DOT15D4_*` environment variables at build time,
//! e.g. `DOT15D4_MAC_PAN_ID="PanId::new_owned([0xcd, 0xab])"`.
pub use customizable::*;


#[cfg(not(test))]
mod customizable {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}
