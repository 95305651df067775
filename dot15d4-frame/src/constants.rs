//! Frame size constants.

/// aMaxPhyPacketSize for all PHYs except SUN, TVWS and LECIM FSK.
pub const PHY_MAX_PACKET_SIZE_127: usize = 127;

/// Length of the PHY header, i.e. the PSDU length prefix.
pub const PHY_HDR_LEN: usize = 1;

/// Index of the PHY header in a frame buffer.
pub const PHY_HDR_OFFSET: usize = 0;

/// Length of the frame check sequence.
pub const FCS_LEN: usize = 2;

/// Length of the frame control field.
pub const FRAME_CONTROL_LEN: usize = 2;

/// Length of the sequence number field.
pub const SEQ_NR_LEN: usize = 1;

/// Length of a PAN ID field.
pub const PAN_ID_LEN: usize = 2;

/// Length of the security control field.
pub const SECURITY_CONTROL_LEN: usize = 1;

/// Length of the frame counter field.
pub const FRAME_COUNTER_LEN: usize = 4;

/// Minimum buffer size able to hold any PHR-prefixed frame.
pub const MAX_FRAME_BUFFER_LEN: usize = PHY_HDR_LEN + PHY_MAX_PACKET_SIZE_127;
