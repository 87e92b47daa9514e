/// Timestamp field values at or above this enable the extended timestamp.
pub const MAX_TIMESTAMP: u32 = 0xFFFFFF;

/// Both directions start at 128 bytes until a Set Chunk Size applies.
pub const INIT_CHUNK_SIZE: usize = 128;
pub const MIN_CHUNK_SIZE: usize = 2;

/// Upper bound on a single message payload. The wire field is 24 bits;
/// anything near that ceiling is a hostile length claim rather than a
/// real message, and the reader allocates the full payload up front.
pub const MAX_MESSAGE_PAYLOAD: u32 = 0x80_0000;

pub mod csid {
    use crate::{
        protocol_control::consts::PROTOCOL_CONTROL_CSID, user_control::consts::USER_CONTROL_CSID,
    };

    pub const PROTOCOL_CONTROL: u8 = PROTOCOL_CONTROL_CSID;
    pub const USER_CONTROL: u8 = USER_CONTROL_CSID;
    pub const NET_CONNECTION_COMMAND: u8 = 0x03;
    pub const NET_CONNECTION_COMMAND2: u8 = 0x04;
    pub const NET_STREAM_COMMAND: u8 = 0x05;
    pub const VIDEO: u8 = 0x06;
    pub const AUDIO: u8 = 0x07;
}
