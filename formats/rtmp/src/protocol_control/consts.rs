pub const PROTOCOL_CONTROL_MESSAGE_STREAM_ID: u8 = 0;
pub const PROTOCOL_CONTROL_CSID: u8 = 2;
