pub const USER_CONTROL_MESSAGE_TYPE: u8 = 4;
pub const USER_CONTROL_MESSAGE_STREAM_ID: u8 = 0;
pub const USER_CONTROL_CSID: u8 = 2;
