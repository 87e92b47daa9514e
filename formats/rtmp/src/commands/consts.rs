// @see: 7.2.1. NetConnection Commands
pub mod c2s_command_names {
    pub const CONNECT: &str = "connect";
    pub const CREATE_STREAM: &str = "createStream";
    pub const RELEASE_STREAM: &str = "releaseStream";
    pub const FC_PUBLISH: &str = "FCPublish";
    pub const FC_UNPUBLISH: &str = "FCUnpublish";
    pub const PUBLISH: &str = "publish";
    pub const PLAY: &str = "play";
}

pub mod s2c_command_names {
    pub const RESULT: &str = "_result";
    pub const ERROR: &str = "_error";
    pub const ON_STATUS: &str = "onStatus";
    pub const ON_BW_DONE: &str = "onBWDone";
    pub const ON_FC_PUBLISH: &str = "onFCPublish";
    pub const ON_FC_UNPUBLISH: &str = "onFCUnpublish";
    pub const SAMPLE_ACCESS: &str = "|RtmpSampleAccess";
}

pub mod data_message_names {
    pub const ON_META_DATA: &str = "onMetaData";
    pub const SET_DATA_FRAME: &str = "@setDataFrame";
}

/// connect carries a fixed transaction id.
pub const CONNECT_TRANSACTION_ID: f64 = 1.0;

/// The single message stream this server allocates per connection.
pub const RESPONSE_STREAM_ID: u8 = 1;

pub const DEFAULT_RTMP_PORT: &str = "1935";

pub mod play_defaults {
    pub const START: f64 = -2.0;
    pub const DURATION: f64 = -1.0;
    pub const RESET: bool = true;
}
