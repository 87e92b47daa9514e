pub const FMS_VERSION: &str = "FMS/3,5,3,888";
pub const FMS_CAPABILITIES: f64 = 127.0;
pub const FMS_MODE: f64 = 1.0;
pub const SIG_CLIENT_ID: &str = "ASAICiss";

pub const WINDOW_ACK_SIZE: u32 = 2_500_000;
pub const PEER_BANDWIDTH: u32 = 2_500_000;

/// Outgoing chunk size raised right after identify.
pub const OUT_CHUNK_SIZE: u32 = 4096;

/// Pulse of the play loop's socket poll.
pub const PLAY_PULSE_MS: u64 = 100;

pub mod status_keys {
    pub const LEVEL: &str = "level";
    pub const CODE: &str = "code";
    pub const DESCRIPTION: &str = "description";
    pub const DETAILS: &str = "details";
    pub const CLIENT_ID: &str = "clientid";
}

pub mod response_level {
    pub const STATUS: &str = "status";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}

pub mod response_code {
    pub const NET_CONNECTION_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
    pub const NET_STREAM_PLAY_RESET: &str = "NetStream.Play.Reset";
    pub const NET_STREAM_PLAY_START: &str = "NetStream.Play.Start";
    pub const NET_STREAM_PUBLISH_START: &str = "NetStream.Publish.Start";
    pub const NET_STREAM_DATA_START: &str = "NetStream.Data.Start";
    pub const NET_STREAM_UNPUBLISH_SUCCESS: &str = "NetStream.Unpublish.Success";
}
