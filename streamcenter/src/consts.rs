pub const SERVER_NAME: &str = "rill(live rtmp relay)";
pub const SERVER_URL: &str = "https://github.com/rill-live/rill";
pub const SERVER_VERSION: &str = "0.1.0";

/// Value injected into relayed onMetaData objects under the "server" key.
pub fn server_signature() -> String {
    format!("{}{}", SERVER_NAME, SERVER_VERSION)
}
