use clap::Parser;

/// A small live rtmp ingest-and-relay server.
#[derive(Parser)]
#[command(version, about)]
pub(crate) struct AppCli {
    /// TCP port the rtmp listener binds on.
    pub(crate) listen_port: u16,
    /// Log level: trace, debug, info, warn or error.
    #[arg(long, value_name = "LOG_LEVEL", default_value = "info")]
    pub(crate) log_level: String,
}
