use clap::Parser;
use rtmp_server::{config::RtmpServerConfig, consts::OUT_CHUNK_SIZE, server::RtmpServer};
use stream_center::stream_center::StreamCenter;
use tokio::signal;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

mod cli;
mod errors;
mod util;

#[tokio::main]
async fn main() {
    let args = cli::AppCli::parse();
    let level = match util::parse_log_level(&args.log_level) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_env("RILL_LOG")
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .finish();
    tracing::dispatcher::set_global_default(Dispatch::new(subscriber))
        .expect("no other global subscriber is installed at startup");

    tracing::info!("rill is starting");

    let mut stream_center = StreamCenter::new();
    let config = RtmpServerConfig {
        port: args.listen_port,
        chunk_size: OUT_CHUNK_SIZE,
        read_timeout_ms: 10_000,
        write_timeout_ms: 10_000,
    };
    let mut rtmp_server = RtmpServer::new(&config, stream_center.get_event_sender());

    tokio::spawn(async move { stream_center.run().await });
    tokio::spawn(async move {
        if let Err(err) = rtmp_server.run().await {
            // the listener itself failed, nothing left to serve
            tracing::error!("rtmp server exited: {:?}", err);
            std::process::exit(1);
        }
    });

    tracing::info!("rill is serving rtmp on port {}", args.listen_port);
    let _ = signal::ctrl_c().await;
    tracing::info!("rill is shutting down");
}
