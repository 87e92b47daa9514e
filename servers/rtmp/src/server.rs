use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use stream_center::events::StreamCenterEvent;
use tokio::{net::TcpListener, sync::mpsc};

use crate::{
    config::{RtmpServerConfig, RtmpSessionConfig},
    errors::RtmpServerResult,
    session::RtmpSession,
};

/// Base report interval; the effective interval scales linearly with the
/// number of live connections.
const REPORT_INTERVAL_MS: u64 = 3_000;

#[derive(Debug)]
pub struct RtmpServer {
    config: RtmpServerConfig,
    stream_center_event_sender: mpsc::UnboundedSender<StreamCenterEvent>,
    connections: Arc<AtomicUsize>,
}

impl RtmpServer {
    pub fn new(
        config: &RtmpServerConfig,
        stream_center_event_sender: mpsc::UnboundedSender<StreamCenterEvent>,
    ) -> Self {
        Self {
            config: config.clone(),
            stream_center_event_sender,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn run(&mut self) -> RtmpServerResult<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        tracing::info!("rtmp server listening on port {}", self.config.port);

        let mut reported = 0u64;
        loop {
            let (tcp_stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    // a single failed accept must not take the server down
                    tracing::error!("accept connection failed: {:?}", err);
                    continue;
                }
            };

            let live = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
            if Self::can_report(&mut reported, now_ms(), live) {
                tracing::info!("{} connections live", live);
            }

            let mut session = RtmpSession::new(
                tcp_stream,
                self.stream_center_event_sender.clone(),
                RtmpSessionConfig {
                    chunk_size: self.config.chunk_size,
                    read_timeout_ms: self.config.read_timeout_ms,
                    write_timeout_ms: self.config.write_timeout_ms,
                },
            );
            let connections = Arc::clone(&self.connections);
            tokio::spawn(async move {
                let session_id = session.session_id();
                tracing::info!("session {} accepted from {}", session_id, addr);
                match session.run().await {
                    Ok(()) => tracing::info!("session {} closed", session_id),
                    Err(err) => tracing::error!("session {} failed: {:?}", session_id, err),
                }
                if let Err(err) = session.clean_up().await {
                    tracing::error!("session {} clean up failed: {:?}", session_id, err);
                }
                connections.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }

    /// Gates periodic log lines: the allowed interval is 3 s times the
    /// live connection count, so a busy server reports less often.
    fn can_report(reported: &mut u64, now: u64, connection_count: usize) -> bool {
        let interval = REPORT_INTERVAL_MS * connection_count.max(1) as u64;
        if now.saturating_sub(*reported) < interval {
            return false;
        }
        *reported = now;
        true
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::RtmpServer;

    #[test]
    fn report_interval_scales_with_connections() {
        let mut reported = 0u64;
        assert!(RtmpServer::can_report(&mut reported, 10_000, 1));
        assert_eq!(reported, 10_000);
        // within 3 s of the last report
        assert!(!RtmpServer::can_report(&mut reported, 12_000, 1));
        assert!(RtmpServer::can_report(&mut reported, 13_000, 1));

        // ten connections stretch the interval to 30 s
        assert!(!RtmpServer::can_report(&mut reported, 40_000, 10));
        assert!(RtmpServer::can_report(&mut reported, 43_000, 10));
    }
}
