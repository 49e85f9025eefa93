use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::pool::LiveConnections;
use crate::engine::stats::{ErrorKind, StatsAggregator};

/// Deregisters a held connection on every exit path, including task abort.
struct ConnectionGuard {
    id: usize,
    live: Arc<LiveConnections>,
}

impl ConnectionGuard {
    fn register(id: usize, peer: SocketAddr, live: Arc<LiveConnections>) -> Self {
        live.insert(id, peer);
        Self { id, live }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.live.remove(self.id);
    }
}

/// Owns one connection attempt: connect within a bounded window, hold the
/// socket idle until the run deadline or the pool-wide close signal, then
/// close it. No payload bytes are ever sent or received.
pub(crate) struct ConnectionWorker {
    pub id: usize,
    pub target: Arc<str>,
    pub connect_timeout: Duration,
    pub hold_deadline: Instant,
    pub stats: Arc<StatsAggregator>,
    pub live: Arc<LiveConnections>,
    pub close: CancellationToken,
}

impl ConnectionWorker {
    /// Runs the whole lifecycle. Every path records exactly one outcome in
    /// the aggregator (and, on success, registers the socket) before it
    /// signals `launched_tx`, so a pool that saw the signal also sees the
    /// outcome in its next snapshot.
    pub(crate) async fn run(self, launched_tx: mpsc::Sender<usize>) {
        let connect = TcpStream::connect(self.target.as_ref());
        let (stream, guard) = match timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => {
                self.stats.record_connected();
                let peer = stream
                    .peer_addr()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0)));
                let guard = ConnectionGuard::register(self.id, peer, self.live.clone());
                (Some(stream), Some(guard))
            }
            Ok(Err(err)) => {
                let kind = ErrorKind::classify(&err);
                debug!(worker = self.id, error = %err, kind = %kind, "connect failed");
                self.stats.record_failed(kind);
                (None, None)
            }
            Err(_) => {
                debug!(worker = self.id, timeout = ?self.connect_timeout, "connect timed out");
                self.stats.record_failed(ErrorKind::Timeout);
                (None, None)
            }
        };

        let _ = launched_tx.send(self.id).await;

        let Some(mut stream) = stream else { return };
        let _guard = guard;

        self.hold().await;

        // Outcome already recorded; a close failure only matters for logs.
        if let Err(err) = stream.shutdown().await {
            debug!(worker = self.id, error = %err, "close failed");
        }
    }

    /// Sits on the open socket without touching it until the run deadline
    /// or the close signal, whichever comes first.
    async fn hold(&self) {
        tokio::select! {
            _ = self.close.cancelled() => {
                debug!(worker = self.id, "close signal received");
            }
            _ = tokio::time::sleep_until(self.hold_deadline) => {
                debug!(worker = self.id, "hold deadline reached");
            }
        }
    }
}
