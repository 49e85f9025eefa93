use std::net::SocketAddr;
use std::sync::Arc;

use connload_common::RunConfig;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::stats::StatsAggregator;
use crate::engine::worker::ConnectionWorker;

/// Registry of currently held sockets, keyed by worker id. Workers insert
/// on a successful connect and a drop-guard removes the entry on any exit
/// path, so the registry tracks exactly the sockets that are still open.
#[derive(Debug, Default)]
pub struct LiveConnections {
    conns: DashMap<usize, SocketAddr>,
}

impl LiveConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, id: usize, peer: SocketAddr) {
        self.conns.insert(id, peer);
    }

    pub(crate) fn remove(&self, id: usize) {
        self.conns.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }
}

/// Handles for one launched fleet of workers. The pool retains every task
/// handle so shutdown can join or cancel all of them; nothing is
/// fire-and-forget.
pub struct WorkerHandles {
    tasks: Vec<JoinHandle<()>>,
    launched_rx: mpsc::Receiver<usize>,
    /// Instant the first worker was spawned; every hold deadline derives
    /// from it.
    pub started_at: Instant,
}

/// Launches and tears down the worker fleet.
pub struct ConnectionPool {
    config: Arc<RunConfig>,
    stats: Arc<StatsAggregator>,
    live: Arc<LiveConnections>,
    close: CancellationToken,
}

impl ConnectionPool {
    pub fn new(config: Arc<RunConfig>, stats: Arc<StatsAggregator>) -> Self {
        Self {
            config,
            stats,
            live: Arc::new(LiveConnections::new()),
            close: CancellationToken::new(),
        }
    }

    pub fn live(&self) -> &Arc<LiveConnections> {
        &self.live
    }

    /// Spawns every worker, pausing after each batch so the local stack is
    /// not flooded with simultaneous SYNs. Returns as soon as the last
    /// worker is spawned; connects resolve in the background.
    pub async fn launch(&self) -> WorkerHandles {
        let total = self.config.connections as usize;
        let started_at = Instant::now();
        let hold_deadline = started_at + self.config.duration;
        let target: Arc<str> = Arc::from(self.config.target_addr());
        let (launched_tx, launched_rx) = mpsc::channel(total.max(1));

        info!(connections = total, target = %target, "launching workers");
        let mut tasks = Vec::with_capacity(total);
        for id in 0..total {
            let worker = ConnectionWorker {
                id,
                target: target.clone(),
                connect_timeout: self.config.connect_timeout,
                hold_deadline,
                stats: self.stats.clone(),
                live: self.live.clone(),
                close: self.close.clone(),
            };
            tasks.push(tokio::spawn(worker.run(launched_tx.clone())));

            let launched = id + 1;
            if launched % self.config.launch_batch_size as usize == 0 && launched < total {
                info!(launched, total, "ramp-up batch spawned");
                tokio::time::sleep(self.config.launch_batch_pause).await;
            }
        }

        WorkerHandles {
            tasks,
            launched_rx,
            started_at,
        }
    }

    /// Waits for each worker's connect phase to resolve, bounded per
    /// worker. Returns the number that resolved in time; the rest keep
    /// running and their outcomes show up in later snapshots.
    pub async fn await_launch(&self, handles: &mut WorkerHandles) -> usize {
        let total = handles.tasks.len();
        let mut settled = 0;
        while settled < total {
            match timeout(self.config.launch_join_timeout, handles.launched_rx.recv()).await {
                Ok(Some(_)) => settled += 1,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        settled,
                        total,
                        pending = total - settled,
                        "ramp-up join timed out; remaining connects resolve in the background"
                    );
                    break;
                }
            }
        }
        settled
    }

    /// Signals every held worker to close and joins all tasks. Tasks that
    /// overrun the grace window are aborted so nothing outlives the run.
    pub async fn shutdown(&self, handles: WorkerHandles) {
        info!(workers = handles.tasks.len(), "closing connections");
        self.close.cancel();

        for task in handles.tasks {
            let abort = task.abort_handle();
            if timeout(self.config.shutdown_grace, task).await.is_err() {
                abort.abort();
            }
        }

        if self.live.is_empty() {
            debug!("all sockets closed");
        } else {
            warn!(remaining = self.live.len(), "sockets still registered after shutdown");
        }
    }
}
