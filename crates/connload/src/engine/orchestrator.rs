use std::sync::Arc;

use anyhow::Result;
use connload_common::RunConfig;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::engine::pool::ConnectionPool;
use crate::engine::stats::{AggregateStats, StatsAggregator};

/// Everything the reporter needs once the run is over.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub stats: AggregateStats,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// Drives one complete test: ramp-up, hold, teardown, final snapshot. An
/// operator interrupt at any phase skips straight to teardown; the caller
/// is expected to turn `interrupted` into a non-zero exit status.
pub async fn run(config: RunConfig) -> Result<TestOutcome> {
    let config = Arc::new(config);
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config.clone(), stats.clone());

    let interrupt = arm_interrupt_listener();

    let mut handles = pool.launch().await;
    let started_at = handles.started_at;
    let deadline = started_at + config.duration;

    let mut interrupted = false;
    tokio::select! {
        settled = pool.await_launch(&mut handles) => {
            let snap = stats.snapshot();
            info!(
                settled,
                connected = snap.connected,
                failed = snap.failed,
                "ramp-up complete"
            );
        }
        _ = interrupt.cancelled() => {
            interrupted = true;
        }
    }

    if !interrupted {
        interrupted = hold_until(deadline, started_at, &stats, &config, &interrupt).await;
    }
    if interrupted {
        warn!("interrupt received; closing early");
    }

    pool.shutdown(handles).await;

    Ok(TestOutcome {
        stats: stats.snapshot(),
        elapsed: started_at.elapsed(),
        interrupted,
    })
}

/// Logs progress once per report interval until the hold deadline passes.
/// Returns true when cut short by the interrupt signal.
async fn hold_until(
    deadline: Instant,
    started_at: Instant,
    stats: &StatsAggregator,
    config: &RunConfig,
    interrupt: &CancellationToken,
) -> bool {
    let total_secs = config.duration.as_secs();
    let mut ticker = interval(config.progress_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline_sleep = sleep_until(deadline);
    tokio::pin!(deadline_sleep);

    loop {
        tokio::select! {
            _ = &mut deadline_sleep => return false,
            _ = interrupt.cancelled() => return true,
            _ = ticker.tick() => {
                let snap = stats.snapshot();
                info!(
                    elapsed_secs = started_at.elapsed().as_secs(),
                    total_secs,
                    connected = snap.connected,
                    messages = snap.messages_sent,
                    "holding"
                );
            }
        }
    }
}

/// Listens for ctrl-c on a background task and trips the returned token.
fn arm_interrupt_listener() -> CancellationToken {
    let token = CancellationToken::new();
    let armed = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => armed.cancel(),
            Err(err) => warn!(error = %err, "could not install interrupt handler"),
        }
    });
    token
}
