use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use connload::engine::orchestrator;
use connload::engine::pool::ConnectionPool;
use connload::engine::stats::{ErrorKind, StatsAggregator};
use connload_common::RunConfig;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Listener that accepts everything and keeps the sockets open, like a
/// server being measured for idle-connection capacity.
async fn spawn_hold_listener() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr, task)
}

fn config_for(port: u16, connections: u32) -> RunConfig {
    RunConfig {
        port,
        connections,
        duration: Duration::from_secs(60),
        launch_batch_pause: Duration::from_millis(10),
        ..RunConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_worker_connects_and_shutdown_drains() {
    let (addr, listener_task) = spawn_hold_listener().await;
    let config = Arc::new(config_for(addr.port(), 10));
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config, stats.clone());

    let mut handles = pool.launch().await;
    let settled = pool.await_launch(&mut handles).await;
    assert_eq!(settled, 10);

    let snap = stats.snapshot();
    assert_eq!(snap.connected, 10);
    assert_eq!(snap.failed, 0);
    assert_eq!(pool.live().len(), 10);

    pool.shutdown(handles).await;
    assert!(pool.live().is_empty());
    assert_eq!(stats.snapshot().attempted(), 10);

    listener_task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_port_records_refused() {
    // bind then drop to get a loopback port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = Arc::new(config_for(port, 5));
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config, stats.clone());

    let mut handles = pool.launch().await;
    let settled = pool.await_launch(&mut handles).await;
    assert_eq!(settled, 5);

    let snap = stats.snapshot();
    assert_eq!(snap.connected, 0);
    assert_eq!(snap.failed, 5);
    assert_eq!(snap.errors.get(&ErrorKind::Refused), Some(&5));
    assert!(pool.live().is_empty());

    pool.shutdown(handles).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_connect_window_records_timeout() {
    let (addr, listener_task) = spawn_hold_listener().await;
    let config = Arc::new(RunConfig {
        connect_timeout: Duration::ZERO,
        ..config_for(addr.port(), 3)
    });
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config, stats.clone());

    let mut handles = pool.launch().await;
    let settled = pool.await_launch(&mut handles).await;
    assert_eq!(settled, 3);

    let snap = stats.snapshot();
    assert_eq!(snap.connected, 0);
    assert_eq!(snap.failed, 3);
    assert_eq!(snap.errors.get(&ErrorKind::Timeout), Some(&3));

    pool.shutdown(handles).await;
    listener_task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn deadline_closes_connections_without_a_signal() {
    let (addr, listener_task) = spawn_hold_listener().await;
    let config = Arc::new(RunConfig {
        duration: Duration::from_secs(2),
        ..config_for(addr.port(), 4)
    });
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config, stats.clone());

    let mut handles = pool.launch().await;
    pool.await_launch(&mut handles).await;
    assert_eq!(pool.live().len(), 4);

    // past the hold deadline every worker closes on its own
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(pool.live().is_empty());

    pool.shutdown(handles).await;
    let snap = stats.snapshot();
    assert_eq!(snap.connected, 4);
    assert_eq!(snap.failed, 0);

    listener_task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_wakes_held_workers_promptly() {
    let (addr, listener_task) = spawn_hold_listener().await;
    let config = Arc::new(config_for(addr.port(), 8));
    let stats = Arc::new(StatsAggregator::new());
    let pool = ConnectionPool::new(config, stats.clone());

    let mut handles = pool.launch().await;
    let settled = pool.await_launch(&mut handles).await;
    assert_eq!(settled, 8);

    // the hold deadline is a minute away; the close signal must not wait
    let begun = Instant::now();
    pool.shutdown(handles).await;
    assert!(begun.elapsed() < Duration::from_secs(2));
    assert!(pool.live().is_empty());

    listener_task.abort();
}

#[tokio::test(flavor = "multi_thread")]
async fn orchestrator_runs_to_completion() {
    let (addr, listener_task) = spawn_hold_listener().await;
    let config = RunConfig {
        duration: Duration::from_secs(1),
        ..config_for(addr.port(), 6)
    };

    let outcome = orchestrator::run(config).await.unwrap();
    assert!(!outcome.interrupted);
    assert_eq!(outcome.stats.connected, 6);
    assert_eq!(outcome.stats.failed, 0);
    assert_eq!(outcome.stats.attempted(), 6);
    assert!(outcome.elapsed >= Duration::from_secs(1));

    listener_task.abort();
}
