use clap::Parser;
use connload::cli::Args;
use connload::engine::orchestrator;
use connload::report;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Args::parse().into_config()?;
    info!(
        target = %config.target_addr(),
        connections = config.connections,
        duration_secs = config.duration.as_secs(),
        "starting connection capacity test"
    );

    let outcome = orchestrator::run(config.clone()).await?;
    report::print_report(&config, &outcome);

    if outcome.interrupted {
        warn!("test interrupted by operator");
        std::process::exit(1);
    }
    Ok(())
}
