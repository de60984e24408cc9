use std::{env, net::SocketAddr, process, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use ream_engine::cli::Cli;
use ream_execution_engine::{ExecutionEngine, engine::EngineState};
use ream_metrics::{NODE_INFO, set_int_gauge_vec};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "ream-engine";

fn main() {
    let cli = Cli::parse();

    // Set the default log level based on verbosity flag or RUST_LOG env var
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let env_filter = match rust_log.is_empty() {
        true => EnvFilter::builder().parse_lossy(cli.verbosity.directive()),
        false => EnvFilter::builder().parse_lossy(rust_log),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(APP_NAME)
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Unable to create tokio runtime: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(cli)) {
        error!("{err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("starting up {APP_NAME}...");

    if cli.enable_metrics {
        let address = SocketAddr::new(cli.metrics_address, cli.metrics_port);
        prometheus_exporter::start(address).context("Failed to start prometheus exporter")?;
        info!("Metrics started on {address}");
        set_int_gauge_vec(&NODE_INFO, 1, &[APP_NAME, env!("CARGO_PKG_VERSION")]);
    }

    let engine = Arc::new(
        ExecutionEngine::from_config(&cli.to_engine_config(), cli.network.clone())
            .context("Failed to create execution engine client")?,
    );
    engine.start();

    match engine.exchange_capabilities().await {
        Ok(supported) => info!("Execution client supports {} engine methods", supported.len()),
        Err(err) => warn!("Capability exchange failed: {err}"),
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down...");
        }
        _ = upcheck_loop(&engine, cli.upcheck_interval) => {}
    }

    engine.stop().await;
    Ok(())
}

async fn upcheck_loop(engine: &ExecutionEngine, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match engine.upcheck().await {
            EngineState::Synced | EngineState::Syncing => {}
            EngineState::AuthFailed => {
                error!("Execution client rejected our JWT, check --execution-jwt-secret");
            }
            EngineState::Offline => warn!("Execution client is offline"),
        }
    }
}
