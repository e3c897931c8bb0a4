use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lockscope_core::{
    load_config, load_script, metrics, validate_config, ConnectionProvider, Inspector,
    SanitizedConfig, SqliteProvider,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "Usage: lockscope <config.toml> <script>";

#[tokio::main]
async fn main() {
    // Initialize logging; stdout is reserved for the inspection log
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    println!("Lock Inspector {}", VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [config_path, script_path] = args.as_slice() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    if let Err(e) = run(PathBuf::from(config_path), PathBuf::from(script_path)).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config_path: PathBuf, script_path: PathBuf) -> Result<()> {
    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded: {:?}", SanitizedConfig::from(&config));

    // Load the whole script before anything runs
    let script = load_script(&script_path)
        .with_context(|| format!("Failed to load script from {:?}", script_path))?;
    info!(
        "Loaded {} commands for {} workers",
        script.len(),
        script.worker_ids().len()
    );

    let print_metrics = config.log.metrics;
    let provider: Arc<dyn ConnectionProvider> = Arc::new(SqliteProvider::new());
    let inspector = Inspector::new(config, provider);

    // Ctrl+C / SIGTERM interrupt the dispatcher; workers are still shut down
    let interrupt = inspector.interrupt();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Signal received, interrupting run");
        interrupt.trigger();
    });

    let report = tokio::task::spawn_blocking(move || {
        inspector.run(&script, Box::new(io::stdout()))
    })
    .await
    .context("Inspection thread failed")?;
    signal_task.abort();

    if print_metrics {
        eprint!("{}", metrics::render());
    }

    let aborted = report.aborted_workers();
    if !aborted.is_empty() {
        info!("Workers aborted by database errors: {:?}", aborted);
    }

    match report.error {
        Some(e) => Err(e).context("Dispatch failed"),
        None => Ok(()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
