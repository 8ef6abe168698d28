use anyhow::{Context, Result};
use clap::Parser;
use ingest::deadline::Deadline;
use tracing::{info, warn};

use insight::app;
use insight::cli::Cli;
use insight::config::{InsightConfig, LogFormat};
use insight::provider::{Credentials, ProviderKind};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Phase 1: stderr tracing so config loading can log.
    let basic_tracing = init_tracing_basic(cli.debug);

    let mut config = InsightConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Configuration validation failed")?;

    // Phase 2: replace with the configured format and level.
    drop(basic_tracing);
    init_tracing_from_config(&config);

    if cli.show_config {
        let providers = cli.providers();
        let providers = if providers.is_empty() { ProviderKind::BUILTIN.to_vec() } else { providers };
        let explicit = match (&cli.api_key, providers.as_slice()) {
            (Some(key), [only]) => Some((only, key.expose())),
            _ => None,
        };
        let credentials =
            Credentials::resolve(&providers, explicit, &config.api_keys, |var| std::env::var(var).ok());
        println!("{}", config.show_config(&credentials)?);
        return Ok(());
    }

    let deadline = match config.analysis.run_timeout() {
        Some(timeout) => Deadline::after(timeout),
        None => Deadline::unbounded(),
    };

    let interrupt = deadline.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        interrupt.cancel();
    });

    info!(version = env!("CARGO_PKG_VERSION"), hours = cli.hours, "insight starting");
    app::run(cli, config, deadline).await
}

fn default_level(debug: bool) -> &'static str {
    if debug {
        "insight=debug,ingest=debug"
    } else {
        "insight=info,ingest=info"
    }
}

/// Phase 1: `RUST_LOG` or a sensible default, thread-local so phase 2 can
/// install the global subscriber.
fn init_tracing_basic(debug: bool) -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: level and format from configuration. `RUST_LOG` still wins.
fn init_tracing_from_config(config: &InsightConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}

/// Ctrl+C (or SIGTERM) cancels the run deadline.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, cancelling run"),
        _ = terminate => warn!("Received SIGTERM, cancelling run"),
    }
}
