use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use logwarden_core::LogwardenConfig;
use logwarden_daemon::cli::DaemonCli;
use logwarden_daemon::orchestrator::Orchestrator;
use logwarden_daemon::{logging, metrics_server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // file -> env -> CLI, then validate
    let mut config = LogwardenConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "logwarden-daemon starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let cancel = CancellationToken::new();
    let mut orchestrator = Orchestrator::build_from_config(&config, cancel.clone()).await?;

    if cli.once {
        let report = orchestrator.run_cycle().await;
        orchestrator.shutdown().await;
        tracing::info!(?report, "single cycle completed");
    } else {
        orchestrator.run(cancel.clone()).await?;
    }

    cancel.cancel();
    tracing::info!("logwarden-daemon shut down");
    Ok(())
}
