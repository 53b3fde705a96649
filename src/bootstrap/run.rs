//! Process entry: config, tracing, wiring, then pairing until interrupted.

use std::time::Duration;

use anyhow::Context;
use tracing::{info, info_span, warn, Instrument};

use super::cli::Cli;
use super::config::{
    apply_env_overrides, load_settings_or_default, resolve_config_path, CONFIG_ENV,
};
use super::tracing::{default_log_dir, init_tracing_subscriber};
use super::wiring::{build_runtime, PairingRuntime};

const PAIRED_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Run the pairing agent until Ctrl-C, or until paired with `--exit-when-paired`.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_dir = if cli.no_file_log {
        None
    } else {
        cli.log_dir.clone().or_else(default_log_dir)
    };
    if let Err(err) = init_tracing_subscriber(log_dir.as_deref()) {
        eprintln!("Failed to initialize tracing: {err}");
    }

    let explicit = cli.config.is_some() || std::env::var_os(CONFIG_ENV).is_some();
    let config_path = resolve_config_path(cli.config.clone(), std::env::var_os(CONFIG_ENV));
    let mut settings = load_settings_or_default(config_path.as_deref(), explicit)
        .context("Failed to load configuration")?;
    apply_env_overrides(&mut settings);

    let runtime = build_runtime(&settings)?;
    runtime.orchestrator.set_system_ready(true);

    let span = info_span!("voxpair.run", quiet = cli.quiet);
    async {
        if cli.exit_when_paired && runtime.stored_identity().is_some() {
            info!("device already paired; nothing to do");
            return;
        }

        runtime.orchestrator.handle_not_paired(cli.quiet).await;

        if cli.exit_when_paired {
            tokio::select! {
                _ = wait_until_paired(&runtime, PAIRED_CHECK_INTERVAL) => {
                    info!("device paired; exiting");
                }
                _ = shutdown_signal() => {}
            }
        } else {
            shutdown_signal().await;
        }

        runtime.orchestrator.shutdown().await;
    }
    .instrument(span)
    .await;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received; shutting down"),
        Err(err) => {
            warn!(error = %err, "failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    }
}

/// Resolve once an identity has been stored.
pub async fn wait_until_paired(runtime: &PairingRuntime, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        if runtime.stored_identity().is_some() {
            return;
        }
    }
}
