//! tidald: the tidal autoscaler daemon.
//!
//! Connects to the Kubernetes API and a Thunder ADC, then resizes one
//! deployment to follow the throughput of one virtual port until
//! interrupted.
//!
//! # Usage
//!
//! ```text
//! tidald --config /etc/tidal/config.yaml --debug 1 --log-format json
//! ```

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tidal_autoscale::{ControlLoop, TickReport};
use tidal_axapi::ThunderClient;
use tidal_core::TidalConfig;
use tidal_kube::KubeClient;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogFormat, filter_for};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = TidalConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let level = cli.debug.unwrap_or(config.debug);
    init_tracing(level, cli.log_format);
    info!(config = %cli.config.display(), level, "tidal daemon starting");

    run(config).await
}

fn init_tracing(level: u8, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: TidalConfig) -> anyhow::Result<()> {
    let scaling = config.scaling_config().context("invalid configuration")?;
    let settings = config.http_settings();

    // ── Kubernetes ─────────────────────────────────────────────

    let kube = Arc::new(KubeClient::new(
        &config.cluster_url(),
        &config.cluster.auth_token,
        settings,
    )?);
    let pods = kube
        .list_pods()
        .await
        .context("kubernetes connectivity check failed")?;
    info!(url = %config.cluster_url(), pods = pods.len(), "connected to Kubernetes");

    let creds = kube
        .secret_credentials(&config.thunder.secret, &config.thunder.secret_namespace)
        .await
        .with_context(|| {
            format!(
                "reading secret {}/{}",
                config.thunder.secret_namespace, config.thunder.secret
            )
        })?;

    // ── Thunder ────────────────────────────────────────────────

    let thunder = Arc::new(ThunderClient::new(&config.thunder_url(), settings)?);
    thunder
        .login(&creds.username, &creds.password)
        .await
        .context("Thunder login failed")?;

    // ── Control loop ───────────────────────────────────────────

    info!(
        deployment = %scaling.deployment,
        endpoint = %scaling.endpoint,
        min = scaling.min_replicas,
        max = scaling.max_replicas,
        rate_kbps = scaling.rate_per_replica,
        interval = ?scaling.check_interval,
        "starting control loop"
    );
    let control = ControlLoop::new(scaling, thunder.clone(), kube.clone())?
        .with_callback(Arc::new(log_tick));

    let handle = match control.start().await {
        Ok(handle) => handle,
        Err(e) => {
            logoff(&thunder).await;
            return Err(e).context("initial deployment status");
        }
    };

    shutdown_signal().await;
    info!("shutdown signal received");

    handle.stop().await;
    logoff(&thunder).await;

    info!("tidal daemon stopped");
    Ok(())
}

fn log_tick(report: &TickReport) {
    trace!(
        tick = report.tick,
        bps = ?report.bits_per_second,
        observed = ?report.observed_replicas,
        target = ?report.target_replicas,
        action = ?report.action,
        "tick"
    );
}

async fn logoff(thunder: &ThunderClient) {
    if let Err(e) = thunder.logoff().await {
        warn!(error = %e, "Thunder logoff failed");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
