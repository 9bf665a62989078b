//! cloudflared ingress operator - syncs tunnel ingress rules from annotations

use clap::Parser;
use kube::Client;

use cloudflared_ingress_common::telemetry::{init_telemetry, TelemetryConfig};
use cloudflared_ingress_operator::config::OperatorConfig;
use cloudflared_ingress_operator::reconciler::Reconciler;
use cloudflared_ingress_operator::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OperatorConfig::parse();

    // The Kubernetes client needs a process-wide TLS provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    init_telemetry(TelemetryConfig {
        log_format: config.log_format,
        ..Default::default()
    })?;

    config.log_summary();

    // In-cluster service account first, then KUBECONFIG / ~/.kube/config
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load Kubernetes configuration: {}", e))?;

    let reconciler = Reconciler::from_client(client, &config);

    if config.once {
        let outcome = reconciler.reconcile().await?;
        tracing::info!(outcome = ?outcome, "single pass finished");
        return Ok(());
    }

    tracing::info!("starting reconcile loop...");
    Scheduler::new(reconciler).run().await;
    Ok(())
}
