use anyhow::{Context, Result};
use octofhir_ingest_core::Batch;
use tokio_util::sync::CancellationToken;

use crate::client::{ImportClient, ImportService};
use crate::config::IngestConfig;
use crate::orchestrator::{IngestReport, Orchestrator};
use crate::output::print_report;
use crate::server::FileServer;

use super::plan::load_plan;

/// Cancel `token` on Ctrl+C.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            token.cancel();
        }
    });
}

pub async fn run(cfg: &IngestConfig) -> Result<()> {
    let batches = load_plan(cfg)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let server = FileServer::from_config(cfg)?
        .spawn(cancel.child_token())
        .await
        .with_context(|| {
            format!(
                "failed to start file server on {}:{}",
                cfg.server.host, cfg.server.port
            )
        })?;

    let client = ImportClient::new(&cfg.fhir_server_url, cfg.poll_policy(), cfg.probe_policy());
    let result = ingest(cfg, client, &batches, &cancel).await;

    let report = settle(result, server.shutdown().await)?;
    print_report(&report);
    Ok(())
}

/// The ingest outcome decides the command result; a failed server shutdown
/// is only logged.
fn settle(ingest: Result<IngestReport>, shutdown: Result<()>) -> Result<IngestReport> {
    if let Err(e) = shutdown {
        tracing::error!(error = %format!("{e:#}"), "File server did not shut down cleanly");
    }
    ingest
}

async fn ingest(
    cfg: &IngestConfig,
    client: ImportClient,
    batches: &[Batch],
    cancel: &CancellationToken,
) -> Result<IngestReport> {
    if cfg.ping_server {
        tracing::info!(server = %client.base_url(), "Waiting for FHIR server");
        tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("cancelled while waiting for the FHIR server"),
            ready = client.wait_until_ready() => ready.context("FHIR server did not become ready")?,
        }
    }

    let orchestrator =
        Orchestrator::new(client, cfg.manifest_base_url()).with_batch_delay(cfg.batch_delay());
    Ok(orchestrator.run(batches, cancel).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_error_does_not_mask_ingest_failure() {
        let ingest: Result<IngestReport> = Err(anyhow::anyhow!("batch 2 failed"));
        let err = settle(ingest, Err(anyhow::anyhow!("join error"))).unwrap_err();
        assert_eq!(err.to_string(), "batch 2 failed");
    }

    #[test]
    fn test_shutdown_error_keeps_successful_report() {
        let report = settle(Ok(IngestReport::default()), Err(anyhow::anyhow!("join error"))).unwrap();
        assert!(report.batches.is_empty());
    }
}
