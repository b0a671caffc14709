//! Sequential submission of planned batches.

use std::time::Duration;

use octofhir_ingest_core::{Batch, IngestError, build_manifest};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, ImportService, JobOutcome};

/// Batch numbers in errors are 1-based.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("batch {batch} failed: {reason}")]
    BatchFailed { batch: usize, reason: String },

    #[error("ingest cancelled after {completed} of {total} batches")]
    Cancelled { completed: usize, total: usize },

    #[error("batch {batch}: {source}")]
    Client {
        batch: usize,
        #[source]
        source: ClientError,
    },

    #[error("batch {batch}: failed to build manifest: {source}")]
    Manifest {
        batch: usize,
        #[source]
        source: IngestError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Job reached a successful terminal state
    Completed,
    /// Server accepted the manifest without handing out a job to poll
    Submitted,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub resource_types: Vec<String>,
    pub files: usize,
    pub job: Option<String>,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub batches: Vec<BatchReport>,
}

impl IngestReport {
    pub fn files(&self) -> usize {
        self.batches.iter().map(|b| b.files).sum()
    }
}

pub struct Orchestrator<S> {
    service: S,
    base_url: String,
    batch_delay: Duration,
}

impl<S: ImportService> Orchestrator<S> {
    pub fn new(service: S, base_url: impl Into<String>) -> Self {
        Self {
            service,
            base_url: base_url.into(),
            batch_delay: Duration::from_secs(1),
        }
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Submit `batches` in order, waiting for each job to finish before the next.
    pub async fn run(
        &self,
        batches: &[Batch],
        cancel: &CancellationToken,
    ) -> Result<IngestReport, OrchestratorError> {
        let total = batches.len();
        let mut report = IngestReport::default();

        for (position, batch) in batches.iter().enumerate() {
            let number = position + 1;
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled {
                    completed: position,
                    total,
                });
            }

            let resource_types: Vec<String> =
                batch.resource_types().map(|t| t.to_string()).collect();
            let manifest = build_manifest(batch, &self.base_url).map_err(|source| {
                tracing::error!(
                    batch = number,
                    category = %source.category(),
                    error = %source,
                    "Failed to build import manifest"
                );
                OrchestratorError::Manifest {
                    batch: number,
                    source,
                }
            })?;

            tracing::info!(
                batch = number,
                total,
                resource_types = %resource_types.join(", "),
                files = batch.file_count(),
                "Submitting batch"
            );
            match manifest.to_pretty_json() {
                Ok(json) => tracing::debug!(batch = number, manifest = %json, "Import manifest"),
                Err(e) => tracing::warn!(batch = number, error = %e, "Could not render manifest"),
            }

            let job = self
                .service
                .submit(&manifest)
                .await
                .map_err(|source| OrchestratorError::Client {
                    batch: number,
                    source,
                })?;

            let status = match &job {
                Some(handle) => {
                    let polled = tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(OrchestratorError::Cancelled { completed: position, total });
                        }
                        outcome = self.service.poll_until_done(handle) => outcome,
                    };
                    let outcome = polled.map_err(|source| OrchestratorError::Client {
                        batch: number,
                        source,
                    })?;

                    if let JobOutcome::Failed { status, body } = outcome {
                        return Err(OrchestratorError::BatchFailed {
                            batch: number,
                            reason: format!("import job returned HTTP {status}: {body}"),
                        });
                    }
                    BatchStatus::Completed
                }
                None => BatchStatus::Submitted,
            };

            tracing::info!(batch = number, total, ?status, "Batch finished");
            report.batches.push(BatchReport {
                index: batch.index,
                resource_types,
                files: batch.file_count(),
                job: job.map(|j| j.status_url().to_string()),
                status,
            });

            if number < total && !self.batch_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(OrchestratorError::Cancelled { completed: number, total });
                    }
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
        }

        tracing::info!(
            batches = total,
            files = report.files(),
            "All batches imported"
        );
        Ok(report)
    }
}
