//! Client for the FHIR Bulk Data `$import` operation.
//!
//! Submission follows the asynchronous request pattern: the server answers
//! `202 Accepted` with a `Content-Location` status URL, which is polled until
//! it returns `200` (done) or an error status.

use std::time::Duration;

use async_trait::async_trait;
use octofhir_ingest_core::Manifest;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_LOCATION, CONTENT_TYPE};
use thiserror::Error;

use crate::retry::{Exhausted, RetryPolicy};

const FHIR_JSON: &str = "application/fhir+json";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("import rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid job status URL '{0}'")]
    InvalidStatusUrl(String),

    #[error("{operation} gave up after {elapsed:?} ({attempts} attempts)")]
    RetryExhausted {
        operation: &'static str,
        elapsed: Duration,
        attempts: u32,
    },
}

impl ClientError {
    fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    fn exhausted(operation: &'static str, e: Exhausted) -> Self {
        Self::RetryExhausted {
            operation,
            elapsed: e.elapsed,
            attempts: e.attempts,
        }
    }
}

/// Status URL of an accepted asynchronous import job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(status_url: impl Into<String>) -> Self {
        Self(status_url.into())
    }

    pub fn status_url(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal state of an import job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { body: String },
    Failed { status: u16, body: String },
}

/// What the orchestrator needs from an import endpoint.
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Submit a manifest. `None` means there is no job to wait for.
    async fn submit(&self, manifest: &Manifest) -> Result<Option<JobHandle>, ClientError>;

    /// Poll `job` until it reaches a terminal state.
    async fn poll_until_done(&self, job: &JobHandle) -> Result<JobOutcome, ClientError>;

    /// Block until the server is up.
    async fn wait_until_ready(&self) -> Result<(), ClientError>;
}

pub struct ImportClient {
    http: reqwest::Client,
    base_url: String,
    poll: RetryPolicy,
    probe: RetryPolicy,
}

impl ImportClient {
    pub fn new(base_url: &str, poll: RetryPolicy, probe: RetryPolicy) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            poll,
            probe,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fhir_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Resolve a `Content-Location` value, which may be relative to the server.
    fn job_handle(&self, location: &str) -> Result<JobHandle, ClientError> {
        if let Ok(url) = url::Url::parse(location) {
            return Ok(JobHandle::new(url.as_str()));
        }
        let base = url::Url::parse(&format!("{}/", self.base_url))
            .map_err(|_| ClientError::InvalidStatusUrl(location.to_string()))?;
        base.join(location)
            .map(|url| JobHandle::new(url.as_str()))
            .map_err(|_| ClientError::InvalidStatusUrl(location.to_string()))
    }
}

#[async_trait]
impl ImportService for ImportClient {
    async fn submit(&self, manifest: &Manifest) -> Result<Option<JobHandle>, ClientError> {
        let url = self.fhir_url("$import");
        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, FHIR_JSON)
            .header("Prefer", "respond-async")
            .json(manifest)
            .send()
            .await
            .map_err(|e| ClientError::http(&url, e))?;

        let status = resp.status();
        if status == StatusCode::ACCEPTED {
            let location = resp
                .headers()
                .get(CONTENT_LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return match location {
                Some(location) if !location.is_empty() => {
                    let job = self.job_handle(&location)?;
                    tracing::info!(job = %job, "Import request accepted");
                    Ok(Some(job))
                }
                _ => {
                    tracing::warn!("Import request accepted without a Content-Location header");
                    Ok(None)
                }
            };
        }

        let body = resp.text().await.unwrap_or_default();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), "Import completed synchronously");
            return Ok(None);
        }
        tracing::error!(status = status.as_u16(), %body, "Import request rejected");
        Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn poll_until_done(&self, job: &JobHandle) -> Result<JobOutcome, ClientError> {
        let mut attempts = self.poll.start();
        loop {
            let result = self
                .http
                .get(job.status_url())
                .header(ACCEPT, FHIR_JSON)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    match status {
                        StatusCode::OK => {
                            let body = resp.text().await.unwrap_or_default();
                            tracing::info!(job = %job, "Import job completed");
                            tracing::debug!(job = %job, %body, "Import job result");
                            return Ok(JobOutcome::Succeeded { body });
                        }
                        StatusCode::ACCEPTED => {
                            let progress = resp
                                .headers()
                                .get("X-Progress")
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("in progress")
                                .to_string();
                            tracing::info!(job = %job, %progress, "Import job still running");
                        }
                        _ => {
                            let body = resp.text().await.unwrap_or_default();
                            tracing::error!(job = %job, status = status.as_u16(), %body, "Import job failed");
                            return Ok(JobOutcome::Failed {
                                status: status.as_u16(),
                                body,
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(job = %job, error = %e, "Job status request failed, retrying");
                }
            }

            attempts
                .wait()
                .await
                .map_err(|e| ClientError::exhausted("job polling", e))?;
        }
    }

    async fn wait_until_ready(&self) -> Result<(), ClientError> {
        let url = self.fhir_url("$meta");
        let mut attempts = self.probe.start();
        loop {
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    tracing::info!(server = %self.base_url, "FHIR server is up");
                    return Ok(());
                }
                Ok(resp) => {
                    tracing::info!(
                        status = resp.status().as_u16(),
                        attempt = attempts.attempts(),
                        "FHIR server not ready yet, retrying"
                    );
                }
                Err(e) => {
                    tracing::info!(
                        error = %e,
                        attempt = attempts.attempts(),
                        "FHIR server unreachable, retrying"
                    );
                }
            }

            attempts
                .wait()
                .await
                .map_err(|e| ClientError::exhausted("server probe", e))?;
        }
    }
}
