//! Serves a directory of NDJSON files over HTTP and drives a FHIR server's
//! `$import` operation over them, one dependency-ordered batch at a time.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod datadir;
pub mod handlers;
pub mod observability;
pub mod orchestrator;
pub mod output;
pub mod retry;
pub mod server;

pub use client::{ClientError, ImportClient, ImportService, JobHandle, JobOutcome};
pub use config::IngestConfig;
pub use orchestrator::{BatchReport, BatchStatus, IngestReport, Orchestrator, OrchestratorError};
pub use retry::RetryPolicy;
pub use server::{FileServer, RunningServer, build_app};
