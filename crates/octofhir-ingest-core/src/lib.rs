//! Dependency-aware planning for FHIR NDJSON bulk imports.
//!
//! Files are classified by resource type, layered into batches so that no
//! batch references records from a later one, and turned into `$import`
//! manifests. Everything here is synchronous and free of I/O.
//!
//! ```
//! use octofhir_ingest_core::{DependencyGraph, build_manifest, group_files, plan_batches};
//!
//! let graph = DependencyGraph::standard();
//! let groups = group_files(["Patient.1.ndjson", "Encounter.1.ndjson"], graph);
//! let batches = plan_batches(groups, graph).unwrap();
//! assert_eq!(batches.len(), 2);
//!
//! let manifest = build_manifest(&batches[0], "http://localhost:8001").unwrap();
//! assert_eq!(manifest.inputs().count(), 1);
//! ```

pub mod classify;
pub mod dependency;
pub mod error;
pub mod manifest;
pub mod planner;
pub mod resource;

pub use classify::{FileGroup, group_files, infer_resource_type};
pub use dependency::{DependencyGraph, STANDARD_DEPENDENCIES};
pub use error::{ErrorCategory, IngestError, Result};
pub use manifest::{Manifest, ManifestInput, NDJSON_CONTENT_TYPE, Parameter, Part, build_manifest};
pub use planner::{Batch, BatchEntry, plan_batches};
pub use resource::ResourceType;
