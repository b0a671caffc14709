//! `$import` request bodies.
//!
//! One manifest is built per batch. The wire shape follows the Bulk Data
//! Import `Parameters` pattern:
//!
//! ```json
//! {
//!   "resourceType": "Parameters",
//!   "parameter": [
//!     { "name": "inputFormat", "valueString": "application/fhir+ndjson" },
//!     {
//!       "name": "input",
//!       "part": [
//!         { "name": "type", "valueString": "Patient" },
//!         { "name": "url", "valueString": "http://host:8001/Patient.1.ndjson" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::base_name;
use crate::error::{IngestError, Result};
use crate::planner::Batch;

/// NDJSON content type as per Bulk Data specification
pub const NDJSON_CONTENT_TYPE: &str = "application/fhir+ndjson";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub resource_type: String,
    pub parameter: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub part: Vec<Part>,
    #[serde(rename = "valueString", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    #[serde(rename = "valueString")]
    pub value: String,
}

/// A single `input` parameter, borrowed from a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestInput<'a> {
    pub resource_type: &'a str,
    pub url: &'a str,
}

impl Manifest {
    fn new() -> Self {
        Self {
            resource_type: "Parameters".to_string(),
            parameter: vec![Parameter {
                name: "inputFormat".to_string(),
                part: Vec::new(),
                value: Some(NDJSON_CONTENT_TYPE.to_string()),
            }],
        }
    }

    fn push_input(&mut self, resource_type: &str, url: String) {
        self.parameter.push(Parameter {
            name: "input".to_string(),
            part: vec![
                Part {
                    name: "type".to_string(),
                    value: resource_type.to_string(),
                },
                Part {
                    name: "url".to_string(),
                    value: url,
                },
            ],
            value: None,
        });
    }

    /// The `input` parameters in order.
    pub fn inputs(&self) -> impl Iterator<Item = ManifestInput<'_>> {
        self.parameter
            .iter()
            .filter(|p| p.name == "input")
            .filter_map(|p| {
                let find = |name: &str| {
                    p.part
                        .iter()
                        .find(|part| part.name == name)
                        .map(|part| part.value.as_str())
                };
                Some(ManifestInput {
                    resource_type: find("type")?,
                    url: find("url")?,
                })
            })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the `$import` manifest for `batch`.
///
/// Each file is addressed as `{base_url}/{file base name}`; the directory
/// part of the path is dropped, so equal base names in different directories
/// produce the same URL. The base name is appended verbatim, without
/// percent-encoding: a name containing `#`, `?` or a space yields a URL the
/// FHIR server will not resolve to the file (`Patient#1.ndjson` becomes a
/// fragment).
pub fn build_manifest(batch: &Batch, base_url: &str) -> Result<Manifest> {
    validate_base_url(base_url)?;
    let base_url = base_url.trim_end_matches('/');

    let mut manifest = Manifest::new();
    let mut seen_names = HashSet::new();
    for entry in &batch.entries {
        for file in &entry.files {
            let name = base_name(file);
            if !seen_names.insert(name.clone()) {
                tracing::warn!(
                    batch = batch.index,
                    file = %file.display(),
                    "Another file in this batch has the same name; both map to one URL"
                );
            }
            manifest.push_input(entry.resource_type.as_str(), format!("{base_url}/{name}"));
        }
    }
    Ok(manifest)
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(base_url).map_err(|e| IngestError::invalid_base_url(format!("{base_url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IngestError::invalid_base_url(format!(
            "{base_url}: scheme must be http or https"
        )));
    }
    Ok(())
}
