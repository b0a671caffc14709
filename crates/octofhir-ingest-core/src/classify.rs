//! Resource type inference from NDJSON file names.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::dependency::DependencyGraph;
use crate::resource::ResourceType;

/// Files grouped by inferred resource type.
///
/// Types iterate in order of first appearance; files within a type keep
/// input order.
pub type FileGroup = IndexMap<ResourceType, Vec<PathBuf>>;

/// Infer the resource type encoded in a file name.
///
/// The final extension is dropped and the first dot-separated token of the
/// remaining name is the type: `Patient.000.ndjson` → `Patient`,
/// `Observation.ndjson` → `Observation`.
pub fn infer_resource_type(path: &Path) -> ResourceType {
    let name = base_name(path);
    let stem = match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name.as_str(),
    };
    let token = stem.split('.').next().unwrap_or_default();
    ResourceType::from(token)
}

/// Group `paths` by inferred resource type.
///
/// Types that are not well formed or have no entry in `graph` are kept; they
/// simply have no dependencies and are only reported.
pub fn group_files<I, P>(paths: I, graph: &DependencyGraph) -> FileGroup
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut groups = FileGroup::new();
    for path in paths {
        let path = path.into();
        let resource_type = infer_resource_type(&path);
        if !groups.contains_key(&resource_type) {
            if !resource_type.is_well_formed() {
                tracing::warn!(
                    file = %path.display(),
                    resource_type = %resource_type,
                    "File name does not encode a FHIR resource type"
                );
            } else if !graph.contains(resource_type.as_str()) {
                tracing::warn!(
                    resource_type = %resource_type,
                    "Resource type has no dependency entry; importing without ordering constraints"
                );
            }
        }
        groups.entry(resource_type).or_default().push(path);
    }
    groups
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
