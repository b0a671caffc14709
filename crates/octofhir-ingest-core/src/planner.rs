//! Dependency-ordered batch planning.
//!
//! Types are layered breadth-first: every pass takes *all* pending types
//! whose dependencies are already resolved, so siblings with the same
//! dependencies always share a batch.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::classify::FileGroup;
use crate::dependency::DependencyGraph;
use crate::error::{IngestError, Result};
use crate::resource::ResourceType;

/// Files of one resource type inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub resource_type: ResourceType,
    pub files: Vec<PathBuf>,
}

/// Resource types that can be imported together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// 0-based position in the plan
    pub index: usize,
    pub entries: Vec<BatchEntry>,
}

impl Batch {
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.entries.iter().map(|e| &e.resource_type)
    }

    pub fn file_count(&self) -> usize {
        self.entries.iter().map(|e| e.files.len()).sum()
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.resource_type.as_str() == resource_type)
    }
}

/// Split `groups` into batches so that every dependency of a batch's types
/// is imported by an earlier batch.
///
/// Dependencies on types that have no files in `groups` never gate anything.
/// Fails with [`IngestError::CyclicDependency`] when a pass makes no progress.
pub fn plan_batches(groups: FileGroup, graph: &DependencyGraph) -> Result<Vec<Batch>> {
    let present: HashSet<ResourceType> = groups.keys().cloned().collect();
    let mut resolved: HashSet<ResourceType> = HashSet::with_capacity(groups.len());
    let mut pending = groups;
    let mut batches = Vec::new();

    while !pending.is_empty() {
        let ready: Vec<ResourceType> = pending
            .keys()
            .filter(|rt| {
                graph
                    .dependencies_of(rt.as_str())
                    .iter()
                    .all(|dep| resolved.contains(dep) || !present.contains(dep))
            })
            .cloned()
            .collect();

        if ready.is_empty() {
            let stuck: Vec<String> = pending.keys().map(ToString::to_string).collect();
            tracing::error!(types = ?stuck, "No resource type can be scheduled");
            return Err(IngestError::cyclic_dependency(stuck));
        }

        let entries: Vec<BatchEntry> = ready
            .into_iter()
            .filter_map(|rt| {
                pending
                    .shift_remove_entry(&rt)
                    .map(|(resource_type, files)| BatchEntry {
                        resource_type,
                        files,
                    })
            })
            .collect();

        resolved.extend(entries.iter().map(|e| e.resource_type.clone()));

        let batch = Batch {
            index: batches.len(),
            entries,
        };
        tracing::debug!(
            batch = batch.index,
            resource_types = ?batch.resource_types().map(ResourceType::as_str).collect::<Vec<_>>(),
            files = batch.file_count(),
            "Planned batch"
        );
        batches.push(batch);
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::group_files;

    fn type_sets(batches: &[Batch]) -> Vec<Vec<&str>> {
        batches
            .iter()
            .map(|b| {
                let mut types: Vec<&str> = b.resource_types().map(ResourceType::as_str).collect();
                types.sort();
                types
            })
            .collect()
    }

    fn plan(files: &[&str], graph: &DependencyGraph) -> Result<Vec<Batch>> {
        plan_batches(group_files(files.iter().copied(), graph), graph)
    }

    #[test]
    fn test_clinical_example_three_batches() {
        let files = [
            "Patient.1.ndjson",
            "Practitioner.1.ndjson",
            "Encounter.1.ndjson",
            "Observation.1.ndjson",
        ];
        let batches = plan(&files, DependencyGraph::standard()).unwrap();
        assert_eq!(
            type_sets(&batches),
            vec![
                vec!["Patient", "Practitioner"],
                vec!["Encounter"],
                vec!["Observation"]
            ]
        );
        let indexes: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(indexes, [0, 1, 2]);
    }

    #[test]
    fn test_input_order_does_not_change_membership() {
        let files = [
            "Observation.1.ndjson",
            "Encounter.1.ndjson",
            "Practitioner.1.ndjson",
            "Patient.1.ndjson",
        ];
        let batches = plan(&files, DependencyGraph::standard()).unwrap();
        assert_eq!(
            type_sets(&batches),
            vec![
                vec!["Patient", "Practitioner"],
                vec!["Encounter"],
                vec!["Observation"]
            ]
        );
    }

    #[test]
    fn test_unknown_type_goes_first() {
        let batches = plan(&["Foo.ndjson"], DependencyGraph::standard()).unwrap();
        assert_eq!(type_sets(&batches), vec![vec!["Foo"]]);
    }

    #[test]
    fn test_unknown_type_batched_with_roots() {
        let files = ["Encounter.1.ndjson", "Foo.1.ndjson", "Patient.1.ndjson"];
        let batches = plan(&files, DependencyGraph::standard()).unwrap();
        assert_eq!(
            type_sets(&batches),
            vec![vec!["Foo", "Patient"], vec!["Encounter"]]
        );
    }

    #[test]
    fn test_two_node_cycle_is_rejected() {
        let graph = DependencyGraph::from_entries([("A", &["B"][..]), ("B", &["A"][..])]);
        let err = plan(&["A.ndjson", "B.ndjson"], &graph).unwrap_err();
        match err {
            IngestError::CyclicDependency { types } => assert_eq!(types, ["A", "B"]),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_rejected() {
        let graph = DependencyGraph::from_entries([("A", &["A"][..])]);
        assert!(matches!(
            plan(&["A.ndjson"], &graph),
            Err(IngestError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_reported_after_independent_batches() {
        let graph = DependencyGraph::from_entries([
            ("Root", &[][..]),
            ("A", &["Root", "B"][..]),
            ("B", &["A"][..]),
        ]);
        let err = plan(&["Root.ndjson", "A.ndjson", "B.ndjson"], &graph).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cyclic dependency between resource types: A, B"
        );
    }

    #[test]
    fn test_files_keep_grouper_order() {
        let files = ["Patient.2.ndjson", "Patient.1.ndjson", "Patient.3.ndjson"];
        let batches = plan(&files, DependencyGraph::standard()).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].entries[0].files,
            [
                PathBuf::from("Patient.2.ndjson"),
                PathBuf::from("Patient.1.ndjson"),
                PathBuf::from("Patient.3.ndjson")
            ]
        );
        assert_eq!(batches[0].file_count(), 3);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let batches = plan(&[], DependencyGraph::standard()).unwrap();
        assert!(batches.is_empty());
    }

    /// Every type appears exactly once and only after all of its present
    /// dependencies, for every type in the standard table at once.
    #[test]
    fn test_full_standard_table_layering() {
        let graph = DependencyGraph::standard();
        let files: Vec<String> = crate::dependency::STANDARD_DEPENDENCIES
            .iter()
            .rev()
            .map(|(name, _)| format!("{name}.ndjson"))
            .collect();
        let batches = plan_batches(group_files(files.iter().map(String::as_str), graph), graph)
            .unwrap();

        let mut seen: HashSet<&str> = HashSet::new();
        for batch in &batches {
            for rt in batch.resource_types() {
                for dep in graph.dependencies_of(rt.as_str()) {
                    assert!(
                        seen.contains(dep.as_str()),
                        "{rt} scheduled in batch {} before {dep}",
                        batch.index
                    );
                }
            }
            for rt in batch.resource_types() {
                assert!(seen.insert(rt.as_str()), "{rt} scheduled twice");
            }
        }
        assert_eq!(seen.len(), graph.len());

        // Longest chain: Organization → Location → Encounter → ServiceRequest → Specimen → ImagingStudy
        assert_eq!(batches.len(), 6);
        assert!(batches[0].contains("Organization"));
        assert!(batches[1].contains("Location"));
        assert!(batches[2].contains("Encounter"));
        assert!(batches[3].contains("ServiceRequest"));
        assert!(batches[4].contains("DiagnosticReport"));
        assert!(batches[5].contains("ImagingStudy"));
    }

    #[test]
    fn test_planning_is_deterministic() {
        let files = [
            "Claim.ndjson",
            "Coverage.ndjson",
            "Patient.ndjson",
            "Organization.ndjson",
            "ExplanationOfBenefit.ndjson",
        ];
        let first = plan(&files, DependencyGraph::standard()).unwrap();
        let second = plan(&files, DependencyGraph::standard()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            type_sets(&first),
            vec![
                vec!["Organization", "Patient"],
                vec!["Coverage"],
                vec!["Claim"],
                vec!["ExplanationOfBenefit"]
            ]
        );
    }
}
