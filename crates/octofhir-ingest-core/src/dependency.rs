//! Referential dependencies between FHIR resource types.
//!
//! A resource type must not be imported before the types its records
//! reference. The table below is curated by hand; it is never inferred from
//! the data being imported.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::resource::ResourceType;

/// Standard dependency table: `(resource type, types it references)`.
pub const STANDARD_DEPENDENCIES: &[(&str, &[&str])] = &[
    ("Observation", &["Encounter", "Patient", "Practitioner"]),
    ("Condition", &["Encounter", "Patient", "Practitioner"]),
    ("Medication", &["Patient"]),
    ("MedicationRequest", &["Patient", "Practitioner", "Encounter", "Medication"]),
    ("DiagnosticReport", &["Encounter", "Patient", "Practitioner", "Observation"]),
    ("Immunization", &["Patient", "Practitioner", "Encounter"]),
    ("Procedure", &["Encounter", "Patient", "Practitioner"]),
    ("AllergyIntolerance", &["Patient", "Practitioner"]),
    // Administrative
    ("Encounter", &["Patient", "Practitioner", "Location", "Organization"]),
    ("Patient", &[]),
    ("Practitioner", &[]),
    ("Organization", &[]),
    ("Location", &["Organization"]),
    ("HealthcareService", &["Organization", "Location"]),
    ("Coverage", &["Patient", "Organization"]),
    // Financial
    ("Claim", &["Patient", "Practitioner", "Organization", "Coverage", "Encounter"]),
    ("ExplanationOfBenefit", &["Patient", "Practitioner", "Organization", "Coverage", "Claim"]),
    // Scheduling
    ("Appointment", &["Patient", "Practitioner", "Encounter", "Location"]),
    ("Schedule", &["Practitioner", "Location"]),
    ("Slot", &["Schedule", "Location"]),
    // Medications
    ("MedicationAdministration", &["Encounter", "Patient", "Practitioner", "Medication"]),
    ("MedicationStatement", &["Patient", "Medication"]),
    // Care planning
    ("CarePlan", &["Patient", "Practitioner", "Encounter"]),
    ("CareTeam", &["Patient", "Practitioner"]),
    ("Goal", &["Patient", "CarePlan"]),
    // Orders, specimens and documents
    ("ServiceRequest", &["Patient", "Practitioner", "Encounter"]),
    ("Specimen", &["Patient", "Practitioner", "Encounter", "ServiceRequest"]),
    ("ImagingStudy", &["Patient", "Practitioner", "Encounter", "Specimen"]),
    ("DocumentReference", &["Patient", "Practitioner", "Encounter"]),
];

static STANDARD: LazyLock<DependencyGraph> =
    LazyLock::new(|| DependencyGraph::from_entries(STANDARD_DEPENDENCIES.iter().copied()));

/// Immutable mapping from a resource type to the resource types it depends on.
///
/// Types without an entry have no dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<ResourceType, Vec<ResourceType>>,
}

impl DependencyGraph {
    /// The process-wide standard graph.
    pub fn standard() -> &'static DependencyGraph {
        &STANDARD
    }

    pub fn from_entries<'a, I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a &'a str>,
    {
        let edges = entries
            .into_iter()
            .map(|(name, deps)| {
                let deps = deps.into_iter().map(|d| ResourceType::from(*d)).collect();
                (ResourceType::from(name), deps)
            })
            .collect();
        Self { edges }
    }

    /// Dependencies declared for `resource_type`, in table order.
    pub fn dependencies_of(&self, resource_type: &str) -> &[ResourceType] {
        self.edges
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.edges.contains_key(resource_type)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
