//! Relation categories and directed paragraph relations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of logical relation categories between segments.
///
/// Serialized in SCREAMING_SNAKE_CASE, matching both the catalog file format
/// and the oracle's response vocabulary. Unrecognized categories from the
/// oracle fold into `Unknown` rather than failing the whole response.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Contrast,
    Addition,
    Causality,
    ReferenceBack,
    Summary,
    Example,
    Parallel,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RelationType {
    /// Every category, for exhaustive iteration in tests and catalogs.
    pub const ALL: [RelationType; 8] = [
        RelationType::Contrast,
        RelationType::Addition,
        RelationType::Causality,
        RelationType::ReferenceBack,
        RelationType::Summary,
        RelationType::Example,
        RelationType::Parallel,
        RelationType::Unknown,
    ];

    /// Wire/display name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Contrast => "CONTRAST",
            RelationType::Addition => "ADDITION",
            RelationType::Causality => "CAUSALITY",
            RelationType::ReferenceBack => "REFERENCE_BACK",
            RelationType::Summary => "SUMMARY",
            RelationType::Example => "EXAMPLE",
            RelationType::Parallel => "PARALLEL",
            RelationType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a relation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationOrigin {
    /// Derived locally from an opening marker.
    Heuristic,
    /// Reported by the deep-analysis oracle.
    Oracle,
}

/// Directed relation edge between two segments.
///
/// Invariants: `source_id != target_id`; duplicate edges (same source,
/// target, and type) are merged during graph construction, keeping the
/// higher confidence and the union of marker words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRelation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub marker_words: Vec<String>,
    pub confidence: f32,
    pub origin: RelationOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_round_trips_through_serde() {
        for category in RelationType::ALL {
            let json = serde_json::to_string(&category).unwrap();
            let back: RelationType = serde_json::from_str(&json).unwrap();
            assert_eq!(category, back);
        }
    }

    #[test]
    fn reference_back_uses_screaming_snake_case() {
        let json = serde_json::to_string(&RelationType::ReferenceBack).unwrap();
        assert_eq!(json, "\"REFERENCE_BACK\"");
    }

    #[test]
    fn unrecognized_category_folds_into_unknown() {
        let parsed: RelationType = serde_json::from_str("\"RHETORICAL_FLOURISH\"").unwrap();
        assert_eq!(parsed, RelationType::Unknown);
    }

    #[test]
    fn display_matches_serde_name() {
        assert_eq!(RelationType::Causality.to_string(), "CAUSALITY");
        assert_eq!(RelationType::ReferenceBack.as_str(), "REFERENCE_BACK");
    }
}
