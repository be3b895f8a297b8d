//! Relation graph construction: endpoint filtering and duplicate merging.

use crate::model::ParagraphRelation;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Builds the final relation set from heuristic and oracle edges.
///
/// Edges whose endpoints name unknown segments, and self-loops, are dropped
/// with a warning. Duplicate edges (same source, target, and type) merge into
/// one, keeping the higher confidence and the origin of the more confident
/// edge, and taking the union of marker words. First-seen order is preserved.
pub fn merge(edges: Vec<ParagraphRelation>, known_ids: &HashSet<String>) -> Vec<ParagraphRelation> {
    let mut merged: Vec<ParagraphRelation> = Vec::new();
    let mut index_of: HashMap<(String, String, String), usize> = HashMap::new();

    for edge in edges {
        if edge.source_id == edge.target_id {
            warn!(segment = %edge.source_id, "dropping self-loop relation");
            continue;
        }
        if !known_ids.contains(&edge.source_id) || !known_ids.contains(&edge.target_id) {
            warn!(
                source = %edge.source_id,
                target = %edge.target_id,
                "dropping relation with unknown endpoint"
            );
            continue;
        }

        let key = (
            edge.source_id.clone(),
            edge.target_id.clone(),
            edge.relation_type.as_str().to_string(),
        );
        match index_of.get(&key) {
            Some(&at) => combine(&mut merged[at], edge),
            None => {
                index_of.insert(key, merged.len());
                merged.push(edge);
            }
        }
    }
    merged
}

fn combine(kept: &mut ParagraphRelation, other: ParagraphRelation) {
    if other.confidence > kept.confidence {
        kept.confidence = other.confidence;
        kept.origin = other.origin;
    }
    for word in other.marker_words {
        if !kept.marker_words.contains(&word) {
            kept.marker_words.push(word);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RelationOrigin, RelationType};

    fn ids(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn edge(
        source: &str,
        target: &str,
        relation_type: RelationType,
        confidence: f32,
        origin: RelationOrigin,
        words: &[&str],
    ) -> ParagraphRelation {
        ParagraphRelation {
            source_id: source.to_string(),
            target_id: target.to_string(),
            relation_type,
            marker_words: words.iter().map(|w| w.to_string()).collect(),
            confidence,
            origin,
        }
    }

    #[test]
    fn duplicates_keep_max_confidence_and_union_words() {
        let known = ids(&["seg_0001", "seg_0002"]);
        let merged = merge(
            vec![
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Contrast,
                    0.8,
                    RelationOrigin::Heuristic,
                    &["但是"],
                ),
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Contrast,
                    0.6,
                    RelationOrigin::Oracle,
                    &["然而"],
                ),
            ],
            &known,
        );
        assert_eq!(merged.len(), 1);
        let kept = &merged[0];
        assert!((kept.confidence - 0.8).abs() < 1e-6);
        assert_eq!(kept.origin, RelationOrigin::Heuristic);
        assert_eq!(kept.marker_words, vec!["但是", "然而"]);
    }

    #[test]
    fn higher_confidence_oracle_edge_wins_origin() {
        let known = ids(&["seg_0001", "seg_0002"]);
        let merged = merge(
            vec![
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Causality,
                    0.8,
                    RelationOrigin::Heuristic,
                    &["所以"],
                ),
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Causality,
                    0.95,
                    RelationOrigin::Oracle,
                    &[],
                ),
            ],
            &known,
        );
        assert_eq!(merged[0].origin, RelationOrigin::Oracle);
        assert!((merged[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn same_endpoints_different_type_stay_separate() {
        let known = ids(&["seg_0001", "seg_0002"]);
        let merged = merge(
            vec![
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Contrast,
                    0.8,
                    RelationOrigin::Heuristic,
                    &[],
                ),
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Addition,
                    0.75,
                    RelationOrigin::Heuristic,
                    &[],
                ),
            ],
            &known,
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn self_loops_and_unknown_endpoints_are_dropped() {
        let known = ids(&["seg_0001", "seg_0002"]);
        let merged = merge(
            vec![
                edge(
                    "seg_0001",
                    "seg_0001",
                    RelationType::Addition,
                    0.7,
                    RelationOrigin::Oracle,
                    &[],
                ),
                edge(
                    "seg_0002",
                    "seg_0099",
                    RelationType::Contrast,
                    0.7,
                    RelationOrigin::Oracle,
                    &[],
                ),
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Contrast,
                    0.7,
                    RelationOrigin::Oracle,
                    &[],
                ),
            ],
            &known,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].target_id, "seg_0001");
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let known = ids(&["seg_0001", "seg_0002", "seg_0003"]);
        let merged = merge(
            vec![
                edge(
                    "seg_0003",
                    "seg_0002",
                    RelationType::Summary,
                    0.85,
                    RelationOrigin::Heuristic,
                    &[],
                ),
                edge(
                    "seg_0002",
                    "seg_0001",
                    RelationType::Contrast,
                    0.8,
                    RelationOrigin::Heuristic,
                    &[],
                ),
            ],
            &known,
        );
        assert_eq!(merged[0].source_id, "seg_0003");
        assert_eq!(merged[1].source_id, "seg_0002");
    }
}
