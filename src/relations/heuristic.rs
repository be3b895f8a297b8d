//! Local relation heuristics: opening markers imply edges to prior segments.
//!
//! This pass is fully offline and runs before the oracle; it only sees the
//! segment sequence and each segment's markers. Edges point backwards in
//! time, from the marked segment to the segment it reacts to.

use crate::defaults;
use crate::model::{ParagraphRelation, RelationOrigin, RelationType, Segment};

/// Derives relation edges from opening markers.
///
/// A segment opening with a marker relates to its immediate predecessor,
/// except `REFERENCE_BACK`, which targets the most recent earlier segment
/// sharing a topic tag (falling back to the predecessor when no topic
/// overlap exists or no topics are tagged yet).
pub fn infer(segments: &[Segment]) -> Vec<ParagraphRelation> {
    let mut relations = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        if index == 0 {
            // Nothing earlier to relate to
            continue;
        }
        let Some(marker) = segment.opening_marker() else {
            continue;
        };

        let target_index = match marker.category {
            RelationType::ReferenceBack => {
                reference_back_target(segments, index).unwrap_or(index - 1)
            }
            _ => index - 1,
        };

        relations.push(ParagraphRelation {
            source_id: segment.id.clone(),
            target_id: segments[target_index].id.clone(),
            relation_type: marker.category,
            marker_words: vec![marker.keyword.clone()],
            confidence: defaults::heuristic_confidence(marker.category),
            origin: RelationOrigin::Heuristic,
        });
    }
    relations
}

/// Most recent earlier segment sharing a topic tag with `segments[index]`.
fn reference_back_target(segments: &[Segment], index: usize) -> Option<usize> {
    let own_topics = &segments[index].topics;
    if own_topics.is_empty() {
        return None;
    }
    (0..index)
        .rev()
        .find(|&earlier| segments[earlier].topics.iter().any(|t| own_topics.contains(t)))
}
