//! The assembled document: the immutable root owning all pipeline output.

use crate::model::chain::LogicChain;
use crate::model::relation::ParagraphRelation;
use crate::model::segment::{Segment, SegmentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One node of the topic tree: a topic name and the segments covering it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub segments: Vec<SegmentId>,
}

/// Hierarchical topic overview, either oracle-provided or rebuilt from
/// per-segment topic tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicTree {
    #[serde(default)]
    pub main_topic: String,
    #[serde(default)]
    pub subtopics: Vec<TopicNode>,
}

impl TopicTree {
    pub fn is_empty(&self) -> bool {
        self.main_topic.is_empty() && self.subtopics.is_empty()
    }
}

/// The immutable result of one pipeline run.
///
/// Assembled once per input and never mutated afterwards; owns all segment,
/// relation, and chain values. Presentation and export collaborators treat
/// this as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub source_ref: String,
    pub segments: Vec<Segment>,
    pub relations: Vec<ParagraphRelation>,
    pub chains: Vec<LogicChain>,
    pub topic_tree: TopicTree,
    /// True when the oracle pass failed and only heuristic relations and
    /// fallback chains are present.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// End time of the last segment, or 0 for an empty document.
    pub fn total_duration(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0, f64::max)
    }

    pub fn segment_by_id(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Segments the oracle marked as core arguments.
    pub fn core_arguments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_core_argument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, start: f64, end: f64, core: bool) -> Segment {
        Segment {
            id: id.to_string(),
            start_time: start,
            end_time: end,
            text: String::new(),
            markers: Vec::new(),
            topics: Vec::new(),
            importance_score: 0.5,
            is_core_argument: core,
        }
    }

    fn document(segments: Vec<Segment>) -> Document {
        Document {
            source_ref: "lecture.wav".to_string(),
            segments,
            relations: Vec::new(),
            chains: Vec::new(),
            topic_tree: TopicTree::default(),
            degraded: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn total_duration_is_last_end_time() {
        let doc = document(vec![
            segment("seg_0001", 0.0, 4.5, false),
            segment("seg_0002", 4.5, 12.25, true),
        ]);
        assert!((doc.total_duration() - 12.25).abs() < 1e-9);
        assert_eq!(doc.segment_count(), 2);
    }

    #[test]
    fn empty_document_has_zero_duration() {
        let doc = document(Vec::new());
        assert_eq!(doc.total_duration(), 0.0);
    }

    #[test]
    fn lookup_and_core_arguments() {
        let doc = document(vec![
            segment("seg_0001", 0.0, 1.0, false),
            segment("seg_0002", 1.0, 2.0, true),
        ]);
        assert!(doc.segment_by_id("seg_0002").is_some());
        assert!(doc.segment_by_id("seg_0009").is_none());
        let core: Vec<_> = doc.core_arguments().collect();
        assert_eq!(core.len(), 1);
        assert_eq!(core[0].id, "seg_0002");
    }

    #[test]
    fn document_serializes_to_json() {
        let doc = document(vec![segment("seg_0001", 0.0, 1.0, false)]);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"source_ref\":\"lecture.wav\""));
        assert!(json.contains("\"degraded\":false"));
    }
}
