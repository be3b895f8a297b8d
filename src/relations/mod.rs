//! Two-phase relation reconstruction.
//!
//! Phase A derives relations locally from opening markers and always runs.
//! Phase B consults the deep-analysis oracle for global structure; when the
//! oracle fails after retries the pipeline degrades gracefully to the
//! heuristic results instead of failing the document. Both phases feed one
//! merged relation graph, from which logic chains and importance scores are
//! derived.

pub mod chains;
pub mod heuristic;
pub mod merge;

use crate::analysis::{self, AnalysisSegment, DeepAnalysis, DeepAnalyzer};
use crate::defaults;
use crate::error::{ExternalServiceError, LectographError, Result};
use crate::model::{
    LogicChain, ParagraphRelation, RelationOrigin, RelationType, Segment, TopicNode, TopicTree,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry and timeout policy for the oracle call.
#[derive(Debug, Clone, Copy)]
pub struct ReconstructorConfig {
    pub attempts: u32,
    pub retry_backoff: Duration,
    pub oracle_timeout: Duration,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            attempts: defaults::EXTERNAL_ATTEMPTS,
            retry_backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
            oracle_timeout: Duration::from_secs(defaults::ORACLE_TIMEOUT_SECS),
        }
    }
}

/// Everything reconstruction produces beyond the segments themselves.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionOutcome {
    pub relations: Vec<ParagraphRelation>,
    pub chains: Vec<LogicChain>,
    pub topic_tree: TopicTree,
    /// True when no oracle analysis was applied: either none was configured
    /// or the call failed after retries.
    pub degraded: bool,
}

/// Runs both reconstruction phases over a validated segment sequence.
pub struct Reconstructor<A> {
    oracle: Option<A>,
    config: ReconstructorConfig,
}

impl<A: DeepAnalyzer> Reconstructor<A> {
    pub fn new(oracle: A) -> Self {
        Self {
            oracle: Some(oracle),
            config: ReconstructorConfig::default(),
        }
    }

    /// Heuristics-only reconstruction; every document comes out degraded.
    pub fn without_oracle() -> Self {
        Self {
            oracle: None,
            config: ReconstructorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconstructorConfig) -> Self {
        self.config = config;
        self
    }

    /// Reconstructs relations, chains, and topics for the segment sequence.
    ///
    /// Mutates segments in place: topic tags, core-argument flags, and
    /// importance scores are filled in here. The sequence itself (ids, order,
    /// text, timing) is never changed.
    pub async fn reconstruct(&self, segments: &mut [Segment]) -> Result<ReconstructionOutcome> {
        validate_sequence(segments)?;
        if segments.is_empty() {
            return Ok(ReconstructionOutcome {
                degraded: self.oracle.is_none(),
                ..ReconstructionOutcome::default()
            });
        }

        let heuristic_edges = heuristic::infer(segments);
        debug!(edges = heuristic_edges.len(), "local heuristic pass done");

        let analysis = match &self.oracle {
            Some(oracle) => match self.consult_oracle(oracle, segments).await {
                Ok(analysis) => Some(analysis),
                Err(error) => {
                    warn!(error = %error, "oracle unavailable, continuing with heuristics only");
                    None
                }
            },
            None => None,
        };
        let degraded = analysis.is_none();

        let mut edges = heuristic_edges;
        if let Some(analysis) = &analysis {
            apply_topics_and_flags(segments, analysis);
            edges.extend(analysis.paragraph_relations.iter().map(|r| {
                ParagraphRelation {
                    source_id: r.source_id.clone(),
                    target_id: r.target_id.clone(),
                    relation_type: r.relation_type,
                    marker_words: r.marker_words.clone(),
                    confidence: r.confidence_or_default(),
                    origin: RelationOrigin::Oracle,
                }
            }));
        }

        let known_ids: HashSet<String> = segments.iter().map(|s| s.id.clone()).collect();
        let relations = merge::merge(edges, &known_ids);
        score_importance(segments, &relations);
        if let Some(analysis) = &analysis {
            apply_supporting_floor(segments, analysis);
        }

        // Sanitizing can empty the oracle's chain list entirely; that case
        // falls back to the relation graph like a missing list would.
        let chains = analysis
            .as_ref()
            .map(|a| chains::from_oracle(a.logic_chains.clone(), &known_ids))
            .filter(|sanitized| !sanitized.is_empty())
            .unwrap_or_else(|| chains::fallback(segments, &relations));

        let topic_tree = match &analysis {
            Some(a) if !a.topic_tree.is_empty() => a.topic_tree.clone(),
            _ => fallback_topic_tree(segments),
        };

        info!(
            relations = relations.len(),
            chains = chains.len(),
            degraded,
            "relation reconstruction complete"
        );
        Ok(ReconstructionOutcome {
            relations,
            chains,
            topic_tree,
            degraded,
        })
    }

    async fn consult_oracle(
        &self,
        oracle: &A,
        segments: &[Segment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError> {
        let view: Vec<AnalysisSegment> = segments
            .iter()
            .map(|s| AnalysisSegment {
                id: s.id.clone(),
                start_time: s.start_time,
                end_time: s.end_time,
                text: s.text.clone(),
            })
            .collect();

        let service = oracle.name().to_string();
        let timeout = self.config.oracle_timeout;
        analysis::with_retries(&service, self.config.attempts, self.config.retry_backoff, || {
            let view = &view;
            let service = &service;
            async move {
                tokio::time::timeout(timeout, oracle.analyze(view))
                    .await
                    .map_err(|_| ExternalServiceError::Timeout {
                        service: service.clone(),
                        seconds: timeout.as_secs(),
                    })?
            }
        })
        .await
    }
}

/// Rejects a sequence that violates the ordering invariants: duplicate ids,
/// unordered start times, or overlapping spans.
fn validate_sequence(segments: &[Segment]) -> Result<()> {
    let mut seen = HashSet::new();
    for segment in segments {
        if !seen.insert(segment.id.as_str()) {
            return Err(LectographError::invariant(
                "reconstruct",
                format!("duplicate segment id {}", segment.id),
            ));
        }
    }
    for pair in segments.windows(2) {
        if pair[1].start_time < pair[0].start_time {
            return Err(LectographError::invariant(
                "reconstruct",
                format!("segment {} starts before its predecessor", pair[1].id),
            ));
        }
        if pair[1].start_time < pair[0].end_time - 1e-6 {
            return Err(LectographError::invariant(
                "reconstruct",
                format!("segment {} overlaps its predecessor", pair[1].id),
            ));
        }
    }
    Ok(())
}

/// Copies per-segment topics and core-argument flags out of the analysis.
fn apply_topics_and_flags(segments: &mut [Segment], analysis: &DeepAnalysis) {
    let core: HashSet<&str> = analysis.core_arguments.iter().map(|s| s.as_str()).collect();
    for segment in segments.iter_mut() {
        if let Some(topics) = analysis.topics.get(&segment.id) {
            segment.topics = topics.clone();
        }
        if core.contains(segment.id.as_str()) {
            segment.is_core_argument = true;
        }
    }
}

/// Supporting points never score below their floor, which sits between a
/// plain segment and a core argument.
fn apply_supporting_floor(segments: &mut [Segment], analysis: &DeepAnalysis) {
    let supporting: HashSet<&str> = analysis
        .supporting_points
        .iter()
        .map(|s| s.as_str())
        .collect();
    for segment in segments.iter_mut() {
        if supporting.contains(segment.id.as_str()) {
            segment.importance_score = segment
                .importance_score
                .max(defaults::SUPPORTING_POINT_IMPORTANCE);
        }
    }
}

/// Recomputes importance scores from markers, relations, and text length.
///
/// Base 0.5; an opening summary marker adds 0.3 and an opening causality
/// marker 0.2; each relation touching the segment adds 0.1 up to 0.3; text
/// longer than 100 characters adds 0.1. Core arguments never score below the
/// core floor. Clamped to 1.0.
fn score_importance(segments: &mut [Segment], relations: &[ParagraphRelation]) {
    for segment in segments.iter_mut() {
        let mut score = 0.5f32;
        if let Some(marker) = segment.opening_marker() {
            score += match marker.category {
                RelationType::Summary => 0.3,
                RelationType::Causality => 0.2,
                _ => 0.0,
            };
        }
        let touching = relations
            .iter()
            .filter(|r| r.source_id == segment.id || r.target_id == segment.id)
            .count();
        score += (0.1 * touching as f32).min(0.3);
        if segment.text.chars().count() > 100 {
            score += 0.1;
        }
        if segment.is_core_argument {
            score = score.max(defaults::CORE_ARGUMENT_IMPORTANCE);
        }
        segment.importance_score = score.min(1.0);
    }
}

/// Rebuilds a flat topic tree from per-segment topic tags: the most frequent
/// tag becomes the main topic, every distinct tag a subtopic in first-seen
/// order. Empty when no segment carries topics.
fn fallback_topic_tree(segments: &[Segment]) -> TopicTree {
    let mut nodes: Vec<TopicNode> = Vec::new();
    for segment in segments {
        for topic in &segment.topics {
            match nodes.iter_mut().find(|n| &n.name == topic) {
                Some(node) => node.segments.push(segment.id.clone()),
                None => nodes.push(TopicNode {
                    name: topic.clone(),
                    segments: vec![segment.id.clone()],
                }),
            }
        }
    }
    let main_topic = nodes
        .iter()
        .max_by_key(|n| n.segments.len())
        .map(|n| n.name.clone())
        .unwrap_or_default();
    TopicTree {
        main_topic,
        subtopics: nodes,
    }
}
