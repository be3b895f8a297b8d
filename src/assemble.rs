//! Final document assembly.
//!
//! The last pipeline stage: checks the cross-stage invariants one more time
//! at the point where the immutable document is constructed, so a violation
//! is caught here rather than surfacing downstream as inconsistent output.

use crate::error::{LectographError, Result};
use crate::model::{Document, Segment};
use crate::relations::ReconstructionOutcome;
use chrono::Utc;
use std::collections::HashSet;

/// Assembles the immutable document, validating every structural invariant.
///
/// Checked here: segment ids are unique, segments are time-ordered and
/// non-overlapping, every relation endpoint and chain member names an
/// existing segment, and no relation is a self-loop. Any violation is an
/// internal bug, reported as an invariant failure rather than repaired.
pub fn assemble(
    source_ref: impl Into<String>,
    segments: Vec<Segment>,
    outcome: ReconstructionOutcome,
) -> Result<Document> {
    let mut ids = HashSet::new();
    for segment in &segments {
        if !ids.insert(segment.id.as_str()) {
            return Err(violation(format!("duplicate segment id {}", segment.id)));
        }
    }
    for pair in segments.windows(2) {
        if pair[1].start_time < pair[0].start_time {
            return Err(violation(format!(
                "segment {} starts before its predecessor",
                pair[1].id
            )));
        }
        if pair[1].start_time < pair[0].end_time - 1e-6 {
            return Err(violation(format!(
                "segment {} overlaps its predecessor",
                pair[1].id
            )));
        }
    }

    for relation in &outcome.relations {
        if relation.source_id == relation.target_id {
            return Err(violation(format!(
                "self-loop relation on {}",
                relation.source_id
            )));
        }
        for endpoint in [&relation.source_id, &relation.target_id] {
            if !ids.contains(endpoint.as_str()) {
                return Err(violation(format!(
                    "relation references unknown segment {endpoint}"
                )));
            }
        }
    }
    for chain in &outcome.chains {
        for member in &chain.segment_ids {
            if !ids.contains(member.as_str()) {
                return Err(violation(format!(
                    "chain {} references unknown segment {member}",
                    chain.chain_id
                )));
            }
        }
    }

    Ok(Document {
        source_ref: source_ref.into(),
        segments,
        relations: outcome.relations,
        chains: outcome.chains,
        topic_tree: outcome.topic_tree,
        degraded: outcome.degraded,
        created_at: Utc::now(),
    })
}

fn violation(message: String) -> LectographError {
    LectographError::invariant("assemble", message)
}
