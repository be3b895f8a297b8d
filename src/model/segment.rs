//! Segment types across the three pipeline stages: acoustic spans,
//! transcribed spans, and the final marker-refined units.

use crate::model::relation::RelationType;
use serde::{Deserialize, Serialize};

/// Stable opaque segment identifier, assigned once by the resegmenter and
/// never reused.
pub type SegmentId = String;

/// Half-open sample range into the source waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSpan {
    pub start_sample: usize,
    pub end_sample: usize,
}

impl AudioSpan {
    pub fn len(&self) -> usize {
        self.end_sample.saturating_sub(self.start_sample)
    }

    pub fn is_empty(&self) -> bool {
        self.end_sample <= self.start_sample
    }
}

/// A contiguous span of voiced audio with no internal long silence.
///
/// Produced only by the acoustic segmenter; immutable once created. Raw
/// segments are ordered by `start_time` and non-overlapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub audio: AudioSpan,
}

impl RawSegment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A raw segment enriched with text by the external transcription step.
/// One-to-one with its `RawSegment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribedSegment {
    pub raw: RawSegment,
    pub text: String,
    pub confidence: f32,
    /// Set when transcription exhausted its retries; the text stays empty.
    pub failed: bool,
}

/// A detected marker inside a segment's text.
///
/// Purely derived from the segment text and the catalog; recomputed on
/// demand, never persisted independently of its segment. The offset is a
/// byte offset into the owning segment's text (always a UTF-8 boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerOccurrence {
    pub segment_id: SegmentId,
    pub offset: usize,
    pub keyword: String,
    pub category: RelationType,
}

/// The atomic textual/temporal unit after both segmentation passes.
///
/// Segments are totally ordered by time and non-overlapping; concatenating
/// segment texts in order reproduces the per-raw-segment transcript exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub markers: Vec<MarkerOccurrence>,
    pub topics: Vec<String>,
    pub importance_score: f32,
    pub is_core_argument: bool,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// The marker this segment opens with, if it was split at one.
    ///
    /// A split always places the splitting marker at offset 0 of the new
    /// segment; markers attached because a split was skipped sit at their
    /// original interior offset and do not count as opening.
    pub fn opening_marker(&self) -> Option<&MarkerOccurrence> {
        self.markers.iter().find(|m| m.offset == 0)
    }

    /// `mm:ss - mm:ss` timestamp for display and oracle prompts.
    pub fn format_timestamp(&self) -> String {
        let fmt = |t: f64| {
            let total = t.max(0.0) as u64;
            format!("{:02}:{:02}", total / 60, total % 60)
        };
        format!("{} - {}", fmt(self.start_time), fmt(self.end_time))
    }
}
