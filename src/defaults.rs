//! Default configuration constants for lectograph.
//!
//! Shared tunables used across configuration types, kept in one place so the
//! pipeline, the config file defaults, and the tests agree on the numbers.

use crate::model::RelationType;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard rate for speech recognition input.
pub const SAMPLE_RATE: u32 = 16000;

/// Samples per activity frame (10ms at 16kHz).
pub const ACTIVITY_FRAME_SAMPLES: usize = 160;

/// Default RMS threshold above which an activity frame counts as voiced.
pub const ACTIVITY_THRESHOLD: f32 = 0.02;

/// Relative tolerance for waveform vs. activity-signal length mismatch.
///
/// The activity signal rarely covers the waveform exactly (the last partial
/// frame is usually dropped). Mismatches within this fraction of the
/// waveform length are accepted; anything larger is a malformed input.
pub const ACTIVITY_LENGTH_TOLERANCE: f64 = 0.02;

/// Unvoiced run treated as a segment boundary, in seconds.
pub const PAUSE_THRESHOLD_SECS: f64 = 1.5;

/// Minimum raw segment duration in seconds.
///
/// Spans shorter than this are merged into the following span, never
/// dropped; short utterances still carry meaning.
pub const MIN_SEGMENT_SECS: f64 = 0.5;

/// Maximum raw segment duration in seconds.
///
/// Longer spans are force-split at the locally quietest frame so that no
/// segment exceeds the cap.
pub const MAX_SEGMENT_SECS: f64 = 30.0;

/// Minimum prefix length, in characters, for a marker-driven split.
///
/// A split that would leave a shorter prefix is skipped and the marker is
/// attached to the still-whole segment as metadata instead.
pub const MIN_SPLIT_PREFIX_CHARS: usize = 6;

/// Maximum concurrent transcription calls per document.
pub const TRANSCRIPTION_CONCURRENCY: usize = 5;

/// Attempts per external call (first try plus retries).
pub const EXTERNAL_ATTEMPTS: u32 = 3;

/// Base backoff between external-call retries, in milliseconds. Doubled on
/// each subsequent attempt.
pub const RETRY_BACKOFF_MS: u64 = 500;

/// Timeout for the single per-document oracle request, in seconds.
pub const ORACLE_TIMEOUT_SECS: u64 = 60;

/// Timeout for one transcription request, in seconds.
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 30;

/// Confidence assigned to relations the oracle reports without one.
pub const ORACLE_DEFAULT_CONFIDENCE: f32 = 0.6;

/// Importance floor for segments the oracle marks as core arguments.
pub const CORE_ARGUMENT_IMPORTANCE: f32 = 0.9;

/// Importance floor for segments the oracle marks as supporting points.
pub const SUPPORTING_POINT_IMPORTANCE: f32 = 0.7;

/// Fixed confidence for a heuristic relation, by marker category.
///
/// These are tuned constants, not derived values. Backward references score
/// lower because the topic-overlap target resolution is itself a guess;
/// summaries score higher because their markers are rarely ambiguous.
pub fn heuristic_confidence(category: RelationType) -> f32 {
    match category {
        RelationType::Contrast => 0.8,
        RelationType::Addition => 0.75,
        RelationType::Causality => 0.8,
        RelationType::ReferenceBack => 0.7,
        RelationType::Summary => 0.85,
        RelationType::Example => 0.75,
        RelationType::Parallel => 0.7,
        RelationType::Unknown => 0.5,
    }
}
