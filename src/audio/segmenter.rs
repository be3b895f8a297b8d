//! Acoustic first-pass segmentation.
//!
//! Turns a waveform plus a voice-activity signal into ordered, non-overlapping
//! raw segments. Boundaries are unvoiced runs of at least the pause threshold;
//! spans shorter than the minimum duration merge into the following span, and
//! spans longer than the maximum are force-split at the locally quietest frame.

use crate::audio::vad::ActivitySignal;
use crate::defaults;
use crate::error::{LectographError, Result};
use crate::model::{AudioSpan, RawSegment};

/// Tunables for the acoustic segmenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    /// Unvoiced run treated as a segment boundary, in seconds.
    pub pause_threshold_secs: f64,
    /// Spans shorter than this merge into the following span.
    pub min_segment_secs: f64,
    /// Spans longer than this are force-split.
    pub max_segment_secs: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            pause_threshold_secs: defaults::PAUSE_THRESHOLD_SECS,
            min_segment_secs: defaults::MIN_SEGMENT_SECS,
            max_segment_secs: defaults::MAX_SEGMENT_SECS,
        }
    }
}

impl SegmenterConfig {
    fn validate(&self) -> Result<()> {
        if self.pause_threshold_secs <= 0.0 {
            return Err(LectographError::config(
                "pause_threshold_secs",
                "must be greater than zero",
            ));
        }
        if self.min_segment_secs < 0.0 {
            return Err(LectographError::config(
                "min_segment_secs",
                "must not be negative",
            ));
        }
        if self.min_segment_secs > self.max_segment_secs {
            return Err(LectographError::config(
                "min_segment_secs",
                format!(
                    "must not exceed max_segment_secs ({} > {})",
                    self.min_segment_secs, self.max_segment_secs
                ),
            ));
        }
        Ok(())
    }
}

/// Segments a waveform into ordered, non-overlapping raw segments.
///
/// Pure function over its inputs: the same waveform, activity signal, and
/// config always produce the same segments. Output covers every voiced
/// sample; unvoiced gaps of at least the pause threshold are excluded
/// (unless bridged by a short-span forward merge).
pub fn segment(
    samples: &[f32],
    sample_rate: u32,
    activity: &ActivitySignal,
    config: &SegmenterConfig,
) -> Result<Vec<RawSegment>> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(LectographError::config("sample_rate", "must be non-zero"));
    }
    check_signal_coverage(samples.len(), activity)?;

    let frame_secs = activity.samples_per_frame as f64 / sample_rate as f64;
    let pause_frames = frames_ceil(config.pause_threshold_secs, frame_secs).max(1);
    let min_frames = frames_ceil(config.min_segment_secs, frame_secs);
    let max_frames = ((config.max_segment_secs / frame_secs).floor() as usize).max(1);

    let spans = voiced_spans(activity, pause_frames);
    let spans = merge_short_spans(spans, min_frames);
    let spans = split_long_spans(spans, activity, min_frames, max_frames);

    Ok(spans
        .into_iter()
        .map(|(start, end)| {
            let start_sample = start * activity.samples_per_frame;
            let end_sample = (end * activity.samples_per_frame).min(samples.len());
            RawSegment {
                start_time: start_sample as f64 / sample_rate as f64,
                end_time: end_sample as f64 / sample_rate as f64,
                audio: AudioSpan {
                    start_sample,
                    end_sample,
                },
            }
        })
        .collect())
}

fn frames_ceil(secs: f64, frame_secs: f64) -> usize {
    (secs / frame_secs).ceil() as usize
}

/// Rejects waveform/activity pairs whose lengths disagree beyond tolerance.
///
/// The activity signal usually covers slightly less than the waveform (the
/// trailing partial frame is dropped); anything beyond one frame plus a
/// small relative slack is a malformed pairing.
fn check_signal_coverage(sample_count: usize, activity: &ActivitySignal) -> Result<()> {
    let covered = activity.covered_samples();
    let tolerance = activity
        .samples_per_frame
        .max((sample_count as f64 * defaults::ACTIVITY_LENGTH_TOLERANCE) as usize);
    if covered.abs_diff(sample_count) > tolerance {
        return Err(LectographError::input(format!(
            "activity signal covers {covered} samples but waveform has {sample_count}"
        )));
    }
    Ok(())
}

/// Merges contiguous voiced frames into candidate spans, treating unvoiced
/// runs of at least `pause_frames` as boundaries. Shorter unvoiced runs are
/// absorbed into the surrounding span.
fn voiced_spans(activity: &ActivitySignal, pause_frames: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut current_start: Option<usize> = None;
    let mut last_voiced = 0usize;

    for frame in 0..activity.frame_count() {
        if activity.is_voiced(frame) {
            if current_start.is_none() {
                current_start = Some(frame);
            }
            last_voiced = frame;
        } else if let Some(start) = current_start
            && frame - last_voiced >= pause_frames
        {
            spans.push((start, last_voiced + 1));
            current_start = None;
        }
    }
    if let Some(start) = current_start {
        spans.push((start, last_voiced + 1));
    }
    spans
}

/// Merges spans shorter than `min_frames` into the following span. A short
/// trailing span merges backward instead; a lone short span stays as is,
/// since short utterances still carry meaning and are never dropped.
fn merge_short_spans(spans: Vec<(usize, usize)>, min_frames: usize) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    let mut pending: Option<(usize, usize)> = None;

    for (start, end) in spans {
        let start = match pending.take() {
            Some((carried_start, _)) => carried_start,
            None => start,
        };
        if end - start < min_frames {
            pending = Some((start, end));
        } else {
            merged.push((start, end));
        }
    }
    if let Some((start, end)) = pending {
        // A trailing short span has no following span to join; merge it
        // backward into the previous span, or keep it standalone when it is
        // the only span at all.
        match merged.last_mut() {
            Some(last) => last.1 = end,
            None => merged.push((start, end)),
        }
    }
    merged
}

/// Splits spans longer than `max_frames` at the locally quietest interior
/// frame (a fallback boundary, not a semantic one) until every piece fits.
fn split_long_spans(
    spans: Vec<(usize, usize)>,
    activity: &ActivitySignal,
    min_frames: usize,
    max_frames: usize,
) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        push_split(span, activity, min_frames, max_frames, &mut out);
    }
    out
}

fn push_split(
    (start, end): (usize, usize),
    activity: &ActivitySignal,
    min_frames: usize,
    max_frames: usize,
    out: &mut Vec<(usize, usize)>,
) {
    if end - start <= max_frames {
        out.push((start, end));
        return;
    }

    // Keep at least min_frames on each side of the cut so the split cannot
    // recreate a too-short span; fall back to the midpoint when the span is
    // too tight for that window.
    let lo = start + min_frames.max(1);
    let hi = end.saturating_sub(min_frames.max(1));
    let cut = if lo < hi {
        quietest_frame(activity, lo, hi)
    } else {
        start + (end - start) / 2
    };

    push_split((start, cut), activity, min_frames, max_frames, out);
    push_split((cut, end), activity, min_frames, max_frames, out);
}

/// Index of the lowest-activity frame in `[lo, hi)`.
fn quietest_frame(activity: &ActivitySignal, lo: usize, hi: usize) -> usize {
    let mut best = lo;
    let mut best_value = f32::MAX;
    for frame in lo..hi.min(activity.frame_count()) {
        let value = activity.values[frame];
        if value < best_value {
            best_value = value;
            best = frame;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 16000;
    const FRAME: usize = 160; // 10ms per frame

    /// Test config in frame-friendly units: 100ms pause, 50ms min, 300ms max.
    fn config() -> SegmenterConfig {
        SegmenterConfig {
            pause_threshold_secs: 0.1,
            min_segment_secs: 0.05,
            max_segment_secs: 0.3,
        }
    }

    /// Builds an activity signal from per-frame values and a matching
    /// silent waveform of the right length.
    fn fixture(values: Vec<f32>) -> (Vec<f32>, ActivitySignal) {
        let samples = vec![0.0f32; values.len() * FRAME];
        let activity = ActivitySignal {
            values,
            samples_per_frame: FRAME,
            voiced_threshold: 0.5,
        };
        (samples, activity)
    }

    fn frames(pattern: &[(f32, usize)]) -> Vec<f32> {
        pattern
            .iter()
            .flat_map(|&(value, count)| std::iter::repeat_n(value, count))
            .collect()
    }

    #[test]
    fn long_pause_is_a_boundary() {
        // 20 voiced, 12 unvoiced (>= 10 frame pause), 20 voiced
        let (samples, activity) = fixture(frames(&[(1.0, 20), (0.0, 12), (1.0, 20)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].start_time - 0.0).abs() < 1e-9);
        assert!((segments[0].end_time - 0.2).abs() < 1e-9);
        assert!((segments[1].start_time - 0.32).abs() < 1e-9);
    }

    #[test]
    fn short_gap_is_absorbed() {
        // 5-frame gap < 10-frame pause threshold stays inside one segment
        let (samples, activity) = fixture(frames(&[(1.0, 10), (0.0, 5), (1.0, 10)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((segments[0].end_time - 0.25).abs() < 1e-9);
    }

    #[test]
    fn segments_are_ordered_and_non_overlapping() {
        let (samples, activity) = fixture(frames(&[
            (1.0, 15),
            (0.0, 12),
            (1.0, 40),
            (0.0, 20),
            (1.0, 8),
            (0.0, 15),
            (1.0, 25),
        ]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert!(segments.len() >= 3);
        for pair in segments.windows(2) {
            assert!(pair[0].end_time <= pair[1].start_time);
        }
    }

    #[test]
    fn no_segment_exceeds_max_duration() {
        // 100 voiced frames = 1s, must be split into <= 0.3s pieces
        let (samples, activity) = fixture(frames(&[(1.0, 100)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert!(segments.len() >= 4);
        for seg in &segments {
            assert!(seg.duration() <= 0.3 + 1e-9, "duration {}", seg.duration());
        }
        // Pieces tile the span exactly
        assert!((segments.first().unwrap().start_time - 0.0).abs() < 1e-9);
        assert!((segments.last().unwrap().end_time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn force_split_prefers_quietest_frame() {
        // 40 voiced frames with a pronounced dip at frame 25
        let mut values = frames(&[(1.0, 40)]);
        values[25] = 0.6; // still voiced, but the quietest point
        let (samples, activity) = fixture(values);
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].end_time - 0.25).abs() < 1e-9);
    }

    #[test]
    fn short_span_merges_into_following_span() {
        // 3-frame span (30ms < 50ms min), pause, then a full span
        let (samples, activity) = fixture(frames(&[(1.0, 3), (0.0, 12), (1.0, 20)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 1);
        // The merged segment starts where the short span started
        assert!((segments[0].start_time - 0.0).abs() < 1e-9);
        assert!((segments[0].end_time - 0.35).abs() < 1e-9);
    }

    #[test]
    fn trailing_short_span_merges_backward() {
        let (samples, activity) = fixture(frames(&[(1.0, 20), (0.0, 12), (1.0, 3)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((segments[0].end_time - 0.35).abs() < 1e-9);
    }

    #[test]
    fn lone_short_span_is_kept() {
        let (samples, activity) = fixture(frames(&[(1.0, 3)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((segments[0].duration() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn all_silence_yields_no_segments() {
        let (samples, activity) = fixture(frames(&[(0.0, 50)]));
        let segments = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert!(segments.is_empty());
    }

    #[test]
    fn min_above_max_is_a_config_error() {
        let (samples, activity) = fixture(frames(&[(1.0, 10)]));
        let bad = SegmenterConfig {
            min_segment_secs: 1.0,
            max_segment_secs: 0.5,
            ..config()
        };
        let err = segment(&samples, SAMPLE_RATE, &activity, &bad).unwrap_err();
        assert!(matches!(err, LectographError::Config { .. }));
    }

    #[test]
    fn zero_pause_threshold_is_a_config_error() {
        let (samples, activity) = fixture(frames(&[(1.0, 10)]));
        let bad = SegmenterConfig {
            pause_threshold_secs: 0.0,
            ..config()
        };
        let err = segment(&samples, SAMPLE_RATE, &activity, &bad).unwrap_err();
        assert!(matches!(err, LectographError::Config { .. }));
    }

    #[test]
    fn mismatched_signal_length_is_an_input_error() {
        let (_, activity) = fixture(frames(&[(1.0, 10)]));
        let samples = vec![0.0f32; 10 * FRAME * 3]; // 3x longer than covered
        let err = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap_err();
        assert!(matches!(err, LectographError::Input { .. }));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let (samples, activity) = fixture(frames(&[(1.0, 35), (0.0, 12), (1.0, 60)]));
        let first = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        let second = segment(&samples, SAMPLE_RATE, &activity, &config()).unwrap();
        assert_eq!(first, second);
    }
}
