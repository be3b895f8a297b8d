//! Frame-level voice-activity signals.
//!
//! The acoustic segmenter consumes a pre-computed activity signal rather than
//! running detection itself; any VAD can feed it as long as frame values grow
//! with voice energy. This module carries the signal type plus an RMS-based
//! builder so plain WAV input can go through the same contract.

use serde::{Deserialize, Serialize};

/// Per-frame voice-activity signal at a known sample ratio.
///
/// `values` are monotone in voice energy; probabilities, RMS levels, or
/// plain 0/1 booleans all work. A frame counts as voiced when its value
/// reaches `voiced_threshold`; the raw values additionally drive the
/// lowest-energy force-split inside overlong spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySignal {
    pub values: Vec<f32>,
    pub samples_per_frame: usize,
    pub voiced_threshold: f32,
}

impl ActivitySignal {
    /// Builds an RMS activity signal over fixed-size frames.
    ///
    /// The trailing partial frame, if any, is dropped; the segmenter's
    /// length tolerance accounts for it.
    pub fn from_rms(samples: &[f32], samples_per_frame: usize, voiced_threshold: f32) -> Self {
        let values = samples
            .chunks_exact(samples_per_frame.max(1))
            .map(calculate_rms)
            .collect();
        Self {
            values,
            samples_per_frame: samples_per_frame.max(1),
            voiced_threshold,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.values.len()
    }

    /// Number of waveform samples the signal covers.
    pub fn covered_samples(&self) -> usize {
        self.values.len() * self.samples_per_frame
    }

    pub fn is_voiced(&self, frame: usize) -> bool {
        self.values
            .get(frame)
            .is_some_and(|v| *v >= self.voiced_threshold)
    }
}

/// Root Mean Square of normalized audio samples.
///
/// Samples are expected in [-1.0, 1.0]; the result is 0.0 for silence and
/// ~0.707 for a full-scale sine wave.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(calculate_rms(&[0.0; 160]), 0.0);
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_constant_signal_is_amplitude() {
        let rms = calculate_rms(&[0.5; 160]);
        assert!((rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn from_rms_frames_and_coverage() {
        let mut samples = vec![0.0f32; 480];
        samples.extend(vec![0.5f32; 480]);
        // 6 full frames of 160; no partial frame
        let signal = ActivitySignal::from_rms(&samples, 160, 0.02);
        assert_eq!(signal.frame_count(), 6);
        assert_eq!(signal.covered_samples(), 960);
        assert!(!signal.is_voiced(0));
        assert!(signal.is_voiced(5));
    }

    #[test]
    fn from_rms_drops_trailing_partial_frame() {
        let samples = vec![0.5f32; 170];
        let signal = ActivitySignal::from_rms(&samples, 160, 0.02);
        assert_eq!(signal.frame_count(), 1);
        assert_eq!(signal.covered_samples(), 160);
    }

    #[test]
    fn out_of_range_frame_is_unvoiced() {
        let signal = ActivitySignal::from_rms(&[0.5f32; 160], 160, 0.02);
        assert!(!signal.is_voiced(10));
    }
}
