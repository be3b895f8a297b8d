//! Audio-side pipeline stages: activity signals, the acoustic segmenter,
//! and WAV ingestion for the CLI.

pub mod segmenter;
pub mod vad;
pub mod wav;

pub use segmenter::{SegmenterConfig, segment};
pub use vad::ActivitySignal;
pub use wav::Waveform;
