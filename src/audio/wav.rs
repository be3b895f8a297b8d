//! WAV ingestion and in-memory encoding.
//!
//! The pipeline core works on normalized f32 mono samples; this module
//! converts WAV files into that form for the CLI and encodes audio spans
//! back into WAV bytes for the HTTP transcription collaborator.

use crate::error::{LectographError, Result};
use std::io::{Cursor, Read};
use std::path::Path;

/// Decoded mono waveform.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    /// Loads a WAV file, downmixing stereo to mono. Sample values are
    /// normalized to [-1.0, 1.0].
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)))
    }

    /// Decodes WAV data from any reader (for testing and pipe input).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader = hound::WavReader::new(reader)
            .map_err(|e| LectographError::input(format!("failed to parse WAV data: {e}")))?;

        let spec = wav_reader.spec();
        let raw: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| LectographError::input(format!("failed to read WAV samples: {e}")))?;

        let mono: Vec<f32> = if spec.channels == 2 {
            raw.chunks_exact(2)
                .map(|pair| (pair[0] as f32 + pair[1] as f32) / (2.0 * i16::MAX as f32))
                .collect()
        } else {
            raw.iter().map(|s| *s as f32 / i16::MAX as f32).collect()
        };

        Ok(Self {
            samples: mono,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Encodes normalized f32 samples as 16-bit mono WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| LectographError::input(format!("failed to create WAV writer: {e}")))?;
        for sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| LectographError::input(format!("failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| LectographError::input(format!("failed to finalize WAV data: {e}")))?;
    }
    Ok(cursor.into_inner())
}
