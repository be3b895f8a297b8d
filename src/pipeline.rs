//! End-to-end pipeline: waveform in, assembled document out.
//!
//! Stage order is fixed: acoustic segmentation, concurrent transcription,
//! marker resegmentation, relation reconstruction, assembly. Transcription is
//! the only fan-out stage; everything after it runs on the joined, ordered
//! transcript. A failed transcription degrades that one segment to empty
//! text rather than failing the document.

use crate::analysis::{self, DeepAnalyzer, SpeechToText};
use crate::assemble;
use crate::audio::{ActivitySignal, SegmenterConfig, segmenter};
use crate::defaults;
use crate::error::Result;
use crate::model::{Document, RawSegment, TranscribedSegment};
use crate::relations::Reconstructor;
use crate::resegment::Resegmenter;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Pipeline-level tunables. Stage-specific tunables live with their stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub segmenter: SegmenterConfig,
    /// Maximum in-flight transcription calls per document.
    pub transcription_concurrency: usize,
    /// Attempts per transcription call (first try plus retries).
    pub external_attempts: u32,
    pub retry_backoff: Duration,
    /// Language hint forwarded to the transcription service.
    pub language_hint: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            transcription_concurrency: defaults::TRANSCRIPTION_CONCURRENCY,
            external_attempts: defaults::EXTERNAL_ATTEMPTS,
            retry_backoff: Duration::from_millis(defaults::RETRY_BACKOFF_MS),
            language_hint: "zh".to_string(),
        }
    }
}

/// The full speech-to-structure pipeline.
pub struct Pipeline<S, A> {
    stt: S,
    resegmenter: Resegmenter,
    reconstructor: Reconstructor<A>,
    config: PipelineConfig,
}

impl<S: SpeechToText, A: DeepAnalyzer> Pipeline<S, A> {
    pub fn new(stt: S, resegmenter: Resegmenter, reconstructor: Reconstructor<A>) -> Self {
        Self {
            stt,
            resegmenter,
            reconstructor,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the whole pipeline over one waveform.
    pub async fn run(
        &self,
        source_ref: &str,
        samples: &[f32],
        sample_rate: u32,
        activity: &ActivitySignal,
    ) -> Result<Document> {
        let raw = segmenter::segment(samples, sample_rate, activity, &self.config.segmenter)?;
        info!(segments = raw.len(), "acoustic segmentation done");

        let transcribed = self.transcribe_all(samples, sample_rate, raw).await;
        let failed = transcribed.iter().filter(|t| t.failed).count();
        if failed > 0 {
            warn!(failed, "some segments could not be transcribed");
        }

        let mut segments = self.resegmenter.resegment(&transcribed);
        info!(segments = segments.len(), "marker resegmentation done");

        let outcome = self.reconstructor.reconstruct(&mut segments).await?;
        assemble::assemble(source_ref, segments, outcome)
    }

    /// Transcribes all raw segments concurrently, joining before returning.
    ///
    /// Output order matches input order regardless of completion order. A
    /// segment whose transcription fails after retries comes back with empty
    /// text and the `failed` flag set.
    async fn transcribe_all(
        &self,
        samples: &[f32],
        sample_rate: u32,
        raw: Vec<RawSegment>,
    ) -> Vec<TranscribedSegment> {
        let semaphore = Arc::new(Semaphore::new(self.config.transcription_concurrency.max(1)));
        let service = self.stt.name().to_string();

        let futures = raw.iter().map(|segment| {
            let semaphore = Arc::clone(&semaphore);
            let service = &service;
            async move {
                let _permit = semaphore.acquire().await.ok();
                let start = segment.audio.start_sample.min(samples.len());
                let end = segment.audio.end_sample.min(samples.len());
                let audio = &samples[start..end];
                analysis::with_retries(
                    service,
                    self.config.external_attempts,
                    self.config.retry_backoff,
                    || {
                        self.stt
                            .transcribe(audio, sample_rate, &self.config.language_hint)
                    },
                )
                .await
            }
        });

        let results = join_all(futures).await;
        raw.into_iter()
            .zip(results)
            .map(|(segment, result)| match result {
                Ok(transcription) => TranscribedSegment {
                    raw: segment,
                    text: transcription.text,
                    confidence: transcription.confidence,
                    failed: false,
                },
                Err(error) => {
                    warn!(
                        start = segment.start_time,
                        end = segment.end_time,
                        error = %error,
                        "transcription failed, keeping empty segment"
                    );
                    TranscribedSegment {
                        raw: segment,
                        text: String::new(),
                        confidence: 0.0,
                        failed: true,
                    }
                }
            })
            .collect()
    }
}
