//! Transcription collaborator: trait, HTTP client, and mock.

use crate::audio::wav::encode_wav;
use crate::defaults;
use crate::error::ExternalServiceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Result of transcribing one raw segment's audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub confidence: f32,
}

/// Trait for the external speech-to-text collaborator.
///
/// Contract: idempotent. Transcribing the same audio twice returns
/// equivalent text. Failures are typed so the pipeline can tell transient
/// conditions (retry) from permanent ones (degrade).
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes one segment's audio.
    ///
    /// # Arguments
    /// * `audio` - Normalized f32 mono samples
    /// * `sample_rate` - Sample rate in Hz
    /// * `language_hint` - BCP-47-ish language hint, e.g. "zh" or "auto"
    async fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
        language_hint: &str,
    ) -> std::result::Result<Transcription, ExternalServiceError>;

    /// Name of the backing service, used in logs and error messages.
    fn name(&self) -> &str;
}

/// Allow sharing one client across concurrent transcription calls.
#[async_trait]
impl<T: SpeechToText> SpeechToText for Arc<T> {
    async fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
        language_hint: &str,
    ) -> std::result::Result<Transcription, ExternalServiceError> {
        (**self).transcribe(audio, sample_rate, language_hint).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Allow provider selection at runtime (the config picks mock or HTTP).
#[async_trait]
impl SpeechToText for Box<dyn SpeechToText> {
    async fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
        language_hint: &str,
    ) -> std::result::Result<Transcription, ExternalServiceError> {
        (**self).transcribe(audio, sample_rate, language_hint).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// HTTP speech-to-text client.
///
/// Posts the segment audio as WAV bytes and expects a JSON body with `text`
/// and an optional `confidence`. The request timeout doubles as the typed
/// `Timeout` failure boundary.
pub struct HttpSpeechToText {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl HttpSpeechToText {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> crate::error::Result<Self> {
        Self::with_timeout(
            endpoint,
            model,
            Duration::from_secs(defaults::TRANSCRIPTION_TIMEOUT_SECS),
        )
    }

    /// Fails when the HTTP client cannot be built (broken TLS or proxy
    /// environment); the request timeout backs the typed `Timeout` failure,
    /// so a client without one is not an acceptable fallback.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                crate::error::LectographError::config(
                    "transcription",
                    format!("failed to build HTTP client: {e}"),
                )
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    fn failure(&self, error: reqwest::Error) -> ExternalServiceError {
        if error.is_timeout() {
            ExternalServiceError::Timeout {
                service: self.name().to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            ExternalServiceError::Unrecognized {
                service: self.name().to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(
        &self,
        audio: &[f32],
        sample_rate: u32,
        language_hint: &str,
    ) -> std::result::Result<Transcription, ExternalServiceError> {
        let wav_bytes =
            encode_wav(audio, sample_rate).map_err(|e| ExternalServiceError::Unrecognized {
                service: self.name().to_string(),
                message: format!("failed to encode segment audio: {e}"),
            })?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("model", self.model.as_str()), ("language", language_hint)])
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav_bytes)
            .send()
            .await
            .map_err(|e| self.failure(e))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExternalServiceError::RateLimited {
                service: self.name().to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(ExternalServiceError::Unrecognized {
                service: self.name().to_string(),
                message: format!("server returned {}", response.status()),
            });
        }

        let body: TranscribeResponse = response.json().await.map_err(|e| self.failure(e))?;
        Ok(Transcription {
            text: body.text,
            confidence: body.confidence.unwrap_or(0.0),
        })
    }

    fn name(&self) -> &str {
        "transcription"
    }
}

/// Mock transcription collaborator for tests.
///
/// Returns scripted responses in call order, optionally failing the first N
/// calls with a transient error to exercise the retry path.
pub struct MockSpeechToText {
    responses: Mutex<VecDeque<Transcription>>,
    fallback: Transcription,
    transient_failures: AtomicU32,
    always_fail: bool,
    calls: AtomicU32,
}

impl MockSpeechToText {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Transcription {
                text: "mock transcription".to_string(),
                confidence: 0.9,
            },
            transient_failures: AtomicU32::new(0),
            always_fail: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Queues texts to return in call order; later calls get the fallback.
    pub fn with_responses<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = self.responses.lock().unwrap_or_else(|e| e.into_inner());
            for text in texts {
                queue.push_back(Transcription {
                    text: text.into(),
                    confidence: 0.9,
                });
            }
        }
        self
    }

    /// Fails the first `count` calls with `RateLimited` before succeeding.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Fails every call with `Unrecognized`.
    pub fn with_failure(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for MockSpeechToText {
    async fn transcribe(
        &self,
        _audio: &[f32],
        _sample_rate: u32,
        _language_hint: &str,
    ) -> std::result::Result<Transcription, ExternalServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(ExternalServiceError::Unrecognized {
                service: self.name().to_string(),
                message: "mock transcription failure".to_string(),
            });
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ExternalServiceError::RateLimited {
                service: self.name().to_string(),
            });
        }
        let mut queue = self.responses.lock().unwrap_or_else(|e| e.into_inner());
        Ok(queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "mock-stt"
    }
}
