//! Configuration loading and validation.
//!
//! Configuration comes from a TOML file with every key optional; missing
//! sections fall back to built-in defaults. Secrets and deployment-specific
//! endpoints can be overridden through `LECTOGRAPH_*` environment variables
//! so config files stay checked in without credentials.

use crate::analysis::{
    DeepAnalyzer, HttpDeepAnalyzer, HttpSpeechToText, MockDeepAnalyzer, MockSpeechToText,
    SpeechToText,
};
use crate::audio::SegmenterConfig;
use crate::defaults;
use crate::error::{LectographError, Result};
use crate::markers::MarkerCatalog;
use crate::pipeline::PipelineConfig;
use crate::relations::ReconstructorConfig;
use crate::resegment::ResegmenterConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub resegment: ResegmentConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,
    #[serde(default = "default_activity_threshold")]
    pub activity_threshold: f32,
    #[serde(default = "default_pause_threshold")]
    pub pause_threshold_secs: f64,
    #[serde(default = "default_min_segment")]
    pub min_segment_secs: f64,
    #[serde(default = "default_max_segment")]
    pub max_segment_secs: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResegmentConfig {
    #[serde(default = "default_min_split_prefix")]
    pub min_split_prefix_chars: usize,
    /// Optional path to a marker catalog TOML file; the built-in Chinese
    /// catalog is used when unset.
    #[serde(default)]
    pub markers_file: Option<PathBuf>,
}

/// Which implementation backs an external collaborator. `mock` runs the
/// pipeline fully offline with canned responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Http,
    Mock,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    #[serde(default = "default_language_hint")]
    pub language_hint: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_sample_rate() -> u32 {
    defaults::SAMPLE_RATE
}
fn default_frame_samples() -> usize {
    defaults::ACTIVITY_FRAME_SAMPLES
}
fn default_activity_threshold() -> f32 {
    defaults::ACTIVITY_THRESHOLD
}
fn default_pause_threshold() -> f64 {
    defaults::PAUSE_THRESHOLD_SECS
}
fn default_min_segment() -> f64 {
    defaults::MIN_SEGMENT_SECS
}
fn default_max_segment() -> f64 {
    defaults::MAX_SEGMENT_SECS
}
fn default_min_split_prefix() -> usize {
    defaults::MIN_SPLIT_PREFIX_CHARS
}
fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_language_hint() -> String {
    "zh".to_string()
}
fn default_concurrency() -> usize {
    defaults::TRANSCRIPTION_CONCURRENCY
}
fn default_transcription_timeout() -> u64 {
    defaults::TRANSCRIPTION_TIMEOUT_SECS
}
fn default_true() -> bool {
    true
}
fn default_oracle_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_oracle_timeout() -> u64 {
    defaults::ORACLE_TIMEOUT_SECS
}
fn default_attempts() -> u32 {
    defaults::EXTERNAL_ATTEMPTS
}
fn default_backoff_ms() -> u64 {
    defaults::RETRY_BACKOFF_MS
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_samples: default_frame_samples(),
            activity_threshold: default_activity_threshold(),
            pause_threshold_secs: default_pause_threshold(),
            min_segment_secs: default_min_segment(),
            max_segment_secs: default_max_segment(),
        }
    }
}

impl Default for ResegmentConfig {
    fn default() -> Self {
        Self {
            min_split_prefix_chars: default_min_split_prefix(),
            markers_file: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            endpoint: String::new(),
            model: default_transcription_model(),
            language_hint: default_language_hint(),
            concurrency: default_concurrency(),
            timeout_secs: default_transcription_timeout(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: Provider::default(),
            endpoint: String::new(),
            api_key: String::new(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads the given file, or falls back to the per-user config file if it
    /// exists, or to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            debug!(path = %user_path.display(), "loading user config");
            return Self::load(&user_path);
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `~/.config/lectograph/config.toml` (platform equivalent).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lectograph").join("config.toml"))
    }

    /// Overrides endpoint and secret keys from `LECTOGRAPH_*` variables.
    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 4] = [
            ("LECTOGRAPH_TRANSCRIPTION_ENDPOINT", &mut self.transcription.endpoint),
            ("LECTOGRAPH_ORACLE_ENDPOINT", &mut self.oracle.endpoint),
            ("LECTOGRAPH_ORACLE_API_KEY", &mut self.oracle.api_key),
            ("LECTOGRAPH_ORACLE_MODEL", &mut self.oracle.model),
        ];
        for (name, slot) in overrides {
            if let Ok(value) = std::env::var(name)
                && !value.is_empty()
            {
                *slot = value;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(LectographError::config("audio.sample_rate", "must be non-zero"));
        }
        if self.audio.frame_samples == 0 {
            return Err(LectographError::config("audio.frame_samples", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.audio.activity_threshold) {
            return Err(LectographError::config(
                "audio.activity_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        if self.audio.pause_threshold_secs <= 0.0 {
            return Err(LectographError::config(
                "audio.pause_threshold_secs",
                "must be greater than zero",
            ));
        }
        if self.audio.min_segment_secs < 0.0 {
            return Err(LectographError::config(
                "audio.min_segment_secs",
                "must not be negative",
            ));
        }
        if self.audio.min_segment_secs > self.audio.max_segment_secs {
            return Err(LectographError::config(
                "audio.min_segment_secs",
                "must not exceed audio.max_segment_secs",
            ));
        }
        if self.transcription.concurrency == 0 {
            return Err(LectographError::config(
                "transcription.concurrency",
                "must be at least 1",
            ));
        }
        if self.retry.attempts == 0 {
            return Err(LectographError::config("retry.attempts", "must be at least 1"));
        }
        Ok(())
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            pause_threshold_secs: self.audio.pause_threshold_secs,
            min_segment_secs: self.audio.min_segment_secs,
            max_segment_secs: self.audio.max_segment_secs,
        }
    }

    pub fn resegmenter_config(&self) -> ResegmenterConfig {
        ResegmenterConfig {
            min_split_prefix_chars: self.resegment.min_split_prefix_chars,
        }
    }

    pub fn reconstructor_config(&self) -> ReconstructorConfig {
        ReconstructorConfig {
            attempts: self.retry.attempts,
            retry_backoff: Duration::from_millis(self.retry.backoff_ms),
            oracle_timeout: Duration::from_secs(self.oracle.timeout_secs),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            segmenter: self.segmenter_config(),
            transcription_concurrency: self.transcription.concurrency,
            external_attempts: self.retry.attempts,
            retry_backoff: Duration::from_millis(self.retry.backoff_ms),
            language_hint: self.transcription.language_hint.clone(),
        }
    }

    /// Loads the marker catalog named in the config, or the built-in one.
    pub fn marker_catalog(&self) -> Result<MarkerCatalog> {
        match &self.resegment.markers_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                MarkerCatalog::from_toml_str(&raw)
            }
            None => Ok(MarkerCatalog::default()),
        }
    }

    /// Builds the configured transcription client. The HTTP provider
    /// requires an endpoint; the mock provider runs offline.
    pub fn transcriber(&self) -> Result<Box<dyn SpeechToText>> {
        match self.transcription.provider {
            Provider::Mock => Ok(Box::new(MockSpeechToText::new())),
            Provider::Http => {
                if self.transcription.endpoint.is_empty() {
                    return Err(LectographError::config(
                        "transcription.endpoint",
                        "no transcription endpoint configured",
                    ));
                }
                Ok(Box::new(HttpSpeechToText::with_timeout(
                    &self.transcription.endpoint,
                    &self.transcription.model,
                    Duration::from_secs(self.transcription.timeout_secs),
                )?))
            }
        }
    }

    /// Builds the configured oracle client, or `None` when the oracle is
    /// disabled or the HTTP provider has no endpoint.
    pub fn oracle_client(&self) -> Result<Option<Box<dyn DeepAnalyzer>>> {
        if !self.oracle.enabled {
            return Ok(None);
        }
        match self.oracle.provider {
            Provider::Mock => Ok(Some(Box::new(MockDeepAnalyzer::new()))),
            Provider::Http => {
                if self.oracle.endpoint.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Box::new(HttpDeepAnalyzer::with_timeout(
                    &self.oracle.endpoint,
                    &self.oracle.api_key,
                    &self.oracle.model,
                    Duration::from_secs(self.oracle.timeout_secs),
                )?)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn empty_file_gives_defaults() {
        let file = write_config("");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.sample_rate, defaults::SAMPLE_RATE);
        assert_eq!(config.transcription.concurrency, 5);
        assert!(config.oracle.enabled);
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let file = write_config(
            r#"
[audio]
pause_threshold_secs = 2.0

[transcription]
endpoint = "http://localhost:9000/transcribe"
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.pause_threshold_secs, 2.0);
        assert_eq!(config.audio.min_segment_secs, defaults::MIN_SEGMENT_SECS);
        assert_eq!(
            config.transcription.endpoint,
            "http://localhost:9000/transcribe"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[audio]\nbogus_key = 1\n");
        let result = Config::load(file.path());
        assert!(matches!(result, Err(LectographError::ConfigParse(_))));
    }

    #[test]
    fn negative_split_prefix_fails_to_parse() {
        let file = write_config("[resegment]\nmin_split_prefix_chars = -1\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn inverted_duration_bounds_are_rejected() {
        let file = write_config("[audio]\nmin_segment_secs = 40.0\nmax_segment_secs = 30.0\n");
        let result = Config::load(file.path());
        assert!(matches!(result, Err(LectographError::Config { .. })));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let file = write_config("[transcription]\nconcurrency = 0\n");
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn transcriber_requires_endpoint() {
        let config = Config::default();
        assert!(matches!(
            config.transcriber(),
            Err(LectographError::Config { .. })
        ));
    }

    #[test]
    fn oracle_client_is_none_when_disabled() {
        let mut config = Config::default();
        config.oracle.endpoint = "http://localhost:9001/v1/chat/completions".to_string();
        config.oracle.enabled = false;
        assert!(config.oracle_client().unwrap().is_none());

        config.oracle.enabled = true;
        assert!(config.oracle_client().unwrap().is_some());
    }

    #[test]
    fn mock_providers_run_without_endpoints() {
        let file = write_config(
            r#"
[transcription]
provider = "mock"

[oracle]
provider = "mock"
"#,
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transcription.provider, Provider::Mock);
        assert_eq!(config.oracle.provider, Provider::Mock);

        let stt = config.transcriber().unwrap();
        assert_eq!(stt.name(), "mock-stt");
        let oracle = config.oracle_client().unwrap().unwrap();
        assert_eq!(oracle.name(), "mock-oracle");
    }

    #[test]
    fn provider_defaults_to_http() {
        let file = write_config("");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.transcription.provider, Provider::Http);
        assert_eq!(config.oracle.provider, Provider::Http);
    }

    #[test]
    fn pipeline_config_carries_audio_tunables() {
        let file = write_config("[audio]\npause_threshold_secs = 0.8\n");
        let config = Config::load(file.path()).unwrap();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.segmenter.pause_threshold_secs, 0.8);
        assert_eq!(pipeline.language_hint, "zh");
    }

    #[test]
    fn custom_marker_catalog_is_loaded_from_file() {
        let markers = write_config("CONTRAST = [\"however\"]\nADDITION = [\"moreover\"]\n");
        let mut config = Config::default();
        config.resegment.markers_file = Some(markers.path().to_path_buf());
        let catalog = config.marker_catalog().unwrap();
        assert_eq!(catalog.len(), 2);
    }
}
