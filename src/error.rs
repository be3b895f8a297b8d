//! Error types for lectograph.

use thiserror::Error;

/// Typed failures from the two external collaborators (transcription and
/// deep analysis). Rate limits and timeouts are transient and worth retrying;
/// an unrecognized request is not.
#[derive(Error, Debug, Clone)]
pub enum ExternalServiceError {
    #[error("{service} rate limited the request")]
    RateLimited { service: String },

    #[error("{service} timed out after {seconds}s")]
    Timeout { service: String, seconds: u64 },

    #[error("{service} could not process the request: {message}")]
    Unrecognized { service: String, message: String },
}

impl ExternalServiceError {
    /// Returns true when a retry with backoff has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExternalServiceError::RateLimited { .. } | ExternalServiceError::Timeout { .. }
        )
    }

    /// Name of the service that produced the failure.
    pub fn service(&self) -> &str {
        match self {
            ExternalServiceError::RateLimited { service }
            | ExternalServiceError::Timeout { service, .. }
            | ExternalServiceError::Unrecognized { service, .. } => service,
        }
    }
}

#[derive(Error, Debug)]
pub enum LectographError {
    // Invalid tunables, rejected at pipeline start
    #[error("Invalid configuration value for {key}: {message}")]
    Config { key: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Malformed input, fatal for the affected document only
    #[error("Malformed input: {message}")]
    Input { message: String },

    // External collaborator failure that survived retries and degradation
    #[error("External service failure: {0}")]
    External(#[from] ExternalServiceError),

    // Internal consistency failure; always fatal, indicates a pipeline bug
    #[error("Invariant violated in {stage}: {message}")]
    Invariant { stage: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LectographError {
    /// Convenience constructor for configuration errors.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        LectographError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for input errors.
    pub fn input(message: impl Into<String>) -> Self {
        LectographError::Input {
            message: message.into(),
        }
    }

    /// Convenience constructor for invariant violations, tagged with the
    /// pipeline stage that detected the inconsistency.
    pub fn invariant(stage: impl Into<String>, message: impl Into<String>) -> Self {
        LectographError::Invariant {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LectographError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_display() {
        let error = LectographError::config("max_segment_secs", "must exceed min_segment_secs");
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for max_segment_secs: must exceed min_segment_secs"
        );
    }

    #[test]
    fn test_input_display() {
        let error = LectographError::input("activity signal shorter than waveform");
        assert_eq!(
            error.to_string(),
            "Malformed input: activity signal shorter than waveform"
        );
    }

    #[test]
    fn test_invariant_display() {
        let error = LectographError::invariant("reconstruct", "duplicate segment id seg_0001");
        assert_eq!(
            error.to_string(),
            "Invariant violated in reconstruct: duplicate segment id seg_0001"
        );
    }

    #[test]
    fn test_rate_limited_is_retryable() {
        let error = ExternalServiceError::RateLimited {
            service: "stt".to_string(),
        };
        assert!(error.is_retryable());
        assert_eq!(error.service(), "stt");
    }

    #[test]
    fn test_timeout_is_retryable() {
        let error = ExternalServiceError::Timeout {
            service: "oracle".to_string(),
            seconds: 60,
        };
        assert!(error.is_retryable());
        assert_eq!(error.to_string(), "oracle timed out after 60s");
    }

    #[test]
    fn test_unrecognized_is_not_retryable() {
        let error = ExternalServiceError::Unrecognized {
            service: "stt".to_string(),
            message: "unsupported audio".to_string(),
        };
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_from_external_service_error() {
        let external = ExternalServiceError::RateLimited {
            service: "oracle".to_string(),
        };
        let error: LectographError = external.into();
        assert!(matches!(error, LectographError::External(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: LectographError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LectographError>();
        assert_sync::<LectographError>();
    }
}
