//! External collaborator seams: transcription and the deep-analysis oracle.
//!
//! Both collaborators are reached through traits so the pipeline can run
//! against mocks in tests and HTTP services in production. Retry policy for
//! the external calls lives here; internal computation is retry-free.

pub mod oracle;
pub mod stt;

pub use oracle::{AnalysisSegment, DeepAnalysis, DeepAnalyzer, HttpDeepAnalyzer, MockDeepAnalyzer};
pub use stt::{HttpSpeechToText, MockSpeechToText, SpeechToText, Transcription};

use crate::error::ExternalServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs an external call with bounded retries and exponential backoff.
///
/// Only retryable failures (rate limit, timeout) are retried; an
/// `Unrecognized` failure returns immediately. `attempts` counts the first
/// try, so `attempts = 3` means at most two retries.
pub async fn with_retries<T, F, Fut>(
    service: &str,
    attempts: u32,
    base_backoff: Duration,
    mut call: F,
) -> std::result::Result<T, ExternalServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ExternalServiceError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt + 1 < attempts => {
                let delay = base_backoff * 2u32.saturating_pow(attempt);
                warn!(
                    service,
                    attempt = attempt + 1,
                    error = %error,
                    "external call failed, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try_without_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retries("stt", 3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ExternalServiceError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retries("stt", 3, Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ExternalServiceError::RateLimited {
                        service: "stt".to_string(),
                    })
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_all_attempts() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> =
            with_retries("oracle", 3, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ExternalServiceError::Timeout {
                        service: "oracle".to_string(),
                        seconds: 1,
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unrecognized_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: std::result::Result<(), _> =
            with_retries("stt", 3, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ExternalServiceError::Unrecognized {
                        service: "stt".to_string(),
                        message: "bad audio".to_string(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
