//! Deep-analysis oracle: trait, HTTP chat-completion client, and mock.
//!
//! The oracle sees the full transcribed segment sequence and returns global
//! structure the local heuristics cannot see: long-range relations, logic
//! chains, per-segment topics, and the topic tree. Its response is parsed
//! tolerantly (every field defaults, and unrecognized relation categories
//! fold into `Unknown`) so a partially useful answer is never discarded.

use crate::defaults;
use crate::error::ExternalServiceError;
use crate::model::{LogicChain, RelationType, TopicTree};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

/// Compact view of a segment handed to the oracle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSegment {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// Relation edge as reported by the oracle. Confidence is optional on the
/// wire; absent values take a fixed default when the edge is adopted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OracleRelation {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub relation_type: RelationType,
    #[serde(default)]
    pub marker_words: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl OracleRelation {
    pub fn confidence_or_default(&self) -> f32 {
        self.confidence
            .unwrap_or(defaults::ORACLE_DEFAULT_CONFIDENCE)
    }
}

/// Everything the oracle can report. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DeepAnalysis {
    /// Segment ids the oracle considers core arguments.
    #[serde(default)]
    pub core_arguments: Vec<String>,
    /// Segment ids that support a core argument.
    #[serde(default)]
    pub supporting_points: Vec<String>,
    /// Verbatim logic chains over segment ids.
    #[serde(default)]
    pub logic_chains: Vec<LogicChain>,
    /// Long-range relation edges.
    #[serde(default)]
    pub paragraph_relations: Vec<OracleRelation>,
    /// Per-segment topic labels, keyed by segment id.
    #[serde(default)]
    pub topics: HashMap<String, Vec<String>>,
    /// Hierarchical topic outline of the whole recording.
    #[serde(default)]
    pub topic_tree: TopicTree,
}

/// Trait for the external deep-analysis collaborator.
#[async_trait]
pub trait DeepAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        segments: &[AnalysisSegment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: DeepAnalyzer> DeepAnalyzer for Arc<T> {
    async fn analyze(
        &self,
        segments: &[AnalysisSegment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError> {
        (**self).analyze(segments).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Allow provider selection at runtime (the config picks mock or HTTP).
#[async_trait]
impl DeepAnalyzer for Box<dyn DeepAnalyzer> {
    async fn analyze(
        &self,
        segments: &[AnalysisSegment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError> {
        (**self).analyze(segments).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP oracle speaking the OpenAI-compatible chat-completions protocol.
pub struct HttpDeepAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl HttpDeepAnalyzer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> crate::error::Result<Self> {
        Self::with_timeout(
            endpoint,
            api_key,
            model,
            Duration::from_secs(defaults::ORACLE_TIMEOUT_SECS),
        )
    }

    /// Fails when the HTTP client cannot be built (broken TLS or proxy
    /// environment); the request timeout backs the typed `Timeout` failure,
    /// so a client without one is not an acceptable fallback.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                crate::error::LectographError::config(
                    "oracle",
                    format!("failed to build HTTP client: {e}"),
                )
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
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
impl DeepAnalyzer for HttpDeepAnalyzer {
    async fn analyze(
        &self,
        segments: &[AnalysisSegment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(segments),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
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

        let body: ChatResponse = response.json().await.map_err(|e| self.failure(e))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExternalServiceError::Unrecognized {
                service: self.name().to_string(),
                message: "response contained no choices".to_string(),
            })?;

        parse_analysis(content).map_err(|message| ExternalServiceError::Unrecognized {
            service: self.name().to_string(),
            message,
        })
    }

    fn name(&self) -> &str {
        "oracle"
    }
}

const SYSTEM_PROMPT: &str = "你是一个分析口述讲话逻辑结构的助手。\
根据编号段落，输出 JSON，字段为 core_arguments、supporting_points、\
logic_chains、paragraph_relations、topics、topic_tree。\
关系类型使用 CONTRAST、ADDITION、CAUSALITY、REFERENCE_BACK、SUMMARY、\
EXAMPLE、PARALLEL。只输出 JSON。";

/// Renders the segment sequence as the numbered transcript the prompt expects.
fn build_prompt(segments: &[AnalysisSegment]) -> String {
    let mut prompt = String::from("以下是按时间顺序编号的讲话段落：\n\n");
    for seg in segments {
        let _ = writeln!(
            prompt,
            "[{}] ({:.1}s - {:.1}s) {}",
            seg.id, seg.start_time, seg.end_time, seg.text
        );
    }
    prompt.push_str("\n请分析这些段落之间的逻辑结构，只输出 JSON。");
    prompt
}

/// Extracts the JSON payload from a chat answer that may wrap it in a fenced
/// code block. Tries a ```json fence first, then a bare ``` fence, then the
/// raw text.
fn extract_json_block(content: &str) -> &str {
    for fence in ["```json", "```"] {
        if let Some(start) = content.find(fence) {
            let after = &content[start + fence.len()..];
            if let Some(end) = after.find("```") {
                return after[..end].trim();
            }
        }
    }
    content.trim()
}

fn parse_analysis(content: &str) -> std::result::Result<DeepAnalysis, String> {
    serde_json::from_str(extract_json_block(content))
        .map_err(|e| format!("could not parse analysis JSON: {e}"))
}

/// Mock oracle for tests: a fixed analysis, or a scripted failure.
pub struct MockDeepAnalyzer {
    analysis: DeepAnalysis,
    failure: Mutex<Option<ExternalServiceError>>,
}

impl MockDeepAnalyzer {
    pub fn new() -> Self {
        Self {
            analysis: DeepAnalysis::default(),
            failure: Mutex::new(None),
        }
    }

    pub fn with_analysis(mut self, analysis: DeepAnalysis) -> Self {
        self.analysis = analysis;
        self
    }

    /// Fails every call with the given error.
    pub fn with_failure(self, error: ExternalServiceError) -> Self {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
        self
    }
}

impl Default for MockDeepAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeepAnalyzer for MockDeepAnalyzer {
    async fn analyze(
        &self,
        _segments: &[AnalysisSegment],
    ) -> std::result::Result<DeepAnalysis, ExternalServiceError> {
        let failure = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(error) = failure.as_ref() {
            return Err(error.clone());
        }
        Ok(self.analysis.clone())
    }

    fn name(&self) -> &str {
        "mock-oracle"
    }
}
