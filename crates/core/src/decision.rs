//! DecisionClient trait: the abstraction over the remote decision service.
//!
//! Both orchestrators talk to the service only through this trait: ask for a
//! decision under a named strategy (optionally continuing an episode), and
//! report a scalar metric against a finished episode. Retries, timeouts and
//! transport details belong to implementations, not to callers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::episode::EpisodeId;
use crate::error::DecisionError;
use crate::message::{ContentBlock, Turn};

/// The structured input for one decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Arguments for the function's system template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<serde_json::Value>,

    /// Conversation so far, oldest first
    pub messages: Vec<Turn>,
}

impl DecisionInput {
    pub fn new(messages: Vec<Turn>) -> Self {
        Self {
            system: None,
            messages,
        }
    }

    pub fn with_system(mut self, system: serde_json::Value) -> Self {
        self.system = Some(system);
        self
    }
}

/// One decision request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// The remote function to call (e.g., "play_chess_board")
    pub function_name: String,

    /// The strategy (variant) to decide with (e.g., "baseline")
    pub strategy: String,

    /// Episode to continue; `None` on the first call of a sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeId>,

    pub input: DecisionInput,
}

/// The decoded result of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutput {
    /// Chat functions: text and tool-call blocks
    Chat(Vec<ContentBlock>),
    /// JSON functions: raw text plus the parsed value if it matched the schema
    Json {
        raw: String,
        parsed: Option<serde_json::Value>,
    },
}

/// One decision response. The episode is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_id: Option<String>,

    pub episode: EpisodeId,

    /// The strategy that actually served the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    pub output: DecisionOutput,
}

impl DecisionResponse {
    /// Content blocks of a chat response.
    pub fn chat_content(&self) -> Result<&[ContentBlock], DecisionError> {
        match &self.output {
            DecisionOutput::Chat(blocks) => Ok(blocks),
            DecisionOutput::Json { .. } => Err(DecisionError::MalformedResponse(
                "expected chat content, got JSON output".into(),
            )),
        }
    }

    /// A required string field of a JSON response.
    pub fn json_str(&self, field: &str) -> Result<&str, DecisionError> {
        match &self.output {
            DecisionOutput::Json {
                parsed: Some(value),
                ..
            } => value[field].as_str().ok_or_else(|| {
                DecisionError::MalformedResponse(format!("missing string field '{field}'"))
            }),
            DecisionOutput::Json { parsed: None, raw } => Err(DecisionError::MalformedResponse(
                format!("output did not parse: {raw}"),
            )),
            DecisionOutput::Chat(_) => Err(DecisionError::MalformedResponse(
                "expected JSON output, got chat content".into(),
            )),
        }
    }
}

/// A scalar metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackValue {
    Boolean(bool),
    Float(f64),
}

/// Feedback against a finished episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub episode: EpisodeId,
    pub metric_name: String,
    pub value: FeedbackValue,
}

/// The core DecisionClient trait.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// A human-readable name for this client (e.g., "gateway").
    fn name(&self) -> &str;

    /// Request one decision. Single attempt; no retries.
    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError>;

    /// Submit feedback for an episode.
    async fn submit_feedback(&self, feedback: Feedback) -> Result<(), DecisionError>;
}
