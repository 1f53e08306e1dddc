//! Gateway client implementation.
//!
//! Talks to an inference gateway that exposes:
//! - `POST /inference`: run a named function under a named variant (strategy),
//!   optionally continuing an episode
//! - `POST /feedback`: attach a metric value to an episode
//!
//! One attempt per call. Timeouts and connection failures surface as transport
//! errors; bodies missing required fields surface as malformed responses.

use async_trait::async_trait;
use rookery_core::decision::*;
use rookery_core::episode::EpisodeId;
use rookery_core::error::DecisionError;
use rookery_core::message::{ContentBlock, Role, Turn};
use rookery_core::tool::ToolInvocation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A decision client backed by an HTTP inference gateway.
pub struct GatewayClient {
    name: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DecisionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DecisionError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: "gateway".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    /// Build a client from the `[gateway]` config section.
    pub fn from_config(config: &rookery_config::GatewayConfig) -> Result<Self, DecisionError> {
        Self::new(&config.url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> DecisionError {
        if e.is_timeout() {
            DecisionError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            DecisionError::Transport(e.to_string())
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, DecisionError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, path, "Gateway returned error");
            return Err(DecisionError::Api {
                status_code: status.as_u16(),
                message: error_body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl DecisionClient for GatewayClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError> {
        debug!(
            function = %request.function_name,
            strategy = %request.strategy,
            episode_id = ?request.episode.as_ref().map(EpisodeId::as_str),
            "Sending inference request"
        );

        let body = ApiInferenceRequest {
            function_name: &request.function_name,
            variant_name: &request.strategy,
            episode_id: request.episode.as_ref().map(EpisodeId::as_str),
            input: to_api_input(&request.input),
        };

        let response = self.post("/inference", &body).await?;
        let api_response: ApiInferenceResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::MalformedResponse(format!("failed to decode body: {e}")))?;

        decode_response(api_response)
    }

    async fn submit_feedback(&self, feedback: Feedback) -> Result<(), DecisionError> {
        let body = ApiFeedbackRequest {
            metric_name: &feedback.metric_name,
            episode_id: feedback.episode.as_str(),
            value: feedback.value,
        };
        self.post("/feedback", &body).await?;
        debug!(episode_id = %feedback.episode, metric = %feedback.metric_name, "Feedback accepted");
        Ok(())
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ApiInferenceRequest<'a> {
    function_name: &'a str,
    variant_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode_id: Option<&'a str>,
    input: ApiInput,
}

#[derive(Debug, Serialize)]
struct ApiInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<serde_json::Value>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct ApiFeedbackRequest<'a> {
    metric_name: &'a str,
    episode_id: &'a str,
    value: FeedbackValue,
}

#[derive(Debug, Deserialize)]
struct ApiInferenceResponse {
    #[serde(default)]
    inference_id: Option<String>,
    #[serde(default)]
    episode_id: Option<String>,
    #[serde(default)]
    variant_name: Option<String>,
    #[serde(default)]
    content: Option<Vec<ApiResponseBlock>>,
    #[serde(default)]
    output: Option<ApiJsonOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolCall {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        arguments: Option<serde_json::Value>,
        #[serde(default)]
        raw_arguments: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiJsonOutput {
    #[serde(default)]
    raw: String,
    #[serde(default)]
    parsed: Option<serde_json::Value>,
}

/// Convert our turns to the gateway's input format.
fn to_api_input(input: &DecisionInput) -> ApiInput {
    ApiInput {
        system: input.system.clone(),
        messages: input
            .messages
            .iter()
            .map(|turn: &Turn| ApiMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: turn.content.iter().map(to_api_block).collect(),
            })
            .collect(),
    }
}

fn to_api_block(block: &ContentBlock) -> serde_json::Value {
    match block {
        ContentBlock::Text { text } => serde_json::json!({ "type": "text", "text": text }),
        ContentBlock::Arguments { value } => serde_json::json!({ "type": "text", "arguments": value }),
        ContentBlock::ToolCall(call) => serde_json::json!({
            "type": "tool_call",
            "id": call.id,
            "name": call.name.clone().unwrap_or_default(),
            "arguments": call
                .arguments
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_default(),
        }),
        ContentBlock::ToolResult(result) => serde_json::json!({
            "type": "tool_result",
            "id": result.id,
            "name": result.name,
            "result": result.result,
        }),
    }
}

/// Convert a gateway response into a `DecisionResponse`.
fn decode_response(api: ApiInferenceResponse) -> Result<DecisionResponse, DecisionError> {
    let episode = api
        .episode_id
        .filter(|id| !id.is_empty())
        .map(EpisodeId::new)
        .ok_or_else(|| DecisionError::MalformedResponse("response has no episode_id".into()))?;

    let output = match (api.content, api.output) {
        (Some(blocks), _) => DecisionOutput::Chat(blocks.into_iter().filter_map(from_api_block).collect()),
        (None, Some(out)) => DecisionOutput::Json {
            raw: out.raw,
            parsed: out.parsed,
        },
        (None, None) => {
            return Err(DecisionError::MalformedResponse(
                "response has neither content nor output".into(),
            ));
        }
    };

    Ok(DecisionResponse {
        inference_id: api.inference_id,
        episode,
        strategy: api.variant_name,
        output,
    })
}

fn from_api_block(block: ApiResponseBlock) -> Option<ContentBlock> {
    match block {
        ApiResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
        ApiResponseBlock::ToolCall {
            id,
            name,
            arguments,
            raw_arguments,
        } => {
            // Fall back to the raw text when the gateway could not validate it
            let arguments = arguments.filter(|a| a.is_object()).or_else(|| {
                raw_arguments
                    .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
                    .filter(|a| a.is_object())
            });
            Some(ContentBlock::ToolCall(ToolInvocation { id, name, arguments }))
        }
        ApiResponseBlock::Unknown => None,
    }
}
