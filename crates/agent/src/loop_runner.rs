//! The tool-calling agent loop implementation.

use chrono::Utc;
use rookery_core::decision::{DecisionClient, DecisionInput, DecisionRequest};
use rookery_core::episode::EpisodeId;
use rookery_core::error::AgentError;
use rookery_core::event::{DomainEvent, EventBus};
use rookery_core::message::{ContentBlock, Conversation, Turn};
use rookery_core::tool::{Dispatch, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sent when the model replies without calling any tool.
pub const CONTINUE_PROMPT: &str =
    "Continue working on the question with the available tools. Call `answer_question` once you have the final answer.";

/// Where a single `ask` invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Requesting,
    DispatchingTools,
    Answered,
    Aborted,
}

/// The final answer of an agent run.
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    /// Payload of the terminal tool
    pub answer: String,
    /// Episode the run was recorded under
    pub episode: Option<EpisodeId>,
    /// Number of requests sent
    pub iterations: u32,
    /// Full conversation, ending with the assistant turn that answered
    pub conversation: Conversation,
}

/// The agent loop: request, dispatch tools, repeat until answered or out of budget.
pub struct AgentLoop {
    /// The remote decision client
    client: Arc<dyn DecisionClient>,

    /// Remote function to call
    function_name: String,

    /// Strategy used for every request of a run
    strategy: String,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Maximum requests per run
    max_iterations: u32,

    /// Arguments for the function's system template
    system: Option<serde_json::Value>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        client: Arc<dyn DecisionClient>,
        function_name: impl Into<String>,
        strategy: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            client,
            function_name: function_name.into(),
            strategy: strategy.into(),
            tools,
            max_iterations: 20,
            system: None,
            event_bus,
        }
    }

    /// Set the maximum number of requests per run.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the system template arguments sent with every request.
    pub fn with_system(mut self, system: serde_json::Value) -> Self {
        self.system = Some(system);
        self
    }

    /// Answer a single question.
    pub async fn ask(&self, question: &str) -> Result<AgentAnswer, AgentError> {
        let mut conversation = Conversation::new();
        conversation.push(Turn::user_text(question));
        self.run(conversation).await
    }

    /// Drive an existing conversation until the terminal tool is called.
    ///
    /// Fails with `BudgetExceeded` after exactly `max_iterations` requests
    /// without an answer, and with `Decision` if a request itself fails.
    pub async fn run(&self, mut conversation: Conversation) -> Result<AgentAnswer, AgentError> {
        info!(
            conversation_id = %conversation.id,
            function = %self.function_name,
            strategy = %self.strategy,
            "Starting agent run"
        );

        let mut episode: Option<EpisodeId> = None;

        for iteration in 1..=self.max_iterations {
            debug!(
                conversation_id = %conversation.id,
                iteration,
                state = ?LoopState::Requesting,
                "Agent loop iteration"
            );

            let mut input = DecisionInput::new(conversation.turns().to_vec());
            input.system = self.system.clone();
            let request = DecisionRequest {
                function_name: self.function_name.clone(),
                strategy: self.strategy.clone(),
                episode: episode.clone(),
                input,
            };

            let response = self.client.decide(request).await.inspect_err(|e| {
                warn!(conversation_id = %conversation.id, iteration, error = %e, "Decision request failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("agent run {}", conversation.id),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            })?;

            // The most recent episode is authoritative
            episode = Some(response.episode.clone());
            let content = response.chat_content()?.to_vec();
            conversation.push(Turn::assistant(content.clone()));

            debug!(
                conversation_id = %conversation.id,
                iteration,
                state = ?LoopState::DispatchingTools,
                blocks = content.len(),
                "Dispatching tool calls"
            );

            let mut results = Vec::new();
            let mut saw_tool_call = false;

            for block in &content {
                match block {
                    ContentBlock::ToolCall(invocation) => {
                        saw_tool_call = true;
                        let start = std::time::Instant::now();
                        let dispatch = self.tools.dispatch(invocation).await;
                        let duration_ms = start.elapsed().as_millis() as u64;

                        self.event_bus.publish(DomainEvent::ToolDispatched {
                            tool_name: invocation.name.clone().unwrap_or_default(),
                            success: !matches!(&dispatch, Dispatch::Respond(r) if r.is_error),
                            duration_ms,
                            timestamp: Utc::now(),
                        });

                        match dispatch {
                            Dispatch::Answer(answer) => {
                                info!(
                                    conversation_id = %conversation.id,
                                    iteration,
                                    state = ?LoopState::Answered,
                                    "Agent produced final answer"
                                );
                                self.event_bus.publish(DomainEvent::AgentAnswered {
                                    conversation_id: conversation.id.to_string(),
                                    episode_id: episode.as_ref().map(|e| e.to_string()),
                                    iterations: iteration,
                                    timestamp: Utc::now(),
                                });
                                return Ok(AgentAnswer {
                                    answer,
                                    episode,
                                    iterations: iteration,
                                    conversation,
                                });
                            }
                            Dispatch::Respond(result) => results.push(result),
                        }
                    }
                    ContentBlock::Text { text } => {
                        debug!(conversation_id = %conversation.id, text = %text, "Assistant text");
                    }
                    other => {
                        debug!(conversation_id = %conversation.id, block = ?other, "Ignoring content block");
                    }
                }
            }

            if saw_tool_call {
                conversation.push(Turn::tool_results(results));
            } else {
                conversation.push(Turn::user_text(CONTINUE_PROMPT));
            }
        }

        warn!(
            conversation_id = %conversation.id,
            max_iterations = self.max_iterations,
            state = ?LoopState::Aborted,
            "Iteration budget exhausted without an answer"
        );
        Err(AgentError::BudgetExceeded {
            max_iterations: self.max_iterations,
        })
    }
}
