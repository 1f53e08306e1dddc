//! Shared test helpers for agent loop tests.

use rookery_core::decision::{DecisionClient, DecisionOutput, DecisionRequest, DecisionResponse, Feedback};
use rookery_core::episode::EpisodeId;
use rookery_core::error::DecisionError;
use rookery_core::message::ContentBlock;
use rookery_core::tool::ToolInvocation;
use std::sync::Mutex;

/// A mock client that returns a sequence of scripted responses.
///
/// Each call to `decide` returns the next response in the queue; once the
/// queue is down to its last entry, that entry repeats forever. Every request
/// is recorded for later inspection.
pub struct ScriptedClient {
    responses: Vec<Result<DecisionResponse, DecisionError>>,
    requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<DecisionResponse, DecisionError>>) -> Self {
        assert!(!responses.is_empty(), "ScriptedClient needs at least one response");
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A client that answers every request with the same response.
    pub fn repeating(response: DecisionResponse) -> Self {
        Self::new(vec![Ok(response)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DecisionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len().min(self.responses.len() - 1);
        requests.push(request);
        self.responses[index].clone()
    }

    async fn submit_feedback(&self, _feedback: Feedback) -> Result<(), DecisionError> {
        Ok(())
    }
}

/// A chat response carrying the given blocks.
pub fn chat_response(episode: &str, blocks: Vec<ContentBlock>) -> DecisionResponse {
    DecisionResponse {
        inference_id: None,
        episode: EpisodeId::new(episode),
        strategy: Some("baseline".into()),
        output: DecisionOutput::Chat(blocks),
    }
}

/// A tool-call block.
pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ContentBlock {
    ContentBlock::ToolCall(ToolInvocation::new(id, name, args))
}
