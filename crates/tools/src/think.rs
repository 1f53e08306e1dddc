//! Think tool: a scratchpad for the model's intermediate reasoning.
//!
//! Calling it changes nothing. The registry still answers each call with an
//! empty result because some providers reject a follow-up turn that leaves a
//! tool call unanswered.

use async_trait::async_trait;
use rookery_core::error::ToolError;
use rookery_core::tool::{Tool, ToolKind};

pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "Think step by step about the question and the information gathered so far. \
         Use this to plan the next search or to check an answer before submitting it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "Your reasoning"
                }
            },
            "required": ["thought"]
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Informational
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ToolError> {
        Ok(String::new())
    }
}
