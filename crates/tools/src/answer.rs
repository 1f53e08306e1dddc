//! Answer tool: the terminal tool that ends the agent loop.

use async_trait::async_trait;
use rookery_core::error::ToolError;
use rookery_core::tool::{Tool, ToolKind};

pub struct AnswerQuestionTool;

#[async_trait]
impl Tool for AnswerQuestionTool {
    fn name(&self) -> &str {
        "answer_question"
    }

    fn description(&self) -> &str {
        "Submit the final answer to the question. Call this exactly once, when you are confident."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "answer": {
                    "type": "string",
                    "description": "The final answer, as short as possible"
                }
            },
            "required": ["answer"]
        })
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Terminal
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        arguments["answer"]
            .as_str()
            .map(|a| a.trim().to_string())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'answer' argument".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_trimmed_answer() {
        let out = AnswerQuestionTool
            .execute(serde_json::json!({"answer": "  Paris \n"}))
            .await
            .unwrap();
        assert_eq!(out, "Paris");
    }

    #[tokio::test]
    async fn missing_answer_is_invalid() {
        let err = AnswerQuestionTool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
