//! Built-in tool implementations for the Rookery agent loop.
//!
//! The default registry is the multi-hop question-answering toolset:
//! search and read Wikipedia, think out loud, and submit an answer.

pub mod answer;
pub mod think;
pub mod wikipedia;

use rookery_core::error::ToolError;
use rookery_core::tool::ToolRegistry;
use std::sync::Arc;

pub use answer::AnswerQuestionTool;
pub use think::ThinkTool;
pub use wikipedia::{LoadWikipediaPageTool, SearchWikipediaTool, WikipediaApi};

/// Create the default tool registry against the given MediaWiki API endpoint.
pub fn default_registry(wikipedia_url: &str) -> Result<ToolRegistry, ToolError> {
    let api = Arc::new(WikipediaApi::new(wikipedia_url)?);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ThinkTool));
    registry.register(Box::new(AnswerQuestionTool));
    registry.register(Box::new(SearchWikipediaTool::new(api.clone())));
    registry.register(Box::new(LoadWikipediaPageTool::new(api)));
    Ok(registry)
}
