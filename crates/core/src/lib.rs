//! # Rookery Core
//!
//! Domain types, traits, and error definitions shared by the Rookery puzzle
//! harness and tool-calling agent loop.
//!
//! Every remote or pluggable piece (the decision service, tools) is a trait
//! here. Implementations live in their own crates, and tests swap in scripted
//! doubles.

pub mod decision;
pub mod episode;
pub mod error;
pub mod event;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use decision::{
    DecisionClient, DecisionInput, DecisionOutput, DecisionRequest, DecisionResponse, Feedback,
    FeedbackValue,
};
pub use episode::EpisodeId;
pub use error::{AgentError, DecisionError, Error, Result, SimulationError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{ContentBlock, Conversation, ConversationId, Role, Turn};
pub use tool::{Dispatch, Tool, ToolDefinition, ToolInvocation, ToolKind, ToolRegistry, ToolResult};
