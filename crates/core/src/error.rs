//! Error types for the Rookery domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Rookery operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote decision errors ---
    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    // --- Simulation errors ---
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    // --- Agent loop errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the remote decision service.
///
/// `Transport`, `Timeout` and `Api` form the transport class; a response that
/// arrived but lacks required fields is `MalformedResponse`. Neither class is
/// retried by the orchestrators.
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Gateway rejected request: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl DecisionError {
    /// Whether this error came from the network path rather than the payload.
    pub fn is_transport(&self) -> bool {
        !matches!(self, DecisionError::MalformedResponse(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    #[error("Invalid task {task_id}: {reason}")]
    InvalidTask { task_id: String, reason: String },

    #[error("Invalid puzzle file: {reason}")]
    InvalidPuzzleFile { reason: String },

    #[error("Invalid move '{notation}': {reason}")]
    InvalidMove { notation: String, reason: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Iteration budget exceeded: no answer after {max_iterations} requests")]
    BudgetExceeded { max_iterations: u32 },

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
