//! Tool trait and registry: what the agent loop can do besides talk.
//!
//! The remote model emits tool invocations; the registry resolves each one by
//! name and produces exactly one result keyed by the invocation's id. Two tool
//! kinds are special: informational tools (the model records reasoning, nothing
//! happens) and the terminal tool (the model is done and hands back an answer).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::ToolError;

/// Result text sent back for an invocation without a name or arguments.
pub const MALFORMED_INVOCATION_RESULT: &str =
    "ERROR: tool call is missing a valid name or arguments; please retry with both";

/// A tool invocation emitted by the remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlation id, echoed back on the result
    pub id: String,

    /// Tool name, absent when the model produced an unusable name
    #[serde(default)]
    pub name: Option<String>,

    /// Parsed arguments, absent when the model produced invalid JSON
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            arguments: Some(arguments),
        }
    }
}

/// The answer to one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The invocation id this result answers
    pub id: String,

    /// Name of the tool that was invoked
    pub name: String,

    /// Result text shown to the model
    pub result: String,

    /// Local marker for failed dispatches; not sent over the wire
    #[serde(skip)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(id: impl Into<String>, name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: result.into(),
            is_error: false,
        }
    }

    pub fn error(id: impl Into<String>, name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            result: result.into(),
            is_error: true,
        }
    }
}

/// How the registry treats a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Runs its handler and returns the handler's output
    Action,
    /// Records model reasoning only; answered with an empty result
    Informational,
    /// Ends the agent loop; the handler's output is the final answer
    Terminal,
}

/// A tool definition sent to the remote service so the model knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search_wikipedia").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    fn kind(&self) -> ToolKind {
        ToolKind::Action
    }

    /// Execute the tool and return the result text.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<String, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// What the agent loop should do with one dispatched invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Append this result to the pending tool-result turn
    Respond(ToolResult),
    /// Stop the loop with this answer
    Answer(String),
}

/// A registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name for a stable request body.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Resolve one invocation into either a result or a final answer.
    ///
    /// Never fails: unknown tools, malformed invocations and handler errors
    /// all become error results so the model can correct itself.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> Dispatch {
        let (name, arguments) = match (&invocation.name, &invocation.arguments) {
            (Some(name), Some(arguments)) if !name.is_empty() => (name, arguments),
            _ => {
                warn!(call_id = %invocation.id, "Tool call missing name or arguments");
                return Dispatch::Respond(ToolResult::error(
                    &invocation.id,
                    invocation.name.clone().unwrap_or_default(),
                    MALFORMED_INVOCATION_RESULT,
                ));
            }
        };

        let Some(tool) = self.tools.get(name) else {
            let err = ToolError::NotFound(name.clone());
            warn!(call_id = %invocation.id, tool = %name, "Unknown tool requested");
            return Dispatch::Respond(ToolResult::error(&invocation.id, name, format!("ERROR: {err}")));
        };

        match tool.kind() {
            ToolKind::Informational => {
                debug!(call_id = %invocation.id, tool = %name, "Informational tool call");
                Dispatch::Respond(ToolResult::ok(&invocation.id, name, ""))
            }
            ToolKind::Terminal => match tool.execute(arguments.clone()).await {
                Ok(answer) => Dispatch::Answer(answer),
                Err(e) => {
                    warn!(call_id = %invocation.id, tool = %name, error = %e, "Terminal tool rejected arguments");
                    Dispatch::Respond(ToolResult::error(&invocation.id, name, format!("ERROR: {e}")))
                }
            },
            ToolKind::Action => match tool.execute(arguments.clone()).await {
                Ok(output) => Dispatch::Respond(ToolResult::ok(&invocation.id, name, output)),
                Err(e) => {
                    warn!(call_id = %invocation.id, tool = %name, error = %e, "Tool execution failed");
                    Dispatch::Respond(ToolResult::error(&invocation.id, name, format!("ERROR: {e}")))
                }
            },
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
