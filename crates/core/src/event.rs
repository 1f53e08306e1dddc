//! Domain event system: progress reporting without coupling.
//!
//! The runner and the agent loop publish events as work completes; the CLI
//! (or a test) subscribes to observe progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A puzzle attempt reached its final outcome
    EpisodeFinished {
        task_id: String,
        solved: bool,
        episode_id: Option<String>,
        completed: usize,
        solved_so_far: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Feedback for an episode was sent (or failed to send)
    FeedbackSubmitted {
        episode_id: String,
        metric_name: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// A tool invocation was dispatched by the agent loop
    ToolDispatched {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The agent loop produced a final answer
    AgentAnswered {
        conversation_id: String,
        episode_id: Option<String>,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
