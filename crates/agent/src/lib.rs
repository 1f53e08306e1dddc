//! The tool-calling agent loop.
//!
//! The agent follows a **request → dispatch → feed back** cycle:
//!
//! 1. **Send** the full conversation to the decision service
//! 2. **Dispatch** every tool call in the reply, in order
//! 3. **If the terminal tool was called**: return its payload as the answer
//! 4. **Otherwise**: append the tool results (or a nudge) and loop back to step 1
//!
//! The loop stops with an error once the iteration budget is spent.

pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentAnswer, AgentLoop, LoopState};
