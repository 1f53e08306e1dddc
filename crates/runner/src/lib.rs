//! # Rookery Runner
//!
//! Bounded-concurrency evaluation of chess puzzles against a decision
//! service. Each puzzle is played by its own task; every remote call passes
//! through one shared [`AdmissionGate`].

pub mod attempt;
pub mod fallback;
pub mod gate;
pub mod puzzle;
pub mod runner;

#[cfg(test)]
mod test_support;

pub use attempt::AttemptState;
pub use fallback::{AgentAction, FallbackPolicy};
pub use gate::AdmissionGate;
pub use puzzle::{PuzzleTask, load_puzzles, parse_move};
pub use runner::{EpisodeOutcome, EpisodeRunner, RunProgress, RunReport, RunnerSettings};
