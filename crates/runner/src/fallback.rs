//! What to play when the decision service cannot supply a move.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rookery_config::FallbackMode;
use rookery_core::error::DecisionError;
use shakmaty::{Chess, Move, Position};
use tracing::debug;

/// The agent's move for one turn, before it is checked against the script.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    /// Notation returned by the decision service, not yet parsed
    Proposed(String),
    /// A locally chosen substitute
    Fallback(Move),
    /// Give up on the attempt
    Forfeit,
}

/// Maps a failed decision to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Play a uniformly random legal move
    #[default]
    RandomLegal,
    /// Treat the failure like a wrong move
    Forfeit,
}

impl From<FallbackMode> for FallbackPolicy {
    fn from(mode: FallbackMode) -> Self {
        match mode {
            FallbackMode::RandomLegal => Self::RandomLegal,
            FallbackMode::Forfeit => Self::Forfeit,
        }
    }
}

impl FallbackPolicy {
    /// Turn the result of a decision into the action to take.
    pub fn resolve(
        &self,
        decided: Result<String, DecisionError>,
        position: &Chess,
        rng: &mut StdRng,
    ) -> AgentAction {
        let error = match decided {
            Ok(notation) => return AgentAction::Proposed(notation),
            Err(e) => e,
        };

        match self {
            Self::RandomLegal => match position.legal_moves().choose(rng) {
                Some(m) => {
                    debug!(error = %error, "Substituting random legal move");
                    AgentAction::Fallback(m.clone())
                }
                None => AgentAction::Forfeit,
            },
            Self::Forfeit => AgentAction::Forfeit,
        }
    }
}

/// RNG for one task's fallback moves.
///
/// With a seed, task `index` always gets the same stream.
pub fn task_rng(seed: Option<u64>, index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_os_rng(),
    }
}
