//! A single puzzle attempt, played against the decision service.

use crate::fallback::{AgentAction, FallbackPolicy};
use crate::gate::AdmissionGate;
use crate::puzzle::{PuzzleTask, parse_move, to_uci};
use crate::runner::EpisodeOutcome;
use rand::rngs::StdRng;
use rookery_core::decision::{DecisionClient, DecisionInput, DecisionRequest};
use rookery_core::episode::EpisodeId;
use rookery_core::error::DecisionError;
use rookery_core::message::Turn;
use shakmaty::fen::Fen;
use shakmaty::{Chess, Color, EnPassantMode, Position};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where an attempt is. `Solved` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    AwaitingOpponentMove,
    AwaitingAgentMove,
    Solved,
    Failed,
}

impl AttemptState {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Solved | Self::Failed)
    }
}

/// Everything an attempt shares with the other attempts of a run.
pub struct AttemptContext {
    pub client: Arc<dyn DecisionClient>,
    pub gate: AdmissionGate,
    pub function_name: String,
    pub strategy: String,
    pub policy: FallbackPolicy,
}

/// Mutable bookkeeping for one attempt.
struct Attempt<'a> {
    task: &'a PuzzleTask,
    episode: Option<EpisodeId>,
    agent_moves: u32,
    fallbacks: u32,
}

impl Attempt<'_> {
    fn finish(self, state: AttemptState) -> EpisodeOutcome {
        debug!(
            task_id = %self.task.id(),
            state = ?state,
            agent_moves = self.agent_moves,
            fallbacks = self.fallbacks,
            "Attempt finished"
        );
        EpisodeOutcome {
            task_id: self.task.id().to_string(),
            solved: state == AttemptState::Solved,
            episode: self.episode,
            state,
            agent_moves: self.agent_moves,
            fallbacks: self.fallbacks,
        }
    }
}

/// Play one puzzle to a final state.
///
/// The opening move is applied without asking anyone; from then on the side
/// to move after it is the agent. Opponent replies come from the script.
/// Checkmate by the agent is a solve even if the script expected another move.
pub async fn play(task: &PuzzleTask, ctx: &AttemptContext, rng: &mut StdRng) -> EpisodeOutcome {
    let mut attempt = Attempt {
        task,
        episode: None,
        agent_moves: 0,
        fallbacks: 0,
    };

    let mut position = task.position().clone();
    let (opening, script) = match task.solution().split_first() {
        Some(split) => split,
        None => return attempt.finish(AttemptState::Solved),
    };
    position.play_unchecked(opening);
    let agent_color = position.turn();

    for expected in script {
        if position.is_game_over() {
            break;
        }

        if position.turn() != agent_color {
            debug!(task_id = %task.id(), state = ?AttemptState::AwaitingOpponentMove, "Playing scripted reply");
            position.play_unchecked(expected);
            continue;
        }

        let decided = request_move(ctx, task, &position, &mut attempt.episode).await;
        let chosen = match ctx.policy.resolve(decided, &position, rng) {
            AgentAction::Proposed(notation) => match parse_move(&position, &notation) {
                Ok(m) => m,
                Err(e) => {
                    warn!(task_id = %task.id(), error = %e, "Unusable move from decision service");
                    return attempt.finish(AttemptState::Failed);
                }
            },
            AgentAction::Fallback(m) => {
                attempt.fallbacks += 1;
                m
            }
            AgentAction::Forfeit => return attempt.finish(AttemptState::Failed),
        };

        attempt.agent_moves += 1;
        position.play_unchecked(&chosen);

        if position.is_checkmate() {
            return attempt.finish(AttemptState::Solved);
        }
        if chosen != *expected {
            debug!(
                task_id = %task.id(),
                played = %to_uci(&chosen),
                expected = %to_uci(expected),
                "Move differs from solution"
            );
            return attempt.finish(AttemptState::Failed);
        }
    }

    attempt.finish(AttemptState::Solved)
}

/// Ask for the agent's move, holding a gate slot for the call only.
async fn request_move(
    ctx: &AttemptContext,
    task: &PuzzleTask,
    position: &Chess,
    episode: &mut Option<EpisodeId>,
) -> Result<String, DecisionError> {
    debug!(task_id = %task.id(), state = ?AttemptState::AwaitingAgentMove, "Requesting move");

    let request = DecisionRequest {
        function_name: ctx.function_name.clone(),
        strategy: ctx.strategy.clone(),
        episode: episode.clone(),
        input: DecisionInput::new(vec![Turn::user_arguments(board_arguments(position))]),
    };

    let response = {
        let Some(_permit) = ctx.gate.admit().await else {
            return Err(DecisionError::Transport("admission gate closed".into()));
        };
        ctx.client.decide(request).await
    };

    let response = response.inspect_err(|e| {
        warn!(task_id = %task.id(), error = %e, "Decision request failed");
    })?;
    *episode = Some(response.episode.clone());

    response.json_str("move").map(str::to_owned).inspect_err(|e| {
        warn!(task_id = %task.id(), episode_id = %response.episode, error = %e, "Decision had no move");
    })
}

/// Template arguments describing the board for the agent.
pub fn board_arguments(position: &Chess) -> serde_json::Value {
    let fen = Fen::from_position(position.clone(), EnPassantMode::Legal);
    let legal_moves: Vec<String> = position.legal_moves().iter().map(to_uci).collect();
    serde_json::json!({
        "board": fen.to_string(),
        "color": color_name(position.turn()),
        "legal_moves": legal_moves,
    })
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}
