//! Puzzle fixtures and an instrumented decision client for runner tests.

use crate::attempt::board_arguments;
use crate::puzzle::{PuzzleTask, to_uci};
use rookery_core::decision::{
    DecisionClient, DecisionOutput, DecisionRequest, DecisionResponse, Feedback,
};
use rookery_core::episode::EpisodeId;
use rookery_core::error::DecisionError;
use rookery_core::message::ContentBlock;
use shakmaty::Position;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Back-rank mate: black opens with Kh8, white mates with Rd8.
pub const MATE_FEN: &str = "6k1/5ppp/8/8/8/8/5PPP/3R2K1 b - - 0 1";
pub const MATE_MOVES: &str = "g8h8 d1d8";

/// A quiet line from the start position: black answers twice.
pub const TWO_MOVE_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const TWO_MOVE_MOVES: &str = "e2e4 e7e5 g1f3 b8c6";

/// Same back rank with a second rook: Re8 mates as well as Rd8.
pub const TWO_MATES_FEN: &str = "6k1/5ppp/8/8/8/8/5PPP/3RR1K1 b - - 0 1";

/// Scholar's mate from the start position. The agent plays black and the
/// line ends with white's mating move.
pub const SCHOLARS_MATE_FEN: &str = TWO_MOVE_FEN;
pub const SCHOLARS_MATE_MOVES: &str = "e2e4 e7e5 f1c4 b8c6 d1h5 g8f6 h5f7";

type Answer = Box<dyn Fn(&DecisionRequest) -> Result<Option<String>, DecisionError> + Send + Sync>;

/// A decision client with scripted answers and call accounting.
///
/// `Ok(Some(m))` answers with move `m`, `Ok(None)` with JSON output that has
/// no `move` field.
pub struct MockClient {
    answer: Answer,
    delay: Option<Duration>,
    fail_feedback: bool,
    next_episode: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<DecisionRequest>>,
    feedback: Mutex<Vec<Feedback>>,
}

impl MockClient {
    fn new(answer: Answer) -> Self {
        Self {
            answer,
            delay: None,
            fail_feedback: false,
            next_episode: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
        }
    }

    /// Always plays the solution's next move.
    pub fn oracle(tasks: &[PuzzleTask]) -> Self {
        let mut book = HashMap::new();
        for task in tasks {
            let mut position = task.position().clone();
            let (opening, rest) = task.solution().split_first().unwrap();
            position.play_unchecked(opening);
            let agent = position.turn();
            for m in rest {
                if position.turn() == agent {
                    book.insert(board_arguments(&position)["board"].to_string(), to_uci(m));
                }
                position.play_unchecked(m);
            }
        }

        Self::new(Box::new(move |request| {
            let board = board_of(request);
            Ok(Some(book.get(&board).cloned().unwrap_or_else(|| "0000".into())))
        }))
    }

    /// Always answers with the same notation.
    pub fn fixed(notation: &str) -> Self {
        let notation = notation.to_string();
        Self::new(Box::new(move |_| Ok(Some(notation.clone()))))
    }

    /// Every decision fails with a transport error.
    pub fn failing() -> Self {
        Self::new(Box::new(|_| Err(DecisionError::Transport("connection refused".into()))))
    }

    /// Every decision returns JSON without a move.
    pub fn malformed() -> Self {
        Self::new(Box::new(|_| Ok(None)))
    }

    /// Hold each decision for `delay` so calls overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failing_feedback(mut self) -> Self {
        self.fail_feedback = true;
        self
    }

    pub fn decide_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn feedback(&self) -> Vec<Feedback> {
        self.feedback.lock().unwrap().clone()
    }
}

fn board_of(request: &DecisionRequest) -> String {
    request
        .input
        .messages
        .first()
        .and_then(|turn| turn.content.first())
        .and_then(|block| match block {
            ContentBlock::Arguments { value } => Some(value["board"].to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl DecisionClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn decide(&self, request: DecisionRequest) -> Result<DecisionResponse, DecisionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let answer = (self.answer)(&request);
        let episode = request.episode.clone().unwrap_or_else(|| {
            EpisodeId::new(format!("ep-{}", self.next_episode.fetch_add(1, Ordering::SeqCst)))
        });
        self.requests.lock().unwrap().push(request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let parsed = match answer? {
            Some(m) => serde_json::json!({ "move": m }),
            None => serde_json::json!({ "thinking": "hmm" }),
        };
        Ok(DecisionResponse {
            inference_id: None,
            episode,
            strategy: Some("baseline".into()),
            output: DecisionOutput::Json {
                raw: parsed.to_string(),
                parsed: Some(parsed),
            },
        })
    }

    async fn submit_feedback(&self, feedback: Feedback) -> Result<(), DecisionError> {
        self.feedback.lock().unwrap().push(feedback);
        if self.fail_feedback {
            return Err(DecisionError::Api {
                status_code: 500,
                message: "feedback store down".into(),
            });
        }
        Ok(())
    }
}
