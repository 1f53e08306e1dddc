//! Puzzle tasks and move notation.
//!
//! A puzzle is a starting position plus the scripted line that solves it.
//! The first scripted move is the opponent's; the agent is whoever is to
//! move after it.

use rookery_core::error::SimulationError;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::Uci;
use shakmaty::{CastlingMode, Chess, Move, Position};
use std::path::Path;
use tracing::{debug, warn};

/// One chess puzzle, validated at construction and immutable afterwards.
#[derive(Debug, Clone)]
pub struct PuzzleTask {
    id: String,
    position: Chess,
    solution: Vec<Move>,
}

impl PuzzleTask {
    /// Build a task from a FEN and a space-separated UCI move list.
    ///
    /// The whole line is replayed, so an illegal or unparseable move is
    /// rejected here rather than halfway through an attempt.
    pub fn new(id: impl Into<String>, fen: &str, moves: &str) -> Result<Self, SimulationError> {
        let id = id.into();
        let invalid = |reason: String| SimulationError::InvalidTask {
            task_id: id.clone(),
            reason,
        };

        let position: Chess = fen
            .trim()
            .parse::<Fen>()
            .map_err(|e| invalid(format!("bad FEN: {e}")))?
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("illegal position: {e}")))?;

        let mut replay = position.clone();
        let mut solution = Vec::new();
        for notation in moves.split_whitespace() {
            let m = notation
                .parse::<Uci>()
                .map_err(|e| invalid(format!("bad move '{notation}': {e}")))?
                .to_move(&replay)
                .map_err(|e| invalid(format!("illegal move '{notation}': {e}")))?;
            replay.play_unchecked(&m);
            solution.push(m);
        }

        if solution.len() < 2 {
            return Err(invalid("needs an opening move and at least one reply".into()));
        }

        Ok(Self {
            id,
            position,
            solution,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position before the opening move.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// The scripted line, opening move first.
    pub fn solution(&self) -> &[Move] {
        &self.solution
    }
}

/// Resolve a move in UCI or SAN notation against `position`.
///
/// Both notations produce the same `Move`, so callers compare moves rather
/// than strings.
pub fn parse_move(position: &Chess, notation: &str) -> Result<Move, SimulationError> {
    let notation = notation.trim();
    let invalid = |reason: &str| SimulationError::InvalidMove {
        notation: notation.to_string(),
        reason: reason.to_string(),
    };

    if let Ok(uci) = notation.parse::<Uci>() {
        return uci.to_move(position).map_err(|_| invalid("illegal in this position"));
    }

    notation
        .parse::<SanPlus>()
        .map_err(|_| invalid("not UCI or SAN notation"))?
        .san
        .to_move(position)
        .map_err(|_| invalid("illegal or ambiguous in this position"))
}

/// Render a move the way the legal-move list does.
pub fn to_uci(m: &Move) -> String {
    m.to_uci(CastlingMode::Standard).to_string()
}

/// Load puzzles from a Lichess-style CSV export.
///
/// Requires a header row with `PuzzleId`, `FEN` and `Moves` columns; other
/// columns are ignored. Rows that fail validation are skipped with a warning.
pub fn load_puzzles(path: impl AsRef<Path>) -> rookery_core::Result<Vec<PuzzleTask>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let tasks = parse_puzzles(&content)?;
    debug!(path = %path.display(), count = tasks.len(), "Loaded puzzles");
    Ok(tasks)
}

fn parse_puzzles(content: &str) -> rookery_core::Result<Vec<PuzzleTask>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| invalid_file("file is empty".into()))?
        .split(',')
        .map(str::trim)
        .collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| invalid_file(format!("no '{name}' column")))
    };
    let (id_col, fen_col, moves_col) = (column("PuzzleId")?, column("FEN")?, column("Moves")?);

    let mut tasks = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        match PuzzleTask::new(field(id_col), field(fen_col), field(moves_col)) {
            Ok(task) => tasks.push(task),
            // Header is line 1
            Err(e) => warn!(line = line_no + 2, error = %e, "Skipping invalid puzzle"),
        }
    }
    Ok(tasks)
}

fn invalid_file(reason: String) -> SimulationError {
    SimulationError::InvalidPuzzleFile { reason }
}
