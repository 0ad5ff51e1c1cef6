use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::difficulty::Difficulty;
use crate::game::GameId;
use crate::resolver::EndReason;

/// Final result of a finished session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    pub game: GameId,
    pub score: u32,
    pub difficulty: Difficulty,
    pub reason: EndReason,
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
}

/// Persistence collaborator; called once per finished session.
///
/// Fire-and-forget: a recorder that fails must handle it itself, the session
/// never looks at the outcome.
pub trait ResultRecorder {
    fn record_game_result(&mut self, result: &GameResult);
}

impl<F: FnMut(&GameResult)> ResultRecorder for F {
    fn record_game_result(&mut self, result: &GameResult) {
        self(result)
    }
}

/// Stand-in for the score database: logs the result and drops it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecorder;

impl ResultRecorder for LogRecorder {
    fn record_game_result(&mut self, result: &GameResult) {
        tracing::info!(
            game = %result.game,
            score = result.score,
            difficulty = %result.difficulty,
            reason = %result.reason,
            "game result (not persisted)"
        );
    }
}
