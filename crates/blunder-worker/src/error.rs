//! Worker error types

use chess_core::ChessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid game record {game}: {reason}")]
    InvalidGameRecord { game: String, reason: String },

    #[error("Illegal move {san:?} at ply {ply} while replaying {game}")]
    IllegalMoveReplay { game: String, ply: usize, san: String },

    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("No legal corrective move found for position {fen}")]
    NoCorrectiveMoveFound { fen: String },

    #[error("Chess error: {0}")]
    Chess(#[from] ChessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    /// Whether the error aborts the whole batch. Per-game and per-blunder
    /// failures are logged and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            WorkerError::InvalidGameRecord { .. }
                | WorkerError::IllegalMoveReplay { .. }
                | WorkerError::NoCorrectiveMoveFound { .. }
        )
    }
}
