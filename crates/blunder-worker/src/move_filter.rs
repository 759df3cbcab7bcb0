//! Turns a game record into the move stream the scanner evaluates.

use chess_core::{ChessError, GameRecord, PlayedMove};
use shakmaty::Color;

use crate::error::WorkerError;

/// The moves played by `side`, in game order. Every move of both sides is
/// replayed so side-to-move stays correct even when the game starts from a
/// FEN with black to move.
pub fn filter_moves(record: &GameRecord, side: Color) -> Result<Vec<PlayedMove>, WorkerError> {
    let played = record
        .replay()
        .map_err(|e| WorkerError::InvalidGameRecord {
            game: record.label(),
            reason: e.to_string(),
        })?;
    Ok(played.into_iter().filter(|m| m.mover == side).collect())
}

/// Every move of the game, both sides, in order.
pub fn replay_moves(record: &GameRecord) -> Result<Vec<PlayedMove>, WorkerError> {
    record.replay().map_err(|e| match e {
        ChessError::IllegalMove { ply, san } => WorkerError::IllegalMoveReplay {
            game: record.label(),
            ply,
            san,
        },
        other => WorkerError::InvalidGameRecord {
            game: record.label(),
            reason: other.to_string(),
        },
    })
}
