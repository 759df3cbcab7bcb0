//! Chess-core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChessError {
    #[error("Invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move {san:?} at ply {ply}")]
    IllegalMove { ply: usize, san: String },

    #[error("PGN read error: {0}")]
    Io(#[from] std::io::Error),
}
