//! Position and move-code helpers over shakmaty.
//!
//! Every legality check in the workspace goes through [`legal_uci`] or a SAN
//! lookup; moves handed to [`after`] must already be legal.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

use crate::error::ChessError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Full FEN of a position. Two positions are considered equal iff these match.
pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

pub fn position_from_fen(fen: &str) -> Result<Chess, ChessError> {
    let parsed = fen.trim().parse::<Fen>().map_err(|e| ChessError::InvalidFen {
        fen: fen.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| ChessError::InvalidFen {
            fen: fen.to_string(),
            reason: e.to_string(),
        })
}

/// Canonical move code, e.g. `e2e4`, `e7e8q`, `e1g1`.
pub fn uci_of(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Parse a move code and return it only if it is legal in `pos`.
pub fn legal_uci(pos: &Chess, code: &str) -> Option<Move> {
    let uci_move: UciMove = code.parse().ok()?;
    uci_move.to_move(pos).ok()
}

/// Resolve a SAN token against `pos`, `None` if unparsable or illegal.
pub fn legal_san(pos: &Chess, san: &str) -> Option<Move> {
    let parsed: San = san.parse().ok()?;
    parsed.to_move(pos).ok()
}

/// The position after a legal move. `pos` is left untouched.
pub fn after(pos: &Chess, mv: &Move) -> Chess {
    let mut next = pos.clone();
    next.play_unchecked(*mv);
    next
}

/// SAN with check/mate suffix.
pub fn san_of(pos: &Chess, mv: &Move) -> String {
    let san = San::from_move(pos, *mv).to_string();
    let next = after(pos, mv);
    if next.is_checkmate() {
        format!("{san}#")
    } else if next.is_check() {
        format!("{san}+")
    } else {
        san
    }
}
