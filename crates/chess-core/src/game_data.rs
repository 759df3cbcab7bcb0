use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color, Move, Position};

use crate::error::ChessError;
use crate::position::{after, legal_san, position_from_fen, uci_of};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
    /// Starting position when the record carries a `FEN` header
    pub start_fen: Option<String>,
}

impl Default for GameMetadata {
    fn default() -> Self {
        Self {
            event: "?".to_string(),
            site: "?".to_string(),
            date: "????.??.??".to_string(),
            round: "?".to_string(),
            white: "?".to_string(),
            black: "?".to_string(),
            result: "*".to_string(),
            start_fen: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub metadata: GameMetadata,
    pub moves: Vec<String>, // SAN notation, main line only
}

/// One move of a replayed game, with the position it produced.
#[derive(Debug, Clone)]
pub struct PlayedMove {
    /// 1-based half-move index within the record
    pub ply: usize,
    pub mover: Color,
    pub san: String,
    pub uci: String,
    pub mv: Move,
    pub after: Chess,
}

impl GameRecord {
    /// The standard start, or the position given by the `FEN` header.
    pub fn start_position(&self) -> Result<Chess, ChessError> {
        match &self.metadata.start_fen {
            Some(fen) => position_from_fen(fen),
            None => Ok(Chess::default()),
        }
    }

    /// Which side `player` had in this game, matched exactly against the
    /// White/Black headers.
    pub fn side_of(&self, player: &str) -> Option<Color> {
        if self.metadata.white == player {
            Some(Color::White)
        } else if self.metadata.black == player {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.metadata.event, self.metadata.site)
    }

    /// Replay every recorded move over one owned position.
    pub fn replay(&self) -> Result<Vec<PlayedMove>, ChessError> {
        let mut pos = self.start_position()?;
        let mut played = Vec::with_capacity(self.moves.len());

        for (i, san) in self.moves.iter().enumerate() {
            let ply = i + 1;
            let mv = legal_san(&pos, san).ok_or_else(|| ChessError::IllegalMove {
                ply,
                san: san.clone(),
            })?;
            let mover = pos.turn();
            pos = after(&pos, &mv);
            played.push(PlayedMove {
                ply,
                mover,
                san: san.clone(),
                uci: uci_of(&mv),
                mv,
                after: pos.clone(),
            });
        }

        Ok(played)
    }
}
