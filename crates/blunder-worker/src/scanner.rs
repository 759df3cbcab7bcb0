//! Blunder detection: walk a replayed move stream and flag moves the engine
//! scores badly for the side that played them.

use std::time::Duration;

use chess_core::position::{fen_of, position_from_fen};
use chess_core::PlayedMove;
use serde::{Deserialize, Serialize};
use shakmaty::Chess;
use tracing::{debug, info};

use crate::config::ScanSettings;
use crate::error::WorkerError;
use crate::evaluator::{Evaluator, Limit};

/// A flagged move and the position it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlunderRecord {
    /// 1-based half-move index in the game
    pub ply: usize,
    /// Position right after the blunder
    pub fen: String,
    #[serde(rename = "move")]
    pub uci: String,
    pub san: String,
    /// Centipawns from the mover's point of view
    pub score: i32,
}

impl BlunderRecord {
    pub fn snapshot(&self) -> Result<Chess, WorkerError> {
        Ok(position_from_fen(&self.fen)?)
    }

    /// One line of the flat blunder listing: `('<fen>', '<move>', <score>)`
    pub fn list_line(&self) -> String {
        format!("('{}', '{}', {})", self.fen, self.uci, self.score)
    }
}

pub struct BlunderScanner {
    time: Duration,
    threshold: i32,
}

impl BlunderScanner {
    pub fn new(settings: &ScanSettings) -> Self {
        Self {
            time: settings.time,
            threshold: settings.threshold,
        }
    }

    /// Evaluate the position after each move of `moves`, in order. The stream
    /// comes from [`filter_moves`](crate::move_filter::filter_moves) or, to
    /// scan both sides, [`replay_moves`](crate::move_filter::replay_moves).
    pub async fn scan<E: Evaluator>(
        &self,
        engine: &mut E,
        moves: &[PlayedMove],
    ) -> Result<Vec<BlunderRecord>, WorkerError> {
        let mut blunders = Vec::new();

        for played in moves {
            let fen = fen_of(&played.after);
            let eval = engine.analyze(&fen, Limit::time(self.time)).await?;

            let Some(score) = eval.mover_score() else {
                debug!(ply = played.ply, san = %played.san, mate = ?eval.mate, "No numeric score, not a blunder");
                continue;
            };

            if score <= self.threshold {
                info!(ply = played.ply, san = %played.san, score, "Blunder found");
                blunders.push(BlunderRecord {
                    ply: played.ply,
                    fen,
                    uci: played.uci.clone(),
                    san: played.san.clone(),
                    score,
                });
            }
        }

        Ok(blunders)
    }
}
