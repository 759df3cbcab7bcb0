use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use blunder_worker::config::{EngineSettings, ScanSettings, SynthesisSettings, WorkerConfig};
use blunder_worker::{Evaluation, Evaluator, Limit, WorkerError};
use chess_core::position::{after, fen_of, legal_uci};
use shakmaty::Chess;

pub const PLAYER: &str = "timonix";

/// Deterministic engine stand-in: answers by FEN, falls back to a fixed
/// evaluation, and can be told to stop responding after N queries.
#[derive(Default)]
pub struct ScriptedEvaluator {
    answers: HashMap<String, Evaluation>,
    pub fallback: Evaluation,
    pub queries: Vec<(String, Limit)>,
    pub dies_after: Option<usize>,
}

impl ScriptedEvaluator {
    pub fn new(fallback_score: i32) -> Self {
        Self {
            fallback: Evaluation {
                score: Some(fallback_score),
                mate: None,
                pv: Vec::new(),
            },
            ..Self::default()
        }
    }

    /// Score is relative to the side to move in `fen`.
    pub fn answer(&mut self, fen: &str, score: Option<i32>, pv: &[&str]) {
        self.answers.insert(
            fen.to_string(),
            Evaluation {
                score,
                mate: if score.is_none() { Some(0) } else { None },
                pv: pv.iter().map(|m| m.to_string()).collect(),
            },
        );
    }
}

impl Evaluator for ScriptedEvaluator {
    async fn analyze(&mut self, fen: &str, limit: Limit) -> Result<Evaluation, WorkerError> {
        if self.dies_after.is_some_and(|n| self.queries.len() >= n) {
            return Err(WorkerError::EvaluatorUnavailable("no response within 5010 ms".into()));
        }
        self.queries.push((fen.to_string(), limit));
        Ok(self
            .answers
            .get(fen)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// Position reached by playing UCI `codes` from `start`.
pub fn play(start: &Chess, codes: &[&str]) -> Chess {
    codes.iter().fold(start.clone(), |pos, code| {
        let mv = legal_uci(&pos, code).unwrap_or_else(|| panic!("illegal test move {code}"));
        after(&pos, &mv)
    })
}

pub fn fen_after(codes: &[&str]) -> String {
    fen_of(&play(&Chess::default(), codes))
}

pub fn config(output_dir: &Path) -> WorkerConfig {
    WorkerConfig {
        player: PLAYER.to_string(),
        pgn_path: output_dir.join("input.pgn"),
        output_dir: output_dir.to_path_buf(),
        scan_all_moves: false,
        engine: EngineSettings {
            path: "stockfish".to_string(),
            threads: 1,
            hash_mb: 16,
            timeout_grace: Duration::from_secs(5),
            restarts: 0,
        },
        scan: ScanSettings {
            time: Duration::from_millis(10),
            threshold: -150,
        },
        synthesis: SynthesisSettings {
            root_time: Duration::from_secs(3),
            expand_time: Duration::from_millis(10),
            search_depth: 5,
            max_ply: 5,
            max_suggestions: 5,
        },
    }
}
