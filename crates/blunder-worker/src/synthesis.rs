//! Builds a tree of engine-recommended continuations for a flagged position.
//!
//! The root is the first legal move of a long root query. Below it, each
//! node asks the engine for one principal variation and keeps only the first
//! candidate that is legal in the node's own position, so a tree is a single
//! deepening line that stops early when no candidate is legal.

use std::time::Duration;

use chess_core::position::{after, fen_of, legal_uci};
use chess_core::VariationNode;
use shakmaty::{Chess, Move};
use tracing::debug;

use crate::config::SynthesisSettings;
use crate::error::WorkerError;
use crate::evaluator::{Evaluator, Limit};
use crate::scanner::BlunderRecord;

pub struct VariationSynthesizer {
    root_time: Duration,
    expand_time: Duration,
    search_depth: u32,
    max_ply: usize,
    max_suggestions: usize,
}

impl VariationSynthesizer {
    pub fn new(settings: &SynthesisSettings) -> Self {
        Self {
            root_time: settings.root_time,
            expand_time: settings.expand_time,
            search_depth: settings.search_depth,
            max_ply: settings.max_ply,
            max_suggestions: settings.max_suggestions,
        }
    }

    /// Tree rooted at the corrective move for `blunder`, at most `max_ply` deep.
    pub async fn synthesize<E: Evaluator>(
        &self,
        engine: &mut E,
        blunder: &BlunderRecord,
    ) -> Result<VariationNode, WorkerError> {
        let snapshot = blunder.snapshot()?;
        let corrective = self.corrective_move(engine, &snapshot, &blunder.fen).await?;

        let mut root = VariationNode::new(corrective);
        let next = after(&snapshot, &root.mv);
        root.children = self
            .expand(engine, &next, self.max_ply.saturating_sub(1))
            .await?;

        debug!(
            blunder = %blunder.uci,
            root = %root.uci,
            depth = root.depth(),
            nodes = root.node_count(),
            "Variation tree built"
        );
        Ok(root)
    }

    async fn corrective_move<E: Evaluator>(
        &self,
        engine: &mut E,
        pos: &Chess,
        fen: &str,
    ) -> Result<Move, WorkerError> {
        let eval = engine.analyze(fen, Limit::time(self.root_time)).await?;
        eval.pv
            .iter()
            .find_map(|code| legal_uci(pos, code))
            .ok_or_else(|| WorkerError::NoCorrectiveMoveFound {
                fen: fen.to_string(),
            })
    }

    /// Children of the node whose position is `pos`, `remaining` plies deep at most.
    async fn expand<E: Evaluator>(
        &self,
        engine: &mut E,
        pos: &Chess,
        remaining: usize,
    ) -> Result<Vec<VariationNode>, WorkerError> {
        if remaining == 0 {
            return Ok(Vec::new());
        }

        let limit = Limit::time_and_depth(self.expand_time, self.search_depth);
        let eval = engine.analyze(&fen_of(pos), limit).await?;

        let candidate = eval.pv.iter().take(self.max_suggestions).find_map(|code| {
            let mv = legal_uci(pos, code);
            if mv.is_none() {
                debug!(code = %code, "Discarding illegal suggestion");
            }
            mv
        });
        let Some(mv) = candidate else {
            return Ok(Vec::new());
        };

        let mut child = VariationNode::new(mv);
        // The child plays on its own copy of the position.
        let next = after(pos, &child.mv);
        child.children = Box::pin(self.expand(engine, &next, remaining - 1)).await?;
        Ok(vec![child])
    }
}
