//! Position evaluator interface

use std::time::Duration;

use crate::error::WorkerError;

/// Search budget for one query. Either bound may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limit {
    pub time: Option<Duration>,
    pub depth: Option<u32>,
}

impl Limit {
    pub fn time(time: Duration) -> Self {
        Self {
            time: Some(time),
            depth: None,
        }
    }

    pub fn time_and_depth(time: Duration, depth: u32) -> Self {
        Self {
            time: Some(time),
            depth: Some(depth),
        }
    }
}

/// Result of analysing one position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Centipawn score relative to the side to move; `None` for mate scores
    /// and positions the engine could not score
    pub score: Option<i32>,
    /// Mate in N (positive = side to move mates)
    pub mate: Option<i32>,
    /// Principal variation in UCI notation. Not guaranteed to be legal.
    pub pv: Vec<String>,
}

impl Evaluation {
    /// Score from the point of view of the side that just moved into the
    /// analysed position.
    pub fn mover_score(&self) -> Option<i32> {
        self.score.map(|cp| -cp)
    }
}

/// Something that can analyse a position. Takes `&mut self`: a handle serves
/// one query at a time.
#[allow(async_fn_in_trait)]
pub trait Evaluator {
    async fn analyze(&mut self, fen: &str, limit: Limit) -> Result<Evaluation, WorkerError>;
}
