//! Blunder review worker
//!
//! Finds a player's blunders in a PGN file with a UCI engine and writes, for
//! each one, a short tree of engine-recommended improving lines.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod move_filter;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod stockfish;
pub mod synthesis;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use evaluator::{Evaluation, Evaluator, Limit};
pub use scanner::{BlunderRecord, BlunderScanner};
pub use synthesis::VariationSynthesizer;
