//! Game records, PGN reading/writing and position helpers shared by the
//! blunder worker.

pub mod error;
pub mod game_data;
pub mod pgn;
pub mod position;
pub mod variation;

pub use error::ChessError;
pub use game_data::{GameMetadata, GameRecord, PlayedMove};
pub use variation::VariationNode;
