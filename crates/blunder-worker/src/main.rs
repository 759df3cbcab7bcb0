//! Blunder review worker
//!
//! Reads a PGN file, finds the subject player's blunders with Stockfish and
//! writes a blunder list plus one variation PGN per blunder.
//!
//! Usage: blunder-worker [--pgn <path>] [--player <name>] [--out <dir>]
//! (remaining settings come from the environment, see `config.rs`)

use blunder_worker::config::{CliOverrides, WorkerConfig};
use blunder_worker::pipeline;
use blunder_worker::report::ReportWriter;
use blunder_worker::stockfish::StockfishEngine;
use chess_core::pgn;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let overrides = CliOverrides::from_args(std::env::args().skip(1));
    let config = WorkerConfig::load(&overrides)?;
    info!(
        player = %config.player,
        pgn = %config.pgn_path.display(),
        stockfish_path = %config.engine.path,
        threshold = config.scan.threshold,
        max_ply = config.synthesis.max_ply,
        search_depth = config.synthesis.search_depth,
        "Worker config loaded"
    );

    let games = pgn::read_games_from_path(&config.pgn_path)?;
    info!(games = games.len(), "Read game records");

    // One engine for the whole run; queries are strictly sequential.
    let mut engine = StockfishEngine::new(&config.engine).await?;
    let mut writer = ReportWriter::new(&config.output_dir, &config.player);

    let result = pipeline::run_batch(&mut engine, &config, &games, &mut writer).await;
    engine.quit().await;

    let summary = result?;
    println!(
        "{} games analysed, {} skipped, {} failed; {} blunders, {} variation files written",
        summary.games_analyzed,
        summary.games_skipped,
        summary.games_failed,
        summary.blunders,
        summary.trees_written
    );
    Ok(())
}
