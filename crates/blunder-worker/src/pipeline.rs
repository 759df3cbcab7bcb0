//! Batch driver: filter, scan, synthesize and write reports, game by game.

use chess_core::GameRecord;
use serde::Serialize;
use shakmaty::Color;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::evaluator::Evaluator;
use crate::move_filter::{filter_moves, replay_moves};
use crate::report::{blunder_keys, BlunderEntry, GameReport, ReportWriter};
use crate::scanner::BlunderScanner;
use crate::synthesis::VariationSynthesizer;

/// Counts for the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub games_analyzed: usize,
    /// Games the subject player did not take part in
    pub games_skipped: usize,
    /// Games whose record could not be replayed
    pub games_failed: usize,
    pub blunders: usize,
    pub trees_written: usize,
    pub trees_missing: usize,
}

/// Analyse `games` in order with one engine. Per-game and per-blunder
/// failures are logged and skipped; engine and I/O failures abort the run,
/// leaving reports of earlier games in place.
pub async fn run_batch<E: Evaluator>(
    engine: &mut E,
    config: &WorkerConfig,
    games: &[GameRecord],
    writer: &mut ReportWriter,
) -> Result<BatchSummary, WorkerError> {
    let scanner = BlunderScanner::new(&config.scan);
    let synthesizer = VariationSynthesizer::new(&config.synthesis);
    let mut summary = BatchSummary::default();

    for game in games {
        let Some(side) = game.side_of(&config.player) else {
            debug!(game = %game.label(), "Subject player not in game, skipping");
            summary.games_skipped += 1;
            continue;
        };

        let result = analyze_game(engine, &scanner, &synthesizer, config, game, side, writer).await;
        match result {
            Ok(report) => {
                summary.games_analyzed += 1;
                summary.blunders += report.blunders.len();
                for entry in &report.blunders {
                    if entry.variation_file.is_some() {
                        summary.trees_written += 1;
                    } else {
                        summary.trees_missing += 1;
                    }
                }
            }
            Err(e) if !e.is_fatal() => {
                warn!(game = %game.label(), error = %e, "Skipping game");
                summary.games_failed += 1;
            }
            Err(e) => {
                error!(game = %game.label(), error = %e, "Aborting run");
                return Err(e);
            }
        }
    }

    info!(
        analyzed = summary.games_analyzed,
        skipped = summary.games_skipped,
        failed = summary.games_failed,
        blunders = summary.blunders,
        trees = summary.trees_written,
        "Batch complete"
    );
    Ok(summary)
}

async fn analyze_game<E: Evaluator>(
    engine: &mut E,
    scanner: &BlunderScanner,
    synthesizer: &VariationSynthesizer,
    config: &WorkerConfig,
    game: &GameRecord,
    side: Color,
    writer: &mut ReportWriter,
) -> Result<GameReport, WorkerError> {
    let label = game.label();
    let moves = if config.scan_all_moves {
        replay_moves(game)?
    } else {
        filter_moves(game, side)?
    };
    info!(game = %label, side = color_name(side), moves = moves.len(), "Current game");

    let blunders = scanner.scan(engine, &moves).await?;

    // Nothing is written for a game until its scan has finished.
    let output = writer.open_game(game)?;
    output.write_blunder_list(&blunders)?;

    let keys = blunder_keys(&blunders);
    let total = blunders.len();
    let mut entries = Vec::with_capacity(total);

    for (i, (blunder, key)) in blunders.iter().zip(&keys).enumerate() {
        let entry = match synthesizer.synthesize(engine, blunder).await {
            Ok(tree) => {
                let path = output.write_variation(blunder, key, &tree)?;
                info!(
                    blunder = %key,
                    progress = %format!("{}/{}", i + 1, total),
                    path = %path.display(),
                    "Wrote moves for blunder"
                );
                BlunderEntry {
                    blunder: blunder.clone(),
                    variation_file: Some(format!("{key}.pgn")),
                    variation_depth: Some(tree.depth()),
                    error: None,
                }
            }
            Err(e) if !e.is_fatal() => {
                warn!(blunder = %key, error = %e, "No variation tree for blunder");
                BlunderEntry {
                    blunder: blunder.clone(),
                    variation_file: None,
                    variation_depth: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => return Err(e),
        };
        entries.push(entry);
    }

    let report = GameReport {
        event: game.metadata.event.clone(),
        site: game.metadata.site.clone(),
        white: game.metadata.white.clone(),
        black: game.metadata.black.clone(),
        subject: config.player.clone(),
        side: color_name(side).to_string(),
        blunders: entries,
    };
    output.write_summary(&report)?;
    Ok(report)
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}
