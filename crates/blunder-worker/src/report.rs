//! Report writer: blunder listings, variation PGNs and a JSON summary per game
//!
//! Layout: `<root>/<player>'s blunders/<event>/{blunder_list.txt, <move>.pgn, summary.json}`.
//! Files are written next to their target and renamed into place, so a run
//! that aborts never leaves a half-written file behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chess_core::pgn::write_variation_pgn;
use chess_core::{GameMetadata, GameRecord, VariationNode};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::WorkerError;
use crate::scanner::BlunderRecord;

pub const BLUNDER_LIST_FILE: &str = "blunder_list.txt";
pub const SUMMARY_FILE: &str = "summary.json";

/// Per-game JSON summary
#[derive(Debug, Clone, Serialize)]
pub struct GameReport {
    pub event: String,
    pub site: String,
    pub white: String,
    pub black: String,
    pub subject: String,
    pub side: String,
    pub blunders: Vec<BlunderEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlunderEntry {
    #[serde(flatten)]
    pub blunder: BlunderRecord,
    /// File name of the variation PGN, if one was written
    pub variation_file: Option<String>,
    pub variation_depth: Option<usize>,
    pub error: Option<String>,
}

pub struct ReportWriter {
    player_dir: PathBuf,
    /// Event directory names handed out so far, to keep games with the same
    /// event from overwriting each other
    used_dirs: HashMap<String, usize>,
}

impl ReportWriter {
    pub fn new(output_root: &Path, player: &str) -> Self {
        Self {
            player_dir: output_root.join(format!("{}'s blunders", sanitize_component(player))),
            used_dirs: HashMap::new(),
        }
    }

    /// Create (if needed) the directory for one game and return a handle to it.
    pub fn open_game(&mut self, game: &GameRecord) -> Result<GameOutput, WorkerError> {
        let base = sanitize_component(&game.metadata.event);
        let count = self.used_dirs.entry(base.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 {
            base
        } else {
            format!("{base} ({count})")
        };

        let dir = self.player_dir.join(name);
        fs::create_dir_all(&dir)?;
        Ok(GameOutput {
            dir,
            metadata: game.metadata.clone(),
        })
    }
}

/// Output directory of one game
pub struct GameOutput {
    dir: PathBuf,
    metadata: GameMetadata,
}

impl GameOutput {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_blunder_list(&self, blunders: &[BlunderRecord]) -> Result<PathBuf, WorkerError> {
        let mut contents = String::new();
        for blunder in blunders {
            contents.push_str(&blunder.list_line());
            contents.push('\n');
        }
        let path = self.dir.join(BLUNDER_LIST_FILE);
        write_atomic(&path, contents.as_bytes())?;
        info!(path = %path.display(), count = blunders.len(), "Wrote blunder list");
        Ok(path)
    }

    /// Write `<key>.pgn` holding the tree, set up from the blunder's position.
    pub fn write_variation(
        &self,
        blunder: &BlunderRecord,
        key: &str,
        tree: &VariationNode,
    ) -> Result<PathBuf, WorkerError> {
        let start = blunder.snapshot()?;
        let pgn = write_variation_pgn(&self.metadata, &start, tree);
        let path = self.dir.join(format!("{}.pgn", sanitize_component(key)));
        write_atomic(&path, pgn.as_bytes())?;
        Ok(path)
    }

    pub fn write_summary(&self, report: &GameReport) -> Result<PathBuf, WorkerError> {
        let json = serde_json::to_vec_pretty(report)?;
        let path = self.dir.join(SUMMARY_FILE);
        write_atomic(&path, &json)?;
        Ok(path)
    }
}

/// One unique file key per blunder: the move code, suffixed on repeats
/// (`e2e4`, `e2e4-2`, ...).
pub fn blunder_keys(blunders: &[BlunderRecord]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    blunders
        .iter()
        .map(|b| {
            let count = seen.entry(b.uci.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                b.uci.clone()
            } else {
                format!("{}-{}", b.uci, count)
            }
        })
        .collect()
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".partial");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Make a header value safe to use as a single path component.
fn sanitize_component(raw: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("valid regex"));
    let cleaned = re.replace_all(raw.trim(), "_").to_string();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
