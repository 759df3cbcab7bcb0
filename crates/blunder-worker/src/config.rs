//! Worker configuration from environment variables and CLI overrides

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::WorkerError;

/// How to launch and supervise the engine process
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// Path to Stockfish binary
    pub path: String,
    pub threads: u32,
    pub hash_mb: u32,
    /// Added to each query's time budget before the engine is declared unresponsive
    pub timeout_grace: Duration,
    /// Respawns allowed over the whole run
    pub restarts: u32,
}

#[derive(Clone, Debug)]
pub struct ScanSettings {
    /// Time budget per scanned position
    pub time: Duration,
    /// A move is flagged when the mover's score is at or below this
    pub threshold: i32,
}

#[derive(Clone, Debug)]
pub struct SynthesisSettings {
    /// Time budget for finding the corrective move
    pub root_time: Duration,
    /// Time budget for each expansion query
    pub expand_time: Duration,
    /// Depth passed to the engine on expansion queries
    pub search_depth: u32,
    /// Maximum plies in a variation tree, corrective move included
    pub max_ply: usize,
    /// PV candidates considered per expansion
    pub max_suggestions: usize,
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Subject player, matched against the White/Black headers
    pub player: String,

    /// Input PGN file
    pub pgn_path: PathBuf,

    /// Root of the report directory tree
    pub output_dir: PathBuf,

    /// Evaluate both sides' moves instead of only the subject's
    pub scan_all_moves: bool,

    pub engine: EngineSettings,
    pub scan: ScanSettings,
    pub synthesis: SynthesisSettings,
}

/// Values given on the command line win over the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub pgn: Option<String>,
    pub player: Option<String>,
    pub out: Option<String>,
}

impl CliOverrides {
    /// Parse `--pgn <path> --player <name> --out <dir>`; unknown arguments are ignored.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let args: Vec<String> = args.into_iter().collect();
        let mut overrides = Self::default();
        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--pgn" => overrides.pgn = value,
                "--player" => overrides.player = value,
                "--out" => overrides.out = value,
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }
        overrides
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load(overrides: &CliOverrides) -> Result<Self, WorkerError> {
        Self::from_lookup(overrides, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(overrides: &CliOverrides, lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let player = overrides
            .player
            .clone()
            .or_else(|| lookup("BLUNDER_PLAYER"))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| WorkerError::Config("BLUNDER_PLAYER not set".into()))?;

        let pgn_path = overrides
            .pgn
            .clone()
            .or_else(|| lookup("PGN_PATH"))
            .map(PathBuf::from)
            .ok_or_else(|| WorkerError::Config("PGN_PATH not set".into()))?;

        let output_dir = overrides
            .out
            .clone()
            .or_else(|| lookup("OUTPUT_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let scan_all_moves = lookup("SCAN_ALL_MOVES").is_some_and(|v| is_truthy(&v));

        let engine = EngineSettings {
            path: lookup("STOCKFISH_PATH").unwrap_or_else(|| "/usr/games/stockfish".to_string()),
            threads: parse_var(&lookup, "ENGINE_THREADS", 1)?,
            hash_mb: parse_var(&lookup, "ENGINE_HASH_MB", 256)?,
            timeout_grace: Duration::from_millis(parse_var(&lookup, "ENGINE_TIMEOUT_GRACE_MS", 5_000)?),
            restarts: parse_var(&lookup, "ENGINE_RESTARTS", 2)?,
        };

        let scan_time = Duration::from_millis(parse_var(&lookup, "SCAN_TIME_MS", 10)?);
        let scan = ScanSettings {
            time: scan_time,
            threshold: parse_var(&lookup, "BLUNDER_THRESHOLD", -150)?,
        };

        let synthesis = SynthesisSettings {
            root_time: Duration::from_millis(parse_var(&lookup, "ROOT_TIME_MS", 3_000)?),
            expand_time: scan_time,
            search_depth: parse_var(&lookup, "SEARCH_DEPTH", 5)?,
            max_ply: parse_var(&lookup, "MAX_PLY", 5)?,
            max_suggestions: parse_var(&lookup, "MAX_SUGGESTIONS", 5)?,
        };

        let config = Self {
            player,
            pgn_path,
            output_dir,
            scan_all_moves,
            engine,
            scan,
            synthesis,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), WorkerError> {
        if self.engine.threads == 0 {
            return Err(WorkerError::Config("ENGINE_THREADS must be at least 1".into()));
        }
        if self.scan.time.is_zero() || self.synthesis.root_time.is_zero() {
            return Err(WorkerError::Config("time budgets must be positive".into()));
        }
        if self.synthesis.search_depth == 0 {
            return Err(WorkerError::Config("SEARCH_DEPTH must be at least 1".into()));
        }
        if self.synthesis.max_ply == 0 {
            return Err(WorkerError::Config("MAX_PLY must be at least 1".into()));
        }
        if self.synthesis.max_suggestions == 0 {
            return Err(WorkerError::Config("MAX_SUGGESTIONS must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, WorkerError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WorkerError::Config(format!("{key} is not a valid number: {raw:?}"))),
        None => Ok(default),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let lookup = lookup_from(&[("BLUNDER_PLAYER", "timonix"), ("PGN_PATH", "games.pgn")]);
        let config = WorkerConfig::from_lookup(&CliOverrides::default(), lookup).unwrap();
        assert_eq!(config.player, "timonix");
        assert_eq!(config.pgn_path, PathBuf::from("games.pgn"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.scan.threshold, -150);
        assert_eq!(config.scan.time, Duration::from_millis(10));
        assert_eq!(config.synthesis.root_time, Duration::from_secs(3));
        assert_eq!(config.synthesis.search_depth, 5);
        assert_eq!(config.synthesis.max_ply, 5);
        assert_eq!(config.synthesis.max_suggestions, 5);
        assert_eq!(config.engine.path, "/usr/games/stockfish");
        assert!(!config.scan_all_moves);
    }

    #[test]
    fn test_depth_bounds_are_independent() {
        let lookup = lookup_from(&[
            ("BLUNDER_PLAYER", "timonix"),
            ("PGN_PATH", "games.pgn"),
            ("SEARCH_DEPTH", "12"),
            ("MAX_PLY", "3"),
            ("SCAN_ALL_MOVES", "true"),
        ]);
        let config = WorkerConfig::from_lookup(&CliOverrides::default(), lookup).unwrap();
        assert_eq!(config.synthesis.search_depth, 12);
        assert_eq!(config.synthesis.max_ply, 3);
        assert!(config.scan_all_moves);
    }

    #[test]
    fn test_cli_overrides_win() {
        let overrides = CliOverrides::from_args(
            ["--player", "other", "--verbose", "--pgn", "cli.pgn", "--out", "reports"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(overrides.player.as_deref(), Some("other"));
        assert_eq!(overrides.pgn.as_deref(), Some("cli.pgn"));
        assert_eq!(overrides.out.as_deref(), Some("reports"));

        let lookup = lookup_from(&[("BLUNDER_PLAYER", "timonix"), ("PGN_PATH", "env.pgn")]);
        let config = WorkerConfig::from_lookup(&overrides, lookup).unwrap();
        assert_eq!(config.player, "other");
        assert_eq!(config.pgn_path, PathBuf::from("cli.pgn"));
        assert_eq!(config.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_missing_player() {
        let lookup = lookup_from(&[("PGN_PATH", "games.pgn")]);
        let err = WorkerConfig::from_lookup(&CliOverrides::default(), lookup).unwrap_err();
        assert!(matches!(err, WorkerError::Config(_)));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let lookup = lookup_from(&[
            ("BLUNDER_PLAYER", "timonix"),
            ("PGN_PATH", "games.pgn"),
            ("BLUNDER_THRESHOLD", "minus-150"),
        ]);
        assert!(WorkerConfig::from_lookup(&CliOverrides::default(), lookup).is_err());

        let lookup = lookup_from(&[
            ("BLUNDER_PLAYER", "timonix"),
            ("PGN_PATH", "games.pgn"),
            ("MAX_PLY", "0"),
        ]);
        assert!(WorkerConfig::from_lookup(&CliOverrides::default(), lookup).is_err());
    }
}
