//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::error::WorkerError;
use crate::evaluator::{Evaluation, Evaluator, Limit};

/// Deadline for queries that carry no time budget
const UNTIMED_QUERY_DEADLINE: Duration = Duration::from_secs(60);

/// Node budget used when a limit specifies neither time nor depth
const DEFAULT_NODES: u32 = 100_000;

/// Running engine process and its pipes
struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Stockfish engine instance, restarted on failure while the restart budget lasts
pub struct StockfishEngine {
    settings: EngineSettings,
    process: Option<Process>,
    restarts_left: u32,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(settings: &EngineSettings) -> Result<Self, WorkerError> {
        let process = spawn(settings).await?;
        info!(path = %settings.path, "Stockfish engine ready");
        Ok(Self {
            settings: settings.clone(),
            process: Some(process),
            restarts_left: settings.restarts,
        })
    }

    /// Kill the current process and start a fresh one.
    async fn restart(&mut self) -> Result<(), WorkerError> {
        if let Some(mut old) = self.process.take() {
            let _ = old.child.start_kill();
            let _ = old.child.wait().await;
        }
        if self.restarts_left == 0 {
            return Err(WorkerError::EvaluatorUnavailable(
                "engine failed and restart budget is exhausted".into(),
            ));
        }
        self.restarts_left -= 1;
        warn!(restarts_left = self.restarts_left, "Restarting Stockfish");
        self.process = Some(spawn(&self.settings).await?);
        Ok(())
    }

    /// One analysis round-trip bounded by the limit plus the grace period
    async fn query(&mut self, fen: &str, limit: Limit) -> Result<Evaluation, WorkerError> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| WorkerError::EvaluatorUnavailable("engine is not running".into()))?;

        let deadline = limit.time.unwrap_or(UNTIMED_QUERY_DEADLINE) + self.settings.timeout_grace;
        match timeout(deadline, process.analyze(fen, limit)).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::EvaluatorUnavailable(format!(
                "no response within {} ms",
                deadline.as_millis()
            ))),
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.send("quit").await;
            let _ = process.child.wait().await;
        }
    }
}

impl Evaluator for StockfishEngine {
    async fn analyze(&mut self, fen: &str, limit: Limit) -> Result<Evaluation, WorkerError> {
        match self.query(fen, limit).await {
            Ok(eval) => Ok(eval),
            Err(e) => {
                warn!(error = %e, fen, "Stockfish query failed");
                self.restart().await?;
                self.query(fen, limit).await
            }
        }
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        if let Some(process) = self.process.as_mut() {
            let _ = process.child.start_kill();
        }
    }
}

async fn spawn(settings: &EngineSettings) -> Result<Process, WorkerError> {
    let mut child = Command::new(&settings.path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| WorkerError::EvaluatorUnavailable(format!("Failed to spawn Stockfish: {e}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| WorkerError::EvaluatorUnavailable("Stockfish stdin not captured".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| WorkerError::EvaluatorUnavailable("Stockfish stdout not captured".into()))?;

    let mut process = Process {
        child,
        stdin,
        stdout: BufReader::new(stdout),
    };

    let handshake = async {
        // Initialize UCI
        process.send("uci").await?;
        process.wait_for("uciok").await?;

        // Configure for analysis
        process
            .send(&format!("setoption name Threads value {}", settings.threads))
            .await?;
        process
            .send(&format!("setoption name Hash value {}", settings.hash_mb))
            .await?;
        process.send("setoption name UCI_AnalyseMode value true").await?;
        process.send("isready").await?;
        process.wait_for("readyok").await
    };
    timeout(UNTIMED_QUERY_DEADLINE, handshake)
        .await
        .map_err(|_| WorkerError::EvaluatorUnavailable("UCI handshake timed out".into()))??;

    Ok(process)
}

impl Process {
    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), WorkerError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| WorkerError::EvaluatorUnavailable(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| WorkerError::EvaluatorUnavailable(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one trimmed line; EOF means the process died.
    async fn read_line(&mut self, line: &mut String) -> Result<(), WorkerError> {
        line.clear();
        let read = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| WorkerError::EvaluatorUnavailable(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(WorkerError::EvaluatorUnavailable("Stockfish closed its output".into()));
        }
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), WorkerError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if trimmed == expected {
                return Ok(());
            }
        }
    }

    /// Analyse a position until `bestmove`, keeping the last primary PV line
    async fn analyze(&mut self, fen: &str, limit: Limit) -> Result<Evaluation, WorkerError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&go_command(limit)).await?;

        let mut result = Evaluation::default();
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" pv ") {
                // Secondary lines only appear with MultiPV > 1
                if parse_multipv_index(trimmed).unwrap_or(1) != 1 {
                    continue;
                }
                if let Some(cp) = parse_cp(trimmed) {
                    result.score = Some(cp);
                    result.mate = None;
                }
                if let Some(mate) = parse_mate(trimmed) {
                    result.mate = Some(mate);
                    result.score = None;
                }
                result.pv = parse_pv(trimmed);
            } else if trimmed.starts_with("info") && trimmed.contains(" score ") {
                // Terminal positions report a score with no PV
                if let Some(mate) = parse_mate(trimmed) {
                    result.mate = Some(mate);
                    result.score = None;
                } else if let Some(cp) = parse_cp(trimmed) {
                    result.score = Some(cp);
                }
            } else if trimmed.starts_with("bestmove") {
                debug!(line = trimmed, "SF >");
                break;
            }
        }

        Ok(result)
    }
}

fn go_command(limit: Limit) -> String {
    let mut cmd = String::from("go");
    if let Some(time) = limit.time {
        cmd.push_str(&format!(" movetime {}", time.as_millis().max(1)));
    }
    if let Some(depth) = limit.depth {
        cmd.push_str(&format!(" depth {depth}"));
    }
    if limit.time.is_none() && limit.depth.is_none() {
        cmd.push_str(&format!(" nodes {DEFAULT_NODES}"));
    }
    cmd
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

fn parse_after<T: std::str::FromStr>(line: &str, keyword: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == keyword && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_cp(line), Some(35));
        assert_eq!(parse_multipv_index(line), Some(1));
    }

    #[test]
    fn test_parse_negative_cp_with_bound() {
        let line = "info depth 9 score cp -212 upperbound nodes 4000 pv d8h4 g2g3";
        assert_eq!(parse_cp(line), Some(-212));
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate 3 nodes 100000 pv e2e4";
        assert_eq!(parse_mate(line), Some(3));
        assert_eq!(parse_cp(line), None);
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 g1f3";
        let pv = parse_pv(line);
        assert_eq!(pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_go_command() {
        assert_eq!(go_command(Limit::time(Duration::from_millis(10))), "go movetime 10");
        assert_eq!(
            go_command(Limit::time_and_depth(Duration::from_millis(10), 5)),
            "go movetime 10 depth 5"
        );
        assert_eq!(go_command(Limit::default()), "go nodes 100000");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let settings = EngineSettings {
            path: "/nonexistent/stockfish-binary".to_string(),
            threads: 1,
            hash_mb: 16,
            timeout_grace: Duration::from_millis(100),
            restarts: 0,
        };
        let err = StockfishEngine::new(&settings).await.err().unwrap();
        assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
    }

    #[cfg(unix)]
    mod fake_engine {
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        use chess_core::position::STANDARD_START_FEN;

        use super::*;

        /// Shell script speaking just enough UCI. `on_go` runs for every `go`;
        /// each start appends a line to `starts.log` next to the script.
        fn write_engine(dir: &Path, on_go: &str) -> String {
            let path = dir.join("fake-engine.sh");
            let script = format!(
                "#!/bin/sh\n\
                 echo start >> \"{log}\"\n\
                 while read -r line; do\n\
                 case \"$line\" in\n\
                 uci) echo 'id name fake'; echo uciok ;;\n\
                 isready) echo readyok ;;\n\
                 go*) {on_go} ;;\n\
                 quit) exit 0 ;;\n\
                 esac\n\
                 done\n",
                log = dir.join("starts.log").display(),
            );
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        }

        fn starts(dir: &Path) -> usize {
            std::fs::read_to_string(dir.join("starts.log"))
                .unwrap_or_default()
                .lines()
                .count()
        }

        fn settings(path: String, restarts: u32) -> EngineSettings {
            EngineSettings {
                path,
                threads: 1,
                hash_mb: 16,
                timeout_grace: Duration::from_millis(200),
                restarts,
            }
        }

        fn limit() -> Limit {
            Limit::time(Duration::from_millis(10))
        }

        #[tokio::test]
        async fn test_reads_score_and_pv() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_engine(
                dir.path(),
                "echo 'info depth 1 score cp 42 pv e2e4 e7e5'; echo 'bestmove e2e4'",
            );
            let mut engine = StockfishEngine::new(&settings(path, 0)).await.unwrap();

            let eval = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap();
            assert_eq!(eval.score, Some(42));
            assert_eq!(eval.pv, vec!["e2e4", "e7e5"]);
            engine.quit().await;
            assert_eq!(starts(dir.path()), 1);
        }

        #[tokio::test]
        async fn test_hung_engine_restarts_once_then_gives_up() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_engine(dir.path(), "exec sleep 30");
            let mut engine = StockfishEngine::new(&settings(path, 1)).await.unwrap();

            // Times out, restarts, times out again on the retry.
            let err = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap_err();
            assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
            assert_eq!(starts(dir.path()), 2);

            // Budget spent: no further spawn.
            let err = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap_err();
            assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
            assert_eq!(starts(dir.path()), 2);
        }

        #[tokio::test]
        async fn test_engine_exiting_mid_query_is_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_engine(dir.path(), "exit 1");
            let mut engine = StockfishEngine::new(&settings(path, 1)).await.unwrap();

            let err = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap_err();
            assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
            assert_eq!(starts(dir.path()), 2);

            let err = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap_err();
            assert!(matches!(err, WorkerError::EvaluatorUnavailable(_)));
            assert_eq!(starts(dir.path()), 2);
        }

        #[tokio::test]
        async fn test_recovers_after_one_crash() {
            let dir = tempfile::tempdir().unwrap();
            let path = write_engine(
                dir.path(),
                "if [ -e \"$0.crashed\" ]; then \
                 echo 'info depth 1 score cp -7 pv d2d4'; echo 'bestmove d2d4'; \
                 else touch \"$0.crashed\"; exit 1; fi",
            );
            let mut engine = StockfishEngine::new(&settings(path, 1)).await.unwrap();

            let eval = engine.analyze(STANDARD_START_FEN, limit()).await.unwrap();
            assert_eq!(eval.score, Some(-7));
            assert_eq!(eval.pv, vec!["d2d4"]);
            assert_eq!(starts(dir.path()), 2);
            engine.quit().await;
        }
    }
}
