//! Stockfish search oracle
//!
//! Spawns Stockfish as a subprocess and communicates via UCI protocol.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode};
use thiserror::Error;
use tracing::debug;

use super::{moves_from_uci, Evaluation, OracleLine, SearchOracle};
use crate::error::{self, Result};

/// Error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start engine: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<EngineError> for error::Error {
    fn from(error: EngineError) -> Self {
        error::Error::Engine(error.to_string())
    }
}

/// One `info` line worth keeping
#[derive(Debug, Clone, Default)]
struct InfoLine {
    depth: u8,
    multipv: usize,
    evaluation: Option<Evaluation>,
    pv: Vec<String>,
}

/// Wrapper around a Stockfish process
pub struct StockfishOracle {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    multipv: usize,
}

impl StockfishOracle {
    /// Starts the engine and completes the UCI handshake
    ///
    /// # Arguments
    /// * `path` - Path to stockfish binary (or "stockfish" if in PATH)
    ///
    /// # Example
    /// ```ignore
    /// let mut oracle = StockfishOracle::new("stockfish")?;
    /// ```
    pub fn new(path: &str) -> std::result::Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdin".into()))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdout".into()))?;

        let mut engine = StockfishOracle {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            multipv: 1,
        };

        engine.send("uci")?;
        engine.read_until("uciok")?;
        engine.sync()?;
        debug!(path, "stockfish ready");

        Ok(engine)
    }

    fn send(&mut self, cmd: &str) -> std::result::Result<(), EngineError> {
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> std::result::Result<String, EngineError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(EngineError::Protocol("engine closed its output".into()));
        }
        Ok(line.trim().to_string())
    }

    fn read_until(&mut self, expected: &str) -> std::result::Result<(), EngineError> {
        loop {
            if self.read_line()?.starts_with(expected) {
                return Ok(());
            }
        }
    }

    fn sync(&mut self) -> std::result::Result<(), EngineError> {
        self.send("isready")?;
        self.read_until("readyok")
    }

    fn set_multipv(&mut self, lines: usize) -> std::result::Result<(), EngineError> {
        let lines = lines.max(1);
        if lines != self.multipv {
            self.send(&format!("setoption name MultiPV value {}", lines))?;
            self.sync()?;
            self.multipv = lines;
        }
        Ok(())
    }

    /// Runs a fixed-depth search and returns the deepest line per MultiPV slot
    fn search(
        &mut self,
        pos: &Chess,
        lines: usize,
        depth: u8,
    ) -> std::result::Result<Vec<OracleLine>, EngineError> {
        self.set_multipv(lines)?;
        let fen = Fen::from_position(pos, EnPassantMode::Legal);
        self.send(&format!("position fen {}", fen))?;
        self.send(&format!("go depth {}", depth))?;

        let mut slots: BTreeMap<usize, InfoLine> = BTreeMap::new();
        loop {
            let line = self.read_line()?;
            if line.starts_with("bestmove") {
                break;
            }
            if let Some(info) = parse_info_line(&line) {
                let keep = slots.get(&info.multipv).map_or(true, |old| info.depth >= old.depth);
                if keep {
                    slots.insert(info.multipv, info);
                }
            }
        }

        let result: Vec<OracleLine> = slots
            .into_values()
            .filter_map(|info| {
                Some(OracleLine {
                    evaluation: info.evaluation?,
                    pv: moves_from_uci(pos, &info.pv),
                    depth: info.depth,
                })
            })
            .collect();
        debug!(%fen, depth, lines = result.len(), "stockfish search finished");
        Ok(result)
    }

    /// Quit the engine cleanly
    pub fn quit(&mut self) -> std::result::Result<(), EngineError> {
        self.send("quit")?;
        std::thread::sleep(Duration::from_millis(100));
        let _ = self.process.kill();
        Ok(())
    }
}

/// Parses an `info` line carrying a score; bound scores are skipped
fn parse_info_line(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") || parts.contains(&"lowerbound") || parts.contains(&"upperbound") {
        return None;
    }

    let mut info = InfoLine {
        multipv: 1,
        ..InfoLine::default()
    };
    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                info.depth = parts.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "multipv" => {
                info.multipv = parts.get(i + 1)?.parse().ok()?;
                i += 2;
            }
            "score" => {
                let value: i32 = parts.get(i + 2)?.parse().ok()?;
                info.evaluation = match *parts.get(i + 1)? {
                    "cp" => Some(Evaluation::Centipawns(value)),
                    "mate" => Some(Evaluation::Mate(value)),
                    _ => None,
                };
                i += 3;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => i += 1,
        }
    }
    info.evaluation.is_some().then_some(info)
}

impl SearchOracle for StockfishOracle {
    fn evaluate(&mut self, pos: &Chess, depth: u8) -> Result<OracleLine> {
        self.search(pos, 1, depth)
            .map_err(|e| error::Error::OracleUnavailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| error::Error::OracleUnavailable("engine returned no line".into()))
    }

    fn candidates(&mut self, pos: &Chess, breadth: usize, depth: u8) -> Result<Vec<OracleLine>> {
        let lines = self
            .search(pos, breadth, depth)
            .map_err(|e| error::Error::OracleUnavailable(e.to_string()))?;
        if lines.is_empty() {
            return Err(error::Error::OracleUnavailable("engine returned no candidates".into()));
        }
        Ok(lines)
    }
}

impl Drop for StockfishOracle {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
