//! Chess Tactics Core Library
//!
//! Finds tactical motifs in a position, values them with exchange
//! simulation, diffs them across moves, and builds engine-backed decision
//! trees whose candidate lines are ranked by how much they teach.

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

pub mod board;
pub mod config;
pub mod diff;
pub mod error;
pub mod features;
pub mod oracle;
pub mod parser;
pub mod see;
pub mod tactics;
pub mod teachability;
pub mod timeline;
pub mod tree;
pub mod valuation;

pub use config::TreeConfig;
pub use diff::{diff_tactics, DiffSummary, TacticDiff};
pub use error::{Error, Result};
pub use oracle::{Evaluation, OracleLine, SearchOracle, StockfishOracle};
pub use tactics::{analyze_tactics, IdentityKey, MotifType, Tactic, TacticCollection, TacticValue};
pub use teachability::{rank_by_teachability, Candidate, RankedCandidate, TeachabilityWeights};
pub use timeline::GameTimeline;
pub use tree::{build_decision_tree, GameTree, NodeId};
pub use valuation::{value_collection, value_tactic, ValuedTactic};

/// Parses a FEN string into a standard chess position
pub fn parse_fen(fen: &str) -> Result<Chess> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))
}
