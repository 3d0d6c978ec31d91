//! Error types for chess-tactics-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Search oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
