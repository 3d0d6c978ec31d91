//! Readers for chess game formats
//!
//! Currently supports:
//! - PGN (Portable Game Notation), including games set up from a `FEN` tag

pub mod pgn;

pub use pgn::{parse_pgn_file, parse_pgn_string, PgnGame};
