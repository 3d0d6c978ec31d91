//! Search oracle seam
//!
//! The decision tree asks an external engine for evaluations and candidate
//! lines through [`SearchOracle`]. A UCI adapter for Stockfish is bundled.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, File, Move, Position, Role, Square};
use tracing::warn;

use crate::error::Result;

mod stockfish;

pub use stockfish::{EngineError, StockfishOracle};

/// Centipawn value given to a mate in zero
pub const MATE_SCORE: i32 = 100_000;

/// Engine score, from the perspective of the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Centipawns(i32),
    /// Moves to mate; negative when the side to move is getting mated
    Mate(i32),
}

impl Evaluation {
    /// Total order over scores: any mate outranks any centipawn value,
    /// and a shorter mate outranks a longer one.
    pub fn as_centipawns(&self) -> i32 {
        match *self {
            Evaluation::Centipawns(cp) => cp,
            Evaluation::Mate(n) if n > 0 => MATE_SCORE - n,
            Evaluation::Mate(n) => -MATE_SCORE - n,
        }
    }

    /// The same score seen by the other side
    pub fn negate(&self) -> Self {
        match *self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(n) => Evaluation::Mate(-n),
        }
    }

    /// Score for the side that just moved, given the score for the side
    /// now to move. A side to move that is mated (`Mate(0)`) or getting
    /// mated in `n` means the mover mates one move later.
    pub fn backed_up(&self) -> Self {
        match *self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(n) if n <= 0 => Evaluation::Mate(1 - n),
            Evaluation::Mate(n) => Evaluation::Mate(-n),
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(_))
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Evaluation::Centipawns(0)
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// One line returned by the oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleLine {
    pub evaluation: Evaluation,
    /// Principal variation, starting with the candidate move
    pub pv: Vec<Move>,
    pub depth: u8,
}

impl OracleLine {
    pub fn first_move(&self) -> Option<&Move> {
        self.pv.first()
    }

    /// The principal variation in UCI notation
    pub fn pv_uci(&self) -> Vec<String> {
        self.pv.iter().map(uci).collect()
    }
}

/// An engine that can score positions and propose candidate moves
pub trait SearchOracle {
    /// Best line at `depth`
    fn evaluate(&mut self, pos: &Chess, depth: u8) -> Result<OracleLine>;

    /// Up to `breadth` best lines at `depth`, best first
    fn candidates(&mut self, pos: &Chess, breadth: usize, depth: u8) -> Result<Vec<OracleLine>>;
}

/// Convert a move to UCI notation
pub fn uci(mv: &Move) -> String {
    match mv {
        Move::Normal { from, to, promotion, .. } => {
            let promo = promotion
                .map(|r| match r {
                    Role::Queen => "q",
                    Role::Rook => "r",
                    Role::Bishop => "b",
                    Role::Knight => "n",
                    _ => "",
                })
                .unwrap_or("");
            format!("{}{}{}", from, to, promo)
        }
        Move::EnPassant { from, to, .. } => format!("{}{}", from, to),
        Move::Castle { king, rook } => {
            let king_to = if rook.file() > king.file() {
                Square::from_coords(File::G, king.rank())
            } else {
                Square::from_coords(File::C, king.rank())
            };
            format!("{}{}", king, king_to)
        }
        Move::Put { .. } => String::new(),
    }
}

/// Replays UCI moves from `pos`, stopping at the first one that is not legal
pub fn moves_from_uci(pos: &Chess, line: &[String]) -> Vec<Move> {
    let mut current = pos.clone();
    let mut moves = Vec::with_capacity(line.len());
    for text in line {
        let Some(mv) = current.legal_moves().into_iter().find(|m| uci(m) == *text) else {
            warn!(uci = %text, "oracle move is not legal here, truncating line");
            break;
        };
        current = match current.play(mv.clone()) {
            Ok(next) => next,
            Err(_) => break,
        };
        moves.push(mv);
    }
    moves
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;

    #[test]
    fn test_mate_outranks_centipawns() {
        assert!(Evaluation::Mate(3).as_centipawns() > Evaluation::Centipawns(5000).as_centipawns());
        assert!(Evaluation::Mate(1).as_centipawns() > Evaluation::Mate(4).as_centipawns());
        assert!(Evaluation::Mate(-2).as_centipawns() < Evaluation::Centipawns(-5000).as_centipawns());
        assert_eq!(Evaluation::Mate(2).negate(), Evaluation::Mate(-2));
    }

    #[test]
    fn test_backed_up_scores() {
        assert_eq!(Evaluation::Centipawns(-80).backed_up(), Evaluation::Centipawns(80));
        assert_eq!(Evaluation::Mate(0).backed_up(), Evaluation::Mate(1));
        assert_eq!(Evaluation::Mate(-2).backed_up(), Evaluation::Mate(3));
        assert_eq!(Evaluation::Mate(4).backed_up(), Evaluation::Mate(-4));
    }

    #[test]
    fn test_display() {
        assert_eq!(Evaluation::Centipawns(150).to_string(), "+1.50");
        assert_eq!(Evaluation::Centipawns(-25).to_string(), "-0.25");
        assert_eq!(Evaluation::Mate(-3).to_string(), "M-3");
    }

    #[test]
    fn test_uci_round_trip_through_legal_moves() {
        let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let line = vec!["e1g1".to_string(), "e8c8".to_string()];
        let moves = moves_from_uci(&pos, &line);
        assert_eq!(moves.len(), 2);
        assert!(matches!(moves[0], Move::Castle { .. }));
        assert_eq!(moves.iter().map(uci).collect::<Vec<_>>(), line);
    }

    #[test]
    fn test_illegal_uci_truncates_line() {
        let pos = Chess::default();
        let line = vec!["e2e4".to_string(), "e2e4".to_string(), "d7d5".to_string()];
        assert_eq!(moves_from_uci(&pos, &line).len(), 1);
    }
}
