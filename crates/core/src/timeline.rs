//! Tactic deltas over a whole game
//!
//! Each position of the game is analyzed exactly once; consecutive
//! collections are diffed by identity key, and the tactics that appear on
//! a ply are valued in the position where they appear.

use serde::Serialize;
use shakmaty::{Chess, Move, Position};
use tracing::debug;

use crate::diff::diff_tactics;
use crate::error::{Error, Result};
use crate::oracle::uci;
use crate::parser::PgnGame;
use crate::tactics::analyze_tactics;
use crate::valuation::{value_tactic, ValuedTactic};

/// What one move changed
#[derive(Debug, Clone, Serialize)]
pub struct PlyDelta {
    /// 1 for the first move of the game
    pub ply: usize,
    pub uci: String,
    pub san: Option<String>,
    pub new: Vec<String>,
    pub resolved: Vec<String>,
    pub persistent: Vec<String>,
    /// Values of the tactics in `new`, in the same order
    pub new_values: Vec<ValuedTactic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GameTimeline {
    pub plies: Vec<PlyDelta>,
}

impl GameTimeline {
    pub fn from_game(game: &PgnGame) -> Result<Self> {
        let mut timeline = Self::from_moves(&game.start, &game.moves)?;
        for (delta, san) in timeline.plies.iter_mut().zip(&game.san) {
            delta.san = Some(san.clone());
        }
        Ok(timeline)
    }

    /// Walks `moves` from `start`. An illegal move is an error.
    pub fn from_moves(start: &Chess, moves: &[Move]) -> Result<Self> {
        let mut position = start.clone();
        let mut before = analyze_tactics(&position);
        let mut plies = Vec::with_capacity(moves.len());

        for (index, mv) in moves.iter().enumerate() {
            position = position.play(mv.clone()).map_err(|_| {
                Error::InvalidPosition(format!("illegal move {} at ply {}", uci(mv), index + 1))
            })?;
            let after = analyze_tactics(&position);
            let diff = diff_tactics(&before, &after);

            let new_values = diff
                .new
                .iter()
                .filter_map(|key| after.get(key))
                .map(|tactic| ValuedTactic {
                    key: tactic.identity_key().to_string(),
                    tactic: tactic.clone(),
                    value: value_tactic(tactic, &position),
                })
                .collect();

            let summary = diff.summary();
            plies.push(PlyDelta {
                ply: index + 1,
                uci: uci(mv),
                san: None,
                new: summary.new,
                resolved: summary.resolved,
                persistent: summary.persistent,
                new_values,
            });
            before = after;
        }

        debug!(plies = plies.len(), "built game timeline");
        Ok(Self { plies })
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    /// Plies on which at least one sound tactic appeared
    pub fn turning_points(&self) -> impl Iterator<Item = &PlyDelta> {
        self.plies
            .iter()
            .filter(|delta| delta.new_values.iter().any(|v| v.value.is_sound))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::KING_VALUE;
    use crate::parser::parse_pgn_string;
    use crate::tactics::Tactic;
    use std::collections::BTreeSet;

    const ITALIAN: &str = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. c3 Nf6 5. d4 exd4 6. cxd4 Bb4+ *\n";

    #[test]
    fn test_one_delta_per_move() {
        let games = parse_pgn_string(ITALIAN).unwrap();
        let timeline = GameTimeline::from_game(&games[0]).unwrap();
        assert_eq!(timeline.len(), 12);
        assert_eq!(timeline.plies[0].uci, "e2e4");
        assert_eq!(timeline.plies[0].san.as_deref(), Some("e4"));
        assert_eq!(timeline.plies[11].ply, 12);
    }

    #[test]
    fn test_consecutive_deltas_agree() {
        let games = parse_pgn_string(ITALIAN).unwrap();
        let timeline = GameTimeline::from_game(&games[0]).unwrap();
        for pair in timeline.plies.windows(2) {
            let left: BTreeSet<&String> = pair[0].new.iter().chain(&pair[0].persistent).collect();
            let right: BTreeSet<&String> = pair[1].resolved.iter().chain(&pair[1].persistent).collect();
            assert_eq!(left, right, "ply {}", pair[1].ply);
        }
        for delta in &timeline.plies {
            assert_eq!(delta.new_values.len(), delta.new.len());
        }
    }

    #[test]
    fn test_mate_appears_on_final_ply() {
        let pgn = "[FEN \"6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1\"]\n\n1. Ra8# 1-0\n";
        let games = parse_pgn_string(pgn).unwrap();
        let timeline = GameTimeline::from_game(&games[0]).unwrap();
        let last = &timeline.plies[0];
        assert!(last
            .new_values
            .iter()
            .any(|v| matches!(v.tactic, Tactic::MatePattern { .. }) && v.value.material_delta == KING_VALUE));
        assert!(last.resolved.iter().any(|key| key.starts_with("mate_threat")));
        assert_eq!(timeline.turning_points().count(), 1);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let start = Chess::default();
        let games = parse_pgn_string("1. e4 *\n").unwrap();
        let moves = vec![games[0].moves[0].clone(), games[0].moves[0].clone()];
        assert!(matches!(
            GameTimeline::from_moves(&start, &moves),
            Err(Error::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_json_report() {
        let games = parse_pgn_string("1. e4 e5 *\n").unwrap();
        let json = GameTimeline::from_game(&games[0]).unwrap().to_json().unwrap();
        assert!(json.contains("\"uci\": \"e2e4\""));
    }
}
