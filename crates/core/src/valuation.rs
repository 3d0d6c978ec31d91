//! Tactic valuation
//!
//! Attaches a signed material value to each tactic, from the perspective of
//! the side exploiting it. Most motifs resolve to an exchange simulation;
//! the rest fall back to documented heuristics.

use serde::Serialize;
use shakmaty::{Board, Chess, Position, Role, Square};

use crate::board::{piece_value, KING_VALUE};
use crate::see::{self, Exchange};
use crate::tactics::{Tactic, TacticCollection, TacticValue, ValueSource};

/// A tactic paired with its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuedTactic {
    pub key: String,
    #[serde(skip)]
    pub tactic: Tactic,
    pub value: TacticValue,
}

/// Values one tactic found in `pos`
pub fn value_tactic(tactic: &Tactic, pos: &Chess) -> TacticValue {
    let board = pos.board();
    let side = tactic.side();

    match tactic {
        Tactic::HangingPiece { square, .. } => from_exchange(see::evaluate(board, *square, side)),

        Tactic::Pin {
            pinned,
            is_absolute: true,
            ..
        } => {
            let value = value_at(board, *pinned);
            sound(value, format!("pinned piece on {pinned} cannot move"), ValueSource::Exchange)
        }
        Tactic::Pin { pinned, .. } => from_exchange(see::evaluate(board, *pinned, side)),

        Tactic::Fork { forker, targets, .. } => value_fork(board, *forker, targets),

        Tactic::Skewer {
            rear,
            is_absolute: true,
            ..
        } => {
            let value = value_at(board, *rear);
            sound(value, format!("king must step aside, exposing {rear}"), ValueSource::Exchange)
        }
        Tactic::Skewer { front, rear, .. } => {
            from_exchange(see::evaluate(&without(board, *front), *rear, side))
        }

        Tactic::DiscoveredAttack { blocker, target, .. } => {
            let mut exchange = see::evaluate(&without(board, *blocker), *target, side);
            exchange
                .notes
                .push(format!("ignores the value of the piece leaving {blocker}"));
            from_exchange(exchange)
        }

        Tactic::CapturableDefender {
            attacker,
            defender,
            charge,
            ..
        } => {
            let first = see::evaluate_capture(board, *attacker, *defender);
            if first.material_delta < 0 {
                return from_exchange(first);
            }
            let gained = value_at(board, *charge);
            let mut notes = first.notes;
            notes.push(format!("{charge} is left without a defender"));
            TacticValue {
                material_delta: first.material_delta + gained,
                is_sound: first.material_delta + gained > 0,
                defense_notes: notes.join("; "),
                source: ValueSource::Exchange,
            }
        }

        Tactic::OverloadedPiece { charges, .. } => {
            let cheapest = charges.iter().map(|&sq| value_at(board, sq)).min().unwrap_or(0);
            sound(
                cheapest,
                "cheapest charge of an overloaded defender".to_string(),
                ValueSource::Heuristic,
            )
        }

        Tactic::TrappedPiece { square, .. } => sound(
            value_at(board, *square),
            format!("piece on {square} has no safe square"),
            ValueSource::Heuristic,
        ),

        Tactic::MatePattern { .. } => sound(KING_VALUE, "checkmate".to_string(), ValueSource::Heuristic),

        Tactic::XRayAttack { .. }
        | Tactic::XRayDefense { .. }
        | Tactic::Battery { .. }
        | Tactic::DoubleCheck { .. }
        | Tactic::BackRankWeakness { .. }
        | Tactic::ExposedKing { .. }
        | Tactic::MateThreat { .. } => TacticValue {
            material_delta: 0,
            is_sound: false,
            defense_notes: String::new(),
            source: ValueSource::Heuristic,
        },
    }
}

/// Values every tactic of a collection once
pub fn value_collection(tactics: &TacticCollection, pos: &Chess) -> Vec<ValuedTactic> {
    tactics
        .iter()
        .map(|tactic| ValuedTactic {
            key: tactic.identity_key().to_string(),
            tactic: tactic.clone(),
            value: value_tactic(tactic, pos),
        })
        .collect()
}

/// The opponent saves the most valuable target; the next one falls.
fn value_fork(board: &Board, forker: Square, targets: &[Square]) -> TacticValue {
    let mut values: Vec<i32> = targets.iter().map(|&sq| value_at(board, sq)).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    let second = values.get(1).copied().unwrap_or(0);

    let mut notes = Vec::new();
    let mut value = second;
    if let Some(owner) = board.color_at(forker) {
        let counter = see::evaluate(board, forker, !owner);
        if counter.material_delta > 0 {
            value -= counter.material_delta;
            notes.push(format!("forker on {forker} can be won for {}", counter.material_delta));
        }
    }
    TacticValue {
        material_delta: value,
        is_sound: value > 0,
        defense_notes: notes.join("; "),
        source: ValueSource::Exchange,
    }
}

fn from_exchange(exchange: Exchange) -> TacticValue {
    TacticValue {
        material_delta: exchange.material_delta,
        is_sound: exchange.material_delta > 0,
        defense_notes: exchange.notes_text(),
        source: ValueSource::Exchange,
    }
}

fn sound(material_delta: i32, note: String, source: ValueSource) -> TacticValue {
    TacticValue {
        material_delta,
        is_sound: material_delta > 0,
        defense_notes: note,
        source,
    }
}

fn value_at(board: &Board, sq: Square) -> i32 {
    board.role_at(sq).map_or(0, piece_value)
}

fn without(board: &Board, sq: Square) -> Board {
    let mut copy = board.clone();
    if board.role_at(sq) != Some(Role::King) {
        copy.discard_piece_at(sq);
    }
    copy
}
