//! Static Exchange Evaluation (SEE)
//!
//! Simulates the capture sequence on one square, least valuable attacker
//! first, on a private copy of the board. Attackers are recomputed after
//! every capture so sliders revealed behind a departed piece join in, and
//! pinned pieces that would leave their pin line are kept out.

use shakmaty::{Bitboard, Board, Color, Piece, Role, Square};

use crate::board::{attackers, least_valuable, pin_ray, piece_value};

/// One simulated capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub from: Square,
    pub role: Role,
    pub captured: Role,
}

/// Outcome of an exchange on one square
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    /// Net material for the side that captures first
    pub material_delta: i32,
    /// Every capture that was available, whether or not it pays to make it
    pub captures: Vec<Capture>,
    pub notes: Vec<String>,
}

impl Exchange {
    fn declined(note: String) -> Self {
        Self {
            material_delta: 0,
            captures: Vec::new(),
            notes: vec![note],
        }
    }

    pub fn notes_text(&self) -> String {
        self.notes.join("; ")
    }
}

/// Exchange on `target` started by `side` with its least valuable attacker
pub fn evaluate(board: &Board, target: Square, side: Color) -> Exchange {
    simulate(board, target, side, None)
}

/// Exchange on `target` started by the piece on `from`
pub fn evaluate_capture(board: &Board, from: Square, target: Square) -> Exchange {
    match board.color_at(from) {
        Some(side) => simulate(board, target, side, Some(from)),
        None => Exchange::declined(format!("no piece on {from}")),
    }
}

fn simulate(board: &Board, target: Square, side: Color, first: Option<Square>) -> Exchange {
    let Some(victim) = board.piece_at(target) else {
        return Exchange::declined(format!("{target} is empty"));
    };
    if victim.color == side {
        return Exchange::declined(format!("{target} holds a friendly piece"));
    }
    if victim.role == Role::King {
        return Exchange::declined("the king is never captured".to_string());
    }

    let mut sim = board.clone();
    let mut notes = Vec::new();
    let mut captures = Vec::new();
    let mut mover = side;
    let mut on_square = victim.role;
    let mut forced = first;

    loop {
        let capturer = match forced.take() {
            Some(from) => {
                let allowed = capture_candidates(&sim, target, mover, &mut notes);
                match sim.role_at(from) {
                    Some(role) if allowed.contains(from) => Some((from, role)),
                    _ => {
                        notes.push(format!("piece on {from} cannot capture on {target}"));
                        None
                    }
                }
            }
            None => {
                let allowed = capture_candidates(&sim, target, mover, &mut notes);
                least_valuable(&sim, allowed)
            }
        };
        let Some((from, role)) = capturer else {
            break;
        };

        captures.push(Capture {
            from,
            role,
            captured: on_square,
        });
        sim.discard_piece_at(from);
        sim.set_piece_at(target, Piece { color: mover, role });
        on_square = role;
        mover = !mover;
    }

    // Each recapture is optional: a side only continues when it gains.
    let mut value = 0;
    for capture in captures.iter().rev() {
        value = piece_value(capture.captured) - value.max(0);
    }

    Exchange {
        material_delta: value,
        captures,
        notes,
    }
}

/// Pieces of `mover` that may legally capture on `target` in `sim`
fn capture_candidates(
    sim: &Board,
    target: Square,
    mover: Color,
    notes: &mut Vec<String>,
) -> Bitboard {
    let mut allowed = Bitboard::EMPTY;
    for sq in attackers(sim, mover, target) {
        let Some(role) = sim.role_at(sq) else {
            continue;
        };
        if role == Role::King {
            let occupied = sim.occupied() & !Bitboard::from(sq);
            if sim.attacks_to(target, !mover, occupied).any() {
                push_note(
                    notes,
                    format!("king on {sq} cannot recapture on defended {target}"),
                );
                continue;
            }
        } else if let Some(ray) = pin_ray(sim, mover, sq) {
            if !ray.contains(target) {
                push_note(
                    notes,
                    format!("{role:?} on {sq} is pinned and cannot recapture on {target}")
                        .to_lowercase(),
                );
                continue;
            }
        }
        allowed |= Bitboard::from(sq);
    }
    allowed
}

fn push_note(notes: &mut Vec<String>, note: String) {
    if !notes.contains(&note) {
        notes.push(note);
    }
}
