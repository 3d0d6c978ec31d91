//! Material motifs: hanging, trapped and overloaded pieces, capturable defenders
//!
//! All detectors run for both colours. Whenever a side's legal moves matter
//! and it is not that side's turn, its view is taken from a null-move copy.

use std::collections::BTreeMap;

use shakmaty::{Bitboard, Board, Chess, Color, Move, Piece, Position, Role, Square};

use super::types::Tactic;
use crate::board::{attackers, least_valuable, perspective, pin_ray, piece_value};
use crate::see;

/// Attacked pieces that lose material to the best exchange on their square
pub fn find_hanging(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut hanging = Vec::new();

    for owner in [Color::White, Color::Black] {
        for square in board.by_color(owner) & !board.by_role(Role::King) {
            let hitters = attackers(board, !owner, square);
            if hitters.is_empty() {
                continue;
            }
            if see::evaluate(board, square, !owner).material_delta > 0 {
                hanging.push(Tactic::HangingPiece {
                    side: !owner,
                    square,
                    attackers: hitters.into_iter().collect(),
                });
            }
        }
    }
    hanging
}

/// Pieces in danger that have no legal move to safety
pub fn find_trapped(pos: &Chess) -> Vec<Tactic> {
    let mut trapped = Vec::new();

    for owner in [Color::White, Color::Black] {
        let Some(view) = perspective(pos, owner) else {
            continue;
        };
        // Check evasions say nothing about a piece's freedom
        if view.is_check() {
            continue;
        }
        let board = view.board();
        let moves = view.legal_moves();
        let pieces = board.by_color(owner) & !board.by_role(Role::Pawn) & !board.by_role(Role::King);

        for square in pieces {
            let Some(role) = board.role_at(square) else {
                continue;
            };
            if see::evaluate(board, square, !owner).material_delta <= 0 {
                continue;
            }
            let escapes = moves
                .iter()
                .filter(|m| m.from() == Some(square))
                .any(|m| is_escape(&view, m, piece_value(role), owner));
            if !escapes {
                trapped.push(Tactic::TrappedPiece {
                    side: !owner,
                    square,
                });
            }
        }
    }
    trapped
}

fn is_escape(view: &Chess, m: &Move, value: i32, owner: Color) -> bool {
    if m.capture().is_some_and(|captured| piece_value(captured) >= value) {
        return true;
    }
    let to = m.to();
    match view.clone().play(m.clone()) {
        Ok(after) => see::evaluate(after.board(), to, !owner).material_delta <= 0,
        Err(_) => false,
    }
}

/// Pieces of `owner` that could really recapture on `square`.
///
/// A pinned piece only counts when the square lies on its pin line, and the
/// king only when a single enemy piece bears on the square.
pub fn effective_defenders(board: &Board, owner: Color, square: Square) -> Bitboard {
    let enemy_pressure = attackers(board, !owner, square).count();
    let mut defenders = Bitboard::EMPTY;
    for defender in attackers(board, owner, square) {
        let usable = match board.role_at(defender) {
            Some(Role::King) => enemy_pressure <= 1,
            Some(_) => pin_ray(board, owner, defender).map_or(true, |ray| ray.contains(square)),
            None => false,
        };
        if usable {
            defenders |= Bitboard::from(defender);
        }
    }
    defenders
}

/// The one effective defender of `square`, provided nothing takes over
/// once it is gone. A slider lined up behind it still counts.
fn sole_defender(board: &Board, owner: Color, square: Square) -> Option<Square> {
    let defenders = effective_defenders(board, owner, square);
    if defenders.count() != 1 {
        return None;
    }
    let defender = defenders.first()?;
    let mut without = board.clone();
    without.discard_piece_at(defender);
    effective_defenders(&without, owner, square)
        .is_empty()
        .then_some(defender)
}

/// Overloaded defenders and defenders that can be captured off their post.
///
/// A sole defender is the only effective defender of an attacked friendly
/// piece. One that guards two or more such pieces is overloaded; one that can
/// itself be taken, leaving a charge hanging, is a capturable defender.
pub fn find_defensive_duties(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut tactics = Vec::new();

    for owner in [Color::White, Color::Black] {
        let enemy = !owner;
        let mut duties: BTreeMap<Square, Vec<Square>> = BTreeMap::new();

        for charge in board.by_color(owner) & !board.by_role(Role::King) {
            if attackers(board, enemy, charge).is_empty() {
                continue;
            }
            if let Some(defender) = sole_defender(board, owner, charge) {
                duties.entry(defender).or_default().push(charge);
            }
        }

        for (defender, charges) in duties {
            if charges.len() >= 2 {
                tactics.push(Tactic::OverloadedPiece {
                    side: enemy,
                    defender,
                    charges: charges.clone(),
                });
            }
            tactics.extend(capturable_defender(board, enemy, defender, &charges));
        }
    }
    tactics
}

fn capturable_defender(
    board: &Board,
    enemy: Color,
    defender: Square,
    charges: &[Square],
) -> Vec<Tactic> {
    if board.role_at(defender) == Some(Role::King) {
        return Vec::new();
    }
    let capturers: Bitboard = attackers(board, enemy, defender)
        .into_iter()
        .filter(|&sq| pin_ray(board, enemy, sq).map_or(true, |ray| ray.contains(defender)))
        .filter(|&sq| board.role_at(sq) != Some(Role::King))
        .fold(Bitboard::EMPTY, |acc, sq| acc | Bitboard::from(sq));
    let Some((attacker, role)) = least_valuable(board, capturers) else {
        return Vec::new();
    };

    let mut after = board.clone();
    after.discard_piece_at(attacker);
    after.set_piece_at(defender, Piece { color: enemy, role });

    charges
        .iter()
        .filter(|&&charge| see::evaluate(&after, charge, enemy).material_delta > 0)
        .map(|&charge| Tactic::CapturableDefender {
            side: enemy,
            attacker,
            defender,
            charge,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;

    #[test]
    fn test_hanging_piece_both_colours() {
        // White to move; the black knight a5 and the white bishop h6 both hang
        let pos = parse_fen("7k/6p1/7B/n7/8/8/8/R6K w - - 0 1").unwrap();
        let found = find_hanging(&pos);
        assert!(found.contains(&Tactic::HangingPiece {
            side: Color::White,
            square: Square::A5,
            attackers: vec![Square::A1],
        }));
        assert!(found
            .iter()
            .any(|t| matches!(t, Tactic::HangingPiece { side: Color::Black, square: Square::H6, .. })));
    }

    #[test]
    fn test_adequately_defended_piece_is_not_hanging() {
        // Rook attacks a knight that a pawn defends
        let pos = parse_fen("7k/8/1p6/n7/8/8/8/R6K w - - 0 1").unwrap();
        assert!(find_hanging(&pos).is_empty());
    }

    #[test]
    fn test_trapped_bishop_for_side_not_to_move() {
        let pos = parse_fen("7k/8/8/8/8/1P6/b1P5/K7 w - - 0 1").unwrap();
        let found = find_trapped(&pos);
        assert_eq!(
            found,
            vec![Tactic::TrappedPiece {
                side: Color::White,
                square: Square::A2,
            }]
        );
    }

    #[test]
    fn test_piece_with_safe_retreat_is_not_trapped() {
        // Without the c2 pawn the bishop can take on b3 for free
        let pos = parse_fen("7k/8/8/8/8/1P6/b7/K7 w - - 0 1").unwrap();
        assert!(find_trapped(&pos).is_empty());
    }

    #[test]
    fn test_overloaded_queen() {
        let pos = parse_fen("6k1/8/3q4/8/3n1b2/7N/8/K2R4 w - - 0 1").unwrap();
        let found = find_defensive_duties(&pos);
        assert!(found.contains(&Tactic::OverloadedPiece {
            side: Color::White,
            defender: Square::D6,
            charges: vec![Square::D4, Square::F4],
        }));
    }

    #[test]
    fn test_capturable_defender() {
        let pos = parse_fen("7k/8/5n2/3p2B1/8/2N5/8/K7 w - - 0 1").unwrap();
        let found = find_defensive_duties(&pos);
        assert!(found.contains(&Tactic::CapturableDefender {
            side: Color::White,
            attacker: Square::G5,
            defender: Square::F6,
            charge: Square::D5,
        }));
    }

    #[test]
    fn test_doubled_rook_is_not_a_sole_defender() {
        // Rd1 still covers d5 once Rd2 leaves, so Rd2 only guards b2
        let pos = parse_fen("7k/5b2/8/3N4/8/b7/1N1R4/3R3K w - - 0 1").unwrap();
        let found = find_defensive_duties(&pos);
        assert!(found
            .iter()
            .all(|t| !matches!(t, Tactic::OverloadedPiece { .. } | Tactic::CapturableDefender { .. })));
        assert_eq!(sole_defender(pos.board(), Color::White, Square::B2), Some(Square::D2));
        assert_eq!(sole_defender(pos.board(), Color::White, Square::D5), None);
    }

    #[test]
    fn test_pinned_piece_retreats_along_pin_line() {
        // The e4 rook is pinned by e8 but may still take on e8 or step back to e2
        let pos = parse_fen("k3r3/8/8/3p4/4R3/8/8/4K3 w - - 0 1").unwrap();
        assert!(find_trapped(&pos)
            .iter()
            .all(|t| !matches!(t, Tactic::TrappedPiece { square: Square::E4, .. })));
    }

    #[test]
    fn test_pinned_piece_with_only_off_line_squares_is_trapped() {
        // A rook pinned on a diagonal cannot move at all
        let pos = parse_fen("k7/8/8/b7/8/4p3/3R4/4K3 w - - 0 1").unwrap();
        assert!(find_trapped(&pos).contains(&Tactic::TrappedPiece {
            side: Color::Black,
            square: Square::D2,
        }));
    }

    #[test]
    fn test_trapped_skipped_when_null_move_is_illegal() {
        // The a1 knight has no safe square
        let free = parse_fen("8/R7/7k/8/7r/8/8/n2BK3 w - - 0 1").unwrap();
        assert!(find_trapped(&free).contains(&Tactic::TrappedPiece {
            side: Color::White,
            square: Square::A1,
        }));

        // With White in check, Black's view cannot be taken
        let checked = parse_fen("8/R7/7k/8/8/8/8/n2BK2r w - - 0 1").unwrap();
        assert!(find_trapped(&checked).is_empty());
    }

    #[test]
    fn test_pinned_defender_does_not_count() {
        // The d7 knight eyes e5 but is pinned to its king
        let pos = parse_fen("4k3/3n4/8/1B2p3/8/5N2/8/4K3 w - - 0 1").unwrap();
        let defenders = effective_defenders(pos.board(), Color::Black, Square::E5);
        assert!(defenders.is_empty());
    }
}
