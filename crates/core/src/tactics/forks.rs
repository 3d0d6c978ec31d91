//! Fork and double-check detection

use shakmaty::{Chess, Color, Position, Role, Square};

use super::types::Tactic;
use crate::board::{attackers, piece_value};

/// Finds defence-aware forks for both colours.
///
/// A piece hitting two or more enemy pieces only counts when the fork cannot
/// be shrugged off: it gives check, the forker is defended, or the forker is
/// worth less than its most valuable target. A king only forks pieces it can
/// actually take, and is never itself capturable.
pub fn find_forks(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut forks = Vec::new();

    for side in [Color::White, Color::Black] {
        for forker in board.by_color(side) {
            let Some(role) = board.role_at(forker) else {
                continue;
            };

            let hit = board.attacks_from(forker) & board.by_color(!side);
            let targets: Vec<Square> = hit
                .into_iter()
                .filter(|&t| role != Role::King || attackers(board, !side, t).is_empty())
                .collect();
            if targets.len() < 2 {
                continue;
            }

            let target_roles: Vec<Role> = targets.iter().filter_map(|&t| board.role_at(t)).collect();
            let hits_king = target_roles.contains(&Role::King);
            let hits_queen = target_roles.contains(&Role::Queen);
            let max_target = target_roles.iter().map(|&r| piece_value(r)).max().unwrap_or(0);
            let defended = attackers(board, side, forker).any();

            let real = role == Role::King
                || hits_king
                || defended
                || piece_value(role) < max_target;
            if !real {
                continue;
            }

            forks.push(Tactic::Fork {
                side,
                forker,
                targets,
                is_check_fork: hits_king,
                is_royal_fork: hits_king && hits_queen,
            });
        }
    }
    forks
}

/// A king attacked by two pieces at once
pub fn find_double_check(pos: &Chess) -> Option<Tactic> {
    let checkers = pos.checkers();
    if checkers.count() < 2 {
        return None;
    }
    let king = pos.board().king_of(pos.turn())?;
    Some(Tactic::DoubleCheck {
        side: !pos.turn(),
        king,
        checkers: checkers.into_iter().collect(),
    })
}
