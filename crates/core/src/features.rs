//! Positional features: material and development

use shakmaty::{Bitboard, Board, Color, Role, Square};

use crate::board::piece_value;

/// Material of `color` in centipawns, kings excluded
pub fn material(board: &Board, color: Color) -> i32 {
    (board.by_color(color) & !board.by_role(Role::King))
        .into_iter()
        .filter_map(|sq| board.role_at(sq))
        .map(piece_value)
        .sum()
}

/// Material difference from `color`'s point of view
pub fn material_balance(board: &Board, color: Color) -> i32 {
    material(board, color) - material(board, !color)
}

fn minor_homes(color: Color) -> (Bitboard, Bitboard) {
    let (knights, bishops) = match color {
        Color::White => ([Square::B1, Square::G1], [Square::C1, Square::F1]),
        Color::Black => ([Square::B8, Square::G8], [Square::C8, Square::F8]),
    };
    let bb = |squares: [Square; 2]| squares.into_iter().fold(Bitboard::EMPTY, |acc, sq| acc | Bitboard::from(sq));
    (bb(knights), bb(bishops))
}

/// Minor pieces that have left their starting squares.
///
/// Counts surviving minors minus minors still at home, so a captured piece
/// never counts as developed just because its home square is empty.
pub fn developed_minors(board: &Board, color: Color) -> u32 {
    let ours = board.by_color(color);
    let knights = ours & board.by_role(Role::Knight);
    let bishops = ours & board.by_role(Role::Bishop);
    let (knight_homes, bishop_homes) = minor_homes(color);

    let surviving = (knights | bishops).count();
    let at_home = (knights & knight_homes).count() + (bishops & bishop_homes).count();
    surviving.saturating_sub(at_home) as u32
}
