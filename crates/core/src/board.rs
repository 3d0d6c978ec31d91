//! Board access layer over shakmaty
//!
//! Everything the detectors need to know about a position goes through the
//! helpers in this module: piece values, ray geometry, pin rays and the
//! legal-move set of either side. Simulation always happens on owned copies.

use shakmaty::{Bitboard, Board, Chess, Color, Move, Position, Rank, Role, Square};

pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 300;
pub const BISHOP_VALUE: i32 = 300;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;
/// Large enough that no exchange ever trades it, small enough to sum safely.
pub const KING_VALUE: i32 = 20_000;

/// Material value of a piece in centipawns
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => KING_VALUE,
    }
}

pub fn is_slider(role: Role) -> bool {
    matches!(role, Role::Bishop | Role::Rook | Role::Queen)
}

/// A unit step on the board: file delta and rank delta, each in -1..=1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    pub df: i8,
    pub dr: i8,
}

impl Direction {
    pub const ORTHOGONAL: [Direction; 4] = [
        Direction { df: 0, dr: 1 },
        Direction { df: 1, dr: 0 },
        Direction { df: 0, dr: -1 },
        Direction { df: -1, dr: 0 },
    ];

    pub const DIAGONAL: [Direction; 4] = [
        Direction { df: 1, dr: 1 },
        Direction { df: 1, dr: -1 },
        Direction { df: -1, dr: -1 },
        Direction { df: -1, dr: 1 },
    ];

    pub const ALL: [Direction; 8] = [
        Direction { df: 0, dr: 1 },
        Direction { df: 1, dr: 0 },
        Direction { df: 0, dr: -1 },
        Direction { df: -1, dr: 0 },
        Direction { df: 1, dr: 1 },
        Direction { df: 1, dr: -1 },
        Direction { df: -1, dr: -1 },
        Direction { df: -1, dr: 1 },
    ];

    pub fn is_diagonal(self) -> bool {
        self.df != 0 && self.dr != 0
    }

    /// Ray directions a sliding piece moves along (empty for non-sliders)
    pub fn for_role(role: Role) -> &'static [Direction] {
        match role {
            Role::Bishop => &Self::DIAGONAL,
            Role::Rook => &Self::ORTHOGONAL,
            Role::Queen => &Self::ALL,
            _ => &[],
        }
    }

    /// Direction from `from` towards `to`, if the squares share a line
    pub fn between(from: Square, to: Square) -> Option<Direction> {
        let df = file_index(to) - file_index(from);
        let dr = rank_index(to) - rank_index(from);
        if df == 0 && dr == 0 {
            return None;
        }
        if df == 0 || dr == 0 || df.abs() == dr.abs() {
            Some(Direction {
                df: df.signum() as i8,
                dr: dr.signum() as i8,
            })
        } else {
            None
        }
    }
}

/// Whether a piece of this role slides along the direction
pub fn slides_along(role: Role, dir: Direction) -> bool {
    match role {
        Role::Bishop => dir.is_diagonal(),
        Role::Rook => !dir.is_diagonal(),
        Role::Queen => true,
        _ => false,
    }
}

pub fn file_index(sq: Square) -> i32 {
    sq.file() as i32
}

pub fn rank_index(sq: Square) -> i32 {
    sq.rank() as i32
}

pub fn square_at(file: i32, rank: i32) -> Option<Square> {
    if (0..8).contains(&file) && (0..8).contains(&rank) {
        Some(Square::ALL[(rank * 8 + file) as usize])
    } else {
        None
    }
}

pub fn step(sq: Square, dir: Direction) -> Option<Square> {
    square_at(file_index(sq) + dir.df as i32, rank_index(sq) + dir.dr as i32)
}

/// Squares beyond `from` in the given direction, up to the board edge
pub fn walk(from: Square, dir: Direction) -> impl Iterator<Item = Square> {
    std::iter::successors(step(from, dir), move |&sq| step(sq, dir))
}

/// True when `b` and `c` lie on the same ray leaving `a`
pub fn collinear(a: Square, b: Square, c: Square) -> bool {
    match Direction::between(a, b) {
        Some(dir) => Direction::between(a, c) == Some(dir),
        None => false,
    }
}

pub fn same_square_color(a: Square, b: Square) -> bool {
    a.is_light() == b.is_light()
}

/// Chebyshev distance
pub fn distance(a: Square, b: Square) -> i32 {
    (file_index(a) - file_index(b))
        .abs()
        .max((rank_index(a) - rank_index(b)).abs())
}

pub fn back_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::First,
        Color::Black => Rank::Eighth,
    }
}

/// Pieces of `color` attacking `sq` (pseudo-legal)
pub fn attackers(board: &Board, color: Color, sq: Square) -> Bitboard {
    board.attacks_to(sq, color, board.occupied())
}

/// Least valuable piece among `squares`, lowest square first on ties
pub fn least_valuable(board: &Board, squares: Bitboard) -> Option<(Square, Role)> {
    squares
        .into_iter()
        .filter_map(|sq| board.role_at(sq).map(|role| (sq, role)))
        .min_by_key(|&(_, role)| piece_value(role))
}

/// The line a pinned piece may still move along.
///
/// Returns the squares from the king (exclusive) up to and including the
/// pinning slider when the piece of `color` on `sq` is absolutely pinned.
pub fn pin_ray(board: &Board, color: Color, sq: Square) -> Option<Bitboard> {
    let piece = board.piece_at(sq)?;
    if piece.color != color || piece.role == Role::King {
        return None;
    }
    let king = board.king_of(color)?;
    let dir = Direction::between(king, sq)?;

    let mut ray = Bitboard::EMPTY;
    let mut passed_pinned = false;
    for s in walk(king, dir) {
        ray |= Bitboard::from(s);
        let Some(p) = board.piece_at(s) else {
            continue;
        };
        if s == sq {
            passed_pinned = true;
        } else if passed_pinned && p.color != color && slides_along(p.role, dir) {
            return Some(ray);
        } else {
            return None;
        }
    }
    None
}

pub fn is_pinned(board: &Board, color: Color, sq: Square) -> bool {
    pin_ray(board, color, sq).is_some()
}

/// A copy of the position with `color` to move.
///
/// Flips the turn with a null move when needed. Returns `None` when the
/// flip is illegal or leaves `color` in check, since the legal-move set of
/// such a position says nothing about the piece's freedom.
pub fn perspective(pos: &Chess, color: Color) -> Option<Chess> {
    if pos.turn() == color {
        return Some(pos.clone());
    }
    let flipped = pos.clone().swap_turn().ok()?;
    if flipped.is_check() {
        None
    } else {
        Some(flipped)
    }
}

/// Legal moves of the piece on `sq`, as seen by its owner
pub fn legal_moves_for(pos: &Chess, sq: Square) -> Option<Vec<Move>> {
    let color = pos.board().color_at(sq)?;
    let view = perspective(pos, color)?;
    Some(
        view.legal_moves()
            .into_iter()
            .filter(|m| m.from() == Some(sq))
            .collect(),
    )
}
