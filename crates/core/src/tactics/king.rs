//! King safety: back-rank weakness, exposed king, mate threats and mate patterns

use shakmaty::{attacks, Bitboard, Board, Chess, Color, Position, Role, Square};

use super::types::{MatePatternKind, Tactic};
use crate::board::{
    attackers, back_rank, distance, file_index, perspective, rank_index, square_at, Direction,
};

/// Kings on their back rank that cannot step off it, facing a major piece
pub fn find_back_rank_weakness(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut weak = Vec::new();

    for owner in [Color::White, Color::Black] {
        let Some(king) = board.king_of(owner) else {
            continue;
        };
        let home = back_rank(owner);
        if king.rank() != home {
            continue;
        }
        let majors = board.by_color(!owner) & (board.by_role(Role::Rook) | board.by_role(Role::Queen));
        if majors.is_empty() {
            continue;
        }
        let Some(view) = perspective(pos, owner) else {
            continue;
        };
        let escapes = view
            .legal_moves()
            .iter()
            .any(|m| m.from() == Some(king) && m.to().rank() != home);
        if !escapes {
            weak.push(Tactic::BackRankWeakness { side: !owner, king });
        }
    }
    weak
}

/// Kings with a thin pawn shield and several attacked neighbour squares,
/// while the enemy still has a queen
pub fn find_exposed_king(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut exposed = Vec::new();

    for owner in [Color::White, Color::Black] {
        let Some(king) = board.king_of(owner) else {
            continue;
        };
        if (board.by_color(!owner) & board.by_role(Role::Queen)).is_empty() {
            continue;
        }

        let shield_pawns = count_shield(board, owner, king);
        let attacked_zone = attacks::king_attacks(king)
            .into_iter()
            .filter(|&sq| attackers(board, !owner, sq).any())
            .count() as u8;

        if (shield_pawns == 0 && attacked_zone >= 2) || (shield_pawns <= 1 && attacked_zone >= 3) {
            exposed.push(Tactic::ExposedKing {
                side: !owner,
                king,
                shield_pawns,
                attacked_zone,
            });
        }
    }
    exposed
}

/// Friendly pawns on the king's file and its neighbours, one or two ranks ahead
fn count_shield(board: &Board, owner: Color, king: Square) -> u8 {
    let forward = if owner == Color::White { 1 } else { -1 };
    let pawns = board.by_color(owner) & board.by_role(Role::Pawn);
    let mut count = 0;
    for df in -1..=1 {
        for ahead in 1..=2 {
            if let Some(sq) = square_at(file_index(king) + df, rank_index(king) + forward * ahead) {
                if pawns.contains(sq) {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Moves that would deliver checkmate, for either side
pub fn find_mate_threats(pos: &Chess) -> Vec<Tactic> {
    if pos.is_game_over() {
        return Vec::new();
    }
    let mut threats = Vec::new();

    for side in [Color::White, Color::Black] {
        let Some(view) = perspective(pos, side) else {
            continue;
        };
        for m in view.legal_moves() {
            let Some(from) = m.from() else {
                continue;
            };
            let to = m.to();
            if view.clone().play(m).is_ok_and(|after| after.is_checkmate()) {
                threats.push(Tactic::MateThreat { side, from, to });
            }
        }
    }
    threats
}

/// Named mate geometries of a finished checkmate.
///
/// Every detector runs; one mate can fit several templates.
pub fn find_mate_patterns(pos: &Chess) -> Vec<Tactic> {
    if !pos.is_checkmate() {
        return Vec::new();
    }
    let board = pos.board();
    let loser = pos.turn();
    let Some(king) = board.king_of(loser) else {
        return Vec::new();
    };
    let ctx = Mate {
        board,
        king,
        loser,
        winner: !loser,
        checkers: pos.checkers(),
    };

    let detectors: [fn(&Mate) -> Option<(MatePatternKind, Square)>; 7] = [
        back_rank_mate,
        smothered_mate,
        arabian_mate,
        hook_mate,
        anastasia_mate,
        dovetail_mate,
        boden_or_double_bishop,
    ];
    detectors
        .iter()
        .filter_map(|detect| detect(&ctx))
        .map(|(kind, mating_piece)| Tactic::MatePattern {
            side: ctx.winner,
            kind,
            king,
            mating_piece,
        })
        .collect()
}

struct Mate<'a> {
    board: &'a Board,
    king: Square,
    loser: Color,
    winner: Color,
    checkers: Bitboard,
}

impl Mate<'_> {
    fn checker_of(&self, roles: &[Role]) -> Option<Square> {
        self.checkers
            .into_iter()
            .find(|&sq| self.board.role_at(sq).is_some_and(|r| roles.contains(&r)))
    }

    fn is_own(&self, sq: Square) -> bool {
        self.board.color_at(sq) == Some(self.loser)
    }

    fn first_checker(&self) -> Option<Square> {
        self.checkers.first()
    }
}

fn back_rank_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    let home = back_rank(m.loser);
    if m.king.rank() != home {
        return None;
    }
    let forward = if m.loser == Color::White { 1 } else { -1 };
    let front_blocked = (-1..=1)
        .filter_map(|df| square_at(file_index(m.king) + df, rank_index(m.king) + forward))
        .all(|sq| m.is_own(sq) && attackers(m.board, m.winner, sq).is_empty());
    if !front_blocked {
        return None;
    }
    let checker = m
        .checkers
        .into_iter()
        .find(|&sq| sq.rank() == home && matches!(m.board.role_at(sq), Some(Role::Rook | Role::Queen)))?;
    Some((MatePatternKind::BackRank, checker))
}

fn smothered_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    let knight = m.checker_of(&[Role::Knight])?;
    attacks::king_attacks(m.king)
        .into_iter()
        .all(|sq| m.is_own(sq))
        .then_some((MatePatternKind::Smothered, knight))
}

fn arabian_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    let corner = matches!(file_index(m.king), 0 | 7) && matches!(rank_index(m.king), 0 | 7);
    if !corner {
        return None;
    }
    m.checkers
        .into_iter()
        .filter(|&sq| m.board.role_at(sq) == Some(Role::Rook) && distance(sq, m.king) == 1)
        .find(|&rook| {
            attackers(m.board, m.winner, rook).into_iter().any(|sq| {
                m.board.role_at(sq) == Some(Role::Knight)
                    && (file_index(sq) - file_index(m.king)).abs() == 2
                    && (rank_index(sq) - rank_index(m.king)).abs() == 2
            })
        })
        .map(|rook| (MatePatternKind::Arabian, rook))
}

fn hook_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    m.checkers
        .into_iter()
        .filter(|&sq| m.board.role_at(sq) == Some(Role::Rook) && distance(sq, m.king) == 1)
        .find(|&rook| {
            attackers(m.board, m.winner, rook).into_iter().any(|knight| {
                m.board.role_at(knight) == Some(Role::Knight)
                    && distance(knight, m.king) == 1
                    && attackers(m.board, m.winner, knight)
                        .into_iter()
                        .any(|sq| m.board.role_at(sq) == Some(Role::Pawn))
            })
        })
        .map(|rook| (MatePatternKind::Hook, rook))
}

fn anastasia_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    let file = file_index(m.king);
    let rank = rank_index(m.king);
    if !matches!(file, 0 | 7) || matches!(rank, 0 | 7) {
        return None;
    }
    let checker = m
        .checkers
        .into_iter()
        .find(|&sq| file_index(sq) == file && matches!(m.board.role_at(sq), Some(Role::Rook | Role::Queen)))?;

    let inward = if file == 0 { 1 } else { -1 };
    let blocker = square_at(file + inward, rank)?;
    let knight = square_at(file + 3 * inward, rank)?;
    let knight_is_ours = m.board.color_at(knight) == Some(m.winner)
        && m.board.role_at(knight) == Some(Role::Knight);
    (m.is_own(blocker) && knight_is_ours).then_some((MatePatternKind::Anastasia, checker))
}

fn dovetail_mate(m: &Mate) -> Option<(MatePatternKind, Square)> {
    if matches!(file_index(m.king), 0 | 7) || matches!(rank_index(m.king), 0 | 7) {
        return None;
    }
    let queen = m.checker_of(&[Role::Queen])?;
    let diagonal_contact = distance(queen, m.king) == 1
        && Direction::between(queen, m.king).is_some_and(|d| d.is_diagonal());
    if !diagonal_contact {
        return None;
    }
    for sq in attacks::king_attacks(m.king) {
        if sq == queen {
            continue;
        }
        let hitters = attackers(m.board, m.winner, sq);
        if hitters == Bitboard::from(queen) {
            if m.board.piece_at(sq).is_some() {
                return None;
            }
        } else if hitters.any() {
            return None;
        }
    }
    Some((MatePatternKind::Dovetail, queen))
}

/// Two bishops alone cover the king's square and all its neighbours.
///
/// Bishops on opposite sides of the king's file make Boden's mate, bishops
/// on the same side a double-bishop mate.
fn boden_or_double_bishop(m: &Mate) -> Option<(MatePatternKind, Square)> {
    let bishops: Vec<Square> = (m.board.by_color(m.winner) & m.board.by_role(Role::Bishop))
        .into_iter()
        .collect();
    if bishops.len() < 2 {
        return None;
    }
    let zone = attacks::king_attacks(m.king) | Bitboard::from(m.king);
    let only_bishops = zone.into_iter().all(|sq| {
        attackers(m.board, m.winner, sq)
            .into_iter()
            .all(|a| m.board.role_at(a) == Some(Role::Bishop))
    });
    if !only_bishops {
        return None;
    }
    let king_file = file_index(m.king);
    let opposite_sides =
        (file_index(bishops[0]) < king_file) == (file_index(bishops[1]) > king_file);
    let kind = if opposite_sides {
        MatePatternKind::Boden
    } else {
        MatePatternKind::DoubleBishop
    };
    Some((kind, m.first_checker()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;

    fn patterns(fen: &str) -> Vec<MatePatternKind> {
        find_mate_patterns(&parse_fen(fen).unwrap())
            .into_iter()
            .filter_map(|t| match t {
                Tactic::MatePattern { kind, .. } => Some(kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_back_rank_with_attacked_escape_is_weak() {
        // f2 is empty but covered by the bishop on h4
        let pos = parse_fen("r3k3/8/8/8/7b/8/6PP/6K1 w - - 0 1").unwrap();
        assert_eq!(
            find_back_rank_weakness(&pos),
            vec![Tactic::BackRankWeakness {
                side: Color::Black,
                king: Square::G1,
            }]
        );

        // Same check for the side not to move
        let pos = parse_fen("r3k3/8/8/8/7b/8/6PP/6K1 b - - 0 1").unwrap();
        assert_eq!(find_back_rank_weakness(&pos).len(), 1);
    }

    #[test]
    fn test_back_rank_with_free_escape_is_not_weak() {
        let pos = parse_fen("r3k3/8/8/8/8/8/6PP/6K1 w - - 0 1").unwrap();
        assert!(find_back_rank_weakness(&pos).is_empty());
    }

    #[test]
    fn test_exposed_king() {
        let pos = parse_fen("k6r/8/8/8/8/3q4/8/6K1 w - - 0 1").unwrap();
        let found = find_exposed_king(&pos);
        assert_eq!(
            found,
            vec![Tactic::ExposedKing {
                side: Color::Black,
                king: Square::G1,
                shield_pawns: 0,
                attacked_zone: 3,
            }]
        );
    }

    #[test]
    fn test_sheltered_king_is_not_exposed() {
        let pos = parse_fen("k6r/8/8/8/8/3q4/5PPP/6K1 w - - 0 1").unwrap();
        assert!(find_exposed_king(&pos).is_empty());
    }

    #[test]
    fn test_mate_threat_for_either_side() {
        let expected = Tactic::MateThreat {
            side: Color::White,
            from: Square::A1,
            to: Square::A8,
        };
        let to_move = parse_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        assert_eq!(find_mate_threats(&to_move), vec![expected.clone()]);

        let waiting = parse_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 b - - 0 1").unwrap();
        assert_eq!(find_mate_threats(&waiting), vec![expected]);
    }

    #[test]
    fn test_no_patterns_without_checkmate() {
        assert!(patterns("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").is_empty());
    }

    #[test]
    fn test_back_rank_mate() {
        assert_eq!(patterns("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1"), vec![MatePatternKind::BackRank]);
    }

    #[test]
    fn test_smothered_mate() {
        assert!(patterns("6rk/5Npp/8/8/8/8/8/6K1 b - - 0 1").contains(&MatePatternKind::Smothered));
    }

    #[test]
    fn test_arabian_mate() {
        assert!(patterns("7k/7R/5N2/8/8/8/8/6K1 b - - 0 1").contains(&MatePatternKind::Arabian));
    }

    #[test]
    fn test_hook_mate() {
        let found = patterns("4Rk2/5pN1/7P/8/8/8/8/K7 b - - 0 1");
        assert!(found.contains(&MatePatternKind::Hook));
        assert!(!found.contains(&MatePatternKind::BackRank));
    }

    #[test]
    fn test_anastasia_mate() {
        assert!(patterns("8/4N1pk/8/8/8/8/8/K6R b - - 0 1").contains(&MatePatternKind::Anastasia));
    }

    #[test]
    fn test_dovetail_mate() {
        assert!(patterns("8/8/3p4/2pk4/4Q3/5P2/8/7K b - - 0 1").contains(&MatePatternKind::Dovetail));
    }

    #[test]
    fn test_boden_and_double_bishop_are_exclusive() {
        let boden = patterns("2kr4/3n4/B7/8/5B2/8/8/7K b - - 0 1");
        assert!(boden.contains(&MatePatternKind::Boden));
        assert!(!boden.contains(&MatePatternKind::DoubleBishop));

        let double = patterns("7k/7p/4B3/8/8/8/1B6/6K1 b - - 0 1");
        assert!(double.contains(&MatePatternKind::DoubleBishop));
        assert!(!double.contains(&MatePatternKind::Boden));
    }
}
