//! Ray motif walker
//!
//! Walks every ray of every slider once, stopping at the second occupied
//! square, and classifies the (slider, first hit, second hit) triple as a
//! pin, skewer, x-ray, discovered attack or battery.

use shakmaty::{Board, Chess, Color, Position, Role, Square};
use tracing::{trace, warn};

use super::types::{Significance, Tactic};
use crate::board::{
    attackers, collinear, perspective, piece_value, same_square_color, walk, Direction,
};

/// Ray classifications, lowest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RayClass {
    Battery,
    XRayDefense,
    DiscoveredAttack,
    XRayAttack,
    Skewer,
    AbsoluteSkewer,
    RelativePin,
    AbsolutePin,
}

/// One scanned ray with its two occupied squares
#[derive(Debug, Clone, Copy)]
struct Ray {
    side: Color,
    slider: Square,
    dir: Direction,
    first: Square,
    second: Square,
}

/// Finds all ray motifs for both colours. At most one tactic per ray.
pub fn find_ray_motifs(pos: &Chess) -> Vec<Tactic> {
    let board = pos.board();
    let mut tactics = Vec::new();

    for side in [Color::White, Color::Black] {
        let sliders = board.by_color(side)
            & (board.by_role(Role::Bishop) | board.by_role(Role::Rook) | board.by_role(Role::Queen));
        for slider in sliders {
            let Some(role) = board.role_at(slider) else {
                continue;
            };
            for &dir in Direction::for_role(role) {
                if let Some(tactic) = scan_ray(pos, side, slider, dir) {
                    tactics.push(tactic);
                }
            }
        }
    }
    tactics
}

fn scan_ray(pos: &Chess, side: Color, slider: Square, dir: Direction) -> Option<Tactic> {
    let board = pos.board();
    let mut hits = walk(slider, dir).filter(|&sq| board.piece_at(sq).is_some());
    let ray = Ray {
        side,
        slider,
        dir,
        first: hits.next()?,
        second: hits.next()?,
    };

    if !geometry_holds(&ray) {
        warn!(
            slider = %ray.slider,
            first = %ray.first,
            second = %ray.second,
            "dropping ray claim with inconsistent geometry"
        );
        return None;
    }

    let mut discovery = None;
    let class = classify(pos, &ray, &mut discovery)?;
    trace!(slider = %slider, first = %ray.first, second = %ray.second, ?class, "ray classified");
    Some(build(&ray, class, discovery))
}

/// Collinearity for every ray; a diagonal must also keep one square colour.
fn geometry_holds(ray: &Ray) -> bool {
    if Direction::between(ray.slider, ray.first) != Some(ray.dir)
        || !collinear(ray.slider, ray.first, ray.second)
    {
        return false;
    }
    !ray.dir.is_diagonal()
        || (same_square_color(ray.slider, ray.first) && same_square_color(ray.slider, ray.second))
}

fn classify(
    pos: &Chess,
    ray: &Ray,
    discovery: &mut Option<(Significance, Square)>,
) -> Option<RayClass> {
    let board = pos.board();
    let front = board.piece_at(ray.first)?;
    let rear = board.piece_at(ray.second)?;
    let enemy = !ray.side;

    let mut classes = Vec::new();
    match (front.color == enemy, rear.color == enemy) {
        (true, true) => {
            if rear.role == Role::King {
                classes.push(RayClass::AbsolutePin);
            } else if front.role == Role::King {
                classes.push(RayClass::AbsoluteSkewer);
            } else {
                let (front_value, rear_value) = (piece_value(front.role), piece_value(rear.role));
                if front_value < rear_value {
                    classes.push(RayClass::RelativePin);
                }
                if front_value > rear_value {
                    classes.push(RayClass::Skewer);
                }
                if rear_value <= front_value {
                    classes.push(RayClass::XRayAttack);
                }
            }
        }
        (true, false) => {
            if front.role != Role::King && rear.role != Role::King {
                classes.push(RayClass::XRayDefense);
            }
        }
        (false, true) => {
            let view = perspective(pos, ray.side)?;
            *discovery = discovery_threat(&view, ray);
            if discovery.is_some() {
                classes.push(RayClass::DiscoveredAttack);
            } else {
                classes.push(RayClass::Battery);
            }
        }
        (false, false) => {}
    }

    classes.into_iter().max()
}

/// Most forcing off-ray move of the blocker, if any creates a threat
fn discovery_threat(view: &Chess, ray: &Ray) -> Option<(Significance, Square)> {
    let target_is_king = view.board().role_at(ray.second) == Some(Role::King);
    let mut best: Option<(Significance, Square)> = None;

    for m in view.legal_moves() {
        if m.from() != Some(ray.first) || Direction::between(ray.slider, m.to()) == Some(ray.dir) {
            continue;
        }
        let to = m.to();
        let is_capture = m.is_capture();
        let Ok(after) = view.clone().play(m) else {
            continue;
        };
        let significance = if target_is_king || after.is_check() {
            Significance::Check
        } else if is_capture {
            Significance::Capture
        } else if threatens_from(after.board(), to, ray.side) {
            Significance::Threat
        } else {
            continue;
        };
        if best.map_or(true, |(s, _)| significance > s) {
            best = Some((significance, to));
        }
    }
    best
}

/// Whether the piece that landed on `sq` attacks something worth taking
fn threatens_from(board: &Board, sq: Square, side: Color) -> bool {
    let Some(mover) = board.role_at(sq) else {
        return false;
    };
    (board.attacks_from(sq) & board.by_color(!side))
        .into_iter()
        .filter_map(|target| board.role_at(target).map(|role| (target, role)))
        .any(|(target, role)| {
            role != Role::King
                && (piece_value(role) > piece_value(mover)
                    || attackers(board, !side, target).is_empty())
        })
}

fn build(ray: &Ray, class: RayClass, discovery: Option<(Significance, Square)>) -> Tactic {
    let side = ray.side;
    match class {
        RayClass::AbsolutePin | RayClass::RelativePin => Tactic::Pin {
            side,
            pinner: ray.slider,
            pinned: ray.first,
            shielded: ray.second,
            is_absolute: class == RayClass::AbsolutePin,
        },
        RayClass::AbsoluteSkewer | RayClass::Skewer => Tactic::Skewer {
            side,
            attacker: ray.slider,
            front: ray.first,
            rear: ray.second,
            is_absolute: class == RayClass::AbsoluteSkewer,
        },
        RayClass::XRayAttack => Tactic::XRayAttack {
            side,
            attacker: ray.slider,
            blocker: ray.first,
            target: ray.second,
        },
        RayClass::XRayDefense => Tactic::XRayDefense {
            side,
            defender: ray.slider,
            blocker: ray.first,
            defended: ray.second,
        },
        RayClass::DiscoveredAttack => {
            let (significance, reveal_to) = discovery.unwrap_or((Significance::Threat, ray.first));
            Tactic::DiscoveredAttack {
                side,
                slider: ray.slider,
                blocker: ray.first,
                target: ray.second,
                significance,
                reveal_to,
            }
        }
        RayClass::Battery => Tactic::Battery {
            side,
            rear: ray.slider,
            front: ray.first,
            target: ray.second,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;
    use std::collections::HashSet;

    fn motifs(fen: &str) -> Vec<Tactic> {
        find_ray_motifs(&parse_fen(fen).unwrap())
    }

    /// (slider, first hit) identifies the ray a tactic came from
    fn ray_of(tactic: &Tactic) -> (Square, Square) {
        let squares = tactic.squares();
        (squares[0], squares[1])
    }

    #[test]
    fn test_absolute_pin() {
        let found = motifs("4k3/8/8/8/1b6/2N5/8/4K3 w - - 0 1");
        assert!(found.contains(&Tactic::Pin {
            side: Color::Black,
            pinner: Square::B4,
            pinned: Square::C3,
            shielded: Square::E1,
            is_absolute: true,
        }));
    }

    #[test]
    fn test_relative_pin_to_queen() {
        let found = motifs("3qk3/8/5n2/6B1/8/8/8/4K3 w - - 0 1");
        assert!(found.contains(&Tactic::Pin {
            side: Color::White,
            pinner: Square::G5,
            pinned: Square::F6,
            shielded: Square::D8,
            is_absolute: false,
        }));
    }

    #[test]
    fn test_absolute_skewer() {
        let found = motifs("6q1/8/8/3k4/8/8/B7/7K b - - 0 1");
        assert!(found.contains(&Tactic::Skewer {
            side: Color::White,
            attacker: Square::A2,
            front: Square::D5,
            rear: Square::G8,
            is_absolute: true,
        }));
    }

    #[test]
    fn test_skewer_wins_over_xray() {
        let found = motifs("4k3/8/8/8/R2q3r/8/8/4K3 w - - 0 1");
        let from_rook: Vec<&Tactic> = found.iter().filter(|t| ray_of(t) == (Square::A4, Square::D4)).collect();
        assert_eq!(from_rook.len(), 1);
        assert!(matches!(
            from_rook[0],
            Tactic::Skewer { rear: Square::H4, is_absolute: false, .. }
        ));
    }

    #[test]
    fn test_xray_defense() {
        let found = motifs("4k3/R7/8/8/n7/8/8/R3K3 w - - 0 1");
        assert!(found.contains(&Tactic::XRayDefense {
            side: Color::White,
            defender: Square::A1,
            blocker: Square::A4,
            defended: Square::A7,
        }));
    }

    #[test]
    fn test_discovered_check() {
        let found = motifs("4k3/8/8/8/4B3/8/8/4RK2 w - - 0 1");
        let discovered: Vec<&Tactic> = found
            .iter()
            .filter(|t| matches!(t, Tactic::DiscoveredAttack { .. }))
            .collect();
        assert_eq!(discovered.len(), 1);
        assert!(matches!(
            discovered[0],
            Tactic::DiscoveredAttack {
                slider: Square::E1,
                blocker: Square::E4,
                target: Square::E8,
                significance: Significance::Check,
                ..
            }
        ));
    }

    #[test]
    fn test_battery_when_blocker_has_no_threat() {
        // The d2 pawn can only advance along the file
        let found = motifs("3r2k1/8/8/8/8/8/3P4/3R2K1 w - - 0 1");
        assert!(found.contains(&Tactic::Battery {
            side: Color::White,
            rear: Square::D1,
            front: Square::D2,
            target: Square::D8,
        }));
        // Seen from the other end the pawn is pinned to the rook
        assert!(found.contains(&Tactic::Pin {
            side: Color::Black,
            pinner: Square::D8,
            pinned: Square::D2,
            shielded: Square::D1,
            is_absolute: false,
        }));
    }

    #[test]
    fn test_one_classification_per_ray() {
        for fen in [
            "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R w KQkq - 1 5",
            "3r2k1/8/8/8/8/8/3P4/3R2K1 w - - 0 1",
            "4k3/8/8/8/R2q3r/8/8/4K3 w - - 0 1",
            "r3k2r/1b1q1ppp/p2p1n2/1p2p3/3NP3/1BN1Q3/PPP2PPP/R4RK1 b kq - 0 12",
        ] {
            let found = motifs(fen);
            let rays: HashSet<(Square, Square)> = found.iter().map(ray_of).collect();
            assert_eq!(rays.len(), found.len(), "duplicate ray claims in {fen}");
        }
    }

    #[test]
    fn test_ray_claims_are_geometrically_sound() {
        let found = motifs("r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R w KQkq - 1 5");
        for tactic in &found {
            let sq = tactic.squares();
            assert!(collinear(sq[0], sq[1], sq[2]), "{tactic:?}");
            if Direction::between(sq[0], sq[1]).is_some_and(|d| d.is_diagonal()) {
                assert!(same_square_color(sq[0], sq[2]), "{tactic:?}");
            }
        }
    }

    #[test]
    fn test_geometry_guard_rejects_bent_rays() {
        let diagonal = Direction { df: 1, dr: 1 };
        let ray = |dir, first, second| Ray {
            side: Color::White,
            slider: Square::A1,
            dir,
            first,
            second,
        };
        assert!(geometry_holds(&ray(diagonal, Square::C3, Square::E5)));
        // Second square off the diagonal
        assert!(!geometry_holds(&ray(diagonal, Square::C3, Square::E4)));
        // First square not in the walked direction
        assert!(!geometry_holds(&ray(Direction { df: 0, dr: 1 }, Square::C3, Square::E5)));
        // Collinear on a rank but claimed as a diagonal
        assert!(!geometry_holds(&ray(diagonal, Square::B1, Square::C1)));
    }
}
