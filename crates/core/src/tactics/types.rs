//! Tactic types for motif detection

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Square};

/// Named checkmate geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatePatternKind {
    BackRank,
    Smothered,
    Arabian,
    Hook,
    Anastasia,
    Dovetail,
    Boden,
    DoubleBishop,
}

impl MatePatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatePatternKind::BackRank => "back_rank_mate",
            MatePatternKind::Smothered => "smothered_mate",
            MatePatternKind::Arabian => "arabian_mate",
            MatePatternKind::Hook => "hook_mate",
            MatePatternKind::Anastasia => "anastasia_mate",
            MatePatternKind::Dovetail => "dovetail_mate",
            MatePatternKind::Boden => "boden_mate",
            MatePatternKind::DoubleBishop => "double_bishop_mate",
        }
    }
}

/// Type of tactical/positional motif
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotifType {
    // Ray motifs
    Pin,
    Skewer,
    XRayAttack,
    XRayDefense,
    DiscoveredAttack,
    Battery,

    // Point motifs
    Fork,
    HangingPiece,
    TrappedPiece,
    OverloadedPiece,
    CapturableDefender,
    DoubleCheck,

    // King safety
    BackRankWeakness,
    ExposedKing,
    MateThreat,
    MatePattern(MatePatternKind),
}

impl MotifType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotifType::Pin => "pin",
            MotifType::Skewer => "skewer",
            MotifType::XRayAttack => "x_ray_attack",
            MotifType::XRayDefense => "x_ray_defense",
            MotifType::DiscoveredAttack => "discovered_attack",
            MotifType::Battery => "battery",
            MotifType::Fork => "fork",
            MotifType::HangingPiece => "hanging_piece",
            MotifType::TrappedPiece => "trapped_piece",
            MotifType::OverloadedPiece => "overloaded_piece",
            MotifType::CapturableDefender => "capturable_defender",
            MotifType::DoubleCheck => "double_check",
            MotifType::BackRankWeakness => "back_rank_weakness",
            MotifType::ExposedKing => "exposed_king",
            MotifType::MateThreat => "mate_threat",
            MotifType::MatePattern(kind) => kind.as_str(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MotifType::Pin => "Pin",
            MotifType::Skewer => "Skewer",
            MotifType::XRayAttack => "X-Ray Attack",
            MotifType::XRayDefense => "X-Ray Defense",
            MotifType::DiscoveredAttack => "Discovered Attack",
            MotifType::Battery => "Battery",
            MotifType::Fork => "Fork",
            MotifType::HangingPiece => "Hanging Piece",
            MotifType::TrappedPiece => "Trapped Piece",
            MotifType::OverloadedPiece => "Overloaded Piece",
            MotifType::CapturableDefender => "Capturable Defender",
            MotifType::DoubleCheck => "Double Check",
            MotifType::BackRankWeakness => "Back Rank Weakness",
            MotifType::ExposedKing => "Exposed King",
            MotifType::MateThreat => "Mate Threat",
            MotifType::MatePattern(MatePatternKind::BackRank) => "Back Rank Mate",
            MotifType::MatePattern(MatePatternKind::Smothered) => "Smothered Mate",
            MotifType::MatePattern(MatePatternKind::Arabian) => "Arabian Mate",
            MotifType::MatePattern(MatePatternKind::Hook) => "Hook Mate",
            MotifType::MatePattern(MatePatternKind::Anastasia) => "Anastasia's Mate",
            MotifType::MatePattern(MatePatternKind::Dovetail) => "Dovetail Mate",
            MotifType::MatePattern(MatePatternKind::Boden) => "Boden's Mate",
            MotifType::MatePattern(MatePatternKind::DoubleBishop) => "Double Bishop Mate",
        }
    }

    pub fn is_ray_motif(&self) -> bool {
        matches!(
            self,
            MotifType::Pin
                | MotifType::Skewer
                | MotifType::XRayAttack
                | MotifType::XRayDefense
                | MotifType::DiscoveredAttack
                | MotifType::Battery
        )
    }
}

/// How forcing a discovered attack is, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Threat,
    Capture,
    Check,
}

/// One concrete motif found in a position.
///
/// `side` is always the colour that profits from the motif.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tactic {
    Pin {
        side: Color,
        pinner: Square,
        pinned: Square,
        shielded: Square,
        is_absolute: bool,
    },
    Skewer {
        side: Color,
        attacker: Square,
        front: Square,
        rear: Square,
        is_absolute: bool,
    },
    XRayAttack {
        side: Color,
        attacker: Square,
        blocker: Square,
        target: Square,
    },
    XRayDefense {
        side: Color,
        defender: Square,
        blocker: Square,
        defended: Square,
    },
    DiscoveredAttack {
        side: Color,
        slider: Square,
        blocker: Square,
        target: Square,
        significance: Significance,
        /// Destination of the blocker's most forcing move
        reveal_to: Square,
    },
    Battery {
        side: Color,
        rear: Square,
        front: Square,
        target: Square,
    },
    Fork {
        side: Color,
        forker: Square,
        targets: Vec<Square>,
        is_check_fork: bool,
        is_royal_fork: bool,
    },
    HangingPiece {
        side: Color,
        square: Square,
        attackers: Vec<Square>,
    },
    TrappedPiece {
        side: Color,
        square: Square,
    },
    OverloadedPiece {
        side: Color,
        defender: Square,
        charges: Vec<Square>,
    },
    CapturableDefender {
        side: Color,
        attacker: Square,
        defender: Square,
        charge: Square,
    },
    DoubleCheck {
        side: Color,
        king: Square,
        checkers: Vec<Square>,
    },
    BackRankWeakness {
        side: Color,
        king: Square,
    },
    ExposedKing {
        side: Color,
        king: Square,
        shield_pawns: u8,
        attacked_zone: u8,
    },
    MateThreat {
        side: Color,
        from: Square,
        to: Square,
    },
    MatePattern {
        side: Color,
        kind: MatePatternKind,
        king: Square,
        mating_piece: Square,
    },
}

impl Tactic {
    pub fn motif_type(&self) -> MotifType {
        match self {
            Tactic::Pin { .. } => MotifType::Pin,
            Tactic::Skewer { .. } => MotifType::Skewer,
            Tactic::XRayAttack { .. } => MotifType::XRayAttack,
            Tactic::XRayDefense { .. } => MotifType::XRayDefense,
            Tactic::DiscoveredAttack { .. } => MotifType::DiscoveredAttack,
            Tactic::Battery { .. } => MotifType::Battery,
            Tactic::Fork { .. } => MotifType::Fork,
            Tactic::HangingPiece { .. } => MotifType::HangingPiece,
            Tactic::TrappedPiece { .. } => MotifType::TrappedPiece,
            Tactic::OverloadedPiece { .. } => MotifType::OverloadedPiece,
            Tactic::CapturableDefender { .. } => MotifType::CapturableDefender,
            Tactic::DoubleCheck { .. } => MotifType::DoubleCheck,
            Tactic::BackRankWeakness { .. } => MotifType::BackRankWeakness,
            Tactic::ExposedKing { .. } => MotifType::ExposedKing,
            Tactic::MateThreat { .. } => MotifType::MateThreat,
            Tactic::MatePattern { kind, .. } => MotifType::MatePattern(*kind),
        }
    }

    /// The colour that profits from this tactic
    pub fn side(&self) -> Color {
        match self {
            Tactic::Pin { side, .. }
            | Tactic::Skewer { side, .. }
            | Tactic::XRayAttack { side, .. }
            | Tactic::XRayDefense { side, .. }
            | Tactic::DiscoveredAttack { side, .. }
            | Tactic::Battery { side, .. }
            | Tactic::Fork { side, .. }
            | Tactic::HangingPiece { side, .. }
            | Tactic::TrappedPiece { side, .. }
            | Tactic::OverloadedPiece { side, .. }
            | Tactic::CapturableDefender { side, .. }
            | Tactic::DoubleCheck { side, .. }
            | Tactic::BackRankWeakness { side, .. }
            | Tactic::ExposedKing { side, .. }
            | Tactic::MateThreat { side, .. }
            | Tactic::MatePattern { side, .. } => *side,
        }
    }

    /// Squares bound to the tactic's roles, in role order
    pub fn squares(&self) -> Vec<Square> {
        match self {
            Tactic::Pin {
                pinner,
                pinned,
                shielded,
                ..
            } => vec![*pinner, *pinned, *shielded],
            Tactic::Skewer {
                attacker,
                front,
                rear,
                ..
            } => vec![*attacker, *front, *rear],
            Tactic::XRayAttack {
                attacker,
                blocker,
                target,
                ..
            } => vec![*attacker, *blocker, *target],
            Tactic::XRayDefense {
                defender,
                blocker,
                defended,
                ..
            } => vec![*defender, *blocker, *defended],
            Tactic::DiscoveredAttack {
                slider,
                blocker,
                target,
                ..
            } => vec![*slider, *blocker, *target],
            Tactic::Battery {
                rear,
                front,
                target,
                ..
            } => vec![*rear, *front, *target],
            Tactic::Fork {
                forker, targets, ..
            } => std::iter::once(*forker).chain(targets.iter().copied()).collect(),
            Tactic::HangingPiece { square, .. } => vec![*square],
            Tactic::TrappedPiece { square, .. } => vec![*square],
            Tactic::OverloadedPiece {
                defender, charges, ..
            } => std::iter::once(*defender).chain(charges.iter().copied()).collect(),
            Tactic::CapturableDefender {
                attacker,
                defender,
                charge,
                ..
            } => vec![*attacker, *defender, *charge],
            Tactic::DoubleCheck { king, checkers, .. } => {
                std::iter::once(*king).chain(checkers.iter().copied()).collect()
            }
            Tactic::BackRankWeakness { king, .. } => vec![*king],
            Tactic::ExposedKing { king, .. } => vec![*king],
            Tactic::MateThreat { from, to, .. } => vec![*from, *to],
            Tactic::MatePattern {
                king, mating_piece, ..
            } => vec![*king, *mating_piece],
        }
    }

    /// Structural identity used to compare tactics across positions
    pub fn identity_key(&self) -> IdentityKey {
        let mut squares = self.squares();
        squares.sort();
        IdentityKey {
            motif: self.motif_type(),
            squares,
        }
    }
}

/// `(motif type, sorted role squares)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub motif: MotifType,
    pub squares: Vec<Square>,
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let squares: Vec<String> = self.squares.iter().map(|sq| sq.to_string()).collect();
        write!(f, "{}:{}", self.motif.as_str(), squares.join(","))
    }
}

/// Where a tactic's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Exchange,
    Heuristic,
}

/// Material assessment of one tactic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticValue {
    /// Centipawns, from the perspective of the side exploiting the tactic
    pub material_delta: i32,
    pub is_sound: bool,
    pub defense_notes: String,
    pub source: ValueSource,
}

/// All tactics found in one position, grouped by motif type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacticCollection {
    by_motif: BTreeMap<MotifType, Vec<Tactic>>,
}

impl TacticCollection {
    /// Groups the tactics; a repeated identity key keeps its first tactic.
    pub fn new(tactics: impl IntoIterator<Item = Tactic>) -> Self {
        let mut seen = BTreeSet::new();
        let mut by_motif: BTreeMap<MotifType, Vec<Tactic>> = BTreeMap::new();
        for tactic in tactics {
            if seen.insert(tactic.identity_key()) {
                by_motif.entry(tactic.motif_type()).or_default().push(tactic);
            }
        }
        for group in by_motif.values_mut() {
            group.sort_by_cached_key(Tactic::identity_key);
        }
        Self { by_motif }
    }

    pub fn of(&self, motif: MotifType) -> &[Tactic] {
        self.by_motif.get(&motif).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tactic> {
        self.by_motif.values().flatten()
    }

    pub fn for_side(&self, side: Color) -> impl Iterator<Item = &Tactic> {
        self.iter().filter(move |t| t.side() == side)
    }

    pub fn motif_types(&self) -> impl Iterator<Item = MotifType> + '_ {
        self.by_motif.keys().copied()
    }

    pub fn keys(&self) -> BTreeSet<IdentityKey> {
        self.iter().map(Tactic::identity_key).collect()
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&Tactic> {
        self.of(key.motif).iter().find(|t| t.identity_key() == *key)
    }

    pub fn len(&self) -> usize {
        self.by_motif.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_motif.is_empty()
    }
}

impl FromIterator<Tactic> for TacticCollection {
    fn from_iter<I: IntoIterator<Item = Tactic>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(pinner: Square, pinned: Square, shielded: Square) -> Tactic {
        Tactic::Pin {
            side: Color::Black,
            pinner,
            pinned,
            shielded,
            is_absolute: true,
        }
    }

    #[test]
    fn test_identity_key_sorts_squares() {
        let key = pin(Square::B4, Square::C3, Square::E1).identity_key();
        assert_eq!(key.motif, MotifType::Pin);
        assert_eq!(key.squares, vec![Square::E1, Square::C3, Square::B4]);
        assert_eq!(key.to_string(), "pin:e1,c3,b4");
    }

    #[test]
    fn test_fork_key_ignores_flags() {
        let a = Tactic::Fork {
            side: Color::White,
            forker: Square::E5,
            targets: vec![Square::G6, Square::C6],
            is_check_fork: false,
            is_royal_fork: false,
        };
        let b = Tactic::Fork {
            side: Color::White,
            forker: Square::E5,
            targets: vec![Square::C6, Square::G6],
            is_check_fork: true,
            is_royal_fork: false,
        };
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_collection_groups_and_dedups() {
        let collection = TacticCollection::new(vec![
            pin(Square::B4, Square::C3, Square::E1),
            pin(Square::B4, Square::C3, Square::E1),
            Tactic::TrappedPiece {
                side: Color::White,
                square: Square::A8,
            },
        ]);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.of(MotifType::Pin).len(), 1);
        assert_eq!(collection.of(MotifType::Fork).len(), 0);
        assert_eq!(collection.for_side(Color::White).count(), 1);
        let key = pin(Square::B4, Square::C3, Square::E1).identity_key();
        assert!(collection.get(&key).is_some());
    }

    #[test]
    fn test_motif_names() {
        assert_eq!(MotifType::XRayAttack.as_str(), "x_ray_attack");
        assert_eq!(
            MotifType::MatePattern(MatePatternKind::Smothered).display_name(),
            "Smothered Mate"
        );
        assert!(MotifType::Battery.is_ray_motif());
        assert!(!MotifType::Fork.is_ray_motif());
    }
}
