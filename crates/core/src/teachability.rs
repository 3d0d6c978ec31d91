//! Teachability ranking of candidate continuations
//!
//! A fixed linear score: motif points for new themes that show up early in
//! the line, a material term, mate and sacrifice bonuses, and penalties for
//! late-only themes and for giving away evaluation. Every coefficient comes
//! from [`TeachabilityWeights`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Move, Position};
use tracing::{trace, warn};

use crate::board::PAWN_VALUE;
use crate::diff::diff_tactics;
use crate::features::{developed_minors, material_balance};
use crate::oracle::Evaluation;
use crate::tactics::{analyze_tactics, MotifType, TacticCollection};

/// Caller-supplied scoring coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeachabilityWeights {
    pub double_check: f64,
    pub trapped_piece: f64,
    pub fork: f64,
    pub discovered_attack: f64,
    pub skewer: f64,
    pub pin: f64,
    pub mate_pattern: f64,
    pub mate_threat: f64,
    pub x_ray: f64,
    pub exposed_king: f64,
    pub overloaded_piece: f64,
    pub capturable_defender: f64,
    pub back_rank_weakness: f64,
    pub hanging_piece: f64,
    pub battery: f64,
    /// Points per 100 centipawns of material won along the line
    pub value_bonus_per_100cp: f64,
    pub checkmate_bonus: f64,
    pub checkmated_penalty: f64,
    pub sacrifice_bonus: f64,
    /// Points per minor piece developed along the line
    pub positional_bonus: f64,
    /// Charged once per motif type that only appears past `concept_depth`
    pub deep_only_penalty: f64,
    pub eval_loss_penalty_per_100cp: f64,
    /// Evaluation loss tolerated before the penalty applies
    pub eval_loss_threshold_cp: i32,
    /// Plies of the line in which a new motif still counts as the lesson
    pub concept_depth: usize,
}

impl Default for TeachabilityWeights {
    fn default() -> Self {
        Self {
            double_check: 60.0,
            trapped_piece: 60.0,
            fork: 45.0,
            discovered_attack: 40.0,
            skewer: 35.0,
            pin: 30.0,
            mate_pattern: 50.0,
            mate_threat: 30.0,
            x_ray: 25.0,
            exposed_king: 25.0,
            overloaded_piece: 25.0,
            capturable_defender: 25.0,
            back_rank_weakness: 20.0,
            hanging_piece: 15.0,
            battery: 10.0,
            value_bonus_per_100cp: 10.0,
            checkmate_bonus: 500.0,
            checkmated_penalty: 500.0,
            sacrifice_bonus: 80.0,
            positional_bonus: 5.0,
            deep_only_penalty: 10.0,
            eval_loss_penalty_per_100cp: 20.0,
            eval_loss_threshold_cp: 150,
            concept_depth: 3,
        }
    }
}

impl TeachabilityWeights {
    /// Base points for a motif family
    pub fn base_score(&self, motif: MotifType) -> f64 {
        match motif {
            MotifType::DoubleCheck => self.double_check,
            MotifType::TrappedPiece => self.trapped_piece,
            MotifType::Fork => self.fork,
            MotifType::DiscoveredAttack => self.discovered_attack,
            MotifType::Skewer => self.skewer,
            MotifType::Pin => self.pin,
            MotifType::MatePattern(_) => self.mate_pattern,
            MotifType::MateThreat => self.mate_threat,
            MotifType::XRayAttack | MotifType::XRayDefense => self.x_ray,
            MotifType::ExposedKing => self.exposed_king,
            MotifType::OverloadedPiece => self.overloaded_piece,
            MotifType::CapturableDefender => self.capturable_defender,
            MotifType::BackRankWeakness => self.back_rank_weakness,
            MotifType::HangingPiece => self.hanging_piece,
            MotifType::Battery => self.battery,
        }
    }

    pub(crate) fn coefficients(&self) -> [f64; 22] {
        [
            self.double_check,
            self.trapped_piece,
            self.fork,
            self.discovered_attack,
            self.skewer,
            self.pin,
            self.mate_pattern,
            self.mate_threat,
            self.x_ray,
            self.exposed_king,
            self.overloaded_piece,
            self.capturable_defender,
            self.back_rank_weakness,
            self.hanging_piece,
            self.battery,
            self.value_bonus_per_100cp,
            self.checkmate_bonus,
            self.checkmated_penalty,
            self.sacrifice_bonus,
            self.positional_bonus,
            self.deep_only_penalty,
            self.eval_loss_penalty_per_100cp,
        ]
    }
}

/// A candidate continuation from a decision point
#[derive(Debug, Clone)]
pub struct Candidate {
    pub root: Chess,
    /// Candidate move followed by the expected reply sequence
    pub line: Vec<Move>,
    /// Oracle score for the root side to move
    pub evaluation: Evaluation,
}

/// Where a candidate's score came from
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub motifs: f64,
    pub material: f64,
    pub mate: f64,
    pub sacrifice: f64,
    pub positional: f64,
    pub deep_only: f64,
    pub eval_loss: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.motifs + self.material + self.mate + self.sacrifice + self.positional
            - self.deep_only
            - self.eval_loss
    }
}

/// A candidate's rank entry; `index` points into the ranked slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub index: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// New motif types for the analyzed side within the concept depth
    pub motifs: Vec<MotifType>,
}

/// Scores every candidate and orders them best first.
///
/// Ties keep their input order. The evaluation-loss term compares each
/// candidate against the best evaluation among `candidates`.
pub fn rank_by_teachability(
    candidates: &[Candidate],
    weights: &TeachabilityWeights,
) -> Vec<RankedCandidate> {
    let best = candidates
        .iter()
        .map(|c| c.evaluation)
        .max_by_key(Evaluation::as_centipawns);

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let (breakdown, motifs) = score_candidate(candidate, best, weights);
            RankedCandidate {
                index,
                score: breakdown.total(),
                breakdown,
                motifs,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Walks one candidate line and accumulates its score
pub fn score_candidate(
    candidate: &Candidate,
    best: Option<Evaluation>,
    weights: &TeachabilityWeights,
) -> (ScoreBreakdown, Vec<MotifType>) {
    let side = candidate.root.turn();
    let mut breakdown = ScoreBreakdown::default();

    let root_tactics = analyze_tactics(&candidate.root);
    let mut known: BTreeSet<MotifType> = root_tactics.for_side(side).map(|t| t.motif_type()).collect();
    let mut early: Vec<MotifType> = Vec::new();
    let mut late: BTreeSet<MotifType> = BTreeSet::new();

    let start_balance = material_balance(candidate.root.board(), side);
    let mut lowest_balance = start_balance;
    let mut pos = candidate.root.clone();
    let mut previous: TacticCollection = root_tactics;

    for (ply, mv) in candidate.line.iter().enumerate() {
        pos = match pos.clone().play(mv.clone()) {
            Ok(next) => next,
            Err(_) => {
                warn!(ply, "candidate line contains an illegal move, scoring the prefix");
                break;
            }
        };
        let current = analyze_tactics(&pos);
        let diff = diff_tactics(&previous, &current);
        for key in &diff.new {
            let ours = current.get(key).is_some_and(|t| t.side() == side);
            if !ours || known.contains(&key.motif) {
                continue;
            }
            if ply < weights.concept_depth {
                known.insert(key.motif);
                early.push(key.motif);
                breakdown.motifs += weights.base_score(key.motif);
            } else {
                late.insert(key.motif);
            }
        }
        lowest_balance = lowest_balance.min(material_balance(pos.board(), side));
        previous = current;
    }

    breakdown.deep_only = late.difference(&known).count() as f64 * weights.deep_only_penalty;

    let end_balance = material_balance(pos.board(), side);
    let swing = end_balance - start_balance;
    breakdown.material = weights.value_bonus_per_100cp * swing as f64 / 100.0;

    let mates_for_side = pos.is_checkmate() && pos.turn() != side;
    if pos.is_checkmate() {
        breakdown.mate = if mates_for_side {
            weights.checkmate_bonus
        } else {
            -weights.checkmated_penalty
        };
    }

    let gave_material = lowest_balance < start_balance - PAWN_VALUE;
    if gave_material && (end_balance >= start_balance || mates_for_side) {
        breakdown.sacrifice = weights.sacrifice_bonus;
    }

    let developed = developed_minors(pos.board(), side) as f64
        - developed_minors(candidate.root.board(), side) as f64;
    breakdown.positional = weights.positional_bonus * developed.max(0.0);

    if let Some(best) = best {
        let loss = best.as_centipawns() - candidate.evaluation.as_centipawns();
        if loss > weights.eval_loss_threshold_cp {
            breakdown.eval_loss = weights.eval_loss_penalty_per_100cp * loss as f64 / 100.0;
        }
    }

    trace!(
        side = ?side,
        plies = candidate.line.len(),
        score = breakdown.total(),
        "scored candidate"
    );
    (breakdown, early)
}
