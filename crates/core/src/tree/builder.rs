//! Two-phase decision tree construction

use shakmaty::{Chess, Move, Position};
use tracing::{debug, warn};

use super::{GameTree, NodeKind, Phase};
use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::oracle::{uci, Evaluation, SearchOracle};
use crate::teachability::{rank_by_teachability, Candidate};

/// A head line ready to be attached to the tree
struct Head {
    line: Vec<Move>,
    evaluation: Evaluation,
    phase: Phase,
    score: f64,
}

/// Builds the decision tree for `pos`.
///
/// Screens `screen_breadth` oracle candidates at `screen_depth`, keeps the
/// `keep` most teachable, and re-searches each survivor at `deep_depth`.
/// Candidates that do not survive never enter the tree. The played move,
/// if given, is tagged on its matching alternative or added as its own head.
///
/// Only configuration problems and an illegal played move are errors. An
/// oracle failure yields a degraded tree holding whatever was already known.
pub fn build_decision_tree(
    pos: &Chess,
    played: Option<&Move>,
    oracle: &mut dyn SearchOracle,
    config: &TreeConfig,
) -> Result<GameTree> {
    config.validate()?;
    if let Some(mv) = played {
        if !pos.is_legal(mv.clone()) {
            return Err(Error::InvalidPosition(format!(
                "played move {} is not legal here",
                uci(mv)
            )));
        }
    }

    let mut tree = GameTree::new(pos.clone());
    if pos.legal_moves().is_empty() {
        debug!("decision point has no legal moves");
        return Ok(tree);
    }

    let screened = match oracle.candidates(pos, config.screen_breadth, config.screen_depth) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(error = %e, "screening failed, returning degraded tree");
            tree.mark_degraded(format!("screening failed: {e}"));
            if let Some(mv) = played {
                attach_played(&mut tree, mv);
            }
            return Ok(tree);
        }
    };

    let candidates: Vec<Candidate> = screened
        .into_iter()
        .filter(|line| !line.pv.is_empty())
        .map(|line| Candidate {
            root: pos.clone(),
            line: line.pv,
            evaluation: line.evaluation,
        })
        .collect();
    if candidates.is_empty() {
        warn!("screening returned no candidates, returning degraded tree");
        tree.mark_degraded("screening returned no candidates".to_string());
        if let Some(mv) = played {
            attach_played(&mut tree, mv);
        }
        return Ok(tree);
    }

    let ranked = rank_by_teachability(&candidates, &config.weights);
    debug!(
        screened = candidates.len(),
        kept = ranked.len().min(config.keep),
        "screening complete"
    );

    // Validation starts only once every screened candidate is scored
    let mut heads = Vec::new();
    for entry in ranked.iter().take(config.keep) {
        let candidate = &candidates[entry.index];
        let first = &candidate.line[0];
        match deep_line(oracle, pos, first, config.deep_depth) {
            Ok((line, evaluation)) => heads.push(Head {
                line,
                evaluation,
                phase: Phase::Validated,
                score: entry.score,
            }),
            Err(e) => {
                warn!(candidate = %uci(first), error = %e, "validation failed, keeping screened line");
                tree.mark_degraded(format!("validation of {} failed: {e}", uci(first)));
                heads.push(Head {
                    line: candidate.line.clone(),
                    evaluation: candidate.evaluation,
                    phase: Phase::Screened,
                    score: entry.score,
                });
            }
        }
    }

    let root = tree.root();
    for head in heads {
        if let Some(id) = tree.attach_line(root, &head.line, NodeKind::Alternative) {
            tree.annotate(id, Some(head.evaluation), head.phase, Some(head.score));
        }
    }
    debug!(alternatives = tree.alternatives().len(), "validation complete");

    if let Some(mv) = played {
        let matched = tree
            .alternatives()
            .into_iter()
            .find(|&id| tree.node(id).mv.as_ref() == Some(mv));
        match matched {
            Some(id) => tree.tag_played(id),
            None => match deep_line(oracle, pos, mv, config.deep_depth) {
                Ok((line, evaluation)) => {
                    if let Some(id) = tree.attach_line(root, &line, NodeKind::Played) {
                        tree.annotate(id, Some(evaluation), Phase::Validated, None);
                        tree.tag_played(id);
                    }
                }
                Err(e) => {
                    warn!(played = %uci(mv), error = %e, "could not evaluate the played move");
                    tree.mark_degraded(format!("evaluation of played move {} failed: {e}", uci(mv)));
                    attach_played(&mut tree, mv);
                }
            },
        }
    }

    Ok(tree)
}

/// Deep line starting with `first`, scored for the side playing it
fn deep_line(
    oracle: &mut dyn SearchOracle,
    pos: &Chess,
    first: &Move,
    depth: u8,
) -> Result<(Vec<Move>, Evaluation)> {
    let after = pos
        .clone()
        .play(first.clone())
        .map_err(|_| Error::InvalidPosition(format!("{} is not legal", uci(first))))?;
    let reply = oracle.evaluate(&after, depth)?;
    if reply.pv.is_empty() && !after.is_game_over() {
        return Err(Error::OracleUnavailable(format!(
            "no continuation after {}",
            uci(first)
        )));
    }

    let mut line = Vec::with_capacity(reply.pv.len() + 1);
    line.push(first.clone());
    line.extend(reply.pv);
    Ok((line, reply.evaluation.backed_up()))
}

/// Played move without an evaluation, for degraded trees
fn attach_played(tree: &mut GameTree, mv: &Move) {
    let root = tree.root();
    if let Some(id) = tree.attach_line(root, std::slice::from_ref(mv), NodeKind::Played) {
        tree.tag_played(id);
    }
}
