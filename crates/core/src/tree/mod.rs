//! Decision trees of candidate continuations
//!
//! Nodes live in one arena owned by the tree. Children are owned through
//! their ids; the parent link is a plain back-reference id.

use std::cell::OnceCell;

use serde::Serialize;
use shakmaty::{Chess, Move, Position};

use crate::diff::{diff_tactics, TacticDiff};
use crate::oracle::{uci, Evaluation};
use crate::tactics::{analyze_tactics, TacticCollection};

mod builder;

pub use builder::build_decision_tree;

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

/// What a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The decision point
    Root,
    /// Head of an engine-suggested alternative
    Alternative,
    /// Head of the move actually played, when no alternative matched it
    Played,
    /// Later move of a head's continuation chain
    Continuation,
}

/// Search phase a head node has been through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Screened,
    Validated,
}

#[derive(Debug)]
pub struct GameNode {
    pub position: Chess,
    /// Move leading here from the parent
    pub mv: Option<Move>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Oracle score for the side that played the head move; heads only
    pub evaluation: Option<Evaluation>,
    pub phase: Option<Phase>,
    pub played: bool,
    pub teachability: Option<f64>,
    tactics: OnceCell<TacticCollection>,
}

impl GameNode {
    fn new(position: Chess, mv: Option<Move>, parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            position,
            mv,
            parent,
            children: Vec::new(),
            kind,
            evaluation: None,
            phase: None,
            played: false,
            teachability: None,
            tactics: OnceCell::new(),
        }
    }

    /// Tactics of this node's position, computed on first access
    pub fn tactics(&self) -> &TacticCollection {
        self.tactics.get_or_init(|| analyze_tactics(&self.position))
    }

    pub fn is_head(&self) -> bool {
        matches!(self.kind, NodeKind::Alternative | NodeKind::Played)
    }
}

/// A decision point with its played line and engine alternatives
#[derive(Debug)]
pub struct GameTree {
    nodes: Vec<GameNode>,
    degraded: bool,
    notes: Vec<String>,
}

impl GameTree {
    pub fn new(root: Chess) -> Self {
        Self {
            nodes: vec![GameNode::new(root, None, None, NodeKind::Root)],
            degraded: false,
            notes: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &GameNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut GameNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &GameNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// True when the oracle failed and the tree holds unvalidated data
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub(crate) fn mark_degraded(&mut self, note: String) {
        self.degraded = true;
        self.notes.push(note);
    }

    /// Head nodes of the engine alternatives, in rank order
    pub fn alternatives(&self) -> Vec<NodeId> {
        self.node(self.root())
            .children
            .iter()
            .copied()
            .filter(|&id| self.node(id).kind == NodeKind::Alternative)
            .collect()
    }

    /// Head node of the played move, whichever kind it is
    pub fn played(&self) -> Option<NodeId> {
        self.node(self.root())
            .children
            .iter()
            .copied()
            .find(|&id| self.node(id).played)
    }

    /// Plays `line` from `parent`, attaching the first move as a head of
    /// `kind` and the rest as its continuation chain. Stops at the first
    /// illegal move.
    pub(crate) fn attach_line(&mut self, parent: NodeId, line: &[Move], kind: NodeKind) -> Option<NodeId> {
        let mut head = None;
        let mut at = parent;
        for (ply, mv) in line.iter().enumerate() {
            let Ok(position) = self.node(at).position.clone().play(mv.clone()) else {
                break;
            };
            let node_kind = if ply == 0 { kind } else { NodeKind::Continuation };
            let id = NodeId(self.nodes.len());
            self.nodes.push(GameNode::new(position, Some(mv.clone()), Some(at), node_kind));
            self.node_mut(at).children.push(id);
            head.get_or_insert(id);
            at = id;
        }
        head
    }

    pub(crate) fn annotate(
        &mut self,
        id: NodeId,
        evaluation: Option<Evaluation>,
        phase: Phase,
        teachability: Option<f64>,
    ) {
        let node = self.node_mut(id);
        node.evaluation = evaluation;
        node.phase = Some(phase);
        node.teachability = teachability;
    }

    pub(crate) fn tag_played(&mut self, id: NodeId) {
        self.node_mut(id).played = true;
    }

    /// Moves of a head's continuation chain, head move first
    pub fn line(&self, head: NodeId) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut at = Some(head);
        while let Some(id) = at {
            let node = self.node(id);
            moves.extend(node.mv.clone());
            at = node.children.first().copied();
        }
        moves
    }

    /// What changed between a node's parent and the node
    pub fn delta_from_parent(&self, id: NodeId) -> Option<TacticDiff> {
        let parent = self.node(id).parent?;
        Some(diff_tactics(self.node(parent).tactics(), self.node(id).tactics()))
    }

    /// Tactic difference between any two nodes, `a` taken as before
    pub fn compare(&self, a: NodeId, b: NodeId) -> TacticDiff {
        diff_tactics(self.node(a).tactics(), self.node(b).tactics())
    }

    /// Serializable outline of the root's heads
    pub fn summary(&self) -> Vec<HeadSummary> {
        self.node(self.root())
            .children
            .iter()
            .map(|&id| {
                let node = self.node(id);
                HeadSummary {
                    kind: node.kind,
                    line: self.line(id).iter().map(uci).collect(),
                    evaluation: node.evaluation,
                    phase: node.phase,
                    played: node.played,
                    teachability: node.teachability,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadSummary {
    pub kind: NodeKind,
    pub line: Vec<String>,
    pub evaluation: Option<Evaluation>,
    pub phase: Option<Phase>,
    pub played: bool,
    pub teachability: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::moves_from_uci;
    use crate::parse_fen;
    use crate::tactics::MotifType;

    fn tree_with_line(fen: &str, uci: &[&str]) -> (GameTree, NodeId) {
        let root = parse_fen(fen).unwrap();
        let line: Vec<String> = uci.iter().map(|s| s.to_string()).collect();
        let moves = moves_from_uci(&root, &line);
        let mut tree = GameTree::new(root);
        let head = tree.attach_line(tree.root(), &moves, NodeKind::Alternative).unwrap();
        (tree, head)
    }

    #[test]
    fn test_attach_line_builds_chain() {
        let (tree, head) = tree_with_line(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            &["e2e4", "e7e5", "g1f3"],
        );
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.node(head).kind, NodeKind::Alternative);
        assert_eq!(tree.node(head).parent, Some(tree.root()));
        assert_eq!(tree.line(head).iter().map(uci).collect::<Vec<_>>(), vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(tree.alternatives(), vec![head]);
    }

    #[test]
    fn test_delta_from_parent_sees_new_mate() {
        let (tree, head) = tree_with_line("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", &["a1a8"]);
        let delta = tree.delta_from_parent(head).unwrap();
        assert!(delta.new.iter().any(|k| matches!(k.motif, MotifType::MatePattern(_))));
        assert!(delta.resolved.iter().any(|k| k.motif == MotifType::MateThreat));
        assert!(tree.delta_from_parent(tree.root()).is_none());
    }

    #[test]
    fn test_compare_node_with_itself() {
        let (tree, head) = tree_with_line("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", &["a1a8"]);
        let same = tree.compare(head, head);
        assert!(same.is_unchanged());
        assert_eq!(same.persistent, tree.node(head).tactics().keys());
    }
}
