//! Tactic differencing across a move

use std::collections::BTreeSet;

use serde::Serialize;

use crate::tactics::{IdentityKey, TacticCollection};

/// Identity keys that appeared, disappeared, or survived between two positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TacticDiff {
    pub new: BTreeSet<IdentityKey>,
    pub resolved: BTreeSet<IdentityKey>,
    pub persistent: BTreeSet<IdentityKey>,
}

impl TacticDiff {
    pub fn is_unchanged(&self) -> bool {
        self.new.is_empty() && self.resolved.is_empty()
    }

    /// String form of the three sets, for reports
    pub fn summary(&self) -> DiffSummary {
        let render = |keys: &BTreeSet<IdentityKey>| keys.iter().map(ToString::to_string).collect();
        DiffSummary {
            new: render(&self.new),
            resolved: render(&self.resolved),
            persistent: render(&self.persistent),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffSummary {
    pub new: Vec<String>,
    pub resolved: Vec<String>,
    pub persistent: Vec<String>,
}

/// Compares two collections by identity key only
pub fn diff_tactics(before: &TacticCollection, after: &TacticCollection) -> TacticDiff {
    let before = before.keys();
    let after = after.keys();
    TacticDiff {
        new: after.difference(&before).cloned().collect(),
        resolved: before.difference(&after).cloned().collect(),
        persistent: before.intersection(&after).cloned().collect(),
    }
}
