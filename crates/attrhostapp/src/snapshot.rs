//! # Selection Snapshot
//!
//! Buckets the active attributes for a status display. Always recomputed in full from
//! the tree and the overlay state; never patched.

use crate::model::{AttributeId, AttributeNode, HintType};
use crate::overlay::OverlayManager;
use crate::tree::AttributeTree;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSnapshot {
    pub accepted: usize,
    pub unaccepted: usize,
    pub direct_hints: usize,
    pub indirect_hints: usize,
    pub no_highlight: usize,
}

impl SelectionSnapshot {
    pub fn compute(tree: &AttributeTree, overlays: &OverlayManager, active: &[AttributeId]) -> Self {
        let mut snapshot = Self::default();
        for node in active.iter().filter_map(|id| tree.get(id)) {
            if !overlays.has_highlight(&node.id) {
                snapshot.no_highlight += 1;
                continue;
            }
            match node.hint_type {
                HintType::Direct => snapshot.direct_hints += 1,
                HintType::Indirect => snapshot.indirect_hints += 1,
                HintType::None if node.accepted => snapshot.accepted += 1,
                HintType::None => snapshot.unaccepted += 1,
            }
        }
        snapshot
    }

    pub fn total(&self) -> usize {
        self.accepted + self.unaccepted + self.direct_hints + self.indirect_hints + self.no_highlight
    }
}

/// Whether an active node's overlays are drawn when `active_count` nodes are active.
/// Indirect hints are only drawn when they are the sole active node.
pub fn is_displayed_in_selection(node: &AttributeNode, active_count: usize) -> bool {
    !(node.is_indirect_hint() && active_count > 1)
}
