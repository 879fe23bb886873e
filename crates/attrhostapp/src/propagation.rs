//! # Genealogy and Propagation
//!
//! Moving to an attribute means walking its genealogy (root first) and letting every
//! control along the way bring the right node into view. Consecutive nodes owned by the
//! same control form a run, and a run is propagated once using its deepest node, so a
//! control that edits both a row and its cells is asked to show the cell, not the row.
//!
//! Routing decides which control owns which node. It runs over the whole tree after every
//! structural change and also assigns display orders, so ownership and tab order are
//! always current when a genealogy is walked.
//!
//! The active-control bookkeeping lives here as [`FocusTracker`], a small state machine
//! that the session drives from focus events.

use crate::controls::{ControlId, ControlRegistry};
use crate::error::{HostError, Result};
use crate::model::AttributeId;
use crate::tree::{compose_display_order, display_segment, AttributeTree, Genealogy};
use tracing::debug;

/// Path from the root to `node`. Empty for `None` or an unknown node.
pub fn genealogy_of(tree: &AttributeTree, node: Option<&AttributeId>) -> Genealogy {
    node.and_then(|id| tree.path_to(id)).unwrap_or_default()
}

/// The node with the smallest display order; the earliest wins ties.
pub fn first_in_display_order(tree: &AttributeTree, nodes: &[AttributeId]) -> Option<AttributeId> {
    let mut best: Option<(&str, AttributeId)> = None;
    for id in nodes {
        let Some(node) = tree.get(id) else {
            continue;
        };
        match best {
            Some((order, _)) if node.display_order.as_str() >= order => {}
            _ => best = Some((node.display_order.as_str(), *id)),
        }
    }
    best.map(|(_, id)| id)
}

/// One propagate call: the deepest node of a run of nodes owned by `control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerRun {
    pub control: ControlId,
    pub node: AttributeId,
}

/// Pops `genealogy` and collapses consecutive same-owner nodes into runs.
///
/// A node without an owner was never routed; that is a caller error.
pub fn owner_runs(tree: &AttributeTree, mut genealogy: Genealogy) -> Result<Vec<OwnerRun>> {
    let mut runs: Vec<OwnerRun> = Vec::new();
    while let Some(id) = genealogy.pop() {
        let node = tree.node(&id)?;
        let control = node.owning_control.ok_or(HostError::Unrouted(id))?;
        match runs.last_mut() {
            Some(run) if run.control == control => run.node = id,
            _ => runs.push(OwnerRun { control, node: id }),
        }
    }
    Ok(runs)
}

/// Assigns owners and display orders to the whole tree.
///
/// Nodes no control claims keep no owner and get a positional display order.
pub fn route_tree(tree: &mut AttributeTree, controls: &ControlRegistry) {
    for id in tree.walk() {
        if let Some(node) = tree.get_mut(&id) {
            node.owning_control = None;
            node.display_order.clear();
        }
    }

    let mut pending: Vec<(Option<AttributeId>, Option<ControlId>, String)> =
        vec![(None, None, String::new())];
    let mut routed = 0usize;
    while let Some((parent, parent_owner, parent_order)) = pending.pop() {
        let children = tree.children_of(parent.as_ref()).to_vec();
        // Unrouted parents still pass their order down so their subtrees sort together.
        for (position, child) in children.into_iter().enumerate() {
            let Some(node) = tree.get_mut(&child) else {
                continue;
            };
            let owner = if parent.is_some() && parent_owner.is_none() {
                None
            } else {
                controls.route(parent_owner, &node.name)
            };
            let key = owner
                .and_then(|c| controls.spec(c).ok())
                .map(|spec| spec.display_key.clone())
                .unwrap_or_default();
            node.owning_control = owner;
            node.display_order =
                compose_display_order(Some(&parent_order), &display_segment(&key, position));
            if owner.is_some() {
                routed += 1;
            }
            pending.push((Some(child), owner, node.display_order.clone()));
        }
    }
    debug!(routed, total = tree.len(), "routed attribute tree");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveControl {
    #[default]
    Inactive,
    Active(ControlId),
}

impl ActiveControl {
    pub fn control(&self) -> Option<ControlId> {
        match self {
            ActiveControl::Inactive => None,
            ActiveControl::Active(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub control: ControlId,
    /// Focus moved because the user tabbed or clicked, not because the host window
    /// was reactivated.
    pub manual_navigation: bool,
}

/// What the session has to do after a focus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub from: Option<ControlId>,
    pub to: ControlId,
    /// Focus has to be moved to `to` because the event came from another control.
    pub refocus: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    state: ActiveControl,
    active_before_focus_lost: Option<ControlId>,
    last_clicked: Option<ControlId>,
    regaining_focus: bool,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ActiveControl {
        self.state
    }

    pub fn active(&self) -> Option<ControlId> {
        self.state.control()
    }

    pub fn on_control_clicked(&mut self, control: ControlId) {
        self.last_clicked = Some(control);
    }

    /// Leaves the active state, remembering the control to restore. Returns the control
    /// that was active.
    pub fn on_host_focus_lost(&mut self) -> Option<ControlId> {
        let previous = self.state.control();
        if previous.is_some() {
            self.active_before_focus_lost = previous;
        }
        self.state = ActiveControl::Inactive;
        self.regaining_focus = false;
        previous
    }

    pub fn on_host_focus_regained(&mut self) {
        self.regaining_focus = true;
    }

    /// Handles a control receiving focus. Returns `None` when nothing changes.
    ///
    /// Only the first focus event after the host regains focus can be retargeted.
    pub fn on_control_focus(&mut self, event: FocusEvent) -> Option<FocusChange> {
        let regaining = std::mem::take(&mut self.regaining_focus);
        let target = if !event.manual_navigation && regaining {
            self.active_before_focus_lost
                .or(self.last_clicked)
                .unwrap_or(event.control)
        } else {
            event.control
        };
        self.transition(target, target != event.control)
    }

    /// Activates `control` directly, e.g. after propagation moved focus there.
    pub fn activate(&mut self, control: ControlId) -> Option<FocusChange> {
        self.transition(control, false)
    }

    pub fn deactivate(&mut self) -> Option<ControlId> {
        let previous = self.state.control();
        self.state = ActiveControl::Inactive;
        previous
    }

    fn transition(&mut self, to: ControlId, refocus: bool) -> Option<FocusChange> {
        let from = self.state.control();
        if from == Some(to) {
            return None;
        }
        self.state = ActiveControl::Active(to);
        Some(FocusChange { from, to, refocus })
    }

    pub fn forget(&mut self, control: ControlId) {
        if self.state.control() == Some(control) {
            self.state = ActiveControl::Inactive;
        }
        if self.active_before_focus_lost == Some(control) {
            self.active_before_focus_lost = None;
        }
        if self.last_clicked == Some(control) {
            self.last_clicked = None;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
