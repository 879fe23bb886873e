//! # Attribute Tree
//!
//! The document's attributes, owned top-down in a single arena. A node's `children`
//! and `parent` fields are ids into the arena; the arena is the only owner, so there
//! are no reference cycles to manage and lookups in either direction are O(1).
//!
//! ## Document Order vs Display Order
//!
//! - **Document order** is a pre-order walk of the roots and each node's children, as
//!   loaded. It is the tie-breaker everywhere.
//! - **Display order** is the tab order. Each node's `display_order` string is its
//!   parent's order plus one segment for its own level (see [`display_segment`]), so
//!   plain string comparison orders a whole tree the way the user tabs through it.
//!
//! Nodes that were never routed to a control get a positional order from
//! [`AttributeTree::assign_positional_display_order`] so they still sort sensibly.

use crate::error::{HostError, Result};
use crate::model::{AttributeId, AttributeNode};
use std::collections::{HashMap, VecDeque};

pub mod traversal;

pub use traversal::{find_in_display_order, find_next_in_display_order, Direction, FindOptions};

/// Separates the per-level segments of a display order.
pub const DISPLAY_ORDER_SEPARATOR: char = '.';

/// Widest level key a display order can hold. Every `u32` control id fits.
pub const DISPLAY_KEY_WIDTH: usize = 10;

/// Digits of the sibling position. Every `usize` fits.
const POSITION_WIDTH: usize = 20;

/// One level of a display order: the level key (usually the owning control's order)
/// followed by the sibling position, both zero-padded to a fixed width so they compare
/// as strings. Keys longer than [`DISPLAY_KEY_WIDTH`] are rejected when a control is
/// registered.
pub fn display_segment(level_key: &str, position: usize) -> String {
    format!(
        "{:0>kw$}{:0pw$}",
        level_key,
        position,
        kw = DISPLAY_KEY_WIDTH,
        pw = POSITION_WIDTH
    )
}

pub fn compose_display_order(parent_order: Option<&str>, segment: &str) -> String {
    match parent_order {
        Some(parent) if !parent.is_empty() => {
            format!("{}{}{}", parent, DISPLAY_ORDER_SEPARATOR, segment)
        }
        _ => segment.to_string(),
    }
}

/// Path from a root to a target node, consumed root-first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genealogy(VecDeque<AttributeId>);

impl Genealogy {
    pub fn from_root_path(path: impl IntoIterator<Item = AttributeId>) -> Self {
        Self(path.into_iter().collect())
    }

    /// Removes and returns the shallowest remaining node.
    pub fn pop(&mut self) -> Option<AttributeId> {
        self.0.pop_front()
    }

    pub fn root(&self) -> Option<AttributeId> {
        self.0.front().copied()
    }

    pub fn target(&self) -> Option<AttributeId> {
        self.0.back().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeId> {
        self.0.iter()
    }
}

#[derive(Debug, Default, Clone)]
pub struct AttributeTree {
    nodes: HashMap<AttributeId, AttributeNode>,
    roots: Vec<AttributeId>,
}

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &AttributeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &AttributeId) -> Option<&AttributeNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &AttributeId) -> Option<&mut AttributeNode> {
        self.nodes.get_mut(id)
    }

    /// Like [`get`](Self::get), but a missing node is an error.
    pub fn node(&self, id: &AttributeId) -> Result<&AttributeNode> {
        self.nodes.get(id).ok_or(HostError::AttributeNotFound(*id))
    }

    pub fn node_mut(&mut self, id: &AttributeId) -> Result<&mut AttributeNode> {
        self.nodes
            .get_mut(id)
            .ok_or(HostError::AttributeNotFound(*id))
    }

    pub fn roots(&self) -> &[AttributeId] {
        &self.roots
    }

    /// Children of `parent`, or the roots when `parent` is `None`.
    pub fn children_of(&self, parent: Option<&AttributeId>) -> &[AttributeId] {
        match parent {
            None => &self.roots,
            Some(id) => self
                .nodes
                .get(id)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub fn insert_root(&mut self, node: AttributeNode) -> Result<AttributeId> {
        let position = self.roots.len();
        self.insert_at(None, position, node)
    }

    pub fn insert_child(&mut self, parent: AttributeId, node: AttributeNode) -> Result<AttributeId> {
        let position = self.node(&parent)?.children.len();
        self.insert_at(Some(parent), position, node)
    }

    /// Inserts `node` under `parent` (or as a root) at sibling `position`, clamped to
    /// the end. The node's own `children` are discarded: subtrees are built top-down.
    pub fn insert_at(
        &mut self,
        parent: Option<AttributeId>,
        position: usize,
        mut node: AttributeNode,
    ) -> Result<AttributeId> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(HostError::Contract(format!(
                "attribute {} is already in the tree",
                id
            )));
        }
        let siblings = match parent {
            None => &mut self.roots,
            Some(parent_id) => {
                &mut self
                    .nodes
                    .get_mut(&parent_id)
                    .ok_or(HostError::AttributeNotFound(parent_id))?
                    .children
            }
        };
        let position = position.min(siblings.len());
        siblings.insert(position, id);

        node.parent = parent;
        node.children.clear();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Detaches `id` and all its descendants, returning them in pre-order.
    pub fn remove_subtree(&mut self, id: &AttributeId) -> Result<Vec<AttributeNode>> {
        let parent = self.node(id)?.parent;
        let ids = self.descendants(id);

        match parent {
            None => self.roots.retain(|r| r != id),
            Some(parent_id) => {
                if let Some(p) = self.nodes.get_mut(&parent_id) {
                    p.children.retain(|c| c != id);
                }
            }
        }

        Ok(ids
            .into_iter()
            .filter_map(|node_id| self.nodes.remove(&node_id))
            .collect())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// `id` and everything below it, pre-order. Empty if `id` is unknown.
    pub fn descendants(&self, id: &AttributeId) -> Vec<AttributeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(id) {
            return out;
        }
        let mut stack = vec![*id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Every node in document order.
    pub fn walk(&self) -> Vec<AttributeId> {
        self.roots
            .iter()
            .flat_map(|root| self.descendants(root))
            .collect()
    }

    /// Full recount of nodes satisfying `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&AttributeNode) -> bool) -> usize {
        self.nodes.values().filter(|n| predicate(n)).count()
    }

    /// Root-to-node path by following `parent` links.
    pub fn path_to(&self, id: &AttributeId) -> Option<Genealogy> {
        let mut path = VecDeque::new();
        let mut current = Some(*id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            path.push_front(node_id);
            current = node.parent;
        }
        Some(Genealogy(path))
    }

    /// Gives every node that has no display order one derived from its position,
    /// keeping any order a control already assigned.
    pub fn assign_positional_display_order(&mut self) {
        let mut queue: VecDeque<(Option<AttributeId>, String)> = VecDeque::new();
        queue.push_back((None, String::new()));
        while let Some((parent, parent_order)) = queue.pop_front() {
            let children = self.children_of(parent.as_ref()).to_vec();
            for (position, child) in children.into_iter().enumerate() {
                let Some(node) = self.nodes.get_mut(&child) else {
                    continue;
                };
                if node.display_order.is_empty() {
                    let segment = display_segment("", position);
                    node.display_order = compose_display_order(Some(&parent_order), &segment);
                }
                queue.push_back((Some(child), node.display_order.clone()));
            }
        }
    }

    /// Sibling position of `id` under its parent (or among the roots).
    pub fn position_of(&self, id: &AttributeId) -> Option<usize> {
        let parent = self.nodes.get(id)?.parent;
        self.children_of(parent.as_ref())
            .iter()
            .position(|c| c == id)
    }
}
