//! Controls for a session with no form behind it.
//!
//! Every distinct attribute name at each level of the document gets one control, in
//! order of first appearance, so the session routes and orders the document the way a
//! form laid out in document order would.

use attrhostapp::model::AttributeId;
use attrhostapp::overlay::tiers::Color;
use attrhostapp::{AttributeNode, AttributeTree, ControlId, ControlSpec, DataEntryControl};
use std::collections::HashMap;
use tracing::{debug, trace};

pub struct HeadlessControl {
    id: ControlId,
}

impl HeadlessControl {
    pub fn new(id: ControlId) -> Self {
        Self { id }
    }
}

impl DataEntryControl for HeadlessControl {
    fn set_attributes(&mut self, nodes: &[&AttributeNode]) {
        trace!(control = %self.id, count = nodes.len(), "attributes set");
    }

    fn propagate_to_children(&mut self, node: &AttributeNode, select: bool) {
        debug!(control = %self.id, attribute = %node.name, select, "propagated");
    }

    fn mark_active(&mut self, active: bool, _color: Color) {
        trace!(control = %self.id, active, "marked");
    }

    fn supports_direct_input(&self) -> bool {
        false
    }
}

/// One control spec per (parent control, attribute name), parents first.
pub fn derive_controls(tree: &AttributeTree) -> Vec<ControlSpec> {
    let mut specs: Vec<ControlSpec> = Vec::new();
    let mut seen: HashMap<(Option<ControlId>, String), ControlId> = HashMap::new();
    let mut level: Vec<(Option<AttributeId>, Option<ControlId>)> = vec![(None, None)];

    while !level.is_empty() {
        let mut next = Vec::new();
        for (parent, parent_control) in level {
            for child in tree.children_of(parent.as_ref()) {
                let Some(node) = tree.get(child) else {
                    continue;
                };
                let key = (parent_control, node.name.clone());
                let control = *seen.entry(key).or_insert_with(|| {
                    let id = specs.len() as u32 + 1;
                    let spec = ControlSpec::new(id, node.name.clone());
                    specs.push(match parent_control {
                        Some(parent) => spec.child_of(parent),
                        None => spec,
                    });
                    ControlId(id)
                });
                next.push((Some(*child), Some(control)));
            }
        }
        level = next;
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_control_per_name_and_level() {
        let mut tree = AttributeTree::new();
        let invoice = tree.insert_root(AttributeNode::new("Invoice", "")).unwrap();
        tree.insert_child(invoice, AttributeNode::new("Line", "")).unwrap();
        tree.insert_child(invoice, AttributeNode::new("Line", "")).unwrap();
        tree.insert_root(AttributeNode::new("Vendor", "")).unwrap();
        tree.insert_root(AttributeNode::new("Line", "")).unwrap();

        let specs = derive_controls(&tree);
        let described: Vec<_> = specs
            .iter()
            .map(|s| (s.id.0, s.attribute_name.as_str(), s.parent.map(|p| p.0)))
            .collect();
        assert_eq!(
            described,
            vec![
                (1, "Invoice", None),
                (2, "Vendor", None),
                (3, "Line", None),
                (4, "Line", Some(1)),
            ]
        );
    }

    #[test]
    fn test_empty_tree_has_no_controls() {
        assert!(derive_controls(&AttributeTree::new()).is_empty());
    }
}
