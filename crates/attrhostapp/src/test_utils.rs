use crate::controls::{ControlId, DataEntryControl, ErrorDisplay};
use crate::geometry::{Point, RasterZone};
use crate::model::{AttributeId, AttributeNode, Validity};
use crate::overlay::tiers::Color;
use crate::tree::AttributeTree;
use crate::validation::{ValidationOutcome, Validator};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What a [`RecordingControl`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    SetAttributes(Vec<AttributeId>),
    Propagate { node: AttributeId, select: bool },
    MarkActive(bool),
    EndEdit,
    Focus,
    ShowError(AttributeId, String),
    ClearError(AttributeId),
}

pub type CallLog = Rc<RefCell<Vec<(ControlId, ControlCall)>>>;

/// Control double that appends every call to a log shared between controls, so tests
/// can assert on ordering across controls.
pub struct RecordingControl {
    id: ControlId,
    log: CallLog,
    errors: RecordingErrors,
}

struct RecordingErrors {
    id: ControlId,
    log: CallLog,
}

impl RecordingControl {
    pub fn new(id: u32, log: &CallLog) -> Self {
        Self {
            id: ControlId(id),
            log: Rc::clone(log),
            errors: RecordingErrors {
                id: ControlId(id),
                log: Rc::clone(log),
            },
        }
    }

    fn record(&self, call: ControlCall) {
        self.log.borrow_mut().push((self.id, call));
    }
}

impl DataEntryControl for RecordingControl {
    fn set_attributes(&mut self, nodes: &[&AttributeNode]) {
        self.record(ControlCall::SetAttributes(
            nodes.iter().map(|n| n.id).collect(),
        ));
    }

    fn propagate_to_children(&mut self, node: &AttributeNode, select: bool) {
        self.record(ControlCall::Propagate {
            node: node.id,
            select,
        });
    }

    fn mark_active(&mut self, active: bool, _color: Color) {
        self.record(ControlCall::MarkActive(active));
    }

    fn end_edit(&mut self) {
        self.record(ControlCall::EndEdit);
    }

    fn focus(&mut self) {
        self.record(ControlCall::Focus);
    }

    fn error_display(&mut self) -> Option<&mut dyn ErrorDisplay> {
        Some(&mut self.errors)
    }
}

impl ErrorDisplay for RecordingErrors {
    fn show_error(&mut self, attribute: AttributeId, message: &str) {
        self.log
            .borrow_mut()
            .push((self.id, ControlCall::ShowError(attribute, message.to_string())));
    }

    fn clear_error(&mut self, attribute: AttributeId) {
        self.log
            .borrow_mut()
            .push((self.id, ControlCall::ClearError(attribute)));
    }
}

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Calls made to `control`, in order.
pub fn calls_to(log: &CallLog, control: ControlId) -> Vec<ControlCall> {
    log.borrow()
        .iter()
        .filter(|(id, _)| *id == control)
        .map(|(_, call)| call.clone())
        .collect()
}

/// Validator that answers from a fixed table keyed by attribute name. Unlisted names
/// are valid.
#[derive(Debug, Default, Clone)]
pub struct StaticValidator {
    pub outcomes: HashMap<String, ValidationOutcome>,
}

impl StaticValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalid(mut self, name: &str, message: &str) -> Self {
        self.outcomes
            .insert(name.to_string(), ValidationOutcome::invalid(message));
        self
    }

    pub fn warning(mut self, name: &str, message: &str) -> Self {
        self.outcomes
            .insert(name.to_string(), ValidationOutcome::warning(message));
        self
    }
}

impl Validator for StaticValidator {
    fn validate(&self, node: &AttributeNode, _correct: bool) -> ValidationOutcome {
        self.outcomes
            .get(&node.name)
            .cloned()
            .unwrap_or_else(ValidationOutcome::valid)
    }
}

/// Builds trees top-down. `child` nests under the node added last; `up` climbs back
/// one level so the next `child` becomes a sibling.
#[derive(Default)]
pub struct TreeBuilder {
    tree: AttributeTree,
    path: Vec<AttributeId>,
    ids: Vec<AttributeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, node: AttributeNode) -> Self {
        let id = self.tree.insert_root(node).expect("fresh node");
        self.path = vec![id];
        self.ids.push(id);
        self
    }

    pub fn child(mut self, node: AttributeNode) -> Self {
        let parent = *self.path.last().expect("child() needs a root first");
        let id = self.tree.insert_child(parent, node).expect("parent exists");
        self.path.push(id);
        self.ids.push(id);
        self
    }

    pub fn up(mut self) -> Self {
        self.path.pop();
        self
    }

    /// The tree plus every id in the order the nodes were added.
    pub fn build(self) -> (AttributeTree, Vec<AttributeId>) {
        (self.tree, self.ids)
    }
}

/// Horizontal zone on `page` starting at (`x`, `y`).
pub fn zone_at(page: u32, x: f64, y: f64, width: f64) -> RasterZone {
    RasterZone::new(Point::new(x, y), Point::new(x + width, y), 20.0, page)
}

/// Node with one zone, as extracted.
pub fn extracted(name: &str, text: &str, y: f64) -> AttributeNode {
    AttributeNode::new(name, text).with_zones(vec![zone_at(1, 100.0, y, 200.0)])
}

pub fn invalid_node(name: &str, message: &str) -> AttributeNode {
    let mut node = AttributeNode::new(name, "");
    node.validity = Validity::Invalid;
    node.validation_message = Some(message.to_string());
    node
}
