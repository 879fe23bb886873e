//! # Data-Entry Controls
//!
//! Controls are the widgets that edit attributes. The host never inspects their concrete
//! type: everything it needs goes through [`DataEntryControl`], and the one optional
//! capability (showing validation errors inline) is asked for through
//! [`DataEntryControl::error_display`].
//!
//! Each control is registered with a [`ControlSpec`] that says which attribute name it
//! edits and where it sits in the control hierarchy. Routing (see
//! [`crate::propagation::route_tree`]) matches attributes to controls purely by these specs.

use crate::error::{HostError, Result};
use crate::model::{AttributeId, AttributeNode};
use crate::overlay::tiers::Color;
use crate::tree::DISPLAY_KEY_WIDTH;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlId(pub u32);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub id: ControlId,
    /// Name of the attributes this control edits.
    pub attribute_name: String,
    /// `None` for controls that receive root attributes.
    #[serde(default)]
    pub parent: Option<ControlId>,
    /// Level key used when composing display orders.
    #[serde(default)]
    pub display_key: String,
    #[serde(default = "default_tab_stop")]
    pub tab_stop: bool,
    /// Sub-attribute names the control edits itself (e.g. the columns of a table).
    #[serde(default)]
    pub owned_children: Vec<String>,
}

fn default_tab_stop() -> bool {
    true
}

impl ControlSpec {
    pub fn new(id: u32, attribute_name: impl Into<String>) -> Self {
        Self {
            id: ControlId(id),
            attribute_name: attribute_name.into(),
            parent: None,
            display_key: id.to_string(),
            tab_stop: true,
            owned_children: Vec::new(),
        }
    }

    pub fn child_of(mut self, parent: ControlId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_display_key(mut self, key: impl Into<String>) -> Self {
        self.display_key = key.into();
        self
    }

    pub fn without_tab_stop(mut self) -> Self {
        self.tab_stop = false;
        self
    }

    pub fn owning(mut self, names: &[&str]) -> Self {
        self.owned_children = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

/// Inline error display, for controls that show validation messages themselves.
pub trait ErrorDisplay {
    fn show_error(&mut self, attribute: AttributeId, message: &str);

    fn clear_error(&mut self, attribute: AttributeId);
}

pub trait DataEntryControl {
    /// Replaces the attributes the control is showing.
    fn set_attributes(&mut self, nodes: &[&AttributeNode]);

    /// Brings `node` into view in the control, selecting it when `select` is set.
    fn propagate_to_children(&mut self, node: &AttributeNode, select: bool);

    fn mark_active(&mut self, active: bool, color: Color);

    /// Whether the user can type into this control (as opposed to only swiping).
    fn supports_direct_input(&self) -> bool {
        true
    }

    /// Commits any edit in progress.
    fn end_edit(&mut self) {}

    /// Takes input focus.
    fn focus(&mut self) {}

    fn error_display(&mut self) -> Option<&mut dyn ErrorDisplay> {
        None
    }
}

struct RegisteredControl {
    spec: ControlSpec,
    control: Box<dyn DataEntryControl>,
}

/// Every control of the current session, keyed by id.
#[derive(Default)]
pub struct ControlRegistry {
    controls: HashMap<ControlId, RegisteredControl>,
    order: Vec<ControlId>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a control. A parent must be registered before its children.
    pub fn register(&mut self, spec: ControlSpec, control: Box<dyn DataEntryControl>) -> Result<()> {
        if self.controls.contains_key(&spec.id) {
            return Err(HostError::Contract(format!(
                "{} is already registered",
                spec.id
            )));
        }
        if spec.display_key.chars().count() > DISPLAY_KEY_WIDTH {
            return Err(HostError::Contract(format!(
                "display key of {} is longer than {} characters",
                spec.id, DISPLAY_KEY_WIDTH
            )));
        }
        if let Some(parent) = spec.parent {
            if !self.controls.contains_key(&parent) {
                return Err(HostError::ControlNotFound(parent));
            }
        }
        self.order.push(spec.id);
        self.controls.insert(spec.id, RegisteredControl { spec, control });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn contains(&self, id: ControlId) -> bool {
        self.controls.contains_key(&id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> &[ControlId] {
        &self.order
    }

    pub fn spec(&self, id: ControlId) -> Result<&ControlSpec> {
        self.controls
            .get(&id)
            .map(|c| &c.spec)
            .ok_or(HostError::ControlNotFound(id))
    }

    pub fn control_mut(&mut self, id: ControlId) -> Result<&mut (dyn DataEntryControl + 'static)> {
        self.controls
            .get_mut(&id)
            .map(|c| c.control.as_mut())
            .ok_or(HostError::ControlNotFound(id))
    }

    /// Direct children of `parent`, or the root controls for `None`.
    pub fn children_of(&self, parent: Option<ControlId>) -> Vec<ControlId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.controls.get(id).map(|c| c.spec.parent) == Some(parent))
            .collect()
    }

    /// Control that should own an attribute called `name` whose parent attribute is
    /// owned by `parent_owner` (`None` for root attributes).
    pub fn route(&self, parent_owner: Option<ControlId>, name: &str) -> Option<ControlId> {
        if let Some(owner) = parent_owner {
            let spec = &self.controls.get(&owner)?.spec;
            if spec.owned_children.iter().any(|n| n == name) {
                return Some(owner);
            }
        }
        self.children_of(parent_owner)
            .into_iter()
            .find(|id| {
                self.controls
                    .get(id)
                    .is_some_and(|c| c.spec.attribute_name == name)
            })
    }

    pub fn is_tab_stop(&self, id: ControlId) -> bool {
        self.controls.get(&id).is_some_and(|c| c.spec.tab_stop)
    }

    pub fn clear(&mut self) {
        self.controls.clear();
        self.order.clear();
    }
}
