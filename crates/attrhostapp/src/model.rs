//! # Domain Model: Attributes
//!
//! A document's extracted data is a tree of [`AttributeNode`]s. Each node holds a text
//! value, the page regions the value came from, and the per-node status the data-entry
//! surface tracks: whether the user has seen it, whether it validated, whether its
//! spatial evidence was confirmed.
//!
//! ## Identity
//!
//! Nodes are identified by [`AttributeId`] (a UUID). Nodes are never compared by value;
//! every map in the crate is keyed by id, and every cross-reference (parent, children,
//! owning control) is an id looked up in the owning [`crate::tree::AttributeTree`].
//!
//! ## Hints
//!
//! A hint is a suggestion rather than confirmed data:
//! - [`HintType::Direct`]: the zones point at the candidate value itself.
//! - [`HintType::Indirect`]: the zones only point at related text (e.g. a label).
//!
//! Hints render as outlines, never as confirmed highlights, until the user accepts them.

use crate::controls::ControlId;
use crate::geometry::RasterZone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type AttributeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HintType {
    #[default]
    None,
    Direct,
    Indirect,
}

/// Outcome of the last validation pass over a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Validity {
    #[default]
    Valid,
    Invalid,
    /// Data is acceptable but questionable; shown with an icon, not counted as invalid.
    Warning,
}

#[derive(Debug, Clone)]
pub struct AttributeNode {
    pub id: AttributeId,
    /// Field name used to route the node to the control that edits it.
    pub name: String,
    pub text: String,
    pub spatial_zones: Vec<RasterZone>,
    pub children: Vec<AttributeId>,
    pub parent: Option<AttributeId>,
    pub owning_control: Option<ControlId>,
    pub hint_type: HintType,
    pub accepted: bool,
    pub viewed: bool,
    pub validity: Validity,
    pub validation_message: Option<String>,
    pub persistable: bool,
    /// Value was typed or swiped by the user rather than extracted.
    pub manually_edited: bool,
    pub display_order: String,
}

impl AttributeNode {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            text: text.into(),
            spatial_zones: Vec::new(),
            children: Vec::new(),
            parent: None,
            owning_control: None,
            hint_type: HintType::None,
            accepted: false,
            viewed: false,
            validity: Validity::Valid,
            validation_message: None,
            persistable: true,
            manually_edited: false,
            display_order: String::new(),
        }
    }

    pub fn with_zones(mut self, zones: Vec<RasterZone>) -> Self {
        self.spatial_zones = zones;
        self
    }

    pub fn with_hint(mut self, hint_type: HintType) -> Self {
        self.hint_type = hint_type;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn is_hint(&self) -> bool {
        self.hint_type != HintType::None
    }

    pub fn is_indirect_hint(&self) -> bool {
        self.hint_type == HintType::Indirect
    }

    pub fn has_spatial_info(&self) -> bool {
        !self.spatial_zones.is_empty()
    }

    /// Pages this node has zones on, ascending.
    pub fn pages(&self) -> BTreeSet<u32> {
        self.spatial_zones.iter().map(|z| z.page).collect()
    }

    pub fn zones_on_page(&self, page: u32) -> Vec<RasterZone> {
        self.spatial_zones
            .iter()
            .filter(|z| z.page == page)
            .copied()
            .collect()
    }

    /// Accepted or hand-entered values are drawn without confidence tiering.
    pub fn is_confirmed(&self) -> bool {
        self.accepted || self.manually_edited
    }
}
