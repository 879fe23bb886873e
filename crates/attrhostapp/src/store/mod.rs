//! # Attribute Storage
//!
//! The session loads and saves its tree through [`AttributeStore`]. Two implementations
//! ship with the crate:
//!
//! - [`json::JsonFileStore`]: one JSON document on disk, written atomically.
//! - [`memory::MemoryStore`]: in-memory, for tests and headless use.
//!
//! ## Format
//!
//! Documents are a nested list of [`StoredAttribute`]s wrapped in a versioned envelope:
//!
//! ```json
//! { "version": 1, "attributes": [ { "name": "Invoice", "text": "INV-1", "children": [] } ] }
//! ```
//!
//! A bare list of attributes (the legacy layout) is accepted on load, and every status
//! field is optional, so documents written before a field existed still load.
//! Only persistable attributes are written; a non-persistable node drops its subtree.

pub mod json;
pub mod memory;

use crate::error::Result;
use crate::geometry::RasterZone;
use crate::model::{AttributeId, AttributeNode, HintType, Validity};
use crate::tree::AttributeTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FORMAT_VERSION: u32 = 1;

pub trait AttributeStore {
    /// Loads the stored tree. A store with nothing in it yields an empty tree.
    fn load(&self) -> Result<AttributeTree>;

    fn save(&self, tree: &AttributeTree) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAttribute {
    #[serde(default = "Uuid::new_v4")]
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<RasterZone>,
    #[serde(default)]
    pub hint_type: HintType,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default)]
    pub manually_edited: bool,
    #[serde(default)]
    pub validity: Validity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StoredAttribute>,
}

impl StoredAttribute {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            text: text.into(),
            zones: Vec::new(),
            hint_type: HintType::None,
            accepted: false,
            viewed: false,
            manually_edited: false,
            validity: Validity::Valid,
            validation_message: None,
            children: Vec::new(),
        }
    }

    fn from_node(tree: &AttributeTree, node: &AttributeNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            text: node.text.clone(),
            zones: node.spatial_zones.clone(),
            hint_type: node.hint_type,
            accepted: node.accepted,
            viewed: node.viewed,
            manually_edited: node.manually_edited,
            validity: node.validity,
            validation_message: node.validation_message.clone(),
            children: stored_children(tree, Some(&node.id)),
        }
    }

    fn to_node(&self) -> AttributeNode {
        let mut node = AttributeNode::new(self.name.clone(), self.text.clone())
            .with_zones(self.zones.clone())
            .with_hint(self.hint_type);
        node.id = self.id;
        node.accepted = self.accepted;
        node.viewed = self.viewed;
        node.manually_edited = self.manually_edited;
        node.validity = self.validity;
        node.validation_message = self.validation_message.clone();
        node
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    pub attributes: Vec<StoredAttribute>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Versioned(StoredDocument),
    Legacy(Vec<StoredAttribute>),
}

fn stored_children(tree: &AttributeTree, parent: Option<&AttributeId>) -> Vec<StoredAttribute> {
    tree.children_of(parent)
        .iter()
        .filter_map(|id| tree.get(id))
        .filter(|node| node.persistable)
        .map(|node| StoredAttribute::from_node(tree, node))
        .collect()
}

impl StoredDocument {
    pub fn from_tree(tree: &AttributeTree) -> Self {
        Self {
            version: FORMAT_VERSION,
            saved_at: Some(Utc::now()),
            attributes: stored_children(tree, None),
        }
    }

    pub fn into_tree(self) -> Result<AttributeTree> {
        let mut tree = AttributeTree::new();
        let mut pending: Vec<(Option<AttributeId>, StoredAttribute)> =
            self.attributes.into_iter().map(|a| (None, a)).collect();
        pending.reverse();
        while let Some((parent, mut stored)) = pending.pop() {
            let node = stored.to_node();
            let id = match parent {
                None => tree.insert_root(node)?,
                Some(parent_id) => tree.insert_child(parent_id, node)?,
            };
            let children = std::mem::take(&mut stored.children);
            pending.extend(children.into_iter().rev().map(|c| (Some(id), c)));
        }
        Ok(tree)
    }
}

/// Parses a stored document in either the current or the legacy layout.
pub fn parse_document(content: &str) -> Result<StoredDocument> {
    let file: DocumentFile = serde_json::from_str(content)?;
    Ok(match file {
        DocumentFile::Versioned(doc) => doc,
        DocumentFile::Legacy(attributes) => StoredDocument {
            version: 0,
            saved_at: None,
            attributes,
        },
    })
}
