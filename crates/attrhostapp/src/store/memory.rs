use super::{AttributeStore, StoredDocument};
use crate::error::{HostError, Result};
use crate::tree::AttributeTree;
use std::cell::RefCell;

/// In-memory attribute store.
///
/// Keeps the stored form rather than the tree, so a load always goes through the same
/// conversion a file would. `RefCell` lets `save` take `&self` like the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RefCell<Option<StoredDocument>>,
    simulate_read_error: RefCell<bool>,
    saves: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StoredDocument) -> Self {
        let store = Self::default();
        *store.document.borrow_mut() = Some(document);
        store
    }

    /// Enable read error simulation for testing load failures.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        *self.simulate_read_error.borrow_mut() = simulate;
    }

    pub fn document(&self) -> Option<StoredDocument> {
        self.document.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl AttributeStore for MemoryStore {
    fn load(&self) -> Result<AttributeTree> {
        if *self.simulate_read_error.borrow() {
            return Err(HostError::Store("Simulated read error".to_string()));
        }
        match self.document.borrow().clone() {
            Some(document) => document.into_tree(),
            None => Ok(AttributeTree::new()),
        }
    }

    fn save(&self, tree: &AttributeTree) -> Result<()> {
        *self.document.borrow_mut() = Some(StoredDocument::from_tree(tree));
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
