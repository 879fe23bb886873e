use super::{parse_document, AttributeStore, StoredDocument};
use crate::error::{HostError, Result};
use crate::tree::AttributeTree;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores the document as pretty-printed JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttributeStore for JsonFileStore {
    fn load(&self) -> Result<AttributeTree> {
        if !self.path.exists() {
            return Ok(AttributeTree::new());
        }
        let content = fs::read_to_string(&self.path).map_err(HostError::Io)?;
        parse_document(&content)?.into_tree()
    }

    fn save(&self, tree: &AttributeTree) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(HostError::Io)?;

        let content = serde_json::to_string_pretty(&StoredDocument::from_tree(tree))
            .map_err(HostError::Serialization)?;

        // Atomic write
        let tmp_file = dir.join(format!(".attributes-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(HostError::Io)?;
        fs::rename(&tmp_file, &self.path).map_err(HostError::Io)?;
        Ok(())
    }
}
