//! Single-document JSON store.

use std::fs;
use std::path::{Path, PathBuf};

use super::ConversationStore;
use crate::error::StoreError;
use crate::models::Conversations;

/// Stores all conversations in one pretty-printed JSON document.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// failed write leaves the previous document intact. Concurrent writers are
/// not coordinated; the last rename wins.
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

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConversationStore for JsonFileStore {
    fn load(&self) -> Result<Conversations, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "store file missing, starting empty");
            return Ok(Conversations::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, conversations: &Conversations) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(conversations).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        tracing::debug!(
            path = %self.path.display(),
            conversations = conversations.len(),
            "store saved"
        );
        Ok(())
    }
}
