//! Active-conversation selection persisted between CLI invocations.
//!
//! The selection lives in a sidecar file next to the store (`chats.json` →
//! `chats.active`), holding just the conversation id.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Sidecar path for a given store path.
pub fn active_path(store_path: &Path) -> PathBuf {
    store_path.with_extension("active")
}

/// Read the persisted active id, if any.
pub fn read_active(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let id = content.trim();

    if id.is_empty() {
        return Ok(None);
    }

    Ok(Some(id.to_string()))
}

/// Persist the active id, or clear it.
pub fn write_active(path: &Path, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, id).with_context(|| format!("Failed to write {}", path.display()))
        }
        None if path.exists() => std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display())),
        None => Ok(()),
    }
}
