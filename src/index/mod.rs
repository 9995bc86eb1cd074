//! Local File Index
//!
//! The search coordinator only needs a synchronous lookup of local files by
//! name. `DirectoryIndex` builds that lookup by scanning the shared directory;
//! `MemoryIndex` serves a fixed list and is used for embedding and tests.

pub mod directory;
pub mod memory;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

/// A file this peer offers to the network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    /// Hex-encoded SHA-256 of the content.
    pub checksum: String,
    /// Lowercased extension without the dot; empty when the name has none.
    pub extension: String,
}

impl FileEntry {
    pub fn matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

pub trait LocalIndex: Send + Sync {
    /// Files whose name contains `term`, case-insensitively.
    fn find(&self, term: &str) -> Vec<FileEntry>;

    fn entries(&self) -> Vec<FileEntry>;
}

pub fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
