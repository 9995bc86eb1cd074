use super::{FileEntry, LocalIndex, extension_of};

#[derive(Debug, Default, Clone)]
pub struct MemoryIndex {
    files: Vec<FileEntry>,
}

impl MemoryIndex {
    pub fn new(files: Vec<FileEntry>) -> Self {
        Self { files }
    }

    /// Builds an index from bare names; sizes and checksums are derived from
    /// the name so entries stay distinguishable.
    pub fn with_names(names: &[&str]) -> Self {
        let files = names
            .iter()
            .map(|name| FileEntry {
                name: name.to_string(),
                size: name.len() as u64,
                checksum: format!("{:x}", name.len()),
                extension: extension_of(name),
            })
            .collect();
        Self { files }
    }
}

impl LocalIndex for MemoryIndex {
    fn find(&self, term: &str) -> Vec<FileEntry> {
        self.files
            .iter()
            .filter(|file| file.matches(term))
            .cloned()
            .collect()
    }

    fn entries(&self) -> Vec<FileEntry> {
        self.files.clone()
    }
}
