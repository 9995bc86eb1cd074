use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{FileEntry, LocalIndex, extension_of};

/// Index over the regular files directly inside a directory.
pub struct DirectoryIndex {
    dir: PathBuf,
    files: RwLock<Vec<FileEntry>>,
}

impl DirectoryIndex {
    /// Scans `dir` once. A scan failure leaves the index empty; call
    /// [`DirectoryIndex::rebuild`] to retry.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let index = Self {
            dir: dir.into(),
            files: RwLock::new(Vec::new()),
        };

        match index.rebuild() {
            Ok(count) => tracing::info!("Indexed {} files in {}", count, index.dir.display()),
            Err(e) => tracing::warn!("Failed to index {}: {}", index.dir.display(), e),
        }

        index
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rescans the directory and swaps in the new listing.
    pub fn rebuild(&self) -> io::Result<usize> {
        let files = scan_dir(&self.dir)?;
        let count = files.len();
        *self.files.write().unwrap_or_else(|e| e.into_inner()) = files;
        Ok(count)
    }
}

impl LocalIndex for DirectoryIndex {
    fn find(&self, term: &str) -> Vec<FileEntry> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|file| file.matches(term))
            .cloned()
            .collect()
    }

    fn entries(&self) -> Vec<FileEntry> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn scan_dir(dir: &Path) -> io::Result<Vec<FileEntry>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let checksum = match sha256_file(&entry.path()) {
            Ok(checksum) => checksum,
            Err(e) => {
                tracing::warn!("Skipping unreadable file {}: {}", name, e);
                continue;
            }
        };

        files.push(FileEntry {
            extension: extension_of(&name),
            name,
            size: metadata.len(),
            checksum,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
