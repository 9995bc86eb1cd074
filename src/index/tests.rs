//! Local Index Tests
//!
//! Validates the directory scanner (metadata, checksums, rescans) and the
//! case-insensitive name matching shared by every index.

#[cfg(test)]
mod tests {
    use crate::index::directory::DirectoryIndex;
    use crate::index::memory::MemoryIndex;
    use crate::index::{LocalIndex, extension_of};
    use std::fs;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("data4.txt"), "txt");
        assert_eq!(extension_of("ARCHIVE.TAR.GZ"), "gz");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_memory_index_matches_case_insensitively() {
        let index = MemoryIndex::with_names(&["Data4.TXT", "notes.md", "data10.bin"]);

        let names: Vec<String> = index.find("DATA").into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Data4.TXT".to_string(), "data10.bin".to_string()]);

        assert_eq!(index.find("").len(), 3, "empty term matches everything");
        assert!(index.find("missing").is_empty());
    }

    #[test]
    fn test_directory_index_scans_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello1.txt"), b"hello").unwrap();
        fs::write(dir.path().join("photo.JPG"), vec![0u8; 2048]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("hidden.txt"), b"x").unwrap();

        let index = DirectoryIndex::open(dir.path());
        let entries = index.entries();

        assert_eq!(entries.len(), 2, "subdirectories are not descended into");
        assert_eq!(entries[0].name, "hello1.txt");
        assert_eq!(entries[0].size, 5);
        assert_eq!(entries[0].extension, "txt");
        assert_eq!(
            entries[0].checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(entries[1].extension, "jpg");
        assert_eq!(entries[1].size, 2048);
    }

    #[test]
    fn test_directory_index_rebuild_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = DirectoryIndex::open(dir.path());
        assert!(index.find("report").is_empty());

        fs::write(dir.path().join("report.pdf"), b"%PDF").unwrap();
        assert_eq!(index.rebuild().unwrap(), 1);
        assert_eq!(index.find("REPORT").len(), 1);
    }

    #[test]
    fn test_missing_directory_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = DirectoryIndex::open(dir.path().join("does-not-exist"));

        assert!(index.entries().is_empty());
        assert_eq!(index.rebuild().unwrap(), 0);
    }
}
