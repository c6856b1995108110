//! Index file discovery.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Find index files under `root`.
///
/// A directory holding an index file is a fixture set: its subdirectories are
/// fixture folders and are not searched. Hidden entries are skipped.
pub fn find_index_files(root: &Path, index_file_name: &str) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && !inside_fixture_set(e, index_file_name)));

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cannot read directory entry");
                continue;
            }
        };

        if entry.file_type().is_file() && entry.file_name() == index_file_name {
            debug!(path = %entry.path().display(), "Found index file");
            found.push(entry.into_path());
        }
    }

    found.sort();
    found
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// A directory whose parent holds an index file.
fn inside_fixture_set(entry: &DirEntry, index_file_name: &str) -> bool {
    entry.file_type().is_dir()
        && entry
            .path()
            .parent()
            .is_some_and(|parent| parent.join(index_file_name).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_finds_nested_index_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("catalog/index.txt"));
        touch(&root.join("catalog/folder1/resp_body.json"));
        touch(&root.join("checkout/v2/index.txt"));
        touch(&root.join("readme.md"));

        let found = find_index_files(root, "index.txt");
        assert_eq!(
            found,
            vec![
                root.join("catalog/index.txt"),
                root.join("checkout/v2/index.txt"),
            ]
        );
    }

    #[test]
    fn test_does_not_descend_into_fixture_sets() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("set/index.txt"));
        touch(&root.join("set/folder1/index.txt"));

        let found = find_index_files(root, "index.txt");
        assert_eq!(found, vec![root.join("set/index.txt")]);
    }

    #[test]
    fn test_index_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("index.txt"));
        touch(&root.join("nested/index.txt"));

        assert_eq!(find_index_files(root, "index.txt"), vec![root.join("index.txt")]);
    }

    #[test]
    fn test_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join(".git/index.txt"));
        touch(&root.join("a/.index.txt"));

        assert!(find_index_files(root, "index.txt").is_empty());
    }

    #[test]
    fn test_custom_index_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/manifest.tsv"));
        touch(&root.join("b/index.txt"));

        assert_eq!(
            find_index_files(root, "manifest.tsv"),
            vec![root.join("a/manifest.tsv")]
        );
    }
}
