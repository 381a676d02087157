//! Directory traversal and candidate discovery
//!
//! Walks the search root lazily, pruning excluded directories and
//! skipping hidden entries, backup files, and unreadable entries.

use crate::config::SearchConfig;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

/// A file discovered during traversal, with the metadata the matcher needs
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the search root
    pub relative_path: String,
    /// File name including extension
    pub file_name: String,
    /// Lower-cased extension with leading dot, empty when none
    pub extension: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, when available
    pub modified: Option<SystemTime>,
    /// Directory depth below the search root
    pub depth: usize,
}

/// Walk the tree under `root`, yielding candidate files lazily
///
/// Exclusion is exactly the configured directory set plus hidden and
/// `~`-prefixed entries; ambient ignore files are not consulted, so the
/// same tree always yields the same candidates. Entries that cannot be
/// read are logged and skipped.
pub fn walk(root: PathBuf, config: &SearchConfig) -> impl Iterator<Item = Candidate> {
    let excluded: HashSet<String> = config
        .excluded_dirs
        .iter()
        .map(|d| d.to_lowercase())
        .collect();

    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            if name.starts_with('~') {
                return false;
            }
            let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            !(is_dir && excluded.contains(name.to_lowercase().as_str()))
        })
        .build();

    walker.filter_map(move |entry| {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                return None;
            }
        };

        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping {:?}: {}", entry.path(), e);
                return None;
            }
        };

        let path = entry.path().to_path_buf();
        let relative_path = path
            .strip_prefix(&root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        let file_name = entry.file_name().to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        Some(Candidate {
            path,
            relative_path,
            file_name,
            extension,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            depth: entry.depth(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn collect(root: &TempDir, config: &SearchConfig) -> Vec<Candidate> {
        walk(root.path().to_path_buf(), config).collect()
    }

    #[test]
    fn test_walk_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(collect(&dir, &SearchConfig::default()).is_empty());
    }

    #[test]
    fn test_walk_yields_files_with_depth() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "top").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), "nested").unwrap();

        let mut candidates = collect(&dir, &SearchConfig::default());
        candidates.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].relative_path, "a.txt");
        assert_eq!(candidates[0].depth, 1);
        assert_eq!(candidates[1].relative_path, "sub/b.txt");
        assert_eq!(candidates[1].depth, 2);
        assert_eq!(candidates[1].file_name, "b.txt");
    }

    #[test]
    fn test_walk_prunes_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("config"), "secret").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules").join("x.js"), "dep").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("main.rs"), "code").unwrap();

        let candidates = collect(&dir, &SearchConfig::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].relative_path, "src/main.rs");
    }

    #[test]
    fn test_walk_skips_hidden_and_backup_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".hidden.txt"), "x").unwrap();
        fs::write(dir.path().join("~$report.docx"), "lock").unwrap();
        fs::write(dir.path().join("visible.txt"), "x").unwrap();

        let candidates = collect(&dir, &SearchConfig::default());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].file_name, "visible.txt");
    }

    #[test]
    fn test_walk_normalizes_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("REPORT.PDF"), "x").unwrap();
        fs::write(dir.path().join("Makefile"), "x").unwrap();

        let mut candidates = collect(&dir, &SearchConfig::default());
        candidates.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        assert_eq!(candidates[0].extension, "");
        assert_eq!(candidates[1].extension, ".pdf");
    }

    #[test]
    fn test_walk_yields_oversize_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), vec![b'x'; 100]).unwrap();

        let config = SearchConfig::default().with_max_file_size(10);
        let candidates = collect(&dir, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].size, 100);
    }
}
