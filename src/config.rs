//! Configuration types and constants for nlfind
//!
//! Defines search tunables and the directory exclusion rules applied
//! during traversal.

use crate::error::{NlfindError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a search run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory names pruned during traversal (case-insensitive)
    pub excluded_dirs: Vec<String>,
    /// Maximum file size whose content is extracted (bytes)
    pub max_file_size: u64,
    /// Maximum bytes of content read per file
    pub content_budget: usize,
    /// Number of parallel workers for matching
    pub workers: usize,
    /// How long to wait for the language-model parser stage
    pub llm_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            content_budget: 50 * 1024,       // 50 KB
            workers: num_cpus::get(),
            llm_timeout: Duration::from_secs(10),
        }
    }
}

impl SearchConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the excluded directory names
    pub fn with_excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.excluded_dirs = dirs;
        self
    }

    /// Set the maximum file size for content extraction
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set the per-file content budget
    pub fn with_content_budget(mut self, bytes: usize) -> Self {
        self.content_budget = bytes;
        self
    }

    /// Set the number of parallel workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the language-model parser timeout
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    /// Validate that the tunables are usable
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(NlfindError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.content_budget == 0 {
            return Err(NlfindError::Config(
                "content_budget must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if a directory name is excluded from traversal
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.excluded_dirs.iter().any(|d| d.to_lowercase() == lower)
    }
}

/// Directory names that are never descended into
pub const EXCLUDED_DIRS: &[&str] = &[
    // Version control
    ".git", ".hg", ".svn",
    // Python environments and caches
    ".venv", "venv", "__pycache__", ".mypy_cache", ".pytest_cache",
    "site-packages",
    // Build output
    "target", "node_modules",
    // Editor and tool state
    ".vscode", ".idea", ".cache",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.content_budget, 50 * 1024);
        assert_eq!(config.llm_timeout, Duration::from_secs(10));
        assert!(config.workers >= 1);
        assert!(config.excluded_dirs.iter().any(|d| d == ".git"));
    }

    #[test]
    fn test_builders() {
        let config = SearchConfig::new()
            .with_workers(2)
            .with_content_budget(1024)
            .with_llm_timeout(Duration::from_millis(250));
        assert_eq!(config.workers, 2);
        assert_eq!(config.content_budget, 1024);
        assert_eq!(config.llm_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate() {
        assert!(SearchConfig::default().validate().is_ok());
        assert!(SearchConfig::new().with_workers(0).validate().is_err());
        assert!(SearchConfig::new()
            .with_content_budget(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_is_excluded_dir() {
        let config = SearchConfig::default();
        assert!(config.is_excluded_dir(".git"));
        assert!(config.is_excluded_dir(".GIT"));
        assert!(config.is_excluded_dir("node_modules"));
        assert!(!config.is_excluded_dir("src"));
        assert!(!config.is_excluded_dir("docs"));
    }
}
