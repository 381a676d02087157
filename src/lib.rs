//! # nlfind - natural-language file finder
//!
//! Describe the files you want in plain English and get back a ranked
//! list of matching paths. No index, no embeddings - every search scans
//! the tree fresh, extracts text per format, and scores matches.
//!
//! ## Features
//!
//! - **Plain-English queries**: "pdf files about neural networks"
//! - **Dual-stage parsing**: optional language-model parser with a
//!   deterministic keyword fallback, so searches always run
//! - **Format-aware extraction**: text, PDF, Word, and spreadsheet files
//! - **Parallel matching**: a bounded worker pool overlaps traversal
//!   with per-file matching
//! - **Deterministic ranking**: score, then depth, then path
//!
//! ## Example
//!
//! ```no_run
//! use nlfind::{SearchConfig, SearchRequest, Searcher};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let searcher = Searcher::new(SearchConfig::default())?;
//!     let request = SearchRequest::new(PathBuf::from("."), "markdown files about testing");
//!     let results = searcher.search(&request)?;
//!
//!     for result in results {
//!         println!("{} (score: {:.2})", result.relative_path, result.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod query;
pub mod searcher;
pub mod walker;

// Re-export commonly used types
pub use config::SearchConfig;
pub use error::{NlfindError, Result};
pub use extract::{extract_content, Extractor};
pub use matcher::{match_candidate, MatchField, MatchResult};
pub use query::{
    Combinator, ParseOutcome, QueryFieldExtractor, QueryFields, QueryParser, SearchQuery,
};
pub use searcher::{format_results, format_results_json, CancelToken, SearchRequest, Searcher};
pub use walker::{walk, Candidate};
