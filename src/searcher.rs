//! Search orchestration and result formatting
//!
//! Drives the full pipeline: request validation, prompt parsing, parallel
//! candidate matching, deterministic ranking, and terminal/JSON output.

use crate::config::SearchConfig;
use crate::error::{NlfindError, Result};
use crate::extract;
use crate::matcher::{self, MatchResult};
use crate::query::{QueryFieldExtractor, QueryParser, SearchQuery};
use crate::walker::{self, Candidate};
use colored::*;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{info, warn};

/// Default cap on returned results
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Bounded handoff between the traversal thread and the worker pool
const CHANNEL_CAPACITY: usize = 1024;

/// One search invocation
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Directory tree to search
    pub root_path: PathBuf,
    /// Free-text description of the wanted files
    pub prompt: String,
    /// Maximum number of results returned
    pub max_results: usize,
}

impl SearchRequest {
    /// Create a request with the default result cap
    pub fn new(root_path: PathBuf, prompt: &str) -> Self {
        Self {
            root_path,
            prompt: prompt.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set the result cap
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Cooperative cancellation flag shared with a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the search to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Natural-language file searcher
pub struct Searcher {
    config: SearchConfig,
    parser: QueryParser,
    pool: rayon::ThreadPool,
}

impl Searcher {
    /// Create a searcher using the keyword fallback parser only
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a searcher backed by a language-model query parser
    pub fn with_extractor(
        config: SearchConfig,
        extractor: Arc<dyn QueryFieldExtractor>,
    ) -> Result<Self> {
        Self::build(config, Some(extractor))
    }

    fn build(
        config: SearchConfig,
        extractor: Option<Arc<dyn QueryFieldExtractor>>,
    ) -> Result<Self> {
        config.validate()?;
        let parser = match extractor {
            Some(e) => QueryParser::with_extractor(e, config.llm_timeout),
            None => QueryParser::new(config.llm_timeout),
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| NlfindError::Config(e.to_string()))?;

        Ok(Self {
            config,
            parser,
            pool,
        })
    }

    /// Run a search to completion
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<MatchResult>> {
        self.search_with_cancel(request, &CancelToken::new())
    }

    /// Run a search that another thread can cancel through the token
    ///
    /// Cancellation is observed at every per-candidate boundary; a
    /// cancelled search returns an error and discards partial results.
    pub fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<MatchResult>> {
        let root = validate_request(request)?;

        let outcome = self.parser.parse(&request.prompt);
        if outcome.is_fallback() {
            info!("Parsed prompt with the keyword fallback");
        } else {
            info!("Parsed prompt with the language-model collaborator");
        }
        let query = outcome.into_query();

        let results = self.run_pipeline(root, &query, cancel)?;
        Ok(rank_results(results, request.max_results))
    }

    /// Stream candidates from a traversal thread through the worker pool
    fn run_pipeline(
        &self,
        root: PathBuf,
        query: &SearchQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<MatchResult>> {
        let (tx, rx) = mpsc::sync_channel::<Candidate>(CHANNEL_CAPACITY);

        let walk_config = self.config.clone();
        let walk_cancel = cancel.clone();
        let producer = thread::spawn(move || {
            for candidate in walker::walk(root, &walk_config) {
                if walk_cancel.is_cancelled() {
                    break;
                }
                if tx.send(candidate).is_err() {
                    break;
                }
            }
        });

        let results = Arc::new(Mutex::new(Vec::new()));

        self.pool.install(|| {
            rx.into_iter().par_bridge().for_each(|candidate| {
                if cancel.is_cancelled() {
                    return;
                }
                let verdict = matcher::match_candidate(query, &candidate, |c| {
                    extract::extract_content(c, &self.config)
                });
                if let Some(result) = verdict {
                    results.lock().unwrap().push(result);
                }
            });
        });

        if producer.join().is_err() {
            warn!("Traversal thread panicked");
        }

        if cancel.is_cancelled() {
            return Err(NlfindError::Cancelled);
        }

        let collected = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        info!("Matched {} files", collected.len());
        Ok(collected)
    }
}

/// Check the request and canonicalize its root, before any other work
fn validate_request(request: &SearchRequest) -> Result<PathBuf> {
    if request.prompt.trim().is_empty() {
        return Err(NlfindError::InvalidRequest("prompt is empty".to_string()));
    }
    if request.max_results == 0 {
        return Err(NlfindError::InvalidRequest(
            "max_results must be at least 1".to_string(),
        ));
    }
    if !request.root_path.is_dir() {
        return Err(NlfindError::InvalidRequest(format!(
            "{} is not a searchable directory",
            request.root_path.display()
        )));
    }
    Ok(request.root_path.canonicalize()?)
}

/// Sort by score descending, then shallower depth, then path, and truncate
fn rank_results(mut results: Vec<MatchResult>, max_results: usize) -> Vec<MatchResult> {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.depth.cmp(&b.depth))
            .then_with(|| a.path.cmp(&b.path))
    });
    results.truncate(max_results);
    results
}

/// Format search results for terminal display
pub fn format_results(results: &[MatchResult], show_details: bool) -> String {
    let mut output = String::new();

    for (i, result) in results.iter().enumerate() {
        let score_pct = (result.score * 100.0) as u32;
        let score_color = if score_pct >= 55 {
            "green"
        } else if score_pct >= 30 {
            "yellow"
        } else {
            "red"
        };

        output.push_str(&format!(
            "\n{} {} ({}%)\n",
            format!("[{}]", i + 1).dimmed(),
            result.relative_path.cyan().bold(),
            format!("{}", score_pct).color(score_color)
        ));

        if show_details {
            let modified = result
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let matched = if result.matched_on.is_empty() {
                "all files".to_string()
            } else {
                result
                    .matched_on
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            output.push_str(&format!(
                "    {}\n",
                format!(
                    "{} | {} | modified {} | matched: {}",
                    result.path.display(),
                    format_size(result.size),
                    modified,
                    matched
                )
                .dimmed()
            ));
        }
    }

    output
}

/// Format results as JSON
pub fn format_results_json(results: &[MatchResult]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Human-readable file size
fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryFields;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tempfile::TempDir;

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl QueryFieldExtractor for CountingExtractor {
        fn extract_query_fields(&self, _prompt: &str, _timeout: Duration) -> Result<QueryFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(QueryFields::default())
        }
    }

    fn searcher() -> Searcher {
        Searcher::new(SearchConfig::default().with_workers(2)).unwrap()
    }

    #[test]
    fn test_empty_tree_returns_empty() {
        let dir = TempDir::new().unwrap();
        let request = SearchRequest::new(dir.path().to_path_buf(), "python files");
        let results = searcher().search(&request).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_root_fails_before_any_work() {
        let calls = Arc::new(AtomicUsize::new(0));
        let searcher = Searcher::with_extractor(
            SearchConfig::default().with_workers(2),
            Arc::new(CountingExtractor {
                calls: calls.clone(),
            }),
        )
        .unwrap();

        let request = SearchRequest::new(PathBuf::from("/nonexistent/nlfind-test"), "python files");
        match searcher.search(&request) {
            Err(NlfindError::InvalidRequest(_)) => {}
            other => panic!("expected InvalidRequest, got {:?}", other.map(|r| r.len())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_prompt_is_invalid() {
        let dir = TempDir::new().unwrap();
        let request = SearchRequest::new(dir.path().to_path_buf(), "   ");
        assert!(matches!(
            searcher().search(&request),
            Err(NlfindError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_zero_max_results_is_invalid() {
        let dir = TempDir::new().unwrap();
        let request =
            SearchRequest::new(dir.path().to_path_buf(), "python files").with_max_results(0);
        assert!(matches!(
            searcher().search(&request),
            Err(NlfindError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_file_as_root_is_invalid() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let request = SearchRequest::new(file, "python files");
        assert!(matches!(
            searcher().search(&request),
            Err(NlfindError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_end_to_end_fallback_search() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src").join("learning_rates.py"),
            "machine learning experiments",
        )
        .unwrap();
        fs::write(dir.path().join("src").join("utils.py"), "helpers").unwrap();
        fs::write(dir.path().join("notes.txt"), "machine learning notes").unwrap();

        let request = SearchRequest::new(
            dir.path().to_path_buf(),
            "python files with machine learning",
        );
        let results = searcher().search(&request).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "learning_rates.py");
        assert_eq!(results[0].extension, ".py");
        // extension + one of two name terms + both content terms
        let expected = 0.20 + 0.35 * 0.5 + 0.45;
        assert!((results[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_excluded_dir_never_surfaces() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(
            dir.path().join(".git").join("notes.txt"),
            "machine learning needle",
        )
        .unwrap();
        fs::write(dir.path().join("kept.txt"), "plain").unwrap();

        let request = SearchRequest::new(dir.path().to_path_buf(), "text files");
        let results = searcher().search(&request).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "kept.txt");
        assert!(results.iter().all(|r| !r.relative_path.contains(".git")));
    }

    #[test]
    fn test_truncation_keeps_exact_top_five() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("a{:02}.txt", i)), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        for i in 0..10 {
            fs::write(dir.path().join("sub").join(format!("b{:02}.txt", i)), "x").unwrap();
        }

        let request =
            SearchRequest::new(dir.path().to_path_buf(), "text files").with_max_results(5);
        let results = searcher().search(&request).unwrap();

        // Equal scores, so shallower then lexicographic wins
        let paths: Vec<&str> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a00.txt", "a01.txt", "a02.txt", "a03.txt", "a04.txt"]);
    }

    #[test]
    fn test_idempotent_ordering() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.txt"), "alpha").unwrap();
        fs::write(dir.path().join("two.txt"), "beta").unwrap();
        fs::create_dir(dir.path().join("deep")).unwrap();
        fs::write(dir.path().join("deep").join("three.txt"), "gamma").unwrap();

        let searcher = searcher();
        let request = SearchRequest::new(dir.path().to_path_buf(), "text files");

        let first = searcher.search(&request).unwrap();
        let second = searcher.search(&request).unwrap();

        let key = |rs: &[MatchResult]| -> Vec<(String, f32)> {
            rs.iter().map(|r| (r.relative_path.clone(), r.score)).collect()
        };
        assert_eq!(key(&first), key(&second));
    }

    #[test]
    fn test_monotonic_scoring_end_to_end() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("training_loop.py"), "loss curves").unwrap();
        fs::write(dir.path().join("misc.py"), "nothing relevant").unwrap();

        // OR query: both files match on extension, one adds a name term
        let request = SearchRequest::new(dir.path().to_path_buf(), "python or training");
        let results = searcher().search(&request).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file_name, "training_loop.py");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_content_term_past_budget_does_not_match() {
        let dir = TempDir::new().unwrap();
        let mut early = "needle ".to_string();
        early.push_str(&"x".repeat(200));
        fs::write(dir.path().join("needle_early.txt"), early).unwrap();

        let mut late = "y".repeat(200);
        late.push_str(" needle");
        fs::write(dir.path().join("needle_late.txt"), late).unwrap();

        let config = SearchConfig::default()
            .with_workers(2)
            .with_content_budget(100);
        let searcher = Searcher::new(config).unwrap();
        let request = SearchRequest::new(dir.path().to_path_buf(), "needle files");
        let results = searcher.search(&request).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "needle_early.txt");
    }

    #[test]
    fn test_unextractable_file_still_matches_on_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("garbage.xlsx"), "not a real workbook").unwrap();

        let request = SearchRequest::new(dir.path().to_path_buf(), "excel spreadsheets");
        let results = searcher().search(&request).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_name, "garbage.xlsx");
    }

    #[test]
    fn test_excel_family_matches_both_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.xlsx"), "x").unwrap();
        fs::write(dir.path().join("legacy.xls"), "x").unwrap();
        fs::write(dir.path().join("readme.txt"), "x").unwrap();

        let request = SearchRequest::new(dir.path().to_path_buf(), "excel spreadsheets");
        let results = searcher().search(&request).unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert!(names.contains(&"report.xlsx"));
        assert!(names.contains(&"legacy.xls"));
        assert!(!names.contains(&"readme.txt"));
    }

    #[test]
    fn test_cancelled_search_returns_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let token = CancelToken::new();
        token.cancel();

        let request = SearchRequest::new(dir.path().to_path_buf(), "text files");
        assert!(matches!(
            searcher().search_with_cancel(&request, &token),
            Err(NlfindError::Cancelled)
        ));
    }

    #[test]
    fn test_match_all_prompt_returns_everything() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), "x").unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();

        let request = SearchRequest::new(dir.path().to_path_buf(), "show me all the files");
        let results = searcher().search(&request).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 0.0));
        // deterministic tie-break: lexicographic at equal depth
        assert_eq!(results[0].file_name, "a.bin");
    }

    #[test]
    fn test_rank_results_ordering() {
        let base = MatchResult {
            path: PathBuf::from("/r/z.txt"),
            relative_path: "z.txt".to_string(),
            file_name: "z.txt".to_string(),
            extension: ".txt".to_string(),
            size: 1,
            modified: None,
            score: 0.2,
            matched_on: vec![],
            depth: 1,
        };
        let mut high = base.clone();
        high.path = PathBuf::from("/r/sub/high.txt");
        high.score = 0.9;
        high.depth = 2;
        let mut shallow_tie = base.clone();
        shallow_tie.path = PathBuf::from("/r/a.txt");

        let ranked = rank_results(vec![base.clone(), high, shallow_tie], 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].path, PathBuf::from("/r/sub/high.txt"));
        assert_eq!(ranked[1].path, PathBuf::from("/r/a.txt"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_json_output_exposes_named_fields() {
        let result = MatchResult {
            path: PathBuf::from("/r/a.txt"),
            relative_path: "a.txt".to_string(),
            file_name: "a.txt".to_string(),
            extension: ".txt".to_string(),
            size: 10,
            modified: None,
            score: 0.2,
            matched_on: vec![crate::matcher::MatchField::Extension],
            depth: 1,
        };
        let json = format_results_json(&[result]).unwrap();
        assert!(json.contains("\"path\""));
        assert!(json.contains("\"file_name\""));
        assert!(json.contains("\"extension\""));
        assert!(json.contains("\"size\""));
        assert!(json.contains("\"score\""));
        assert!(json.contains("\"matched_on\""));
        assert!(json.contains("extension"));
    }
}
