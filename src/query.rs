//! Natural-language prompt parsing
//!
//! Turns a free-text prompt into a structured query via a language-model
//! collaborator when one is configured, with a deterministic keyword
//! fallback when the collaborator is absent, fails, or times out.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// How multiple query clauses combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    /// Every non-empty clause must be satisfied
    #[default]
    And,
    /// At least one non-empty clause must be satisfied
    Or,
}

/// Structured form of a search prompt
///
/// All extensions are lower-cased with a leading dot; all terms are
/// lower-cased. A query with every collection empty matches any file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Acceptable file extensions (empty = any)
    pub extensions: BTreeSet<String>,
    /// Substrings looked for in file names
    pub filename_terms: Vec<String>,
    /// Substrings looked for in extracted content
    pub content_terms: Vec<String>,
    /// How the clauses combine
    pub combinator: Combinator,
}

impl SearchQuery {
    /// A query that matches every candidate
    pub fn match_all() -> Self {
        Self {
            extensions: BTreeSet::new(),
            filename_terms: Vec::new(),
            content_terms: Vec::new(),
            combinator: Combinator::And,
        }
    }

    /// Check whether this query matches unconditionally
    pub fn is_match_all(&self) -> bool {
        self.extensions.is_empty()
            && self.filename_terms.is_empty()
            && self.content_terms.is_empty()
    }

    /// Normalize a collaborator payload into a query
    ///
    /// Returns None when the payload normalizes to an empty query, which
    /// callers treat as an unusable primary result.
    pub fn from_fields(fields: QueryFields) -> Option<Self> {
        let mut extensions = BTreeSet::new();
        for raw in &fields.file_types {
            let trimmed = raw.trim().to_lowercase();
            let bare = trimmed
                .trim_start_matches('*')
                .trim_start_matches('.')
                .to_string();
            if !bare.is_empty() {
                extensions.insert(format!(".{}", bare));
            }
        }

        let normalize_terms = |raw: &[String]| -> Vec<String> {
            let mut terms = Vec::new();
            for term in raw {
                let t = term.trim().to_lowercase();
                if !t.is_empty() && !terms.contains(&t) {
                    terms.push(t);
                }
            }
            terms
        };

        let filename_terms = normalize_terms(&fields.filename_keywords);
        let content_terms = normalize_terms(&fields.content_keywords);

        if extensions.is_empty() && filename_terms.is_empty() && content_terms.is_empty() {
            return None;
        }

        let combinator = if fields.search_logic.eq_ignore_ascii_case("or") {
            Combinator::Or
        } else {
            Combinator::And
        };

        Some(Self {
            extensions,
            filename_terms,
            content_terms,
            combinator,
        })
    }
}

/// Which parser stage produced the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The language-model collaborator produced a usable query
    Primary(SearchQuery),
    /// The deterministic keyword parser produced the query
    Fallback(SearchQuery),
}

impl ParseOutcome {
    /// Borrow the parsed query regardless of stage
    pub fn query(&self) -> &SearchQuery {
        match self {
            Self::Primary(q) | Self::Fallback(q) => q,
        }
    }

    /// Consume the outcome, yielding the query
    pub fn into_query(self) -> SearchQuery {
        match self {
            Self::Primary(q) | Self::Fallback(q) => q,
        }
    }

    /// True when the fallback stage produced the query
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// Raw structured payload returned by the language-model collaborator
///
/// All fields are optional; missing or extra fields are tolerated so
/// collaborator implementations can evolve their schema independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFields {
    /// Requested extensions, with or without leading dot
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Keywords expected in file names
    #[serde(default)]
    pub filename_keywords: Vec<String>,
    /// Keywords expected in file content
    #[serde(default)]
    pub content_keywords: Vec<String>,
    /// "AND" or "OR"
    #[serde(default)]
    pub search_logic: String,
}

/// Interface to the language-model query parser
///
/// Implementations typically call an external model and deserialize the
/// structured response into QueryFields. The timeout is advisory for the
/// implementation; the caller enforces its own deadline regardless.
pub trait QueryFieldExtractor: Send + Sync {
    /// Extract structured query fields from a free-text prompt
    fn extract_query_fields(&self, prompt: &str, timeout: Duration) -> Result<QueryFields>;
}

/// Two-stage prompt parser
///
/// The primary stage delegates to a QueryFieldExtractor bounded by a
/// timeout; any failure falls through to the deterministic keyword
/// fallback. Parsing never fails: every prompt yields a query.
pub struct QueryParser {
    extractor: Option<Arc<dyn QueryFieldExtractor>>,
    timeout: Duration,
}

impl QueryParser {
    /// Create a parser with no collaborator (fallback only)
    pub fn new(timeout: Duration) -> Self {
        Self {
            extractor: None,
            timeout,
        }
    }

    /// Create a parser backed by a language-model collaborator
    pub fn with_extractor(extractor: Arc<dyn QueryFieldExtractor>, timeout: Duration) -> Self {
        Self {
            extractor: Some(extractor),
            timeout,
        }
    }

    /// Parse a prompt into a structured query
    pub fn parse(&self, prompt: &str) -> ParseOutcome {
        if let Some(query) = self.primary_parse(prompt) {
            return ParseOutcome::Primary(query);
        }
        ParseOutcome::Fallback(fallback_parse(prompt))
    }

    /// Run the collaborator stage on a helper thread, bounded by the timeout
    fn primary_parse(&self, prompt: &str) -> Option<SearchQuery> {
        let extractor = self.extractor.clone()?;
        let (tx, rx) = mpsc::channel();
        let owned = prompt.to_string();
        let timeout = self.timeout;

        thread::spawn(move || {
            let _ = tx.send(extractor.extract_query_fields(&owned, timeout));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(fields)) => match SearchQuery::from_fields(fields) {
                Some(query) => Some(query),
                None => {
                    debug!("Primary parser returned an empty query, falling back");
                    None
                }
            },
            Ok(Err(e)) => {
                debug!("Primary parser failed: {}", e);
                None
            }
            Err(_) => {
                debug!("Primary parser timed out after {:?}", self.timeout);
                None
            }
        }
    }
}

/// Deterministic keyword parser
///
/// Lower-cases the prompt, lifts literal dotted extensions and known
/// format words into the extension set, drops stop words, and uses the
/// remaining tokens as both filename and content terms.
fn fallback_parse(prompt: &str) -> SearchQuery {
    let lower = prompt.to_lowercase();

    let mut combinator = Combinator::And;
    for token in lower.split(|c: char| !c.is_alphanumeric()) {
        if token == "or" || token == "either" {
            combinator = Combinator::Or;
        }
    }

    let mut extensions = BTreeSet::new();
    let mut cleaned = lower.clone();
    if let Ok(re) = Regex::new(r"\.([a-z0-9]{1,8})\b") {
        for capture in re.captures_iter(&lower) {
            if let Some(ext) = capture.get(1) {
                extensions.insert(format!(".{}", ext.as_str()));
            }
        }
        cleaned = re.replace_all(&lower, " ").into_owned();
    }

    let mut terms: Vec<String> = Vec::new();
    for token in cleaned.split(|c: char| !c.is_alphanumeric()) {
        if token.len() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        if let Some((_, exts)) = EXTENSION_VOCAB.iter().find(|(word, _)| *word == token) {
            for ext in exts.iter() {
                extensions.insert((*ext).to_string());
            }
            continue;
        }
        if !terms.iter().any(|t| t == token) {
            terms.push(token.to_string());
        }
    }

    if extensions.is_empty() && terms.is_empty() {
        debug!("No usable tokens in prompt, matching all files");
        return SearchQuery::match_all();
    }

    SearchQuery {
        extensions,
        filename_terms: terms.clone(),
        content_terms: terms,
        combinator,
    }
}

/// Format words mapped to the extensions they imply
///
/// A word mapping to several extensions is satisfied by any one of them.
pub const EXTENSION_VOCAB: &[(&str, &[&str])] = &[
    ("python", &[".py"]),
    ("pdf", &[".pdf"]),
    ("pdfs", &[".pdf"]),
    ("excel", &[".xlsx", ".xls"]),
    ("spreadsheet", &[".xlsx", ".xls", ".csv"]),
    ("spreadsheets", &[".xlsx", ".xls", ".csv"]),
    ("word", &[".docx", ".doc"]),
    ("docx", &[".docx"]),
    ("powerpoint", &[".pptx", ".ppt"]),
    ("presentation", &[".pptx", ".ppt"]),
    ("presentations", &[".pptx", ".ppt"]),
    ("markdown", &[".md"]),
    ("json", &[".json"]),
    ("yaml", &[".yaml", ".yml"]),
    ("toml", &[".toml"]),
    ("csv", &[".csv"]),
    ("text", &[".txt"]),
    ("txt", &[".txt"]),
    ("notebook", &[".ipynb"]),
    ("notebooks", &[".ipynb"]),
    ("javascript", &[".js"]),
    ("typescript", &[".ts"]),
    ("rust", &[".rs"]),
    ("html", &[".html", ".htm"]),
    ("image", &[".png", ".jpg", ".jpeg", ".gif"]),
    ("images", &[".png", ".jpg", ".jpeg", ".gif"]),
];

/// Tokens carrying no search intent, dropped by the fallback parser
pub const STOP_WORDS: &[&str] = &[
    // Articles, pronouns, prepositions
    "the", "and", "any", "all", "about", "with", "from", "for", "that",
    "this", "these", "those", "them", "their", "there", "where", "which",
    "what", "into", "onto", "over", "under", "inside", "within", "some",
    "are", "was", "were", "have", "has", "had", "can", "could", "will",
    "would", "should", "you", "your", "not", "but", "either",
    // Verbs of requesting
    "find", "search", "show", "give", "get", "list", "locate", "look",
    "looking", "want", "need", "please",
    // Domain noise
    "file", "files", "folder", "folders", "directory", "directories",
    "document", "documents", "named", "called", "containing", "contains",
    "contain", "mentioning", "mentions", "mention", "related", "type",
    "types", "kind", "kinds",
];
