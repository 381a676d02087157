//! Query evaluation and scoring
//!
//! Evaluates a structured query against one candidate at a time. Content
//! is fetched lazily through a caller-supplied closure, only when the
//! cheap metadata clauses have not already decided the outcome.

use crate::query::{Combinator, SearchQuery};
use crate::walker::Candidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Score contribution of a satisfied extension clause
pub const EXTENSION_WEIGHT: f32 = 0.20;
/// Score contribution of a fully matched filename clause
pub const FILENAME_WEIGHT: f32 = 0.35;
/// Score contribution of a fully matched content clause
pub const CONTENT_WEIGHT: f32 = 0.45;

/// Which clause a candidate satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Extension,
    Filename,
    Content,
}

impl std::fmt::Display for MatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Extension => "extension",
            Self::Filename => "filename",
            Self::Content => "content",
        };
        write!(f, "{}", name)
    }
}

/// A matching file with its relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the search root
    pub relative_path: String,
    /// File name including extension
    pub file_name: String,
    /// Lower-cased extension with leading dot
    pub extension: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, when available
    pub modified: Option<DateTime<Utc>>,
    /// Relevance in [0, 1]
    pub score: f32,
    /// Clauses this candidate satisfied
    pub matched_on: Vec<MatchField>,
    /// Directory depth below the search root, used for tie-breaking
    #[serde(skip)]
    pub depth: usize,
}

/// Evaluate a query against one candidate
///
/// Returns None when the candidate does not match. The extract closure
/// is invoked at most once, and only when the content clause has to be
/// consulted: under And a failed metadata clause short-circuits to
/// no-match first, under Or a satisfied metadata clause short-circuits
/// to match first.
pub fn match_candidate<F>(
    query: &SearchQuery,
    candidate: &Candidate,
    extract: F,
) -> Option<MatchResult>
where
    F: FnOnce(&Candidate) -> String,
{
    if query.is_match_all() {
        return Some(build_result(candidate, 0.0, Vec::new()));
    }

    let extension_ok = if query.extensions.is_empty() {
        None
    } else {
        Some(query.extensions.contains(&candidate.extension))
    };
    let filename_hits = if query.filename_terms.is_empty() {
        None
    } else {
        let name = candidate.file_name.to_lowercase();
        Some(count_matching_terms(&query.filename_terms, &name))
    };

    let mut score = 0.0f32;
    let mut matched_on = Vec::new();

    match query.combinator {
        Combinator::And => {
            if extension_ok == Some(false) || filename_hits == Some(0) {
                return None;
            }
            let content_hits = if query.content_terms.is_empty() {
                None
            } else {
                let content = extract(candidate).to_lowercase();
                let hits = count_matching_terms(&query.content_terms, &content);
                if hits == 0 {
                    return None;
                }
                Some(hits)
            };

            if extension_ok == Some(true) {
                score += EXTENSION_WEIGHT;
                matched_on.push(MatchField::Extension);
            }
            if let Some(hits) = filename_hits {
                score += FILENAME_WEIGHT * hits as f32 / query.filename_terms.len() as f32;
                matched_on.push(MatchField::Filename);
            }
            if let Some(hits) = content_hits {
                score += CONTENT_WEIGHT * hits as f32 / query.content_terms.len() as f32;
                matched_on.push(MatchField::Content);
            }
        }
        Combinator::Or => {
            if extension_ok == Some(true) {
                score += EXTENSION_WEIGHT;
                matched_on.push(MatchField::Extension);
            }
            if let Some(hits) = filename_hits {
                if hits > 0 {
                    score += FILENAME_WEIGHT * hits as f32 / query.filename_terms.len() as f32;
                    matched_on.push(MatchField::Filename);
                }
            }
            if matched_on.is_empty() {
                if query.content_terms.is_empty() {
                    return None;
                }
                let content = extract(candidate).to_lowercase();
                let hits = count_matching_terms(&query.content_terms, &content);
                if hits == 0 {
                    return None;
                }
                score += CONTENT_WEIGHT * hits as f32 / query.content_terms.len() as f32;
                matched_on.push(MatchField::Content);
            }
        }
    }

    Some(build_result(candidate, score.min(1.0), matched_on))
}

/// Count how many terms occur in the haystack
fn count_matching_terms(terms: &[String], haystack: &str) -> usize {
    terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count()
}

fn build_result(candidate: &Candidate, score: f32, matched_on: Vec<MatchField>) -> MatchResult {
    MatchResult {
        path: candidate.path.clone(),
        relative_path: candidate.relative_path.clone(),
        file_name: candidate.file_name.clone(),
        extension: candidate.extension.clone(),
        size: candidate.size,
        modified: candidate.modified.map(DateTime::<Utc>::from),
        score,
        matched_on,
        depth: candidate.depth,
    }
}
