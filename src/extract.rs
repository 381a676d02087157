//! Per-format text extraction
//!
//! One extractor per format family behind a capability trait. Extraction
//! is budgeted and best-effort: failures degrade to empty content so a
//! single unreadable file never aborts a search.

use crate::config::SearchConfig;
use crate::error::{NlfindError, Result};
use crate::walker::Candidate;
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Maximum spreadsheet sheets read per workbook
const MAX_SHEETS: usize = 3;

/// A text extractor for one format family
pub trait Extractor: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Whether this extractor claims the given dotted extension
    fn handles(&self, extension: &str) -> bool;

    /// Extract text from the file, reading at most what the budget needs
    fn extract(&self, path: &Path, budget: usize) -> Result<String>;
}

/// Plain text, code, and markup files
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn handles(&self, extension: &str) -> bool {
        let bare = extension.trim_start_matches('.');
        if TEXT_EXTENSIONS.contains(&bare) {
            return true;
        }
        mime_guess::from_ext(bare)
            .first()
            .map(|mime| mime.type_() == mime_guess::mime::TEXT)
            .unwrap_or(false)
    }

    fn extract(&self, path: &Path, budget: usize) -> Result<String> {
        let mut reader = File::open(path)?.take(budget as u64);
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// PDF documents
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn handles(&self, extension: &str) -> bool {
        extension == ".pdf"
    }

    fn extract(&self, path: &Path, _budget: usize) -> Result<String> {
        let bytes = std::fs::read(path)?;
        pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| NlfindError::Extraction(e.to_string()))
    }
}

/// Word documents (OOXML)
pub struct WordExtractor;

impl Extractor for WordExtractor {
    fn name(&self) -> &'static str {
        "word"
    }

    fn handles(&self, extension: &str) -> bool {
        extension == ".docx" || extension == ".doc"
    }

    fn extract(&self, path: &Path, _budget: usize) -> Result<String> {
        let file = File::open(path)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| NlfindError::Extraction(e.to_string()))?;
        let mut xml = Vec::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| NlfindError::Extraction(e.to_string()))?
            .read_to_end(&mut xml)?;
        Ok(wordprocessing_text(&String::from_utf8_lossy(&xml)))
    }
}

/// Spreadsheets (xlsx, xls, ods)
pub struct SpreadsheetExtractor;

impl Extractor for SpreadsheetExtractor {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    fn handles(&self, extension: &str) -> bool {
        matches!(extension, ".xlsx" | ".xls" | ".ods")
    }

    fn extract(&self, path: &Path, budget: usize) -> Result<String> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| NlfindError::Extraction(e.to_string()))?;
        let names = workbook.sheet_names().to_owned();

        let mut out = String::new();
        for name in names.iter().take(MAX_SHEETS) {
            let range = match workbook.worksheet_range(name) {
                Ok(r) => r,
                Err(e) => {
                    debug!("Skipping sheet {}: {}", name, e);
                    continue;
                }
            };
            for row in range.rows() {
                for cell in row {
                    if matches!(cell, Data::Empty) {
                        continue;
                    }
                    out.push_str(&cell.to_string());
                    out.push(' ');
                }
                out.push('\n');
                if out.len() >= budget {
                    return Ok(out);
                }
            }
        }
        Ok(out)
    }
}

/// Extractors in dispatch order, most specific first
static EXTRACTORS: &[&dyn Extractor] = &[
    &PdfExtractor,
    &WordExtractor,
    &SpreadsheetExtractor,
    &TextExtractor,
];

/// Find the extractor claiming an extension, if any
pub fn extractor_for(extension: &str) -> Option<&'static dyn Extractor> {
    EXTRACTORS.iter().copied().find(|e| e.handles(extension))
}

/// Extract searchable text from a candidate
///
/// Applies the size gate, dispatches by extension, and truncates to the
/// content budget. Every failure degrades to empty content: files with
/// no claiming extractor are treated as binary and yield nothing.
pub fn extract_content(candidate: &Candidate, config: &SearchConfig) -> String {
    if candidate.size > config.max_file_size {
        debug!(
            "Skipping content of {:?}: {} bytes exceeds limit",
            candidate.path, candidate.size
        );
        return String::new();
    }

    let extractor = match extractor_for(&candidate.extension) {
        Some(e) => e,
        None => return String::new(),
    };

    match extractor.extract(&candidate.path, config.content_budget) {
        Ok(text) => truncate_to_budget(text, config.content_budget),
        Err(e) => {
            debug!(
                "{} extraction failed for {:?}: {}",
                extractor.name(),
                candidate.path,
                e
            );
            String::new()
        }
    }
}

/// Truncate to at most `budget` bytes, backing up to a char boundary
fn truncate_to_budget(mut text: String, budget: usize) -> String {
    if text.len() <= budget {
        return text;
    }
    let mut cut = budget;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}

/// Strip WordprocessingML down to its text runs
///
/// Paragraph ends and breaks become newlines, tabs become tabs, and the
/// five named XML entities are decoded. Attribute noise is ignored.
fn wordprocessing_text(xml: &str) -> String {
    let mut out = String::new();
    let mut tag = String::new();
    let mut in_tag = false;

    for ch in xml.chars() {
        match ch {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' => {
                in_tag = false;
                let name = tag
                    .trim_end_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("");
                match name {
                    "/w:p" | "w:br" => out.push('\n'),
                    "w:tab" => out.push('\t'),
                    _ => {}
                }
            }
            c if in_tag => tag.push(c),
            c => out.push(c),
        }
    }

    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Extensions always treated as plain text
pub const TEXT_EXTENSIONS: &[&str] = &[
    // Code
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "c", "h",
    "cpp", "hpp", "cc", "cs", "rb", "php", "swift", "sh", "bash", "sql",
    // Markup and web
    "html", "htm", "css", "xml", "md", "rst", "tex",
    // Config and data
    "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "csv",
    "tsv", "ipynb", "log",
    // Plain
    "txt",
];
