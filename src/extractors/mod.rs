// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text extraction for text-bearing formats
//!
//! The extractor is picked by the bucket a file was classified into. A file
//! that cannot be read or decoded yields empty text and a failure reason;
//! extraction never returns an error to the caller.

pub mod document;
pub mod pdf;
pub mod plain;
pub mod tabular;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Format family of a text-bearing bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Plain text, read up to the size ceiling
    PlainText,
    /// Delimited text or spreadsheet workbook, cells flattened
    Tabular,
    /// PDF, page by page
    Pdf,
    /// Word-processor document, paragraphs in order
    WordProcessor,
}

impl ExtractorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Tabular => "tabular",
            Self::Pdf => "pdf",
            Self::WordProcessor => "word_processor",
        }
    }
}

/// Text pulled from one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    /// The size ceiling cut the text short
    pub truncated: bool,
    /// Why no text could be produced
    pub failure: Option<String>,
}

impl Extraction {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// Raw output of a format-specific extractor
#[derive(Debug, Default)]
pub(crate) struct RawText {
    pub text: String,
    pub truncated: bool,
}

/// Dispatches files to the extractor for their format family
#[derive(Debug, Clone)]
pub struct TextExtractor {
    max_bytes: u64,
}

impl TextExtractor {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn extract(&self, kind: ExtractorKind, path: &Path) -> Extraction {
        debug!("Extracting {:?} as {}", path, kind.name());

        let result = match kind {
            ExtractorKind::PlainText => plain::extract(path, self.max_bytes),
            ExtractorKind::Tabular => tabular::extract(path, self.max_bytes),
            ExtractorKind::Pdf => pdf::extract(path, self.max_bytes),
            ExtractorKind::WordProcessor => document::extract(path, self.max_bytes),
        };

        match result {
            Ok(raw) => {
                let (text, cut) = truncate_text(raw.text, self.max_bytes);
                Extraction {
                    text,
                    truncated: raw.truncated || cut,
                    failure: None,
                }
            }
            Err(e) => {
                warn!("Failed to extract text from {:?}: {}", path, e);
                Extraction::failed(e.to_string())
            }
        }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

/// Cut `text` to at most `max_bytes`, on a char boundary
pub(crate) fn truncate_text(mut text: String, max_bytes: u64) -> (String, bool) {
    let max = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    if text.len() <= max {
        return (text, false);
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    (text, true)
}

/// Lowercase extension of a path, empty when missing
pub(crate) fn path_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_on_char_boundary() {
        let (text, cut) = truncate_text("héllo".to_string(), 2);
        assert_eq!(text, "h");
        assert!(cut);

        let (text, cut) = truncate_text("short".to_string(), 100);
        assert_eq!(text, "short");
        assert!(!cut);
    }

    #[test]
    fn test_missing_file_is_a_failure_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = TextExtractor::default();
        for kind in [
            ExtractorKind::PlainText,
            ExtractorKind::Tabular,
            ExtractorKind::Pdf,
            ExtractorKind::WordProcessor,
        ] {
            let result = extractor.extract(kind, &dir.path().join("missing.bin"));
            assert!(result.text.is_empty());
            assert!(result.failure.is_some(), "{:?} should record a failure", kind);
        }
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractorKind::WordProcessor).unwrap();
        assert_eq!(json, "\"word_processor\"");
    }
}
