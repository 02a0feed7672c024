// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! PDF text extraction

use std::path::Path;
use tracing::{debug, info, warn};

use super::RawText;
use crate::{OrderlyError, Result};

/// Extract text page by page.
///
/// A page that fails to decode contributes nothing; only a document that
/// cannot be loaded at all is an error. When no page yields any text the
/// whole document is retried with `pdf-extract`.
pub(crate) fn extract(path: &Path, max_bytes: u64) -> Result<RawText> {
    let bytes = std::fs::read(path)?;
    let doc = lopdf::Document::load_mem(&bytes)
        .map_err(|e| OrderlyError::Pdf(format!("Failed to load PDF: {}", e)))?;

    let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    let pages = doc.get_pages();
    let mut text = String::new();
    let mut failed_pages = 0usize;

    for &page_number in pages.keys() {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(page_text.trim_end());
                text.push('\n');
            }
            Err(e) => {
                debug!("Page {} of {:?} did not decode: {}", page_number, path, e);
                failed_pages += 1;
                text.push('\n');
            }
        }
        if text.len() > limit {
            return Ok(RawText { text, truncated: true });
        }
    }

    if failed_pages > 0 {
        warn!("{} of {} pages in {:?} had no extractable text", failed_pages, pages.len(), path);
    }

    if text.trim().is_empty() && !pages.is_empty() {
        if let Some(fallback) = extract_whole_document(path, &bytes) {
            text = fallback;
        }
    }

    info!("Extracted {} chars from {} pages of {:?}", text.len(), pages.len(), path);
    Ok(RawText { text, truncated: false })
}

/// `pdf-extract` can panic on malformed fonts, so the call is isolated
fn extract_whole_document(path: &Path, bytes: &[u8]) -> Option<String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    })) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            debug!("Whole-document extraction failed for {:?}: {}", path, e);
            None
        }
        Err(_) => {
            warn!("Whole-document extraction panicked for {:?}", path);
            None
        }
    }
}
