// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Delimited text and spreadsheet workbooks
//!
//! Cells are flattened into one blob: cells of a row joined by spaces, rows
//! by newlines. Column structure is not kept.

use std::path::Path;

use super::plain::{decode_lossy, read_bounded};
use super::{path_extension, RawText};
use crate::{OrderlyError, Result};

pub(crate) fn extract(path: &Path, max_bytes: u64) -> Result<RawText> {
    match path_extension(path).as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => extract_workbook(path, max_bytes),
        "tsv" | "tab" => extract_delimited(path, b'\t', max_bytes),
        _ => extract_delimited(path, b',', max_bytes),
    }
}

/// Flatten delimited text read up to the size ceiling
fn extract_delimited(path: &Path, delimiter: u8, max_bytes: u64) -> Result<RawText> {
    let (bytes, truncated) = read_bounded(path, max_bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes.as_slice());

    let mut text = String::new();
    for record in reader.byte_records() {
        let record = record?;
        let cells: Vec<String> = record
            .iter()
            .map(|cell| decode_lossy(cell, false).trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect();
        if !cells.is_empty() {
            text.push_str(&cells.join(" "));
            text.push('\n');
        }
    }

    Ok(RawText { text, truncated })
}

/// Flatten every sheet of a workbook
fn extract_workbook(path: &Path, max_bytes: u64) -> Result<RawText> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| OrderlyError::Extraction(format!("Failed to open spreadsheet: {}", e)))?;

    let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    let mut text = String::new();

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| OrderlyError::Extraction(format!("Failed to read sheet {}: {}", sheet_name, e)))?;

        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|c| c.to_string().trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if cells.is_empty() {
                continue;
            }
            text.push_str(&cells.join(" "));
            text.push('\n');

            if text.len() > limit {
                return Ok(RawText { text, truncated: true });
            }
        }
    }

    Ok(RawText { text, truncated: false })
}
