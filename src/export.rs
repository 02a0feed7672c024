// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Analytics export: one CSV row per file plus aggregate counts

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::{round2, FileMetadata};
use crate::Result;

/// Flat CSV view of a [`FileMetadata`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    pub id: String,
    pub session_id: String,
    pub filename: String,
    pub file_type: String,
    pub bucket: String,
    pub owner: String,
    pub original_path: String,
    pub new_path: String,
    pub file_size: u64,
    pub file_size_mb: f64,
    pub created_at: String,
    pub modified_at: String,
    pub moved_at: String,
    /// Joined with `, `
    pub keywords: String,
    pub summary: String,
    pub duplicate_sequence: u32,
    pub is_duplicate: bool,
    pub text_truncated: bool,
    pub analysis_error: String,
}

impl From<&FileMetadata> for ExportRow {
    fn from(file: &FileMetadata) -> Self {
        Self {
            id: file.id.clone(),
            session_id: file.session_id.clone(),
            filename: file.filename.clone(),
            file_type: file.file_type.clone(),
            bucket: file.bucket.clone(),
            owner: file.owner.clone(),
            original_path: file.original_path.to_string_lossy().to_string(),
            new_path: file.new_path.to_string_lossy().to_string(),
            file_size: file.file_size,
            file_size_mb: file.file_size_mb(),
            created_at: file.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            modified_at: file.modified_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            moved_at: file.moved_at.to_rfc3339(),
            keywords: file.keywords.as_ref().map(|k| k.join(", ")).unwrap_or_default(),
            summary: file.summary.clone().unwrap_or_default(),
            duplicate_sequence: file.duplicate_sequence,
            is_duplicate: file.is_duplicate(),
            text_truncated: file.text_truncated,
            analysis_error: file.analysis_error.clone().unwrap_or_default(),
        }
    }
}

/// Write a header and one row per file; returns the row count
pub fn write_csv<W: Write>(writer: W, files: &[FileMetadata]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for file in files {
        wtr.serialize(ExportRow::from(file))?;
    }
    wtr.flush()?;
    Ok(files.len())
}

pub fn export_csv(path: &Path, files: &[FileMetadata]) -> Result<usize> {
    let count = write_csv(File::create(path)?, files)?;
    info!("Exported {} rows to {:?}", count, path);
    Ok(count)
}

/// Totals over a set of file records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_files: usize,
    pub total_size_mb: f64,
    pub text_analyzed: usize,
    pub duplicates: usize,
    /// Type tag counts, largest first
    pub by_type: Vec<(String, usize)>,
    /// Owner counts, largest first
    pub by_owner: Vec<(String, usize)>,
}

impl AnalyticsSummary {
    pub fn from_files(files: &[FileMetadata]) -> Self {
        let total_bytes: u64 = files.iter().map(|f| f.file_size).sum();
        Self {
            total_files: files.len(),
            total_size_mb: round2(total_bytes as f64 / (1024.0 * 1024.0)),
            text_analyzed: files.iter().filter(|f| f.has_text_analysis()).count(),
            duplicates: files.iter().filter(|f| f.is_duplicate()).count(),
            by_type: ranked(files.iter().map(|f| f.file_type.as_str())),
            by_owner: ranked(files.iter().map(|f| f.owner.as_str())),
        }
    }
}

fn ranked<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::sample_file;

    #[test]
    fn test_csv_columns() {
        let mut dup = sample_file("s1", "a.txt", 1);
        dup.owner = "sachin".to_string();
        let files = vec![sample_file("s1", "a.txt", 0), dup];

        let mut buf = Vec::new();
        assert_eq!(write_csv(&mut buf, &files).unwrap(), 2);

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "file_size_mb"));
        assert!(headers.iter().any(|h| h == "is_duplicate"));

        let rows: Vec<ExportRow> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].keywords, "budget, review");
        assert!(!rows[0].is_duplicate);
        assert!(rows[1].is_duplicate);
        assert_eq!(rows[1].owner, "sachin");
        assert_eq!(rows[0].created_at, "");
    }

    #[test]
    fn test_summary_counts() {
        let mut image = sample_file("s1", "b.png", 0);
        image.file_type = ".png".to_string();
        image.keywords = None;
        image.file_size = 2 * 1024 * 1024;
        let files = vec![
            sample_file("s1", "a.txt", 0),
            sample_file("s1", "c.txt", 1),
            image,
        ];

        let summary = AnalyticsSummary::from_files(&files);
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.text_analyzed, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.total_size_mb, 2.0);
        assert_eq!(
            summary.by_type,
            vec![(".txt".to_string(), 2), (".png".to_string(), 1)]
        );
        assert_eq!(summary.by_owner, vec![("rohith".to_string(), 3)]);
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.csv");
        export_csv(&path, &[sample_file("s1", "a.txt", 0)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("id,session_id,filename"));
        assert_eq!(text.lines().count(), 2);
    }
}
