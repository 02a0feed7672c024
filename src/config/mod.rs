// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Orderly
//!
//! Every component receives its slice of this value at construction; nothing
//! reads process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::extractors::ExtractorKind;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Extension and extractor tables
    #[serde(default)]
    pub classify: ClassifyConfig,

    /// Owner inference
    #[serde(default)]
    pub owners: OwnerConfig,

    /// Keyword and summary settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Move and collision settings
    #[serde(default)]
    pub relocation: RelocationConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifyConfig {
    /// Extra or overriding extension → bucket pairs, e.g. `{"heic": "jpgfiles"}`.
    /// Keys may be given with or without the leading dot.
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,

    /// Bucket → extractor used for text analysis
    #[serde(default = "default_extractors")]
    pub extractors: BTreeMap<String, ExtractorKind>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OwnerConfig {
    /// Known owner prefixes
    #[serde(default = "default_known_owners")]
    pub known: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
    /// Upper bound on bytes read (and text kept) per file
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelocationConfig {
    #[serde(default = "default_max_collision_probes")]
    pub max_collision_probes: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

// Default value functions
fn default_delimiter() -> char { '_' }
fn default_keyword_count() -> usize { 10 }
fn default_summary_sentences() -> usize { 3 }
fn default_min_token_length() -> usize { 3 }
fn default_max_text_bytes() -> u64 { 1024 * 1024 }
fn default_max_collision_probes() -> u32 { 10_000 }
fn default_db_path() -> String { "orderly.db".to_string() }

fn default_known_owners() -> Vec<String> {
    ["rohith", "sachin", "nitin", "himani"]
        .into_iter().map(String::from).collect()
}

fn default_extractors() -> BTreeMap<String, ExtractorKind> {
    [
        ("txtfiles", ExtractorKind::PlainText),
        ("mdfiles", ExtractorKind::PlainText),
        ("logfiles", ExtractorKind::PlainText),
        ("csvfiles", ExtractorKind::Tabular),
        ("tsvfiles", ExtractorKind::Tabular),
        ("xlsxfiles", ExtractorKind::Tabular),
        ("xlsfiles", ExtractorKind::Tabular),
        ("odsfiles", ExtractorKind::Tabular),
        ("pdffiles", ExtractorKind::Pdf),
        ("docxfiles", ExtractorKind::WordProcessor),
        ("odtfiles", ExtractorKind::WordProcessor),
    ]
    .into_iter()
    .map(|(bucket, kind)| (bucket.to_string(), kind))
    .collect()
}

fn default_stopwords() -> Vec<String> {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
        "with", "by", "from", "as", "into", "about", "than", "then", "so", "if",
        "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "could", "should", "may", "might",
        "must", "can", "shall", "not", "no", "nor", "only", "also", "very",
        "this", "that", "these", "those", "there", "here", "which", "who", "whom",
        "what", "when", "where", "why", "how", "all", "any", "each", "some", "such",
        "more", "most", "other", "own", "same", "too", "just", "over", "under",
        "again", "out", "off", "up", "down", "its", "our", "your", "their", "his",
        "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
        "my", "mine", "yours", "ours", "theirs",
    ]
    .into_iter().map(String::from).collect()
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            extensions: BTreeMap::new(),
            extractors: default_extractors(),
        }
    }
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            known: default_known_owners(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keyword_count: default_keyword_count(),
            summary_sentences: default_summary_sentences(),
            min_token_length: default_min_token_length(),
            max_text_bytes: default_max_text_bytes(),
            stopwords: default_stopwords(),
        }
    }
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            max_collision_probes: default_max_collision_probes(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::OrderlyError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.relocation.max_collision_probes == 0 {
            return Err(crate::OrderlyError::Config(
                "relocation.max_collision_probes must be at least 1".to_string(),
            ));
        }
        if self.owners.delimiter == '/' || self.owners.delimiter == '\\' {
            return Err(crate::OrderlyError::Config(
                "owners.delimiter cannot be a path separator".to_string(),
            ));
        }
        for (ext, bucket) in &self.classify.extensions {
            if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
                return Err(crate::OrderlyError::Config(format!(
                    "Invalid bucket name {:?} for extension {:?}", bucket, ext
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.analysis.keyword_count, 10);
        assert_eq!(config.owners.delimiter, '_');
        assert_eq!(config.classify.extractors.get("pdffiles"), Some(&ExtractorKind::Pdf));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"owners": {"known": ["alice"]}, "analysis": {"keyword_count": 4}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.owners.known, vec!["alice".to_string()]);
        assert_eq!(config.owners.delimiter, '_');
        assert_eq!(config.analysis.keyword_count, 4);
        assert_eq!(config.analysis.summary_sentences, 3);
        assert_eq!(config.relocation.max_collision_probes, 10_000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.classify.extensions.insert("heic".to_string(), "jpgfiles".to_string());
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.classify.extensions.get("heic").map(String::as_str), Some("jpgfiles"));
    }

    #[test]
    fn test_rejects_bad_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"classify": {"extensions": {"png": "../escape"}}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(crate::OrderlyError::Config(_))));
    }
}
