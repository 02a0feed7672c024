// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Extension based type classification

use std::collections::HashMap;
use std::path::Path;

use crate::config::ClassifyConfig;
use crate::extractors::ExtractorKind;

/// Bucket for files whose extension is missing or not in the table
pub const CATCH_ALL_BUCKET: &str = "otherfiles";

const DEFAULT_EXTENSIONS: &[(&str, &str)] = &[
    // Images
    ("png", "pngfiles"),
    ("jpg", "jpgfiles"),
    ("jpeg", "jpgfiles"),
    ("gif", "giffiles"),
    ("bmp", "bmpfiles"),
    ("tiff", "tifffiles"),
    ("webp", "webpfiles"),
    // Videos
    ("mp4", "mp4files"),
    ("avi", "avifiles"),
    ("mov", "movfiles"),
    ("wmv", "wmvfiles"),
    ("flv", "flvfiles"),
    ("webm", "webmfiles"),
    ("mkv", "mkvfiles"),
    // Documents
    ("pdf", "pdffiles"),
    ("doc", "docfiles"),
    ("docx", "docxfiles"),
    ("odt", "odtfiles"),
    ("txt", "txtfiles"),
    ("md", "mdfiles"),
    ("log", "logfiles"),
    ("rtf", "rtffiles"),
    // Spreadsheets
    ("csv", "csvfiles"),
    ("tsv", "tsvfiles"),
    ("xls", "xlsfiles"),
    ("xlsx", "xlsxfiles"),
    ("ods", "odsfiles"),
    // Presentations
    ("ppt", "pptfiles"),
    ("pptx", "pptxfiles"),
    // Archives
    ("zip", "zipfiles"),
    ("rar", "rarfiles"),
    ("7z", "7zfiles"),
    ("tar", "tarfiles"),
    ("gz", "gzfiles"),
    // Audio
    ("mp3", "mp3files"),
    ("wav", "wavfiles"),
    ("flac", "flacfiles"),
    ("aac", "aacfiles"),
    // Code
    ("py", "pyfiles"),
    ("js", "jsfiles"),
    ("html", "htmlfiles"),
    ("css", "cssfiles"),
    ("java", "javafiles"),
    ("cpp", "cppfiles"),
    ("c", "cfiles"),
    // Data
    ("json", "jsonfiles"),
    ("xml", "xmlfiles"),
    ("sql", "sqlfiles"),
];

/// Maps filenames to output buckets by extension
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    table: HashMap<String, String>,
    extractors: HashMap<String, ExtractorKind>,
}

impl TypeClassifier {
    pub fn new(config: &ClassifyConfig) -> Self {
        let mut table: HashMap<String, String> = DEFAULT_EXTENSIONS
            .iter()
            .map(|(ext, bucket)| (ext.to_string(), bucket.to_string()))
            .collect();

        for (ext, bucket) in &config.extensions {
            table.insert(normalize_extension(ext), bucket.clone());
        }

        Self {
            table,
            extractors: config.extractors.clone().into_iter().collect(),
        }
    }

    /// Bucket for a filename; unknown or missing extensions land in the catch-all
    pub fn bucket_for(&self, filename: &str) -> &str {
        extension_of(filename)
            .and_then(|ext| self.table.get(&ext))
            .map(String::as_str)
            .unwrap_or(CATCH_ALL_BUCKET)
    }

    /// Extractor registered for a bucket, if its files carry text
    pub fn extractor_for(&self, bucket: &str) -> Option<ExtractorKind> {
        self.extractors.get(bucket).copied()
    }
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(&ClassifyConfig::default())
    }
}

/// Lowercase extension without the dot
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Type tag stored on file records: `.png`, or empty without an extension
pub fn type_tag(filename: &str) -> String {
    extension_of(filename)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
