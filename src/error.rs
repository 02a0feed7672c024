// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Orderly

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Orderly operations
pub type Result<T> = std::result::Result<T, OrderlyError>;

/// Orderly error types
#[derive(Error, Debug)]
pub enum OrderlyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Input directory not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputUncreatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free name for {} after {attempts} attempts", .path.display())]
    CollisionExhausted { path: PathBuf, attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {id} cannot move from {from} to {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl OrderlyError {
    /// True for errors that abort a run before any file is touched
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::InputNotFound(_)
                | Self::NotADirectory(_)
                | Self::PermissionDenied(_)
                | Self::OutputUncreatable { .. }
        )
    }
}
