// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Session and file records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::OrderlyError;

/// One relocated file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: String,
    pub session_id: String,
    /// Name the file had before the move
    pub filename: String,
    /// Lowercase extension with its dot, e.g. `.pdf`; empty without one
    pub file_type: String,
    pub bucket: String,
    pub owner: String,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub file_size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub moved_at: DateTime<Utc>,
    /// `None` when the bucket carries no text
    pub keywords: Option<Vec<String>>,
    pub summary: Option<String>,
    pub duplicate_sequence: u32,
    #[serde(default)]
    pub text_truncated: bool,
    #[serde(default)]
    pub analysis_error: Option<String>,
}

impl FileMetadata {
    pub fn is_duplicate(&self) -> bool {
        self.duplicate_sequence > 0
    }

    pub fn file_size_kb(&self) -> f64 {
        round2(self.file_size as f64 / 1024.0)
    }

    pub fn file_size_mb(&self) -> f64 {
        round2(self.file_size as f64 / (1024.0 * 1024.0))
    }

    /// Whether keywords were computed for this file
    pub fn has_text_analysis(&self) -> bool {
        self.keywords.as_ref().is_some_and(|k| !k.is_empty())
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Only running sessions move, and only to a terminal state
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Completed) | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = OrderlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(OrderlyError::Config(format!("Unknown session status: {}", other))),
        }
    }
}

/// A file that was left in place or not recorded, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// One organizer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSession {
    pub session_id: String,
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub total_files_processed: usize,
    pub files_by_type: BTreeMap<String, usize>,
    pub files_by_owner: BTreeMap<String, usize>,
    pub files_skipped: usize,
    pub failures: Vec<FileFailure>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub error_message: Option<String>,
}

impl ProcessingSession {
    pub fn new(session_id: String, input_directory: PathBuf, output_directory: PathBuf) -> Self {
        Self {
            session_id,
            input_directory,
            output_directory,
            total_files_processed: 0,
            files_by_type: BTreeMap::new(),
            files_by_owner: BTreeMap::new(),
            files_skipped: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            status: SessionStatus::Running,
            error_message: None,
        }
    }

    /// Time from start to completion, or to now while running
    pub fn duration(&self) -> Duration {
        self.completed_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Move to a terminal status; the completion time is set exactly once
    pub fn finalize(
        &mut self,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
        error: Option<String>,
    ) -> crate::Result<()> {
        if !self.status.can_transition_to(status) || self.completed_at.is_some() {
            return Err(OrderlyError::InvalidTransition {
                id: self.session_id.clone(),
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        self.completed_at = Some(completed_at);
        self.error_message = error;
        Ok(())
    }
}

/// Partial session fields written while a run progresses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub total_files_processed: Option<usize>,
    pub files_by_type: Option<BTreeMap<String, usize>>,
    pub files_by_owner: Option<BTreeMap<String, usize>>,
    pub files_skipped: Option<usize>,
    pub failures: Option<Vec<FileFailure>>,
}

impl SessionUpdate {
    pub fn apply_to(&self, session: &mut ProcessingSession) {
        if let Some(total) = self.total_files_processed {
            session.total_files_processed = total;
        }
        if let Some(ref by_type) = self.files_by_type {
            session.files_by_type = by_type.clone();
        }
        if let Some(ref by_owner) = self.files_by_owner {
            session.files_by_owner = by_owner.clone();
        }
        if let Some(skipped) = self.files_skipped {
            session.files_skipped = skipped;
        }
        if let Some(ref failures) = self.failures {
            session.failures = failures.clone();
        }
    }
}

/// What `organize` hands back
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session: ProcessingSession,
    /// Records in processing order
    pub files: Vec<FileMetadata>,
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    pub fn duplicates(&self) -> usize {
        self.files.iter().filter(|f| f.is_duplicate()).count()
    }
}
