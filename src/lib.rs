// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Orderly: file classification, safe relocation and text analysis
//!
//! Sorts a directory tree into `{bucket}/{owner}/` folders without losing
//! files to name collisions, pulls text out of documents, and records
//! keywords, summaries and per-run statistics.

pub mod allocator;
pub mod analysis;
pub mod classify;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod export;
pub mod extractors;
pub mod models;
pub mod owner;

pub use config::AppConfig;
pub use engine::OrganizerEngine;
pub use error::{OrderlyError, Result};
