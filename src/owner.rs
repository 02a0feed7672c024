// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Owner inference from filename prefixes
//!
//! The owner is a naming convention, not an identity: `alice_budget.xlsx`
//! belongs to `alice` because of how it is named, nothing more. Resolution
//! never fails; anything that cannot be read as an owner maps to
//! [`UNKNOWN_OWNER`].

use std::path::Path;

use crate::config::OwnerConfig;

/// Sentinel owner for files without a usable prefix
pub const UNKNOWN_OWNER: &str = "unknown";

#[derive(Debug, Clone)]
pub struct OwnerResolver {
    known: Vec<String>,
    delimiter: char,
}

impl OwnerResolver {
    pub fn new(config: &OwnerConfig) -> Self {
        Self {
            known: config
                .known
                .iter()
                .map(|o| o.trim().to_string())
                .filter(|o| is_safe_component(o))
                .collect(),
            delimiter: config.delimiter,
        }
    }

    /// Resolve the owner of a filename.
    ///
    /// First stem segment on the allow-list wins; otherwise the first segment
    /// is used as written if the stem has a delimiter at all; otherwise
    /// [`UNKNOWN_OWNER`].
    pub fn resolve(&self, filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let (first, has_delimiter) = match stem.split_once(self.delimiter) {
            Some((first, _)) => (first.trim(), true),
            None => (stem.trim(), false),
        };

        if let Some(owner) = self.known.iter().find(|o| o.eq_ignore_ascii_case(first)) {
            return owner.clone();
        }

        if has_delimiter && is_safe_component(first) {
            return first.to_string();
        }

        UNKNOWN_OWNER.to_string()
    }
}

impl Default for OwnerResolver {
    fn default() -> Self {
        Self::new(&OwnerConfig::default())
    }
}

fn is_safe_component(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\'])
}
