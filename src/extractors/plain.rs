// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Plain text files

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::RawText;
use crate::Result;

/// Read at most `max_bytes` of a file; the flag is set when more was available
pub(crate) fn read_bounded(path: &Path, max_bytes: u64) -> Result<(Vec<u8>, bool)> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    file.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes)?;

    let truncated = bytes.len() as u64 > max_bytes;
    if truncated {
        bytes.truncate(max_bytes as usize);
    }
    Ok((bytes, truncated))
}

/// Decode bytes as UTF-8, replacing invalid sequences.
///
/// A multi-byte char split by truncation is dropped instead of replaced.
pub(crate) fn decode_lossy(bytes: &[u8], truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(bytes).into_owned();
    if truncated {
        while text.ends_with('\u{FFFD}') {
            text.pop();
        }
    }
    text
}

pub(crate) fn extract(path: &Path, max_bytes: u64) -> Result<RawText> {
    let (bytes, truncated) = read_bounded(path, max_bytes)?;
    Ok(RawText {
        text: decode_lossy(&bytes, truncated),
        truncated,
    })
}
