// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Collision-free destination paths inside the output tree
//!
//! A destination is claimed by creating an empty placeholder with
//! `create_new`, so two claims in one process can never receive the same
//! path. The placeholder is replaced by the moved file on commit and removed
//! if the reservation is dropped uncommitted.
//!
//! Another process writing into the output tree while a run is in progress
//! is not guarded against: it can race the placeholder between the claim and
//! commit.

use std::ffi::{OsStr, OsString};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{OrderlyError, Result};

/// Hands out unique paths under a directory
#[derive(Debug, Clone)]
pub struct PathAllocator {
    max_attempts: u32,
}

/// A claimed destination path
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    duplicate_sequence: u32,
    committed: bool,
}

/// Where a committed move ended up
#[derive(Debug)]
pub struct Moved {
    pub path: PathBuf,
    /// Set when the file was copied across devices but the original stayed behind
    pub source_left_behind: Option<String>,
}

impl PathAllocator {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    /// Claim `dir/filename`, or `dir/{stem}_{n}{.ext}` with the lowest free
    /// `n >= 1` when the plain name is taken. At most `max_attempts` names are
    /// tried. Creates `dir` as needed.
    pub fn reserve(&self, dir: &Path, filename: impl AsRef<OsStr>) -> Result<Reservation> {
        let filename = filename.as_ref();
        fs::create_dir_all(dir)?;

        for sequence in 0..self.max_attempts {
            let candidate = dir.join(sequenced_name(filename, sequence));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(_) => {
                    if sequence > 0 {
                        debug!("Name collision for {:?}, using {:?}", filename, candidate);
                    }
                    return Ok(Reservation {
                        path: candidate,
                        duplicate_sequence: sequence,
                        committed: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(OrderlyError::CollisionExhausted {
            path: dir.join(filename),
            attempts: self.max_attempts,
        })
    }
}

impl Default for PathAllocator {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Reservation {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 0 when the plain name was free, otherwise the suffix used
    pub fn duplicate_sequence(&self) -> u32 {
        self.duplicate_sequence
    }

    /// Move `source` onto the reserved path, replacing the placeholder.
    ///
    /// Falls back to copy and remove when a rename cannot cross filesystems.
    pub fn commit_move(mut self, source: &Path) -> Result<Moved> {
        let source_left_behind = match fs::rename(source, &self.path) {
            Ok(()) => None,
            Err(e) if is_cross_device(&e) => {
                debug!("Rename across devices, copying {:?}", source);
                copy_then_remove(source, &self.path, |p| fs::remove_file(p))?
            }
            Err(e) => return Err(e.into()),
        };
        self.committed = true;
        Ok(Moved {
            path: self.path.clone(),
            source_left_behind,
        })
    }
}

/// Copy `source` to `dest`, then remove `source`.
///
/// A failed removal keeps the copy and is reported rather than returned as
/// an error, since the file already exists at `dest`.
fn copy_then_remove<F>(source: &Path, dest: &Path, remove: F) -> Result<Option<String>>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    fs::copy(source, dest)?;
    match remove(source) {
        Ok(()) => Ok(None),
        Err(e) => {
            warn!("Copied {:?} but could not remove the original: {}", source, e);
            Ok(Some(format!(
                "copied to {} but the original could not be removed: {}",
                dest.display(),
                e
            )))
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.path) {
                debug!("Could not release reservation {:?}: {}", self.path, e);
            }
        }
    }
}

/// `photo.png` with sequence 2 → `photo_2.png`; sequence 0 keeps the name.
///
/// Works on raw OS names, so names that are not valid UTF-8 survive intact.
pub fn sequenced_name(filename: impl AsRef<OsStr>, sequence: u32) -> OsString {
    let filename = filename.as_ref();
    if sequence == 0 {
        return filename.to_os_string();
    }
    let path = Path::new(filename);
    let mut name = path.file_stem().unwrap_or(filename).to_os_string();
    name.push(format!("_{}", sequence));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

#[cfg(unix)]
fn is_cross_device(e: &std::io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(e: &std::io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    e.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_e: &std::io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequenced_name() {
        assert_eq!(sequenced_name("photo.png", 0), "photo.png");
        assert_eq!(sequenced_name("photo.png", 1), "photo_1.png");
        assert_eq!(sequenced_name("backup.tar.gz", 3), "backup.tar_3.gz");
        assert_eq!(sequenced_name("Makefile", 2), "Makefile_2");
        assert_eq!(sequenced_name(".bashrc", 1), ".bashrc_1");
    }

    #[test]
    fn test_free_name_has_sequence_zero() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pngfiles").join("rohith");
        let allocator = PathAllocator::default();

        let reservation = allocator.reserve(&target, "photo.png").unwrap();
        assert_eq!(reservation.duplicate_sequence(), 0);
        assert_eq!(reservation.path(), target.join("photo.png"));
        assert!(target.is_dir());
    }

    #[test]
    fn test_identical_names_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let out = dir.path().join("out");
        fs::create_dir_all(&src).unwrap();
        let allocator = PathAllocator::default();

        let n = 5;
        let mut paths = HashSet::new();
        let mut sequences = Vec::new();
        for i in 0..n {
            let source = src.join(format!("copy{}", i));
            fs::write(&source, format!("content {}", i)).unwrap();
            let reservation = allocator.reserve(&out, "photo.png").unwrap();
            sequences.push(reservation.duplicate_sequence());
            let dest = reservation.commit_move(&source).unwrap().path;
            assert!(!source.exists());
            paths.insert(dest);
        }

        assert_eq!(paths.len(), n);
        assert_eq!(sequences, (0..n as u32).collect::<Vec<_>>());
        assert_eq!(fs::read_to_string(out.join("photo_3.png")).unwrap(), "content 3");
    }

    #[test]
    fn test_gap_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("a_2.txt"), "").unwrap();

        let reservation = PathAllocator::default().reserve(dir.path(), "a.txt").unwrap();
        assert_eq!(reservation.duplicate_sequence(), 1);
        assert_eq!(reservation.path(), dir.path().join("a_1.txt"));
    }

    #[test]
    fn test_dropped_reservation_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let reservation = PathAllocator::default().reserve(dir.path(), "x.txt").unwrap();
            assert!(reservation.path().exists());
            reservation.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_probing_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("a_1.txt"), "").unwrap();
        fs::write(dir.path().join("a_2.txt"), "").unwrap();

        let err = PathAllocator::new(3).reserve(dir.path(), "a.txt").unwrap_err();
        assert!(matches!(err, OrderlyError::CollisionExhausted { attempts: 3, .. }));

        // The last allowed attempt still counts
        let reservation = PathAllocator::new(4).reserve(dir.path(), "a.txt").unwrap();
        assert_eq!(reservation.duplicate_sequence(), 3);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_kept() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let raw = OsStr::from_bytes(b"caf\xE9.txt");
        fs::write(dir.path().join(raw), "").unwrap();

        let reservation = PathAllocator::default().reserve(dir.path(), raw).unwrap();
        assert_eq!(reservation.duplicate_sequence(), 1);
        assert_eq!(
            reservation.path().file_name().unwrap().as_bytes(),
            b"caf\xE9_1.txt"
        );
    }

    #[test]
    fn test_copy_kept_when_original_cannot_be_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.txt");
        let dest = dir.path().join("b.txt");
        fs::write(&source, "payload").unwrap();

        let left = copy_then_remove(&source, &dest, |_| {
            Err(io::Error::new(ErrorKind::PermissionDenied, "read-only source"))
        })
        .unwrap();

        assert!(left.unwrap().contains("read-only source"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "payload");
        assert!(source.exists());

        let other = dir.path().join("c.txt");
        assert!(copy_then_remove(&dest, &other, |p| fs::remove_file(p)).unwrap().is_none());
        assert!(!dest.exists());
    }

    #[test]
    fn test_failed_move_releases_reservation() {
        let dir = tempfile::tempdir().unwrap();
        let reservation = PathAllocator::default().reserve(dir.path(), "x.txt").unwrap();
        let reserved = reservation.path().to_path_buf();

        assert!(reservation.commit_move(&dir.path().join("missing.txt")).is_err());
        assert!(!reserved.exists());
    }
}
