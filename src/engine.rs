// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Organizer run: enumerate, classify, relocate, analyze, record

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::allocator::PathAllocator;
use crate::analysis::KeywordSummarizer;
use crate::classify::{type_tag, TypeClassifier};
use crate::config::AppConfig;
use crate::db::SessionStore;
use crate::extractors::TextExtractor;
use crate::models::{FileFailure, FileMetadata, RunReport, SessionStatus, SessionUpdate};
use crate::owner::OwnerResolver;
use crate::{OrderlyError, Result};

/// Runs the pipeline against one store
pub struct OrganizerEngine<S: SessionStore> {
    classifier: TypeClassifier,
    owners: OwnerResolver,
    allocator: PathAllocator,
    extractor: TextExtractor,
    summarizer: KeywordSummarizer,
    store: S,
}

/// Per-run tallies, pushed to the store after each file
#[derive(Debug, Default)]
struct Progress {
    processed: usize,
    by_type: BTreeMap<String, usize>,
    by_owner: BTreeMap<String, usize>,
    skipped: usize,
    failures: Vec<FileFailure>,
}

impl Progress {
    fn record(&mut self, metadata: &FileMetadata) {
        self.processed += 1;
        *self.by_type.entry(metadata.bucket.clone()).or_insert(0) += 1;
        *self.by_owner.entry(metadata.owner.clone()).or_insert(0) += 1;
    }

    fn fail(&mut self, path: &Path, reason: String, moved: bool) {
        if !moved {
            self.skipped += 1;
        }
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn update(&self, include_failures: bool) -> SessionUpdate {
        SessionUpdate {
            total_files_processed: Some(self.processed),
            files_by_type: Some(self.by_type.clone()),
            files_by_owner: Some(self.by_owner.clone()),
            files_skipped: Some(self.skipped),
            failures: include_failures.then(|| self.failures.clone()),
        }
    }
}

impl<S: SessionStore> OrganizerEngine<S> {
    pub fn new(config: &AppConfig, store: S) -> Self {
        Self {
            classifier: TypeClassifier::new(&config.classify),
            owners: OwnerResolver::new(&config.owners),
            allocator: PathAllocator::new(config.relocation.max_collision_probes),
            extractor: TextExtractor::new(config.analysis.max_text_bytes),
            summarizer: KeywordSummarizer::new(&config.analysis),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Organize every file under `input_dir` into `output_dir/{bucket}/{owner}/`.
    ///
    /// Setup problems are returned as errors; problems with single files are
    /// collected in the report and the run carries on.
    pub fn organize(&self, input_dir: &Path, output_dir: &Path) -> Result<RunReport> {
        let input = check_input(input_dir)?;
        let output = absolute(output_dir)?;

        let session_id = self.store.create_session(&input, &output)?;
        info!("Session {} started: {:?} -> {:?}", session_id, input, output);

        if let Err(e) = fs::create_dir_all(&output) {
            let err = OrderlyError::OutputUncreatable { path: output, source: e };
            return Err(self.fail_session(&session_id, err));
        }
        let output = fs::canonicalize(&output).unwrap_or(output);

        let mut progress = Progress::default();
        let candidates = enumerate(&input, &output, &mut progress);
        info!("Found {} files to organize", candidates.len());

        let mut files = Vec::with_capacity(candidates.len());
        for path in candidates {
            let failed_before = progress.failures.len();

            match self.relocate(&session_id, &path, &output) {
                Ok((metadata, left_behind)) => {
                    match self.store.create_file_record(&session_id, &metadata) {
                        Ok(()) => {
                            info!("Moved {:?} -> {:?}", path, metadata.new_path);
                            progress.record(&metadata);
                            if let Some(reason) = left_behind {
                                progress.fail(&path, reason, true);
                            }
                            files.push(metadata);
                        }
                        Err(e) => {
                            warn!("Moved {:?} but could not record it: {}", path, e);
                            let reason = format!(
                                "moved to {} but not recorded: {}",
                                metadata.new_path.display(),
                                e
                            );
                            progress.fail(&path, reason, true);
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    progress.fail(&path, e.to_string(), false);
                }
            }

            let changed = progress.failures.len() != failed_before;
            if let Err(e) = self.store.update_session(&session_id, &progress.update(changed)) {
                return Err(self.fail_session(&session_id, e));
            }
        }

        // Walk errors are only known once enumeration is over
        if let Err(e) = self.store.update_session(&session_id, &progress.update(true)) {
            return Err(self.fail_session(&session_id, e));
        }
        self.store
            .finalize_session(&session_id, SessionStatus::Completed, Utc::now(), None)?;

        info!(
            "Session {} completed: {} organized, {} failed",
            session_id,
            progress.processed,
            progress.failures.len()
        );

        let session = self
            .store
            .get_session(&session_id)?
            .ok_or_else(|| OrderlyError::SessionNotFound(session_id.clone()))?;

        Ok(RunReport {
            session,
            files,
            failures: progress.failures,
        })
    }

    /// Move one file into place and analyze it. Errors leave the file where it was.
    ///
    /// Symbolic links are never followed or moved. The second value is set
    /// when the file was copied but its original could not be removed.
    fn relocate(
        &self,
        session_id: &str,
        path: &Path,
        output: &Path,
    ) -> Result<(FileMetadata, Option<String>)> {
        let meta = fs::symlink_metadata(path)?;
        if meta.file_type().is_symlink() {
            return Err(
                io::Error::new(ErrorKind::InvalidInput, "symbolic link; left in place").into(),
            );
        }
        if !meta.is_file() {
            return Err(io::Error::new(ErrorKind::InvalidInput, "not a regular file").into());
        }
        File::open(path)?;

        let raw_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "path has no file name"))?;
        let filename = raw_name.to_string_lossy().to_string();

        let bucket = self.classifier.bucket_for(&filename).to_string();
        let owner = self.owners.resolve(&filename);
        debug!("{:?}: bucket {}, owner {}", filename, bucket, owner);

        let reservation = self
            .allocator
            .reserve(&output.join(&bucket).join(&owner), raw_name)?;
        let duplicate_sequence = reservation.duplicate_sequence();
        let moved = reservation.commit_move(path)?;
        let moved_at = Utc::now();

        let mut metadata = FileMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            file_type: type_tag(&filename),
            filename,
            bucket,
            owner,
            original_path: path.to_path_buf(),
            new_path: moved.path,
            file_size: meta.len(),
            created_at: meta.created().ok().map(DateTime::<Utc>::from),
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            moved_at,
            keywords: None,
            summary: None,
            duplicate_sequence,
            text_truncated: false,
            analysis_error: None,
        };

        if let Some(kind) = self.classifier.extractor_for(&metadata.bucket) {
            let extraction = self.extractor.extract(kind, &metadata.new_path);
            metadata.text_truncated = extraction.truncated;
            match extraction.failure {
                Some(reason) => {
                    metadata.keywords = Some(Vec::new());
                    metadata.summary = Some(String::new());
                    metadata.analysis_error = Some(reason);
                }
                None => {
                    let analysis = self.summarizer.analyze(&extraction.text);
                    debug!("Keywords for {:?}: {:?}", metadata.filename, analysis.keywords);
                    metadata.keywords = Some(analysis.keywords);
                    metadata.summary = Some(analysis.summary);
                }
            }
        }

        Ok((metadata, moved.source_left_behind))
    }

    /// Mark the session failed and hand the error back
    fn fail_session(&self, session_id: &str, err: OrderlyError) -> OrderlyError {
        error!("Session {} failed: {}", session_id, err);
        let message = err.to_string();
        if let Err(e) =
            self.store
                .finalize_session(session_id, SessionStatus::Failed, Utc::now(), Some(&message))
        {
            warn!("Could not mark session {} failed: {}", session_id, e);
        }
        err
    }
}

/// Input must exist, be a directory and be listable
fn check_input(input_dir: &Path) -> Result<PathBuf> {
    let meta = fs::metadata(input_dir).map_err(|e| match e.kind() {
        ErrorKind::NotFound => OrderlyError::InputNotFound(input_dir.to_path_buf()),
        ErrorKind::PermissionDenied => OrderlyError::PermissionDenied(input_dir.to_path_buf()),
        _ => e.into(),
    })?;
    if !meta.is_dir() {
        return Err(OrderlyError::NotADirectory(input_dir.to_path_buf()));
    }

    fs::read_dir(input_dir).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => OrderlyError::PermissionDenied(input_dir.to_path_buf()),
        _ => e.into(),
    })?;

    Ok(fs::canonicalize(input_dir)?)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Every non-directory entry under `input`, sorted by name at each level.
///
/// The output tree is skipped when it sits inside the input. An input
/// inside the output is walked in full. Entries that cannot be read are
/// recorded as failures.
fn enumerate(input: &Path, output: &Path, progress: &mut Progress) -> Vec<PathBuf> {
    let skip_output = input != output && !input.starts_with(output);
    let walker = WalkDir::new(input)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(skip_output && e.path().starts_with(output)));

    let mut candidates = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_dir() {
                    candidates.push(entry.into_path());
                }
            }
            Err(e) => {
                let path = e.path().unwrap_or(input).to_path_buf();
                warn!("Cannot read {:?}: {}", path, e);
                progress.fail(&path, e.to_string(), false);
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::extractors::pdf::tests::write_pdf;

    fn engine() -> OrganizerEngine<MemoryStore> {
        OrganizerEngine::new(&AppConfig::default(), MemoryStore::new())
    }

    #[test]
    fn test_layout_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(input.join("nested")).unwrap();
        fs::write(input.join("rohith_photo.png"), b"png").unwrap();
        fs::write(input.join("nested").join("notes.txt"), "Budget budget review.").unwrap();
        fs::write(input.join("Makefile"), "all:").unwrap();

        let report = engine().organize(&input, &output).unwrap();
        let output = fs::canonicalize(&output).unwrap();

        assert_eq!(report.files.len(), 3);
        assert!(report.failures.is_empty());
        assert!(output.join("pngfiles/rohith/rohith_photo.png").is_file());
        assert!(output.join("txtfiles/unknown/notes.txt").is_file());
        assert!(output.join("otherfiles/unknown/Makefile").is_file());
        assert!(!input.join("rohith_photo.png").exists());

        let session = &report.session;
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.total_files_processed, 3);
        assert_eq!(session.files_by_owner.get("unknown"), Some(&2));
        assert_eq!(session.files_by_type.get("pngfiles"), Some(&1));
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_text_files_get_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("nitin_notes.txt"), "Budget budget budget. Travel plans.").unwrap();
        fs::write(input.join("image.png"), b"\x89PNG").unwrap();

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();
        let notes = report.files.iter().find(|f| f.filename == "nitin_notes.txt").unwrap();
        assert_eq!(notes.owner, "nitin");
        assert_eq!(notes.keywords.as_ref().unwrap()[0], "budget");
        assert_eq!(notes.summary.as_deref(), Some("Budget budget budget. Travel plans."));
        assert!(notes.has_text_analysis());

        let image = report.files.iter().find(|f| f.filename == "image.png").unwrap();
        assert!(image.keywords.is_none());
        assert!(image.summary.is_none());
    }

    #[test]
    fn test_broken_document_keeps_move() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("report.pdf"), b"not a pdf at all").unwrap();

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();
        let record = &report.files[0];
        assert!(record.new_path.is_file());
        assert!(record.analysis_error.is_some());
        assert_eq!(record.keywords, Some(Vec::new()));
        assert_eq!(record.summary.as_deref(), Some(""));
    }

    #[test]
    fn test_output_nested_in_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("out/txtfiles/unknown")).unwrap();
        fs::write(input.join("out/txtfiles/unknown/old.txt"), "old").unwrap();
        fs::write(input.join("new.txt"), "new").unwrap();

        let report = engine().organize(&input, &input.join("out")).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].filename, "new.txt");
        assert!(input.join("out/txtfiles/unknown/old.txt").is_file());
    }

    #[test]
    fn test_input_nested_in_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let input = output.join("incoming");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.txt"), "alpha").unwrap();
        fs::write(input.join("b.png"), b"png").unwrap();

        let report = engine().organize(&input, &output).unwrap();
        let output = fs::canonicalize(&output).unwrap();

        assert_eq!(report.files.len(), 2);
        assert!(report.failures.is_empty());
        assert_eq!(report.session.total_files_processed, 2);
        assert_eq!(fs::read_to_string(output.join("txtfiles/unknown/a.txt")).unwrap(), "alpha");
        assert!(output.join("pngfiles/unknown/b.png").is_file());
        assert!(!input.join("a.txt").exists());
    }

    #[test]
    fn test_pdf_top_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        write_pdf(
            &input.join("himani_energy.pdf"),
            &[&[
                "Solar panels cut costs.",
                "Solar output peaks at noon.",
                "Storage keeps solar power for night.",
            ]],
        );

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();
        let record = &report.files[0];

        assert_eq!(record.bucket, "pdffiles");
        assert_eq!(record.owner, "himani");
        assert_eq!(record.file_type, ".pdf");
        assert!(record.analysis_error.is_none(), "{:?}", record.analysis_error);
        assert_eq!(record.keywords.as_ref().unwrap().first().map(String::as_str), Some("solar"));
        assert!(!record.summary.as_deref().unwrap_or("").is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_survives_move() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        let raw = OsStr::from_bytes(b"caf\xE9.txt");
        fs::write(input.join(raw), "Menu").unwrap();

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();
        let record = &report.files[0];

        assert_eq!(record.new_path.file_name(), Some(raw));
        assert!(record.new_path.is_file());
        assert_eq!(record.filename, "caf\u{FFFD}.txt");
        assert_eq!(record.bucket, "txtfiles");
        assert_eq!(record.owner, "unknown");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_left_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        let target = dir.path().join("real.txt");
        fs::write(&target, "kept").unwrap();
        std::os::unix::fs::symlink("../real.txt", input.join("link.txt")).unwrap();
        fs::write(input.join("plain.txt"), "moved").unwrap();

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].filename, "plain.txt");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("link.txt"));
        assert!(report.failures[0].reason.contains("symbolic link"));
        assert_eq!(report.session.files_skipped, 1);
        assert!(input.join("link.txt").symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "kept");
    }

    #[test]
    fn test_same_name_in_two_folders() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("a")).unwrap();
        fs::create_dir_all(input.join("b")).unwrap();
        fs::write(input.join("a/sachin_cv.pdf"), b"first").unwrap();
        fs::write(input.join("b/sachin_cv.pdf"), b"second").unwrap();

        let report = engine().organize(&input, &dir.path().join("out")).unwrap();
        let sequences: Vec<u32> = report.files.iter().map(|f| f.duplicate_sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
        assert_eq!(report.duplicates(), 1);
        assert_eq!(fs::read(&report.files[1].new_path).unwrap(), b"second");
        assert!(report.files[1].new_path.ends_with("pdffiles/sachin/sachin_cv_1.pdf"));
    }

    #[test]
    fn test_input_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let engine = engine();
        let err = engine.organize(&file, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, OrderlyError::NotADirectory(_)));
        assert!(engine.store().list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_uncreatable_output_fails_session() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file where a directory should go").unwrap();

        let engine = engine();
        let err = engine.organize(&input, &blocker.join("out")).unwrap_err();
        assert!(matches!(err, OrderlyError::OutputUncreatable { .. }));

        let sessions = engine.store().list_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Failed);
        assert!(sessions[0].error_message.is_some());
    }

    #[test]
    fn test_collision_exhaustion_is_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        let target = output.join("txtfiles/unknown");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("a.txt"), "").unwrap();
        fs::write(input.join("a.txt"), "kept").unwrap();
        fs::write(input.join("b.txt"), "moved").unwrap();

        let mut config = AppConfig::default();
        config.relocation.max_collision_probes = 1;
        let engine = OrganizerEngine::new(&config, MemoryStore::new());

        let report = engine.organize(&input, &output).unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(input.join("a.txt").is_file());
        assert_eq!(report.session.files_skipped, 1);
        assert_eq!(report.session.status, SessionStatus::Completed);
    }
}
