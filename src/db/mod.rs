// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Session and file record storage

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::{FileMetadata, ProcessingSession, SessionStatus, SessionUpdate};
use crate::{OrderlyError, Result};

/// What the organizer needs from persistence
///
/// Atomicity of each call is the implementation's business; the organizer
/// only relies on the calls below.
pub trait SessionStore: Send + Sync {
    /// Open a running session and return its id
    fn create_session(&self, input_dir: &Path, output_dir: &Path) -> Result<String>;

    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()>;

    /// Move a running session to `completed` or `failed`
    fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()>;

    fn create_file_record(&self, session_id: &str, metadata: &FileMetadata) -> Result<()>;

    fn get_session(&self, session_id: &str) -> Result<Option<ProcessingSession>>;

    /// All sessions, newest first
    fn list_sessions(&self) -> Result<Vec<ProcessingSession>>;

    /// File records in arrival order, optionally for one session
    fn list_files(&self, session_id: Option<&str>) -> Result<Vec<FileMetadata>>;
}

/// Generate a new session id
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// SQLite store (thread-safe wrapper)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Row counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub session_count: i64,
    pub file_count: i64,
    pub orphaned_sessions: i64,
}

const SESSION_COLUMNS: &str = "session_id, input_directory, output_directory, total_files_processed, \
     files_by_type, files_by_owner, files_skipped, failures, started_at, completed_at, status, error_message";

const FILE_COLUMNS: &str = "id, session_id, filename, file_type, bucket, owner, original_path, new_path, \
     file_size, created_at, modified_at, moved_at, keywords, summary, duplicate_sequence, \
     text_truncated, analysis_error";

impl Database {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| OrderlyError::Store("Database lock poisoned".to_string()))
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                input_directory TEXT NOT NULL,
                output_directory TEXT NOT NULL,
                total_files_processed INTEGER NOT NULL DEFAULT 0,
                files_by_type TEXT NOT NULL DEFAULT '{}',
                files_by_owner TEXT NOT NULL DEFAULT '{}',
                files_skipped INTEGER NOT NULL DEFAULT 0,
                failures TEXT NOT NULL DEFAULT '[]',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL DEFAULT 'running',
                error_message TEXT
            );

            CREATE TABLE IF NOT EXISTS files (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL REFERENCES sessions(session_id),
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                bucket TEXT NOT NULL,
                owner TEXT NOT NULL,
                original_path TEXT NOT NULL,
                new_path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                created_at TEXT,
                modified_at TEXT,
                moved_at TEXT NOT NULL,
                keywords TEXT,
                summary TEXT,
                duplicate_sequence INTEGER NOT NULL DEFAULT 0,
                text_truncated INTEGER NOT NULL DEFAULT 0,
                analysis_error TEXT,
                UNIQUE(session_id, new_path)
            );

            CREATE INDEX IF NOT EXISTS idx_files_session ON files(session_id);
            CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner);
            CREATE INDEX IF NOT EXISTS idx_files_bucket ON files(bucket);
        "#)?;
        Ok(())
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DbStats> {
        let conn = self.lock_conn()?;
        let session_count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        let file_count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        let orphaned_sessions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE status = 'running'",
            [],
            |row| row.get(0),
        )?;
        Ok(DbStats { session_count, file_count, orphaned_sessions })
    }

    fn read_session(conn: &Connection, session_id: &str) -> Result<Option<ProcessingSession>> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE session_id = ?1", SESSION_COLUMNS),
                params![session_id],
                SessionRow::from_row,
            )
            .optional()?;
        raw.map(SessionRow::into_session).transpose()
    }
}

impl SessionStore for Database {
    fn create_session(&self, input_dir: &Path, output_dir: &Path) -> Result<String> {
        let session = ProcessingSession::new(
            new_session_id(),
            input_dir.to_path_buf(),
            output_dir.to_path_buf(),
        );
        let conn = self.lock_conn()?;
        conn.execute(
            r#"INSERT INTO sessions (session_id, input_directory, output_directory, started_at, status)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                session.session_id,
                path_text(&session.input_directory),
                path_text(&session.output_directory),
                time_text(&session.started_at),
                session.status.as_str(),
            ],
        )?;
        Ok(session.session_id)
    }

    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut session = Self::read_session(&conn, session_id)?
            .ok_or_else(|| OrderlyError::SessionNotFound(session_id.to_string()))?;
        update.apply_to(&mut session);

        conn.execute(
            r#"UPDATE sessions SET total_files_processed = ?2, files_by_type = ?3, files_by_owner = ?4,
                   files_skipped = ?5, failures = ?6
               WHERE session_id = ?1"#,
            params![
                session_id,
                session.total_files_processed as i64,
                serde_json::to_string(&session.files_by_type)?,
                serde_json::to_string(&session.files_by_owner)?,
                session.files_skipped as i64,
                serde_json::to_string(&session.failures)?,
            ],
        )?;
        Ok(())
    }

    fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut session = Self::read_session(&conn, session_id)?
            .ok_or_else(|| OrderlyError::SessionNotFound(session_id.to_string()))?;
        session.finalize(status, completed_at, error.map(String::from))?;

        conn.execute(
            r#"UPDATE sessions SET status = ?2, completed_at = ?3, error_message = ?4
               WHERE session_id = ?1 AND status = 'running'"#,
            params![session_id, status.as_str(), time_text(&completed_at), error],
        )?;
        Ok(())
    }

    fn create_file_record(&self, session_id: &str, metadata: &FileMetadata) -> Result<()> {
        let conn = self.lock_conn()?;
        let keywords = metadata
            .keywords
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            &format!(
                "INSERT INTO files ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                FILE_COLUMNS
            ),
            params![
                metadata.id,
                session_id,
                metadata.filename,
                metadata.file_type,
                metadata.bucket,
                metadata.owner,
                path_text(&metadata.original_path),
                path_text(&metadata.new_path),
                metadata.file_size as i64,
                metadata.created_at.as_ref().map(time_text),
                metadata.modified_at.as_ref().map(time_text),
                time_text(&metadata.moved_at),
                keywords,
                metadata.summary,
                metadata.duplicate_sequence,
                metadata.text_truncated,
                metadata.analysis_error,
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<ProcessingSession>> {
        let conn = self.lock_conn()?;
        Self::read_session(&conn, session_id)
    }

    fn list_sessions(&self) -> Result<Vec<ProcessingSession>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions ORDER BY started_at DESC, rowid DESC",
            SESSION_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], SessionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    fn list_files(&self, session_id: Option<&str>) -> Result<Vec<FileMetadata>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM files WHERE ?1 IS NULL OR session_id = ?1 ORDER BY seq",
            FILE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![session_id], FileRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(FileRow::into_metadata).collect()
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Fixed width so text ordering matches time ordering
fn time_text(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrderlyError::Store(format!("Bad timestamp {:?}: {}", value, e)))
}

/// Raw session columns before JSON and time decoding
struct SessionRow {
    session_id: String,
    input_directory: String,
    output_directory: String,
    total_files_processed: i64,
    files_by_type: String,
    files_by_owner: String,
    files_skipped: i64,
    failures: String,
    started_at: String,
    completed_at: Option<String>,
    status: String,
    error_message: Option<String>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            session_id: row.get(0)?,
            input_directory: row.get(1)?,
            output_directory: row.get(2)?,
            total_files_processed: row.get(3)?,
            files_by_type: row.get(4)?,
            files_by_owner: row.get(5)?,
            files_skipped: row.get(6)?,
            failures: row.get(7)?,
            started_at: row.get(8)?,
            completed_at: row.get(9)?,
            status: row.get(10)?,
            error_message: row.get(11)?,
        })
    }

    fn into_session(self) -> Result<ProcessingSession> {
        Ok(ProcessingSession {
            session_id: self.session_id,
            input_directory: PathBuf::from(self.input_directory),
            output_directory: PathBuf::from(self.output_directory),
            total_files_processed: self.total_files_processed.max(0) as usize,
            files_by_type: serde_json::from_str(&self.files_by_type)?,
            files_by_owner: serde_json::from_str(&self.files_by_owner)?,
            files_skipped: self.files_skipped.max(0) as usize,
            failures: serde_json::from_str(&self.failures)?,
            started_at: parse_time(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_time).transpose()?,
            status: self.status.parse()?,
            error_message: self.error_message,
        })
    }
}

/// Raw file columns before JSON and time decoding
struct FileRow {
    id: String,
    session_id: String,
    filename: String,
    file_type: String,
    bucket: String,
    owner: String,
    original_path: String,
    new_path: String,
    file_size: i64,
    created_at: Option<String>,
    modified_at: Option<String>,
    moved_at: String,
    keywords: Option<String>,
    summary: Option<String>,
    duplicate_sequence: u32,
    text_truncated: bool,
    analysis_error: Option<String>,
}

impl FileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            filename: row.get(2)?,
            file_type: row.get(3)?,
            bucket: row.get(4)?,
            owner: row.get(5)?,
            original_path: row.get(6)?,
            new_path: row.get(7)?,
            file_size: row.get(8)?,
            created_at: row.get(9)?,
            modified_at: row.get(10)?,
            moved_at: row.get(11)?,
            keywords: row.get(12)?,
            summary: row.get(13)?,
            duplicate_sequence: row.get(14)?,
            text_truncated: row.get(15)?,
            analysis_error: row.get(16)?,
        })
    }

    fn into_metadata(self) -> Result<FileMetadata> {
        Ok(FileMetadata {
            id: self.id,
            session_id: self.session_id,
            filename: self.filename,
            file_type: self.file_type,
            bucket: self.bucket,
            owner: self.owner,
            original_path: PathBuf::from(self.original_path),
            new_path: PathBuf::from(self.new_path),
            file_size: self.file_size.max(0) as u64,
            created_at: self.created_at.as_deref().map(parse_time).transpose()?,
            modified_at: self.modified_at.as_deref().map(parse_time).transpose()?,
            moved_at: parse_time(&self.moved_at)?,
            keywords: self.keywords.as_deref().map(serde_json::from_str).transpose()?,
            summary: self.summary,
            duplicate_sequence: self.duplicate_sequence,
            text_truncated: self.text_truncated,
            analysis_error: self.analysis_error,
        })
    }
}
