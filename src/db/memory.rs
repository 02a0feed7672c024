// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-process store for dry runs and tests

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{new_session_id, SessionStore};
use crate::models::{FileMetadata, ProcessingSession, SessionStatus, SessionUpdate};
use crate::{OrderlyError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    sessions: Vec<ProcessingSession>,
    files: Vec<FileMetadata>,
}

/// Keeps everything in memory behind a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| OrderlyError::Store("Memory store lock poisoned".to_string()))
    }
}

impl MemoryState {
    fn session_mut(&mut self, session_id: &str) -> Result<&mut ProcessingSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| OrderlyError::SessionNotFound(session_id.to_string()))
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&self, input_dir: &Path, output_dir: &Path) -> Result<String> {
        let session = ProcessingSession::new(
            new_session_id(),
            input_dir.to_path_buf(),
            output_dir.to_path_buf(),
        );
        let id = session.session_id.clone();
        self.lock()?.sessions.push(session);
        Ok(id)
    }

    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()> {
        let mut state = self.lock()?;
        update.apply_to(state.session_mut(session_id)?);
        Ok(())
    }

    fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state
            .session_mut(session_id)?
            .finalize(status, completed_at, error.map(String::from))
    }

    fn create_file_record(&self, session_id: &str, metadata: &FileMetadata) -> Result<()> {
        let mut state = self.lock()?;
        state.session_mut(session_id)?;

        let clash = state
            .files
            .iter()
            .any(|f| f.session_id == session_id && f.new_path == metadata.new_path);
        if clash {
            return Err(OrderlyError::Store(format!(
                "Destination already recorded: {}",
                metadata.new_path.display()
            )));
        }

        let mut record = metadata.clone();
        record.session_id = session_id.to_string();
        state.files.push(record);
        Ok(())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<ProcessingSession>> {
        Ok(self
            .lock()?
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    fn list_sessions(&self) -> Result<Vec<ProcessingSession>> {
        let mut sessions = self.lock()?.sessions.clone();
        // Stable, so sessions started in the same instant keep creation order reversed
        sessions.reverse();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    fn list_files(&self, session_id: Option<&str>) -> Result<Vec<FileMetadata>> {
        Ok(self
            .lock()?
            .files
            .iter()
            .filter(|f| session_id.map_or(true, |id| f.session_id == id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{exercise_store, sample_file};

    #[test]
    fn test_memory_store() {
        exercise_store(&MemoryStore::new());
    }

    #[test]
    fn test_newest_session_first() {
        let store = MemoryStore::new();
        let first = store.create_session(Path::new("/a"), Path::new("/b")).unwrap();
        let second = store.create_session(Path::new("/c"), Path::new("/d")).unwrap();

        let ids: Vec<String> = store
            .list_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_record_takes_store_session_id() {
        let store = MemoryStore::new();
        let id = store.create_session(Path::new("/a"), Path::new("/b")).unwrap();
        store.create_file_record(&id, &sample_file("other", "a.txt", 0)).unwrap();
        assert_eq!(store.list_files(Some(&id)).unwrap()[0].session_id, id);
    }
}
