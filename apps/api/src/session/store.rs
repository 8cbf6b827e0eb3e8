use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::models::Session;

/// In-memory arena of sessions keyed by id.
///
/// Each session gets its own scratch subdirectory so uploads and audio from
/// different users never share a path. A session's mutex is held for the
/// whole of a stage, which serializes that user's actions.
#[derive(Clone)]
pub struct SessionStore {
    root: PathBuf,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory for a session. Not created until something is written.
    pub fn scratch_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub async fn create(&self) -> Arc<Mutex<Session>> {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id)));
        self.sessions.write().await.insert(id, session.clone());
        info!("Created session {id}");
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Forgets the session and deletes its scratch files. Returns false if unknown.
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let Some(session) = self.sessions.write().await.remove(&id) else {
            return Ok(false);
        };
        // Wait out any stage still running for this session.
        let mut guard = session.lock().await;
        guard.removed = true;

        self.delete_scratch_dir(id).await?;
        info!("Removed session {id}");
        Ok(true)
    }

    /// Removes every session idle for longer than `max_idle`. Sessions in the
    /// middle of a stage are skipped. Returns how many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut evicted = Vec::new();
        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|id, session| {
                let Ok(mut guard) = session.try_lock() else {
                    return true;
                };
                let idle = (Utc::now() - guard.updated_at).to_std().unwrap_or_default();
                if idle <= max_idle {
                    return true;
                }
                guard.removed = true;
                evicted.push(*id);
                false
            });
        }

        for id in &evicted {
            if let Err(e) = self.delete_scratch_dir(*id).await {
                warn!("Evicted session {id} but kept its files: {e:#}");
            }
        }
        if !evicted.is_empty() {
            info!("Evicted {} idle session(s)", evicted.len());
        }
        evicted.len()
    }

    /// Runs [`Self::evict_idle`] every `period` until the task is dropped.
    pub async fn run_eviction(self, max_idle: Duration, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = self.evict_idle(max_idle).await;
            debug!("Session sweep done: {evicted} evicted, {} live", self.len().await);
        }
    }

    async fn delete_scratch_dir(&self, id: Uuid) -> Result<()> {
        let dir = self.scratch_dir(id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove scratch dir {}: {e}", dir.display());
                Err(e).with_context(|| format!("removing {}", dir.display()))
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_get_returns_same_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let created = store.create().await;
        let id = created.lock().await.id;

        let fetched = store.get(id).await.unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_scratch_dirs_are_per_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let a = store.create().await.lock().await.id;
        let b = store.create().await.lock().await.id;
        assert_ne!(store.scratch_dir(a), store.scratch_dir(b));
        assert!(store.scratch_dir(a).starts_with(dir.path()));
    }

    #[tokio::test]
    async fn test_remove_deletes_scratch_files() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let id = store.create().await.lock().await.id;

        let scratch = store.scratch_dir(id);
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::write(scratch.join("jobdesc.txt"), b"hello").unwrap();

        assert!(store.remove(id).await.unwrap());
        assert!(!scratch.exists());
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_marks_a_held_handle_as_removed() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let handle = store.create().await;
        let id = handle.lock().await.id;

        assert!(store.remove(id).await.unwrap());
        assert!(handle.lock().await.removed);
    }

    #[tokio::test]
    async fn test_evict_idle_drops_stale_sessions_and_their_files() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());

        let stale = store.create().await;
        let stale_id = {
            let mut session = stale.lock().await;
            session.updated_at = Utc::now() - chrono::Duration::seconds(7200);
            session.id
        };
        let fresh_id = store.create().await.lock().await.id;

        let scratch = store.scratch_dir(stale_id);
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::write(scratch.join("job_intro.wav"), b"RIFF").unwrap();

        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 1);
        assert!(store.get(stale_id).await.is_none());
        assert!(store.get(fresh_id).await.is_some());
        assert!(!scratch.exists());
        assert!(stale.lock().await.removed);
    }

    #[tokio::test]
    async fn test_evict_idle_skips_a_session_mid_stage() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let handle = store.create().await;

        let mut session = handle.lock().await;
        session.updated_at = Utc::now() - chrono::Duration::seconds(7200);
        let id = session.id;

        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 0);
        assert!(store.get(id).await.is_some());
        drop(session);

        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_or_never_written_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(!store.remove(Uuid::new_v4()).await.unwrap());

        let id = store.create().await.lock().await.id;
        assert!(store.remove(id).await.unwrap());
    }
}
