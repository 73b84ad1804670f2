use crate::{
    error::{GenerationError, Result},
    models::{HistoryEntry, HISTORY_LIMIT},
    storage::traits::{push_capped, HistoryStorage},
};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

/// History kept as one JSON array on disk.
pub struct FileHistoryStorage {
    path: PathBuf,
    limit: usize,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileHistoryStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limit: HISTORY_LIMIT,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::error!(
                    "Ignoring unreadable history file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            GenerationError::StorageError(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl HistoryStorage for FileHistoryStorage {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        push_capped(&mut entries, entry, self.limit);
        self.save(&entries).await
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self.list().await?.into_iter().find(|entry| entry.id == id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
