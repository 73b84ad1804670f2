use crate::{
    error::Result,
    models::{HistoryEntry, HISTORY_LIMIT},
    storage::traits::{push_capped, HistoryStorage},
};
use async_trait::async_trait;
use tokio::sync::RwLock;

pub struct MemoryHistoryStorage {
    entries: RwLock<Vec<HistoryEntry>>,
    limit: usize,
}

impl Default for MemoryHistoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistoryStorage {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            limit,
        }
    }
}

#[async_trait]
impl HistoryStorage for MemoryHistoryStorage {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        push_capped(&mut entries, entry, self.limit);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() != before)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
