use crate::{error::Result, models::HistoryEntry};
use async_trait::async_trait;

/// Append-only record of finished generations, newest first.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Inserts `entry` at the front and drops anything past the history limit.
    async fn append(&self, entry: HistoryEntry) -> Result<()>;
    async fn list(&self) -> Result<Vec<HistoryEntry>>;
    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>>;
    /// Returns whether an entry with `id` existed.
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
}

/// Shared list manipulation for every backend.
pub(crate) fn push_capped(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry, limit: usize) {
    entries.insert(0, entry);
    entries.truncate(limit);
}
