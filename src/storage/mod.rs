pub mod file;
pub mod memory;
pub mod traits;

use crate::{
    config::StudioConfig,
    error::Result,
    models::{GenerationMode, HistoryEntry, ImagePayload},
};
use std::sync::Arc;

pub use file::FileHistoryStorage;
pub use memory::MemoryHistoryStorage;
pub use traits::HistoryStorage;

#[derive(Clone)]
pub struct HistoryManager {
    backend: Arc<dyn HistoryStorage>,
}

impl HistoryManager {
    pub fn new(backend: Arc<dyn HistoryStorage>) -> Self {
        Self { backend }
    }

    /// File-backed when `history_path` is set, in-memory otherwise.
    pub fn from_config(config: &StudioConfig) -> Self {
        let backend: Arc<dyn HistoryStorage> = match &config.history_path {
            Some(path) => {
                log::info!("📚 Generation history at {}", path.display());
                Arc::new(FileHistoryStorage::new(path.clone()))
            }
            None => Arc::new(MemoryHistoryStorage::new()),
        };
        Self { backend }
    }

    pub fn storage(&self) -> &Arc<dyn HistoryStorage> {
        &self.backend
    }

    pub async fn record(
        &self,
        mode: GenerationMode,
        images: Vec<ImagePayload>,
        prompt: Option<String>,
    ) -> Result<HistoryEntry> {
        let entry = HistoryEntry::new(mode, images, prompt);
        self.backend.append(entry.clone()).await?;
        Ok(entry)
    }

    pub async fn list(&self) -> Result<Vec<HistoryEntry>> {
        self.backend.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<HistoryEntry>> {
        self.backend.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.backend.delete(id).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }
}
