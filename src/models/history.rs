use super::{common::GenerationMode, image::ImagePayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of entries kept by any history backend.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub mode: GenerationMode,
    pub images: Vec<ImagePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl HistoryEntry {
    pub fn new(mode: GenerationMode, images: Vec<ImagePayload>, prompt: Option<String>) -> Self {
        let timestamp = Utc::now();
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();

        Self {
            id: format!("gen-{}-{}", timestamp.timestamp_millis(), suffix),
            timestamp,
            mode,
            images,
            prompt: prompt.filter(|p| !p.trim().is_empty()),
        }
    }
}
