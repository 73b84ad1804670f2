//! Orchestration core of Bottle Swap Studio.
//!
//! Product packshots and reference scenes go in; the crate composes the
//! interleaved prompts, fans them out to the Gemini image model with bounded
//! retry, and hands back complete, ordered result sets.

pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod retry;
pub mod storage;
pub mod studio;

#[cfg(test)]
mod testing;

pub use config::{GeminiConfig, RetrySettings, StudioConfig};
pub use error::{GenerationError, Result};
pub use gemini::{GeminiBackend, ImageClient, ImageGenerator};
pub use models::{
    GenerationMode, GenerationRequest, HistoryEntry, ImagePayload, PromptPart, OUTPUT_MIME_TYPE,
};
pub use orchestrator::FanOutOrchestrator;
pub use prompt::{compose_angle_requests, compose_scene_request, CameraAngle};
pub use retry::{retry_with_backoff, RetryConfig};
pub use storage::{FileHistoryStorage, HistoryManager, HistoryStorage, MemoryHistoryStorage};
pub use studio::{BottleSwapStudio, CompositeRequest, StudioOutput};

pub use tokio_util::sync::CancellationToken;
