pub mod backend;
pub mod image_client;

use crate::{error::Result, models::gemini::GenerateContentResponse, models::GenerationRequest};
use async_trait::async_trait;

pub use backend::GeminiBackend;
pub use image_client::ImageClient;

/// One raw `generateContent` round-trip. Implementations never retry.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_content(&self, request: &GenerationRequest)
        -> Result<GenerateContentResponse>;

    fn model(&self) -> &str;
}
