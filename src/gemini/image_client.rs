use crate::{
    error::{GenerationError, Result},
    gemini::ImageGenerator,
    models::{gemini::GenerateContentResponse, GenerationRequest, ImagePayload, OUTPUT_MIME_TYPE},
    retry::{retry_with_backoff, RetryConfig},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const NO_IMAGE_DATA: &str = "No image data found in the API response.";

/// Sends one composed request through the retry policy and returns its image.
#[derive(Clone)]
pub struct ImageClient {
    generator: Arc<dyn ImageGenerator>,
    retry: RetryConfig,
}

impl ImageClient {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            retry: RetryConfig::for_generation(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<ImagePayload> {
        retry_with_backoff(&self.retry, cancel, || self.generate_once(request)).await
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<ImagePayload> {
        let response = self.generator.generate_content(request).await?;
        extract_image(&response)
    }
}

/// First inline image of the first candidate. A refusal is terminal; a plain
/// empty answer is left to the retry policy.
pub fn extract_image(response: &GenerateContentResponse) -> Result<ImagePayload> {
    if let Some(data) = response.first_inline_image() {
        return ImagePayload::from_base64(data, OUTPUT_MIME_TYPE);
    }

    if let Some(reason) = response.block_reason() {
        log::warn!("Model refused the request: {}", reason);
        return Err(GenerationError::ContentBlocked(reason));
    }

    Err(GenerationError::ResponseError(NO_IMAGE_DATA.into()))
}
