use crate::{
    config::GeminiConfig,
    error::{GenerationError, Result},
    gemini::ImageGenerator,
    models::{
        gemini::{GenerateContentRequest, GenerateContentResponse},
        GenerationRequest, ModelInfo,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::ConfigError("Gemini API key is required".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| GenerationError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: config.model_or_default().to_string(),
            base_url: config.base_url_or_default().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    pub fn supported_models() -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "gemini-2.5-flash-image".into(),
            name: "Gemini 2.5 Flash Image".into(),
            provider: "Google".into(),
            description: "Multimodal image generation and editing".into(),
        }]
    }
}

#[async_trait]
impl ImageGenerator for GeminiBackend {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse> {
        let body = GenerateContentRequest::from(request);
        log::debug!(
            "Calling {} with {} parts ({} images)",
            self.model,
            request.parts().len(),
            request.image_count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::error!("Gemini returned {}: {}", status, text);
            return Err(GenerationError::ApiError {
                status: status.to_string(),
                body: error_summary(&text),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| GenerationError::ResponseError(format!("Malformed API response: {}", e)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pulls `error.status` / `error.message` out of a Google error body, falling
/// back to the truncated raw text.
fn error_summary(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let error = &value["error"];
        match (error["status"].as_str(), error["message"].as_str()) {
            (Some(status), Some(message)) => return format!("{}: {}", status, message),
            (None, Some(message)) => return message.to_string(),
            _ => {}
        }
    }

    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
