use crate::{
    config::{StudioConfig, DEFAULT_OUTPUT_COUNT},
    error::{GenerationError, Result},
    gemini::{GeminiBackend, ImageClient, ImageGenerator},
    models::{GenerationMode, ImagePayload},
    orchestrator::FanOutOrchestrator,
    prompt::{compose_angle_requests, compose_scene_request, CameraAngle},
    retry::RetryConfig,
    storage::HistoryManager,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const MISSING_IMAGES: &str = "Please ensure all required images are uploaded.";

/// Inputs of one composite-scene generation.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub references: Vec<ImagePayload>,
    pub objects: Vec<ImagePayload>,
    pub prompt: String,
    pub style_only: bool,
    pub output_count: Option<usize>,
}

impl CompositeRequest {
    pub fn new(references: Vec<ImagePayload>, objects: Vec<ImagePayload>) -> Self {
        Self {
            references,
            objects,
            prompt: String::new(),
            style_only: false,
            output_count: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn style_only(mut self, enabled: bool) -> Self {
        self.style_only = enabled;
        self
    }

    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = Some(count);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.objects.is_empty() || self.references.is_empty() {
            return Err(GenerationError::ValidationError(MISSING_IMAGES.into()));
        }
        Ok(())
    }
}

/// Everything a run produced. `angles` is empty in simple mode.
#[derive(Debug, Clone)]
pub struct StudioOutput {
    pub mode: GenerationMode,
    pub angles: Vec<ImagePayload>,
    pub images: Vec<ImagePayload>,
}

#[derive(Clone)]
pub struct BottleSwapStudio {
    orchestrator: FanOutOrchestrator,
    output_count: usize,
    history: Option<HistoryManager>,
}

impl BottleSwapStudio {
    pub fn new(config: &StudioConfig) -> Result<Self> {
        let backend = GeminiBackend::new(&config.gemini)?;
        log::info!("🤖 Using model {}", backend.model());

        Ok(Self::with_generator(
            Arc::new(backend),
            config.retry.to_retry_config(),
        )
        .with_output_count(config.output_count))
    }

    /// Builds a studio over any backend, e.g. a proxy or an in-process fake.
    pub fn with_generator(generator: Arc<dyn ImageGenerator>, retry: RetryConfig) -> Self {
        let client = ImageClient::new(generator).with_retry(retry);
        Self {
            orchestrator: FanOutOrchestrator::new(client),
            output_count: DEFAULT_OUTPUT_COUNT,
            history: None,
        }
    }

    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = count;
        self
    }

    pub fn with_history(mut self, history: HistoryManager) -> Self {
        self.history = Some(history);
        self
    }

    pub fn history(&self) -> Option<&HistoryManager> {
        self.history.as_ref()
    }

    pub fn orchestrator(&self) -> &FanOutOrchestrator {
        &self.orchestrator
    }

    /// Four new views of the packshot, in [`crate::prompt::CameraAngle::ALL`] order.
    pub async fn generate_bottle_angles(
        &self,
        packshot: &ImagePayload,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePayload>> {
        let _timer = crate::logger::timer("bottle angles");
        let requests = compose_angle_requests(packshot);
        log::info!(
            "📐 Synthesising angles: {}",
            CameraAngle::ALL
                .iter()
                .map(CameraAngle::label)
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.orchestrator
            .dispatch_all(&requests, cancel)
            .await
            .map_err(|e| e.context("bottle angles"))
    }

    pub async fn generate_composite(
        &self,
        request: &CompositeRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePayload>> {
        request.validate()?;

        let _timer = crate::logger::timer("composite scene");
        let count = request.output_count.unwrap_or(self.output_count);
        let composed = compose_scene_request(
            &request.references,
            &request.objects,
            &request.prompt,
            request.style_only,
        );
        log::info!(
            "🎨 Composing {} scene from {} reference and {} object images",
            if request.style_only { "style-only" } else { "swap" },
            request.references.len(),
            request.objects.len()
        );

        self.orchestrator
            .fan_out(&composed, count, cancel)
            .await
            .map_err(|e| e.context("images"))
    }

    /// Packshot straight into the scene.
    pub async fn run_simple(
        &self,
        packshot: ImagePayload,
        references: Vec<ImagePayload>,
        prompt: &str,
        style_only: bool,
        cancel: &CancellationToken,
    ) -> Result<StudioOutput> {
        let request = CompositeRequest::new(references, vec![packshot])
            .with_prompt(prompt)
            .style_only(style_only);
        let images = self.generate_composite(&request, cancel).await?;

        self.record(GenerationMode::Simple, &images, prompt).await;
        Ok(StudioOutput {
            mode: GenerationMode::Simple,
            angles: Vec::new(),
            images,
        })
    }

    /// Synthesises angles first and composes with the packshot plus every angle.
    pub async fn run_complex(
        &self,
        packshot: ImagePayload,
        references: Vec<ImagePayload>,
        prompt: &str,
        style_only: bool,
        cancel: &CancellationToken,
    ) -> Result<StudioOutput> {
        if references.is_empty() {
            return Err(GenerationError::ValidationError(MISSING_IMAGES.into()));
        }

        let angles = self.generate_bottle_angles(&packshot, cancel).await?;

        let mut objects = Vec::with_capacity(angles.len() + 1);
        objects.push(packshot);
        objects.extend(angles.iter().cloned());

        let request = CompositeRequest::new(references, objects)
            .with_prompt(prompt)
            .style_only(style_only);
        let images = self.generate_composite(&request, cancel).await?;

        self.record(GenerationMode::Complex, &images, prompt).await;
        Ok(StudioOutput {
            mode: GenerationMode::Complex,
            angles,
            images,
        })
    }

    async fn record(&self, mode: GenerationMode, images: &[ImagePayload], prompt: &str) {
        let Some(history) = &self.history else {
            return;
        };

        match history
            .record(mode, images.to_vec(), Some(prompt.to_string()))
            .await
        {
            Ok(entry) => log::debug!("Saved generation {} to history", entry.id),
            Err(e) => log::warn!("⚠️  Could not save generation to history: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{gemini::GenerateContentResponse, GenerationRequest},
        prompt::NO_ADDITIONAL_INSTRUCTIONS,
        storage::{HistoryManager, MemoryHistoryStorage},
        testing::{image_response, last_text, ScriptedGenerator},
    };
    use std::time::Duration;

    fn fast_retry() -> RetryConfig {
        RetryConfig::new().with_initial_delay(Duration::from_millis(10))
    }

    fn image(byte: u8) -> ImagePayload {
        ImagePayload::new(vec![byte], "image/jpeg").unwrap()
    }

    fn studio(generator: Arc<ScriptedGenerator>) -> BottleSwapStudio {
        BottleSwapStudio::with_generator(generator, fast_retry())
    }

    /// Answers each angle request with the index of its angle.
    fn angle_echo(
        _: usize,
        request: &GenerationRequest,
    ) -> (Duration, Result<GenerateContentResponse>) {
        let text = last_text(request);
        let byte = CameraAngle::ALL
            .iter()
            .position(|angle| angle.instruction() == text)
            .map(|i| i as u8)
            .unwrap_or(100);
        // Later angles answer first.
        let delay = Duration::from_millis(10 * (4 - byte.min(4) as u64));
        (delay, Ok(image_response(&[byte])))
    }

    #[tokio::test(start_paused = true)]
    async fn test_bottle_angles_in_fixed_order() {
        let generator = Arc::new(ScriptedGenerator::new(angle_echo));
        let angles = studio(generator.clone())
            .generate_bottle_angles(&image(1), &CancellationToken::new())
            .await
            .unwrap();

        let bytes: Vec<u8> = angles.iter().map(|a| a.data()[0]).collect();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
        assert!(angles.iter().all(|a| a.mime_type() == "image/png"));
        assert_eq!(generator.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bottle_angle_failure_is_wrapped() {
        let generator = Arc::new(ScriptedGenerator::new(|_, request| {
            if last_text(request) == CameraAngle::HighTopDown.instruction() {
                (
                    Duration::ZERO,
                    Err(GenerationError::RequestError("connection reset".into())),
                )
            } else {
                (Duration::ZERO, Ok(image_response(&[1])))
            }
        }));

        let err = studio(generator)
            .generate_bottle_angles(&image(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to generate bottle angles: Failed after 3 attempts: Request error: connection reset"
        );
    }

    #[tokio::test]
    async fn test_composite_requires_images() {
        let generator = Arc::new(ScriptedGenerator::always(vec![1]));
        let studio = studio(generator.clone());

        let no_reference = CompositeRequest::new(vec![], vec![image(1)]);
        let no_object = CompositeRequest::new(vec![image(1)], vec![]);
        for request in [no_reference, no_object] {
            let err = studio
                .generate_composite(&request, &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), MISSING_IMAGES);
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_composite_fans_out_output_count() {
        let generator = Arc::new(ScriptedGenerator::always(vec![8]));
        let request = CompositeRequest::new(vec![image(1)], vec![image(2)])
            .style_only(true)
            .with_output_count(3);

        let images = studio(generator.clone())
            .generate_composite(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(images.len(), 3);
        let sent = generator.requests();
        assert_eq!(sent.len(), 3);
        assert!(last_text(&sent[0]).contains(NO_ADDITIONAL_INSTRUCTIONS));
    }

    #[tokio::test]
    async fn test_composite_defaults_to_four_outputs() {
        let generator = Arc::new(ScriptedGenerator::always(vec![8]));
        let request = CompositeRequest::new(vec![image(1)], vec![image(2)]);

        let images = studio(generator)
            .generate_composite(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(images.len(), DEFAULT_OUTPUT_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_composite_non_retriable_failure() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| {
            (
                Duration::ZERO,
                Err(GenerationError::ApiError {
                    status: "400 Bad Request".into(),
                    body: "INVALID_ARGUMENT: image too large".into(),
                }),
            )
        }));
        let request = CompositeRequest::new(vec![image(1)], vec![image(2)]);

        let err = studio(generator.clone())
            .generate_composite(&request, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Failed to generate images: API error 400 Bad Request"));
        assert!(generator.calls() <= DEFAULT_OUTPUT_COUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complex_run_uses_angles_as_objects() {
        let generator = Arc::new(ScriptedGenerator::new(angle_echo));
        let history = HistoryManager::new(Arc::new(MemoryHistoryStorage::new()));
        let studio = studio(generator.clone())
            .with_output_count(2)
            .with_history(history.clone());

        let output = studio
            .run_complex(
                image(50),
                vec![image(60)],
                "on a beach",
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(output.mode, GenerationMode::Complex);
        assert_eq!(output.angles.len(), 4);
        assert_eq!(output.images.len(), 2);

        // 4 angle calls, then 2 composite calls with packshot + 4 angles + 1 reference.
        let sent = generator.requests();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[4].image_count(), 6);

        let saved = history.list().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].mode, GenerationMode::Complex);
        assert_eq!(saved[0].prompt.as_deref(), Some("on a beach"));
    }

    #[tokio::test]
    async fn test_simple_run_records_history() {
        let generator = Arc::new(ScriptedGenerator::always(vec![4]));
        let history = HistoryManager::new(Arc::new(MemoryHistoryStorage::new()));
        let studio = studio(generator).with_history(history.clone());

        let output = studio
            .run_simple(image(1), vec![image(2)], "", true, &CancellationToken::new())
            .await
            .unwrap();

        assert!(output.angles.is_empty());
        assert_eq!(output.images.len(), DEFAULT_OUTPUT_COUNT);
        let saved = history.list().await.unwrap();
        assert_eq!(saved[0].images, output.images);
        assert_eq!(saved[0].prompt, None);
    }

    #[tokio::test]
    async fn test_cancelled_run_is_not_recorded() {
        let generator = Arc::new(ScriptedGenerator::always(vec![4]));
        let history = HistoryManager::new(Arc::new(MemoryHistoryStorage::new()));
        let studio = studio(generator.clone()).with_history(history.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = studio
            .run_simple(image(1), vec![image(2)], "", false, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(generator.calls(), 0);
        assert!(history.list().await.unwrap().is_empty());
    }
}
