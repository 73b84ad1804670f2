use crate::{
    error::{GenerationError, Result},
    gemini::ImageClient,
    models::{GenerationRequest, ImagePayload},
};
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

/// Runs a batch of generation calls concurrently and joins them all-or-nothing.
///
/// The calls are polled together on the caller's task rather than spawned, and
/// results are collected by position, so the output order always matches the
/// dispatch order. The first terminal failure drops the remaining calls.
#[derive(Clone)]
pub struct FanOutOrchestrator {
    client: ImageClient,
}

impl FanOutOrchestrator {
    pub fn new(client: ImageClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ImageClient {
        &self.client
    }

    /// `count` independent samples of the same request.
    pub async fn fan_out(
        &self,
        request: &GenerationRequest,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePayload>> {
        log::info!("Dispatching {} samples to {}", count, self.client.model());
        let calls = (0..count).map(|index| self.call(index, request, cancel));
        self.join(try_join_all(calls).await, cancel)
    }

    /// One call per request, returned in the order given.
    pub async fn dispatch_all(
        &self,
        requests: &[GenerationRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePayload>> {
        log::info!(
            "Dispatching {} requests to {}",
            requests.len(),
            self.client.model()
        );
        let calls = requests
            .iter()
            .enumerate()
            .map(|(index, request)| self.call(index, request, cancel));
        self.join(try_join_all(calls).await, cancel)
    }

    async fn call(
        &self,
        index: usize,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<ImagePayload> {
        self.client
            .generate(request, cancel)
            .await
            .map_err(|error| {
                if !error.is_cancelled() {
                    log::error!("Batch call {} failed: {}", index, error);
                }
                error
            })
    }

    fn join(
        &self,
        outcome: Result<Vec<ImagePayload>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImagePayload>> {
        // Results that land after an abort are discarded.
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        outcome
    }
}
