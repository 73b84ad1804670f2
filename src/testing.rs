//! In-process generators used by the unit tests.

use crate::{
    error::Result,
    gemini::ImageGenerator,
    models::{
        gemini::{Candidate, Content, GenerateContentResponse, InlineData, Part, PromptFeedback},
        GenerationRequest, PromptPart,
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

pub type Script =
    Box<dyn Fn(usize, &GenerationRequest) -> (Duration, Result<GenerateContentResponse>) + Send + Sync>;

pub struct ScriptedGenerator {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// `script` receives the arrival index of the call and the request.
    pub fn new(
        script: impl Fn(usize, &GenerationRequest) -> (Duration, Result<GenerateContentResponse>)
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call immediately with `bytes`.
    pub fn always(bytes: Vec<u8>) -> Self {
        Self::new(move |_, _| (Duration::ZERO, Ok(image_response(&bytes))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerateContentResponse> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let (delay, outcome) = (self.script)(index, request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn image_response(bytes: &[u8]) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![
                    Part::Text {
                        text: "Here you go".into(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".into(),
                            data: STANDARD.encode(bytes),
                        },
                    },
                ],
                role: Some("model".into()),
            }),
            finish_reason: Some("STOP".into()),
        }],
        prompt_feedback: None,
    }
}

pub fn text_only_response() -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                parts: vec![Part::Text {
                    text: "I cannot draw that".into(),
                }],
                role: Some("model".into()),
            }),
            finish_reason: Some("STOP".into()),
        }],
        prompt_feedback: None,
    }
}

pub fn blocked_response(reason: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![],
        prompt_feedback: Some(PromptFeedback {
            block_reason: Some(reason.into()),
        }),
    }
}

/// The last text part of a request, where the per-call instruction lives.
pub fn last_text(request: &GenerationRequest) -> &str {
    request
        .parts()
        .iter()
        .rev()
        .find_map(PromptPart::as_text)
        .unwrap_or_default()
}
