use super::image::ImagePayload;
use serde::{Deserialize, Serialize};

/// One unit of an interleaved prompt. The model reads parts in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text { content: String },
    Image { payload: ImagePayload },
}

impl PromptPart {
    pub fn text(content: impl Into<String>) -> Self {
        PromptPart::Text {
            content: content.into(),
        }
    }

    pub fn image(payload: ImagePayload) -> Self {
        PromptPart::Image { payload }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptPart::Text { content } => Some(content),
            PromptPart::Image { .. } => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImagePayload> {
        match self {
            PromptPart::Image { payload } => Some(payload),
            PromptPart::Text { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    #[default]
    Image,
}

/// The body of a single outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    parts: Vec<PromptPart>,
    modality: ResponseModality,
}

impl GenerationRequest {
    pub fn new(parts: Vec<PromptPart>) -> Self {
        Self {
            parts,
            modality: ResponseModality::Image,
        }
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    pub fn modality(&self) -> ResponseModality {
        self.modality
    }

    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|p| p.as_image().is_some()).count()
    }
}
