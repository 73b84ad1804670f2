use crate::error::{GenerationError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MIME type of every image the model returns.
pub const OUTPUT_MIME_TYPE: &str = "image/png";

/// One decoded image plus its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawImagePayload")]
pub struct ImagePayload {
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
    mime_type: String,
}

/// Unchecked serialized form; deserializing goes through [`ImagePayload::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImagePayload {
    #[serde(with = "base64_bytes")]
    data: Vec<u8>,
    mime_type: String,
}

impl TryFrom<RawImagePayload> for ImagePayload {
    type Error = GenerationError;

    fn try_from(raw: RawImagePayload) -> Result<Self> {
        Self::new(raw.data, raw.mime_type)
    }
}

impl ImagePayload {
    pub fn new(data: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Result<Self> {
        let mime_type = mime_type.into();
        if !mime_type.starts_with("image/") {
            return Err(GenerationError::ValidationError(
                "Invalid file type. Please upload an image.".into(),
            ));
        }

        Ok(Self {
            data: data.into(),
            mime_type,
        })
    }

    /// Tags raw model output, which is always PNG.
    pub fn png(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            mime_type: OUTPUT_MIME_TYPE.to_string(),
        }
    }

    pub fn from_base64(encoded: &str, mime_type: impl Into<String>) -> Result<Self> {
        let data = STANDARD.decode(encoded.trim())?;
        Self::new(data, mime_type)
    }

    /// Reads an image from disk, inferring the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(mime_type_for_extension)
            .ok_or_else(|| {
                GenerationError::ValidationError(format!(
                    "Invalid file type for {}. Please upload an image.",
                    path.display()
                ))
            })?;

        let data = std::fs::read(path)?;
        log::debug!(
            "Loaded {} ({} bytes, {})",
            path.display(),
            data.len(),
            mime_type
        );
        Self::new(data, mime_type)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
