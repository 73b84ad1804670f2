use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("API error {status}: {body}")]
    ApiError { status: String, body: String },
    #[error("{0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Content blocked by the model: {0}")]
    ContentBlocked(String),
    #[error("Failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
    #[error("Failed to generate {operation}: {message}")]
    OperationFailed { operation: String, message: String },
    #[error("Generation cancelled")]
    Cancelled,
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl GenerationError {
    /// Wraps this error with the name of the logical operation that failed.
    pub fn context(self, operation: &str) -> Self {
        match self {
            GenerationError::Cancelled => GenerationError::Cancelled,
            other => GenerationError::OperationFailed {
                operation: operation.to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::RequestError(format!("request timed out: {}", err))
        } else {
            GenerationError::RequestError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for GenerationError {
    fn from(err: base64::DecodeError) -> Self {
        GenerationError::ResponseError(format!("Failed to decode image data: {}", err))
    }
}

impl From<std::io::Error> for GenerationError {
    fn from(err: std::io::Error) -> Self {
        GenerationError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;
