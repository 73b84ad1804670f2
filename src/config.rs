use crate::retry::RetryConfig;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OUTPUT_COUNT: usize = 4;
pub const DEFAULT_HISTORY_FILE: &str = "bottle-swap-history.json";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let model = env::var("GEMINI_MODEL").ok();
        let base_url = env::var("GEMINI_BASE_URL").ok();
        let timeout_secs = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());

        GeminiConfig {
            api_key,
            model,
            base_url,
            timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url_or_default(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// Retry knobs read from the environment; unset values keep the generation policy.
#[derive(Debug, Clone, Default)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

impl RetrySettings {
    pub fn from_env() -> Self {
        RetrySettings {
            max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok()),
            delay_ms: env::var("RETRY_DELAY_MS").ok().and_then(|s| s.parse().ok()),
            backoff_multiplier: env::var("RETRY_BACKOFF_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m: &f64| m.is_finite() && *m >= 1.0),
        }
    }

    pub fn to_retry_config(&self) -> RetryConfig {
        let mut config = RetryConfig::for_generation();
        if let Some(attempts) = self.max_attempts {
            config = config.with_max_attempts(attempts);
        }
        if let Some(delay) = self.delay_ms {
            config = config.with_initial_delay(Duration::from_millis(delay));
        }
        if let Some(multiplier) = self.backoff_multiplier {
            config = config.with_backoff_multiplier(multiplier);
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub gemini: GeminiConfig,
    pub retry: RetrySettings,
    pub output_count: usize,
    pub history_path: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            gemini: GeminiConfig::default(),
            retry: RetrySettings::default(),
            output_count: DEFAULT_OUTPUT_COUNT,
            history_path: None,
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let output_count = env::var("OUTPUT_COUNT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_OUTPUT_COUNT);
        let history_path = env::var("HISTORY_PATH").ok().map(PathBuf::from);

        StudioConfig {
            gemini: GeminiConfig::from_env(),
            retry: RetrySettings::from_env(),
            output_count,
            history_path,
        }
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self
    }

    pub fn with_retry(mut self, settings: RetrySettings) -> Self {
        self.retry = settings;
        self
    }

    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = count;
        self
    }

    pub fn with_history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_path = Some(path.into());
        self
    }
}
