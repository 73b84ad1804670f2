use crate::error::{GenerationError, Result};
use std::{
    fmt,
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Message fragments that mark a failure as a client-side fault.
pub const NON_RETRIABLE_PATTERNS: &[&str] = &[
    "invalid",
    "bad request",
    "unauthorized",
    "forbidden",
    "not found",
    "validation",
];

pub type RetryHook = Arc<dyn Fn(u32, &GenerationError) + Send + Sync>;
pub type RetryClassifier = Arc<dyn Fn(&GenerationError) -> bool + Send + Sync>;

/// Returns `true` when retrying `error` cannot help.
pub fn is_non_retriable(error: &GenerationError) -> bool {
    match error {
        GenerationError::Cancelled
        | GenerationError::ContentBlocked(_)
        | GenerationError::ValidationError(_)
        | GenerationError::ConfigError(_) => true,
        other => {
            let message = other.to_string().to_lowercase();
            NON_RETRIABLE_PATTERNS
                .iter()
                .any(|pattern| message.contains(pattern))
        }
    }
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    on_retry: Option<RetryHook>,
    classifier: RetryClassifier,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            on_retry: None,
            classifier: Arc::new(|error| !is_non_retriable(error)),
        }
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy used for every model call: 2s, 4s between three attempts, logged.
    pub fn for_generation() -> Self {
        Self::default()
            .with_initial_delay(Duration::from_secs(2))
            .with_on_retry(|attempt, error| {
                log::warn!("🔁 Retry attempt {} after error: {}", attempt, error);
            })
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_on_retry(
        mut self,
        hook: impl Fn(u32, &GenerationError) + Send + Sync + 'static,
    ) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    /// Replaces the retriable predicate. It must return `true` for errors worth retrying.
    pub fn with_classifier(
        mut self,
        is_retriable: impl Fn(&GenerationError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.classifier = Arc::new(is_retriable);
        self
    }

    pub fn is_retriable(&self, error: &GenerationError) -> bool {
        !error.is_cancelled() && (self.classifier)(error)
    }

    /// Wait inserted after the failed `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    fn notify_retry(&self, attempt: u32, error: &GenerationError) {
        if let Some(hook) = &self.on_retry {
            if catch_unwind(AssertUnwindSafe(|| hook(attempt, error))).is_err() {
                log::warn!("on_retry hook panicked on attempt {}", attempt);
            }
        }
    }
}

/// Runs `op` until it succeeds, hits a non-retriable error, or exhausts the budget.
///
/// Cancellation is observed both while `op` is in flight and during the backoff
/// wait; either way the call resolves to [`GenerationError::Cancelled`].
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = op() => result,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !config.is_retriable(&error) {
            log::debug!("Not retrying non-retriable error: {}", error);
            return Err(error);
        }

        if attempt >= max_attempts {
            return Err(GenerationError::RetriesExhausted {
                attempts: max_attempts,
                message: error.to_string(),
            });
        }

        config.notify_retry(attempt, &error);

        let delay = config.delay_for_attempt(attempt);
        log::debug!("Waiting {:?} before attempt {}", delay, attempt + 1);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };
    use tokio::time::Instant;

    fn flaky() -> GenerationError {
        GenerationError::RequestError("connection reset by peer".into())
    }

    #[test]
    fn test_classifier_patterns() {
        let unauthorized = GenerationError::ApiError {
            status: "401 Unauthorized".into(),
            body: "{}".into(),
        };
        assert!(is_non_retriable(&unauthorized));
        assert!(is_non_retriable(&GenerationError::RequestError(
            "INVALID_ARGUMENT: bad image".into()
        )));
        assert!(is_non_retriable(&GenerationError::ContentBlocked(
            "SAFETY".into()
        )));
        assert!(!is_non_retriable(&flaky()));
        assert!(!is_non_retriable(&GenerationError::ResponseError(
            "No image data found in the API response.".into()
        )));
    }

    #[test]
    fn test_delay_schedule() {
        let config = RetryConfig::new().with_initial_delay(Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        assert_eq!(RetryConfig::new().with_max_attempts(0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_scheduling() {
        let delay = Duration::from_millis(500);
        let config = RetryConfig::new()
            .with_max_attempts(3)
            .with_initial_delay(delay)
            .with_backoff_multiplier(2.0);
        let calls = Arc::new(Mutex::new(Vec::new()));

        let result: Result<()> = retry_with_backoff(&config, &CancellationToken::new(), || {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(Instant::now());
                Err(flaky())
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Failed after 3 attempts"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        let first_wait = calls[1] - calls[0];
        let second_wait = calls[2] - calls[1];
        assert!(first_wait >= delay && first_wait < delay + Duration::from_millis(50));
        assert!(second_wait >= delay * 2 && second_wait < delay * 2 + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retriable_short_circuit() {
        let config = RetryConfig::new().with_max_attempts(10);
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(&config, &CancellationToken::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerationError::RequestError("401 Unauthorized".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Request error: 401 Unauthorized"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let retries = Arc::new(Mutex::new(Vec::new()));
        let hook_log = retries.clone();
        let config = RetryConfig::new().with_on_retry(move |attempt, _| {
            hook_log.lock().unwrap().push(attempt);
        });
        let calls = AtomicU32::new(0);

        let value = retry_with_backoff(&config, &CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(flaky())
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(*retries.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_hook_is_contained() {
        let config = RetryConfig::new().with_on_retry(|_, _| panic!("hook exploded"));
        let calls = AtomicU32::new(0);

        let value = retry_with_backoff(&config, &CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(flaky())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_classifier() {
        let config = RetryConfig::new().with_classifier(|_| false);
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(&config, &CancellationToken::new(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(flaky()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GenerationError::RequestError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let config = RetryConfig::new().with_initial_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result: Result<()> =
            retry_with_backoff(&config, &cancel, || async { Err(flaky()) }).await;

        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_calls_op() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(&RetryConfig::new(), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(matches!(result, Err(GenerationError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
