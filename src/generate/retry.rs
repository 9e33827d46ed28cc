// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Retry logic for rate-limited requests with exponential backoff

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::settings::ResilienceConfig;
use crate::error::QuillError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Base delay in milliseconds (doubled per attempt)
    pub base_delay_ms: u64,
    /// Maximum single delay in milliseconds
    pub max_delay_ms: Option<u64>,
    /// Maximum number of attempts; `None` retries until cancelled
    pub max_attempts: Option<u32>,
    /// Additive jitter as a fraction of the delay, in [0, 1)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for RetryConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            max_attempts: config.max_attempts,
            jitter: config.jitter,
        }
    }
}

impl RetryConfig {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^attempt`.
    ///
    /// Jitter only ever adds time, so the first retry never waits less than
    /// `2 * base` and uncapped delays stay strictly increasing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential_ms = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_ms = match self.max_delay_ms {
            Some(cap) => exponential_ms.min(cap),
            None => exponential_ms,
        };

        let jitter_range = (capped_ms as f64 * self.jitter.clamp(0.0, 0.999)) as u64;
        let jitter_ms = if jitter_range > 0 {
            rand::rng().random_range(0..=jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped_ms.saturating_add(jitter_ms))
    }

    /// Whether attempt number `attempt` may be started.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Determine if an error is worth another attempt
pub fn is_retryable(error: &QuillError) -> bool {
    error.is_rate_limited()
}

/// What to do after a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Backoff elapsed; start attempt `attempt`
    Retry { attempt: u32, waited: Duration },
    /// Cancellation was requested before or during the backoff
    Cancelled,
    /// Terminal failure
    Fail(QuillError),
}

/// Tracks the attempt counter for one run and schedules retries.
#[derive(Debug)]
pub struct RetryController {
    config: RetryConfig,
    attempt: u32,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 1 }
    }

    /// Current attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Classify `error` and, if it is retryable, wait out the backoff.
    ///
    /// `on_retry` is told the failed attempt number and the delay before the
    /// wait begins. Cancellation is checked before scheduling and raced
    /// against the wait.
    pub async fn after_failure(
        &mut self,
        error: QuillError,
        cancel: &CancellationToken,
        on_retry: impl FnOnce(u32, Duration),
    ) -> RetryDecision {
        if !is_retryable(&error) {
            tracing::debug!(target: "quill.retry", attempt = self.attempt, %error, "non-retryable failure");
            return RetryDecision::Fail(error);
        }

        if !self.config.allows_attempt(self.attempt + 1) {
            tracing::warn!(
                target: "quill.retry",
                attempts = self.attempt,
                "giving up after reaching the attempt limit"
            );
            return RetryDecision::Fail(error);
        }

        if cancel.is_cancelled() {
            return RetryDecision::Cancelled;
        }

        let delay = self.config.delay_for(self.attempt);
        tracing::info!(
            target: "quill.retry",
            attempt = self.attempt,
            delay_secs = delay.as_secs_f64(),
            %error,
            "rate limited, retrying"
        );
        on_retry(self.attempt, delay);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RetryDecision::Cancelled,
            _ = sleep(delay) => {}
        }

        self.attempt += 1;
        RetryDecision::Retry {
            attempt: self.attempt,
            waited: delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn rate_limited() -> QuillError {
        ApiError::RateLimited { retry_after: None }.into()
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.base_delay_ms, 1000);
        assert!(config.max_delay_ms.is_none());
        assert!(config.max_attempts.is_none());
        assert_eq!(config.jitter, 0.0);
    }

    #[test]
    fn test_delay_doubles_from_two_seconds() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(8));
        assert_eq!(config.delay_for(4), Duration::from_secs(16));
    }

    #[test]
    fn test_delay_cap() {
        let config = RetryConfig {
            max_delay_ms: Some(5000),
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for(2), Duration::from_secs(4));
        assert_eq!(config.delay_for(3), Duration::from_secs(5));
        assert_eq!(config.delay_for(50), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_saturates_on_huge_attempt() {
        let config = RetryConfig::default();
        assert!(config.delay_for(200) >= config.delay_for(10));
    }

    #[test]
    fn test_jitter_only_adds() {
        let config = RetryConfig {
            jitter: 0.5,
            ..RetryConfig::default()
        };
        for _ in 0..50 {
            let delay = config.delay_for(1).as_millis();
            assert!((2000..=3000).contains(&delay), "delay = {}", delay);
        }
    }

    #[test]
    fn test_jittered_delays_still_increase() {
        let config = RetryConfig {
            jitter: 0.9,
            ..RetryConfig::default()
        };
        for attempt in 1..8 {
            for _ in 0..100 {
                let current = config.delay_for(attempt);
                let next = config.delay_for(attempt + 1);
                assert!(current < next, "attempt {}: {:?} >= {:?}", attempt, current, next);
            }
        }
    }

    #[test]
    fn test_allows_attempt() {
        let unbounded = RetryConfig::default();
        assert!(unbounded.allows_attempt(1_000_000));

        let bounded = RetryConfig {
            max_attempts: Some(3),
            ..RetryConfig::default()
        };
        assert!(bounded.allows_attempt(3));
        assert!(!bounded.allows_attempt(4));
    }

    #[test]
    fn test_only_rate_limits_are_retryable() {
        assert!(is_retryable(&rate_limited()));
        assert!(!is_retryable(&ApiError::Network("reset".into()).into()));
        assert!(!is_retryable(
            &ApiError::ServerError {
                status: 503,
                message: "busy".into()
            }
            .into()
        ));
        assert!(!is_retryable(&QuillError::QuotaExceeded {
            estimated: 2,
            limit: 1
        }));
        assert!(!is_retryable(&QuillError::MissingCredentials("x".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_failure_waits_and_increments() {
        let mut controller = RetryController::new(RetryConfig::default());
        let cancel = CancellationToken::new();
        let mut seen = None;

        let start = tokio::time::Instant::now();
        let decision = controller
            .after_failure(rate_limited(), &cancel, |attempt, delay| {
                seen = Some((attempt, delay))
            })
            .await;

        assert!(matches!(decision, RetryDecision::Retry { attempt: 2, .. }));
        assert_eq!(seen, Some((1, Duration::from_secs(2))));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(controller.attempt(), 2);
    }

    #[tokio::test]
    async fn test_after_failure_non_retryable() {
        let mut controller = RetryController::new(RetryConfig::default());
        let cancel = CancellationToken::new();
        let decision = controller
            .after_failure(ApiError::AuthenticationFailed.into(), &cancel, |_, _| {
                panic!("should not schedule a retry")
            })
            .await;
        assert!(matches!(decision, RetryDecision::Fail(_)));
        assert_eq!(controller.attempt(), 1);
    }

    #[tokio::test]
    async fn test_after_failure_respects_attempt_limit() {
        let mut controller = RetryController::new(RetryConfig {
            max_attempts: Some(1),
            ..RetryConfig::default()
        });
        let cancel = CancellationToken::new();
        let decision = controller
            .after_failure(rate_limited(), &cancel, |_, _| {})
            .await;
        assert!(matches!(decision, RetryDecision::Fail(ref e) if e.is_rate_limited()));
    }

    #[tokio::test]
    async fn test_after_failure_cancelled_before_scheduling() {
        let mut controller = RetryController::new(RetryConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let decision = controller
            .after_failure(rate_limited(), &cancel, |_, _| {
                panic!("should not schedule a retry")
            })
            .await;
        assert!(matches!(decision, RetryDecision::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_failure_cancelled_during_backoff() {
        let mut controller = RetryController::new(RetryConfig::default());
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let decision = controller
            .after_failure(rate_limited(), &cancel, |_, _| {})
            .await;
        assert!(matches!(decision, RetryDecision::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(controller.attempt(), 1);
    }
}
