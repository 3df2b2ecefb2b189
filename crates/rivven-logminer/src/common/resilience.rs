//! Retry primitives for the mining cycle
//!
//! - Retriable error types
//! - Retry configuration with exponential backoff and jitter

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

// ============================================================================
// Retry Configuration
// ============================================================================

/// Error types that can be automatically retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriableErrorType {
    /// Catalog or engine connection unavailable
    SourceUnavailable,
    /// A segment disappeared between resolution and registration
    SegmentPurged,
    /// Catalog briefly inconsistent (log switch in progress)
    CatalogInFlux,
    /// Operation timed out
    Timeout,
    /// Any other transient failure
    TemporaryFailure,
}

impl RetriableErrorType {
    /// Get all default retriable error types.
    pub fn defaults() -> HashSet<Self> {
        [
            Self::SourceUnavailable,
            Self::SegmentPurged,
            Self::CatalogInFlux,
            Self::Timeout,
            Self::TemporaryFailure,
        ]
        .into_iter()
        .collect()
    }
}

/// Configuration for retry behavior.
///
/// # Example
///
/// ```rust
/// use rivven_logminer::common::{RetryConfig, RetriableErrorType};
/// use std::time::Duration;
///
/// let config = RetryConfig::builder()
///     .max_retries(10)
///     .retry_delay(Duration::from_secs(1))
///     .max_delay(Duration::from_secs(60))
///     .jitter(0.25)
///     .build();
///
/// assert_eq!(config.max_retries(), 10);
/// assert!(config.is_retriable(&RetriableErrorType::SegmentPurged));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum consecutive retry attempts.
    /// - `-1` = infinite retries
    /// - `0` = retries disabled
    /// - `n` = retry up to n times
    max_retries: i32,
    /// Base delay between retries (before exponential backoff).
    retry_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
    /// Jitter factor (0.0 - 1.0).
    jitter: f64,
    /// Error types considered retriable.
    retriable_errors: HashSet<RetriableErrorType>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.25,
            retriable_errors: RetriableErrorType::defaults(),
        }
    }
}

impl RetryConfig {
    /// Create a builder for RetryConfig.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Create a disabled retry config (no retries).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create an infinite retry config.
    pub fn infinite() -> Self {
        Self {
            max_retries: -1,
            ..Default::default()
        }
    }

    /// Get maximum retries (-1 = infinite, 0 = disabled).
    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }

    /// Get base retry delay.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Get maximum delay cap.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Check if an error type is retriable.
    pub fn is_retriable(&self, error_type: &RetriableErrorType) -> bool {
        self.retriable_errors.contains(error_type)
    }

    /// Check if we should retry given the number of failed attempts so far.
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_retries {
            -1 => true,
            0 => false,
            n => attempt < n as u32,
        }
    }

    /// Calculate delay for a given attempt (exponential backoff plus jitter).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self
            .retry_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let capped = base.min(self.max_delay);

        if self.jitter > 0.0 {
            let jitter_range = capped.as_secs_f64() * self.jitter;
            // Deterministic per attempt so tests can reason about the delay
            let jitter_offset = (attempt as f64 * 0.618033988749895) % 1.0;
            let jitter_amount = jitter_range * (jitter_offset * 2.0 - 1.0);
            let adjusted = capped.as_secs_f64() + jitter_amount;
            Duration::from_secs_f64(adjusted.max(0.0))
        } else {
            capped
        }
    }
}

/// Builder for RetryConfig.
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    max_retries: Option<i32>,
    retry_delay: Option<Duration>,
    max_delay: Option<Duration>,
    jitter: Option<f64>,
    retriable_errors: Option<HashSet<RetriableErrorType>>,
}

impl RetryConfigBuilder {
    /// Set maximum retry attempts.
    pub fn max_retries(mut self, value: i32) -> Self {
        self.max_retries = Some(value);
        self
    }

    /// Set base retry delay.
    pub fn retry_delay(mut self, value: Duration) -> Self {
        self.retry_delay = Some(value);
        self
    }

    /// Set maximum delay cap.
    pub fn max_delay(mut self, value: Duration) -> Self {
        self.max_delay = Some(value);
        self
    }

    /// Set jitter factor (0.0 - 1.0).
    pub fn jitter(mut self, value: f64) -> Self {
        self.jitter = Some(value.clamp(0.0, 1.0));
        self
    }

    /// Set retriable error types.
    pub fn retriable_errors(mut self, errors: HashSet<RetriableErrorType>) -> Self {
        self.retriable_errors = Some(errors);
        self
    }

    /// Build the RetryConfig.
    pub fn build(self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            retriable_errors: self.retriable_errors.unwrap_or(defaults.retriable_errors),
        }
    }
}
