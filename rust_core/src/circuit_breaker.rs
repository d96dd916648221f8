//! Circuit breaker for external HTTP collaborators (source page, prediction service).
//!
//! Closed -> Open after `failure_threshold` consecutive failures; Open -> HalfOpen once
//! `recovery_timeout` has elapsed; HalfOpen -> Closed after `success_threshold` successes,
//! or straight back to Open on any failure.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// States for the API circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are refused until the recovery timeout passes
    Open,
    /// Probing whether the collaborator has recovered
    HalfOpen,
}

impl ApiCircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiCircuitState::Closed => "closed",
            ApiCircuitState::Open => "open",
            ApiCircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiCircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time spent open before a probe is allowed
    pub recovery_timeout: Duration,
    /// Successful probes needed to close again
    pub success_threshold: u32,
}

impl Default for ApiCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

impl ApiCircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            ..Default::default()
        }
    }
}

/// Point-in-time view for logs and health output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCircuitSnapshot {
    pub name: String,
    pub state: ApiCircuitState,
    pub consecutive_failures: u32,
}

/// Breaker guarding calls to one external service.
///
/// ```ignore
/// if !breaker.is_available() {
///     return Err(anyhow!("prediction service circuit breaker open"));
/// }
/// let result = client.post(url).send().await;
/// match &result {
///     Ok(_) => breaker.record_success(),
///     Err(_) => breaker.record_failure(),
/// }
/// ```
#[derive(Debug)]
pub struct ApiCircuitBreaker {
    name: String,
    config: ApiCircuitBreakerConfig,
    state: RwLock<ApiCircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
}

impl ApiCircuitBreaker {
    pub fn new(name: &str, config: ApiCircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            state: RwLock::new(ApiCircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    pub fn with_defaults(name: &str) -> Self {
        Self::new(name, ApiCircuitBreakerConfig::default())
    }

    /// Whether a request may be attempted now. Moves Open -> HalfOpen when the timeout has passed.
    pub fn is_available(&self) -> bool {
        let mut state = self.state.write();

        match *state {
            ApiCircuitState::Closed | ApiCircuitState::HalfOpen => true,
            ApiCircuitState::Open => {
                let recovered = self
                    .opened_at
                    .read()
                    .map(|t| t.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);

                if recovered {
                    *state = ApiCircuitState::HalfOpen;
                    self.success_count.store(0, Ordering::SeqCst);
                    tracing::info!("Circuit breaker '{}' half-open, probing", self.name);
                }
                recovered
            }
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);

        let mut state = self.state.write();
        if *state == ApiCircuitState::HalfOpen {
            let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
            if successes < self.config.success_threshold {
                return;
            }
            tracing::info!(
                "Circuit breaker '{}' closed after {} successful probes",
                self.name,
                successes
            );
        }
        *state = ApiCircuitState::Closed;
    }

    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;

        let mut state = self.state.write();
        match *state {
            ApiCircuitState::Closed if failures >= self.config.failure_threshold => {
                *state = ApiCircuitState::Open;
                *self.opened_at.write() = Some(Instant::now());
                tracing::warn!(
                    "Circuit breaker '{}' OPEN after {} consecutive failures",
                    self.name,
                    failures
                );
            }
            ApiCircuitState::HalfOpen => {
                *state = ApiCircuitState::Open;
                *self.opened_at.write() = Some(Instant::now());
                tracing::warn!("Circuit breaker '{}' re-opened by failed probe", self.name);
            }
            _ => {}
        }
    }

    pub fn state(&self) -> ApiCircuitState {
        *self.state.read()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ApiCircuitSnapshot {
        ApiCircuitSnapshot {
            name: self.name.clone(),
            state: self.state(),
            consecutive_failures: self.failure_count(),
        }
    }

    pub fn reset(&self) {
        *self.state.write() = ApiCircuitState::Closed;
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        *self.opened_at.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, recovery_ms: u64, successes: u32) -> ApiCircuitBreaker {
        ApiCircuitBreaker::new(
            "test_api",
            ApiCircuitBreakerConfig {
                failure_threshold: failures,
                recovery_timeout: Duration::from_millis(recovery_ms),
                success_threshold: successes,
            },
        )
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, 100, 2);
        assert!(cb.is_available());

        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_available());
        assert_eq!(cb.state(), ApiCircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);
        assert!(!cb.is_available());
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(3, 100, 2);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Closed);
        assert_eq!(cb.failure_count(), 1);
    }

    #[test]
    fn test_recovery_through_half_open() {
        let cb = breaker(2, 10, 2);
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_available());
        assert_eq!(cb.state(), ApiCircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), ApiCircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), ApiCircuitState::Closed);
    }

    #[test]
    fn test_failed_probe_reopens() {
        let cb = breaker(1, 10, 1);
        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_available());

        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);
        assert!(!cb.is_available());
    }

    #[test]
    fn test_reset_and_snapshot() {
        let cb = breaker(1, 60_000, 1);
        cb.record_failure();
        assert_eq!(cb.snapshot().state, ApiCircuitState::Open);
        assert_eq!(cb.snapshot().consecutive_failures, 1);

        cb.reset();
        let snap = cb.snapshot();
        assert_eq!(snap.name, "test_api");
        assert_eq!(snap.state, ApiCircuitState::Closed);
        assert_eq!(snap.consecutive_failures, 0);
    }
}
