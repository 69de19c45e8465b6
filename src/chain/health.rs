//! Per-endpoint health tracking for the RPC client.
//!
//! Endpoints that fail repeatedly are quarantined for a cooldown period and
//! retried afterwards.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// State of a single RPC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Usable
    Healthy,
    /// Quarantined after repeated failures
    CoolingDown,
}

#[derive(Debug, Clone)]
struct EndpointHealth {
    state: EndpointState,
    consecutive_failures: u32,
    cooldown_start: Option<Instant>,
}

impl EndpointHealth {
    fn new() -> Self {
        Self {
            state: EndpointState::Healthy,
            consecutive_failures: 0,
            cooldown_start: None,
        }
    }
}

/// Tracks endpoint health and decides which endpoints may be used.
pub struct EndpointBreaker {
    health: HashMap<String, EndpointHealth>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl EndpointBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            health: HashMap::new(),
            failure_threshold,
            cooldown,
        }
    }

    /// Record a successful request; resets the failure streak.
    pub fn record_success(&mut self, endpoint: &str) {
        let health = self
            .health
            .entry(endpoint.to_string())
            .or_insert_with(EndpointHealth::new);
        health.consecutive_failures = 0;
        health.cooldown_start = None;
        health.state = EndpointState::Healthy;
    }

    /// Record a failed request; quarantines the endpoint once the streak
    /// reaches the threshold.
    pub fn record_failure(&mut self, endpoint: &str) {
        let threshold = self.failure_threshold;
        let health = self
            .health
            .entry(endpoint.to_string())
            .or_insert_with(EndpointHealth::new);
        health.consecutive_failures += 1;

        if health.consecutive_failures >= threshold && health.state == EndpointState::Healthy {
            health.state = EndpointState::CoolingDown;
            health.cooldown_start = Some(Instant::now());
            warn!(
                "quarantining endpoint {} after {} consecutive failures",
                endpoint, health.consecutive_failures
            );
        }
    }

    /// Whether the endpoint may be used right now. Expired cooldowns
    /// transition back to healthy with a fresh streak.
    pub fn is_available(&mut self, endpoint: &str) -> bool {
        let cooldown = self.cooldown;
        let health = self
            .health
            .entry(endpoint.to_string())
            .or_insert_with(EndpointHealth::new);

        if health.state == EndpointState::CoolingDown {
            let expired = health
                .cooldown_start
                .map(|start| start.elapsed() >= cooldown)
                .unwrap_or(true);
            if expired {
                debug!("endpoint {} cooldown expired, retrying", endpoint);
                health.state = EndpointState::Healthy;
                health.consecutive_failures = 0;
                health.cooldown_start = None;
            }
        }

        health.state == EndpointState::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_starts_healthy() {
        let mut breaker = EndpointBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.is_available("https://rpc.example"));
    }

    #[test]
    fn test_quarantine_after_threshold() {
        let mut breaker = EndpointBreaker::new(3, Duration::from_secs(60));

        breaker.record_failure("a");
        breaker.record_failure("a");
        assert!(breaker.is_available("a"));

        breaker.record_failure("a");
        assert!(!breaker.is_available("a"));
    }

    #[test]
    fn test_success_resets_streak() {
        let mut breaker = EndpointBreaker::new(3, Duration::from_secs(60));

        breaker.record_failure("a");
        breaker.record_failure("a");
        breaker.record_success("a");
        breaker.record_failure("a");
        breaker.record_failure("a");
        assert!(breaker.is_available("a"));
    }

    #[test]
    fn test_cooldown_expiry_restores_endpoint() {
        let mut breaker = EndpointBreaker::new(1, Duration::from_millis(0));

        breaker.record_failure("a");
        // zero cooldown expires immediately
        assert!(breaker.is_available("a"));
    }

    #[test]
    fn test_endpoints_tracked_independently() {
        let mut breaker = EndpointBreaker::new(1, Duration::from_secs(60));

        breaker.record_failure("a");
        assert!(!breaker.is_available("a"));
        assert!(breaker.is_available("b"));
    }
}
