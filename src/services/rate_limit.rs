// src/services/rate_limit.rs
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub window_seconds: u64,
    pub whitelist_ips: Vec<String>,
    /// Key callers on X-Forwarded-For / X-Real-IP instead of the socket peer.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 50,     // 50 registration attempts
            window_seconds: 3600, // per hour
            whitelist_ips: Vec::new(),
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable rate limiting
        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        // RATE_LIMIT_MAX_ATTEMPTS - attempts allowed per window per caller
        if let Ok(limit) = env::var("RATE_LIMIT_MAX_ATTEMPTS") {
            if let Ok(val) = limit.parse::<u32>() {
                config.max_attempts = val;
            }
        }

        // RATE_LIMIT_WINDOW_SECONDS - time window in seconds
        if let Ok(window) = env::var("RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(val) = window.parse::<u64>() {
                config.window_seconds = val;
            }
        }

        // RATE_LIMIT_WHITELIST_IPS - comma-separated list of whitelisted IPs
        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // RATE_LIMIT_TRUST_PROXY_HEADERS - set to "true" behind a reverse proxy
        if let Ok(trust) = env::var("RATE_LIMIT_TRUST_PROXY_HEADERS") {
            config.trust_proxy_headers = trust.to_lowercase() == "true";
        }

        config
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }

    fn is_expired(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u64 },
}

/// Fixed-window attempt counter keyed by caller identity (client IP).
///
/// The window opens on a caller's first attempt and everything is
/// forgotten once it has fully elapsed.
#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    rate_limiter: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            max_attempts = config.max_attempts,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            trust_proxy_headers = config.trust_proxy_headers,
            "Initializing RateLimitService"
        );
        Self {
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if an IP is whitelisted
    fn is_whitelisted(&self, identity: &str) -> bool {
        self.config
            .whitelist_ips
            .iter()
            .any(|whitelisted_ip| whitelisted_ip == identity)
    }

    /// Count one attempt for `identity` and decide whether it may proceed
    pub async fn check_rate_limit(&self, identity: &str) -> RateLimitResult {
        if !self.config.enabled || self.is_whitelisted(identity) {
            return RateLimitResult::Allowed;
        }

        let window_duration = self.config.window();
        let mut limiter = self.rate_limiter.write().await;

        let state = limiter
            .entry(identity.to_string())
            .or_insert_with(RateLimitState::new);

        if state.is_expired(window_duration) {
            state.reset();
        }

        if state.count >= self.config.max_attempts {
            let remaining = window_duration.saturating_sub(state.window_start.elapsed());
            let retry_after = remaining.as_secs().max(1);
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        debug!(identity = %identity, count = state.count, "Attempt counted");
        RateLimitResult::Allowed
    }

    /// Forget the counter for `identity`, e.g. after a successful registration
    pub async fn reset(&self, identity: &str) {
        let mut limiter = self.rate_limiter.write().await;
        if limiter.remove(identity).is_some() {
            debug!(identity = %identity, "Rate limit counter reset");
        }
    }

    /// Log a rate limit violation
    pub fn log_violation(&self, identity: &str, endpoint: &str) {
        warn!(
            identity = %identity,
            endpoint = %endpoint,
            "Rate limit violation detected"
        );
    }

    /// Clean up expired entries (should be called periodically)
    pub async fn cleanup_expired(&self) -> usize {
        let window_duration = self.config.window();
        let mut limiter = self.rate_limiter.write().await;
        let before = limiter.len();
        limiter.retain(|_, state| !state.is_expired(window_duration));
        let removed = before - limiter.len();
        if removed > 0 {
            info!(removed, "Cleaned up expired rate limit entries");
        }
        removed
    }

    /// Periodically forget callers whose window has elapsed
    pub fn start_cleanup_task(service: Arc<RateLimitService>) {
        tokio::spawn(async move {
            let period = service.config.window().max(Duration::from_secs(1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                service.cleanup_expired().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service(max_attempts: u32, window_seconds: u64) -> RateLimitService {
        RateLimitService::new(RateLimitConfig {
            enabled: true,
            max_attempts,
            window_seconds,
            whitelist_ips: vec!["127.0.0.1".to_string()],
            trust_proxy_headers: false,
        })
    }

    #[test]
    fn test_default_policy_is_fifty_per_hour() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_attempts, 50);
        assert_eq!(config.window(), Duration::from_secs(3600));
        assert!(!config.trust_proxy_headers);
    }

    #[tokio::test]
    async fn test_allows_exactly_the_limit_then_blocks() {
        let service = create_test_service(50, 3600);

        for i in 0..50 {
            let result = service.check_rate_limit("203.0.113.7").await;
            assert_eq!(result, RateLimitResult::Allowed, "attempt {} should pass", i + 1);
        }

        let result = service.check_rate_limit("203.0.113.7").await;
        match result {
            RateLimitResult::Limited { retry_after } => {
                assert!(retry_after > 0 && retry_after <= 3600);
            }
            other => panic!("51st attempt should be limited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_different_callers_have_separate_limits() {
        let service = create_test_service(2, 3600);

        service.check_rate_limit("198.51.100.1").await;
        service.check_rate_limit("198.51.100.1").await;
        assert!(matches!(
            service.check_rate_limit("198.51.100.1").await,
            RateLimitResult::Limited { .. }
        ));

        assert_eq!(
            service.check_rate_limit("198.51.100.2").await,
            RateLimitResult::Allowed
        );
    }

    #[tokio::test]
    async fn test_reset_clears_counter() {
        let service = create_test_service(1, 3600);

        assert_eq!(service.check_rate_limit("198.51.100.9").await, RateLimitResult::Allowed);
        assert!(matches!(
            service.check_rate_limit("198.51.100.9").await,
            RateLimitResult::Limited { .. }
        ));

        service.reset("198.51.100.9").await;
        assert_eq!(service.check_rate_limit("198.51.100.9").await, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_whitelist_bypasses_rate_limit() {
        let service = create_test_service(1, 3600);

        for _ in 0..10 {
            assert_eq!(service.check_rate_limit("127.0.0.1").await, RateLimitResult::Allowed);
        }
    }

    #[tokio::test]
    async fn test_disabled_limiter_allows_everything() {
        let service = RateLimitService::new(RateLimitConfig {
            enabled: false,
            max_attempts: 0,
            ..RateLimitConfig::default()
        });

        assert_eq!(service.check_rate_limit("203.0.113.1").await, RateLimitResult::Allowed);
    }

    #[tokio::test]
    async fn test_window_expiry_starts_a_new_window() {
        let service = create_test_service(1, 1);

        assert_eq!(service.check_rate_limit("203.0.113.5").await, RateLimitResult::Allowed);
        assert!(matches!(
            service.check_rate_limit("203.0.113.5").await,
            RateLimitResult::Limited { .. }
        ));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(service.cleanup_expired().await, 1);
        assert_eq!(service.check_rate_limit("203.0.113.5").await, RateLimitResult::Allowed);
    }
}
