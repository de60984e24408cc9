use std::{path::PathBuf, time::Duration};

use backon::ExponentialBuilder;
use url::Url;

pub const DEFAULT_EXECUTION_ENDPOINT: &str = "http://127.0.0.1:8551";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(2);
/// Two slots, long enough to cover a late `getPayload` for a build started in the prior slot.
pub const DEFAULT_PAYLOAD_TTL: Duration = Duration::from_secs(24);
/// Execution clients reject tokens whose `iat` is more than 60 seconds away from their clock.
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(30);
pub const DEFAULT_TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_CACHE_PRUNE_INTERVAL: Duration = Duration::from_secs(12);

/// Backoff policy for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    pub fn to_backoff_builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionEngineConfig {
    pub endpoint: Url,
    pub jwt_secret_path: PathBuf,
    /// Optional `id` claim identifying this node to the execution client.
    pub jwt_id: Option<String>,
    /// Optional `clv` claim.
    pub client_version: Option<String>,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    pub payload_ttl: Duration,
    pub token_validity: Duration,
    pub token_refresh_interval: Duration,
    pub cache_prune_interval: Duration,
}

impl ExecutionEngineConfig {
    pub fn new(endpoint: Url, jwt_secret_path: PathBuf) -> Self {
        Self {
            endpoint,
            jwt_secret_path,
            jwt_id: None,
            client_version: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
            payload_ttl: DEFAULT_PAYLOAD_TTL,
            token_validity: DEFAULT_TOKEN_VALIDITY,
            token_refresh_interval: DEFAULT_TOKEN_REFRESH_INTERVAL,
            cache_prune_interval: DEFAULT_CACHE_PRUNE_INTERVAL,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_payload_ttl(mut self, payload_ttl: Duration) -> Self {
        self.payload_ttl = payload_ttl;
        self
    }

    pub fn with_jwt_claims(
        mut self,
        jwt_id: Option<String>,
        client_version: Option<String>,
    ) -> Self {
        self.jwt_id = jwt_id;
        self.client_version = client_version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let endpoint = Url::parse(DEFAULT_EXECUTION_ENDPOINT).expect("valid url");
        let config = ExecutionEngineConfig::new(endpoint, PathBuf::from("jwt.hex"));

        assert_eq!(config.request_timeout, Duration::from_secs(8));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.payload_ttl, Duration::from_secs(24));
        assert!(config.token_refresh_interval < config.token_validity);
    }
}
