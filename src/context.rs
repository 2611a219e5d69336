//! Process-wide context for operations
//!
//! One [`AppContext`] is built at startup and passed by reference into every
//! operation; there is no hidden global state, so tests construct isolated
//! instances pointed at local mock servers.

use std::time::Duration;

use crate::cache::CacheLayer;
use crate::client::FetchClient;
use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WATCH_INTERVAL_SECS, USER_AGENT,
};
use crate::error::ProviderError;
use crate::providers::ProviderRegistry;

/// Runtime configuration assembled from CLI flags and defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-attempt HTTP timeout
    pub request_timeout: Duration,
    /// Maximum number of cached results
    pub cache_capacity: usize,
    /// Sleep between watch ticks
    pub watch_interval: Duration,
    /// Abort a watch session after this many consecutive failed ticks;
    /// `None` keeps the session running until cancelled
    pub max_consecutive_failures: Option<u32>,
    /// User agent presented to providers
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            watch_interval: Duration::from_secs(DEFAULT_WATCH_INTERVAL_SECS),
            max_consecutive_failures: None,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Shared services handed to every operation: the fetch client, the cache,
/// the provider chains and the configuration they were built from
pub struct AppContext {
    pub client: FetchClient,
    pub cache: CacheLayer,
    pub providers: ProviderRegistry,
    pub config: Config,
}

impl AppContext {
    /// Builds a context against the default provider chains
    pub fn new(config: Config) -> Result<Self, ProviderError> {
        Self::with_providers(config, ProviderRegistry::default())
    }

    /// Builds a context against custom provider chains
    pub fn with_providers(
        config: Config,
        providers: ProviderRegistry,
    ) -> Result<Self, ProviderError> {
        let client = FetchClient::new(config.request_timeout, &config.user_agent)?;
        let cache = CacheLayer::new(config.cache_capacity);
        Ok(Self {
            client,
            cache,
            providers,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;

    #[tokio::test]
    async fn context_builds_with_defaults() {
        let ctx = AppContext::new(Config::default()).unwrap();
        assert_eq!(ctx.providers.esplora[0].id, "mempool.space");
        assert!(ctx.cache.is_empty().await);
        assert_eq!(ctx.config.max_consecutive_failures, None);
    }

    #[test]
    fn custom_registries_replace_the_default_chains() {
        let mut registry = ProviderRegistry::default();
        registry.esplora = vec![Provider::new("local", "http://127.0.0.1:9")];
        let ctx = AppContext::with_providers(Config::default(), registry).unwrap();
        assert_eq!(ctx.providers.esplora.len(), 1);
        assert_eq!(ctx.providers.esplora[0].id, "local");
    }
}
