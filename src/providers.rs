//! Provider identities and per-endpoint fallback chains
//!
//! A chain is an ordered list of providers for one logical endpoint family;
//! the order is configuration and decides failover priority, with the head
//! treated as the preferred source. Nothing here is learned or re-ranked at
//! runtime.

use crate::constants::{
    BINANCE_API_URL, BLOCKSTREAM_API_URL, COINGECKO_API_URL, MEMPOOL_SPACE_API_URL,
};

/// One upstream data source with its own base URL and response schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: String,
    pub base_url: String,
}

impl Provider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
        }
    }

    /// Resolves a logical endpoint path against this provider's base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// The ordered fallback chains used by the domain commands
///
/// `esplora` groups the mirrors that share esplora-compatible paths
/// (`/mempool`, `/block/{hash}`); the other chains are heterogeneous and
/// their operations branch on `Provider::id` when parsing.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    pub esplora: Vec<Provider>,
    pub fees: Vec<Provider>,
    pub difficulty: Vec<Provider>,
    pub price: Vec<Provider>,
}

impl ProviderRegistry {
    /// Chains with their endpoint family names, for listing and diagnostics
    pub fn chains(&self) -> [(&'static str, &[Provider]); 4] {
        [
            ("esplora", self.esplora.as_slice()),
            ("fees", self.fees.as_slice()),
            ("difficulty", self.difficulty.as_slice()),
            ("price", self.price.as_slice()),
        ]
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mempool_space = Provider::new("mempool.space", MEMPOOL_SPACE_API_URL);
        let blockstream = Provider::new("blockstream.info", BLOCKSTREAM_API_URL);
        Self {
            esplora: vec![mempool_space.clone(), blockstream.clone()],
            fees: vec![mempool_space.clone(), blockstream],
            // blockstream has no difficulty-adjustment endpoint; single-entry
            // chains are legal and simply have nothing to fail over to
            difficulty: vec![mempool_space],
            price: vec![
                Provider::new("coingecko", COINGECKO_API_URL),
                Provider::new("binance", BINANCE_API_URL),
            ],
        }
    }
}
