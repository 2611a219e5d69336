//! Defaults for the chainwatch runtime
//!
//! Everything here can be overridden through [`crate::context::Config`]; the
//! values are the out-of-the-box behavior of the CLI.

/// How long a watch session sleeps between ticks (in seconds)
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 30;

/// HTTP request timeout for a single provider attempt (in seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of cached results held at once
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cache TTL for recommended fee estimates (in seconds)
pub const FEES_TTL_SECS: u64 = 20;

/// Cache TTL for the mempool congestion snapshot (in seconds)
pub const MEMPOOL_TTL_SECS: u64 = 15;

/// Cache TTL for the spot price (in seconds)
pub const PRICE_TTL_SECS: u64 = 60;

/// Cache TTL for the difficulty adjustment estimate (in seconds)
pub const DIFFICULTY_TTL_SECS: u64 = 300;

/// Cache TTL for block lookups; blocks are immutable once mined,
/// so this only bounds memory, not correctness (in seconds)
pub const BLOCK_TTL_SECS: u64 = 3600;

/// mempool.space API base URL
pub const MEMPOOL_SPACE_API_URL: &str = "https://mempool.space/api";

/// blockstream.info (esplora) API base URL
pub const BLOCKSTREAM_API_URL: &str = "https://blockstream.info/api";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Binance public API base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// User agent for HTTP requests
pub const USER_AGENT: &str = concat!("chainwatch/", env!("CARGO_PKG_VERSION"));
