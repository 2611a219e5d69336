//! # chainwatch
//!
//! Polls public Bitcoin chain and market HTTP APIs (mempool.space,
//! blockstream.info, CoinGecko, Binance) and reports fees, mempool congestion,
//! difficulty progress, block details and the BTC spot price, either once or
//! as a continuously refreshing watch.
//!
//! Every endpoint sits behind an ordered fallback chain: providers are tried
//! in sequence and a result from any of them succeeds, with per-provider
//! failures collected for reporting. Responses are cached with per-endpoint
//! TTLs so tight watch intervals do not hammer the upstream APIs.
//!
//! ## Usage
//!
//! The binary is the main consumer, but every command is an ordinary
//! [`Operation`](operation::Operation) usable as a library:
//!
//! ```no_run
//! use chainwatch::commands::FeesCommand;
//! use chainwatch::context::{AppContext, Config};
//! use chainwatch::operation::Operation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = AppContext::new(Config::default())?;
//! let fees = FeesCommand.fetch(&ctx).await?;
//! println!("next block: {:.1} sat/vB", fees.fastest);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod commands;
pub mod constants;
pub mod context;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod providers;
pub mod runner;

// Re-export commonly used types
pub use cache::CacheLayer;
pub use client::FetchClient;
pub use context::{AppContext, Config};
pub use diff::{Diff, EmptyDelta};
pub use envelope::Envelope;
pub use error::{CommandError, FailureRecord, FetchError, ProviderError};
pub use operation::Operation;
pub use providers::{Provider, ProviderRegistry};
pub use runner::{Mode, RunOptions};
