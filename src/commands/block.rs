//! Block lookup by hash over the esplora providers.
//!
//! A mined block is immutable, so the record carries an empty delta and the
//! cache holds it for an hour under a per-hash key.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::cache_key;
use crate::client::parse_json;
use crate::constants::BLOCK_TTL_SECS;
use crate::context::AppContext;
use crate::diff::{Diff, EmptyDelta};
use crate::error::{CommandError, ProviderError};
use crate::operation::Operation;
use crate::providers::Provider;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub hash: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub tx_count: u64,
    /// Serialized size in bytes.
    pub size: u64,
    /// Weight units.
    pub weight: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
}

impl Diff for BlockSummary {
    type Delta = EmptyDelta;

    // A block never changes once mined.
    fn diff(&self, _previous: &Self) -> EmptyDelta {
        EmptyDelta {}
    }
}

/// Esplora `/block/{hash}` response shape.
#[derive(Debug, Deserialize)]
struct BlockRaw {
    id: String,
    height: u64,
    timestamp: i64,
    tx_count: u64,
    size: u64,
    weight: u64,
    previousblockhash: Option<String>,
}

fn parse(provider: &Provider, body: &str) -> Result<BlockSummary, ProviderError> {
    let raw: BlockRaw = parse_json(provider, body)?;
    let timestamp = Utc
        .timestamp_opt(raw.timestamp, 0)
        .single()
        .ok_or_else(|| {
            ProviderError::invalid(format!("block timestamp out of range: {}", raw.timestamp))
        })?;
    Ok(BlockSummary {
        hash: raw.id,
        height: raw.height,
        timestamp,
        tx_count: raw.tx_count,
        size: raw.size,
        weight: raw.weight,
        previous_hash: raw.previousblockhash,
    })
}

fn is_block_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// `chainwatch block <hash>`
pub struct BlockCommand {
    hash: String,
}

impl BlockCommand {
    pub fn new(hash: impl Into<String>) -> Self {
        BlockCommand { hash: hash.into() }
    }
}

#[async_trait]
impl Operation for BlockCommand {
    type Output = BlockSummary;

    fn name(&self) -> &'static str {
        "block"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<BlockSummary, CommandError> {
        if !is_block_hash(&self.hash) {
            return Err(CommandError::invalid_argument(format!(
                "block hash must be 64 hex characters, got {:?}",
                self.hash
            )));
        }
        let path = format!("/block/{}", self.hash);
        let summary = ctx
            .cache
            .get_or_fetch(
                &cache_key("block", &self.hash),
                Duration::from_secs(BLOCK_TTL_SECS),
                || async { ctx.client.fetch(&path, &ctx.providers.esplora, parse).await },
            )
            .await?;
        Ok(summary)
    }

    fn render(&self, data: &BlockSummary, _previous: Option<&BlockSummary>) -> String {
        let mut out = format!("block {}\n", data.hash);
        let _ = writeln!(out, "  height   {}", data.height);
        let _ = writeln!(
            out,
            "  time     {}",
            data.timestamp.format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(out, "  txs      {}", data.tx_count);
        let _ = writeln!(out, "  size     {:.2} MB", data.size as f64 / 1_000_000.0);
        let _ = writeln!(out, "  weight   {:.2} MWU", data.weight as f64 / 1_000_000.0);
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, Config};

    const GENESIS: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    #[test]
    fn recognizes_well_formed_hashes() {
        assert!(is_block_hash(GENESIS));
        assert!(!is_block_hash("abc123"));
        assert!(!is_block_hash(&"g".repeat(64)));
    }

    #[tokio::test]
    async fn rejects_malformed_hash_before_any_fetch() {
        let ctx = AppContext::new(Config::default()).unwrap();
        let err = BlockCommand::new("not-a-hash").fetch(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("64 hex characters"));
    }

    #[test]
    fn parses_esplora_block_shape() {
        let provider = Provider::new("blockstream.info", "https://blockstream.info/api");
        let body = format!(
            r#"{{"id":"{GENESIS}","height":0,"version":1,"timestamp":1231006505,
                "tx_count":1,"size":285,"weight":1140,"merkle_root":"4a5e1e4b"}}"#
        );
        let block = parse(&provider, &body).unwrap();
        assert_eq!(block.hash, GENESIS);
        assert_eq!(block.height, 0);
        assert_eq!(block.timestamp.timestamp(), 1_231_006_505);
        assert_eq!(block.previous_hash, None);
    }

    #[test]
    fn block_delta_is_always_empty() {
        let provider = Provider::new("blockstream.info", "https://blockstream.info/api");
        let body = format!(
            r#"{{"id":"{GENESIS}","height":0,"timestamp":1231006505,"tx_count":1,"size":285,"weight":1140}}"#
        );
        let block = parse(&provider, &body).unwrap();
        let delta = block.diff(&block);
        assert_eq!(serde_json::to_string(&delta).unwrap(), "{}");
    }

    #[test]
    fn render_summarizes_the_block() {
        let cmd = BlockCommand::new(GENESIS);
        let block = BlockSummary {
            hash: GENESIS.to_string(),
            height: 680_000,
            timestamp: Utc.timestamp_opt(1_618_411_260, 0).unwrap(),
            tx_count: 2875,
            size: 1_310_000,
            weight: 3_990_000,
            previous_hash: Some("00".repeat(32)),
        };
        let text = cmd.render(&block, None);
        assert!(text.starts_with(&format!("block {GENESIS}")));
        assert!(text.contains("height   680000"));
        assert!(text.contains("size     1.31 MB"));
        assert!(text.contains("weight   3.99 MWU"));
    }
}
