//! Mempool congestion snapshot.
//!
//! Composes two independent reads, the esplora `/mempool` congestion counters
//! and the recommended fees, fetched concurrently and cached as one record.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use serde::{Deserialize, Serialize};

use crate::client::parse_json;
use crate::commands::fees::{self, FeeEstimate};
use crate::constants::MEMPOOL_TTL_SECS;
use crate::context::AppContext;
use crate::diff::Diff;
use crate::error::{CommandError, FetchError};
use crate::operation::Operation;

/// Pending-transaction counters plus the fee climate they imply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MempoolStatus {
    pub tx_count: u64,
    /// Total virtual size of pending transactions, in vbytes.
    pub vsize: u64,
    /// Total pending fees, in sats.
    pub total_fee: u64,
    pub recommended: FeeEstimate,
}

/// Changes of the congestion counters since the previous poll. The nested fee
/// tiers are not diffed here; the fees command covers them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MempoolDelta {
    pub tx_count_change: i64,
    pub vsize_change: i64,
    pub total_fee_change: i64,
}

impl Diff for MempoolStatus {
    type Delta = MempoolDelta;

    fn diff(&self, previous: &Self) -> MempoolDelta {
        MempoolDelta {
            tx_count_change: self.tx_count as i64 - previous.tx_count as i64,
            vsize_change: self.vsize as i64 - previous.vsize as i64,
            total_fee_change: self.total_fee as i64 - previous.total_fee as i64,
        }
    }
}

/// Esplora `/mempool` response counters. The fee histogram tail is ignored.
#[derive(Debug, Deserialize)]
struct MempoolInfo {
    count: u64,
    vsize: u64,
    total_fee: u64,
}

async fn fetch_congestion(ctx: &AppContext) -> Result<MempoolInfo, FetchError> {
    ctx.client
        .fetch("/mempool", &ctx.providers.esplora, |provider, body| {
            parse_json::<MempoolInfo>(provider, body)
        })
        .await
}

/// `chainwatch mempool`
pub struct MempoolCommand;

#[async_trait]
impl Operation for MempoolCommand {
    type Output = MempoolStatus;

    fn name(&self) -> &'static str {
        "mempool"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<MempoolStatus, CommandError> {
        let status = ctx
            .cache
            .get_or_fetch("mempool", Duration::from_secs(MEMPOOL_TTL_SECS), || async {
                let (congestion, recommended) =
                    future::try_join(fetch_congestion(ctx), fees::fetch_recommended(ctx)).await?;
                Ok::<_, FetchError>(MempoolStatus {
                    tx_count: congestion.count,
                    vsize: congestion.vsize,
                    total_fee: congestion.total_fee,
                    recommended,
                })
            })
            .await?;
        Ok(status)
    }

    fn render(&self, data: &MempoolStatus, previous: Option<&MempoolStatus>) -> String {
        let delta = previous.map(|prev| data.diff(prev));
        let mut out = String::from("mempool\n");

        match delta.as_ref().map(|d| d.tx_count_change) {
            Some(change) if change != 0 => {
                let _ = writeln!(out, "  pending txs  {} ({change:+})", data.tx_count);
            }
            _ => {
                let _ = writeln!(out, "  pending txs  {}", data.tx_count);
            }
        }

        let vsize_mb = data.vsize as f64 / 1_000_000.0;
        match delta.as_ref().map(|d| d.vsize_change) {
            Some(change) if change != 0 => {
                let change_mb = change as f64 / 1_000_000.0;
                let _ = writeln!(out, "  vsize        {vsize_mb:.2} vMB ({change_mb:+.2})");
            }
            _ => {
                let _ = writeln!(out, "  vsize        {vsize_mb:.2} vMB");
            }
        }

        let btc = data.total_fee as f64 / 100_000_000.0;
        let _ = writeln!(out, "  total fees   {btc:.4} BTC");
        let _ = writeln!(out, "  next block   {:.1} sat/vB", data.recommended.fastest);
        out.trim_end().to_string()
    }
}
