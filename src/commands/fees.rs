//! Recommended fee rates across the standard confirmation horizons.
//!
//! mempool.space ships a purpose-built `/v1/fees/recommended` endpoint;
//! blockstream.info only exposes the raw esplora `/fee-estimates` map, so the
//! two providers need different routes and different parsers that converge on
//! the same [`FeeEstimate`] record.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::parse_json;
use crate::constants::FEES_TTL_SECS;
use crate::context::AppContext;
use crate::diff::Diff;
use crate::error::{CommandError, FetchError, ProviderError};
use crate::operation::Operation;
use crate::providers::Provider;

/// Fee rates in sat/vB for the usual confirmation targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeEstimate {
    pub fastest: f64,
    pub half_hour: f64,
    pub hour: f64,
    pub economy: f64,
    pub minimum: f64,
}

/// Signed change of each fee tier since the previous poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeDelta {
    pub fastest_change: f64,
    pub half_hour_change: f64,
    pub hour_change: f64,
    pub economy_change: f64,
    pub minimum_change: f64,
}

impl Diff for FeeEstimate {
    type Delta = FeeDelta;

    fn diff(&self, previous: &Self) -> FeeDelta {
        FeeDelta {
            fastest_change: self.fastest - previous.fastest,
            half_hour_change: self.half_hour - previous.half_hour,
            hour_change: self.hour - previous.hour,
            economy_change: self.economy - previous.economy,
            minimum_change: self.minimum - previous.minimum,
        }
    }
}

/// mempool.space `/v1/fees/recommended` response shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: f64,
    half_hour_fee: f64,
    hour_fee: f64,
    economy_fee: f64,
    minimum_fee: f64,
}

impl From<RecommendedFees> for FeeEstimate {
    fn from(raw: RecommendedFees) -> Self {
        FeeEstimate {
            fastest: raw.fastest_fee,
            half_hour: raw.half_hour_fee,
            hour: raw.hour_fee,
            economy: raw.economy_fee,
            minimum: raw.minimum_fee,
        }
    }
}

fn parse(provider: &Provider, body: &str) -> Result<FeeEstimate, ProviderError> {
    match provider.id.as_str() {
        "blockstream.info" => parse_fee_estimates(provider, body),
        _ => {
            let fees: RecommendedFees = parse_json(provider, body)?;
            Ok(fees.into())
        }
    }
}

/// Esplora `/fee-estimates` keys sat/vB rates by confirmation target. Pick the
/// targets that line up with the recommended tiers.
fn parse_fee_estimates(provider: &Provider, body: &str) -> Result<FeeEstimate, ProviderError> {
    let estimates: HashMap<String, f64> = parse_json(provider, body)?;
    let rate = |target: &str| {
        estimates.get(target).copied().ok_or_else(|| {
            ProviderError::invalid(format!(
                "fee estimates missing confirmation target {target}"
            ))
        })
    };
    Ok(FeeEstimate {
        fastest: rate("1")?,
        half_hour: rate("3")?,
        hour: rate("6")?,
        economy: rate("144")?,
        minimum: rate("1008")?,
    })
}

fn routes(ctx: &AppContext) -> Vec<(Provider, String)> {
    ctx.providers
        .fees
        .iter()
        .map(|provider| {
            let path = match provider.id.as_str() {
                "blockstream.info" => "/fee-estimates",
                _ => "/v1/fees/recommended",
            };
            (provider.clone(), path.to_string())
        })
        .collect()
}

/// Cached fee fetch, shared with the mempool command's composite snapshot so
/// both commands read and refresh the same slot.
pub(crate) async fn fetch_recommended(ctx: &AppContext) -> Result<FeeEstimate, FetchError> {
    ctx.cache
        .get_or_fetch("fees", Duration::from_secs(FEES_TTL_SECS), || async {
            ctx.client.fetch_routed(&routes(ctx), parse).await
        })
        .await
}

/// `chainwatch fees`
pub struct FeesCommand;

#[async_trait]
impl Operation for FeesCommand {
    type Output = FeeEstimate;

    fn name(&self) -> &'static str {
        "fees"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<FeeEstimate, CommandError> {
        Ok(fetch_recommended(ctx).await?)
    }

    fn render(&self, data: &FeeEstimate, previous: Option<&FeeEstimate>) -> String {
        let delta = previous.map(|prev| data.diff(prev));
        let rows = [
            ("fastest", data.fastest, delta.as_ref().map(|d| d.fastest_change)),
            ("half hour", data.half_hour, delta.as_ref().map(|d| d.half_hour_change)),
            ("hour", data.hour, delta.as_ref().map(|d| d.hour_change)),
            ("economy", data.economy, delta.as_ref().map(|d| d.economy_change)),
            ("minimum", data.minimum, delta.as_ref().map(|d| d.minimum_change)),
        ];

        let mut out = String::from("fee estimate (sat/vB)\n");
        for (label, value, change) in rows {
            match change {
                Some(change) if change != 0.0 => {
                    let _ = writeln!(out, "  {label:<9} {value:>7.1} ({change:+.1})");
                }
                _ => {
                    let _ = writeln!(out, "  {label:<9} {value:>7.1}");
                }
            }
        }
        out.trim_end().to_string()
    }
}
