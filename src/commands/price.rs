//! BTC spot price in USD, CoinGecko first with Binance as fallback.
//!
//! CoinGecko answers with nested JSON numbers; Binance quotes every field as a
//! string, so its parser goes through `str::parse`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::parse_json;
use crate::constants::PRICE_TTL_SECS;
use crate::context::AppContext;
use crate::diff::Diff;
use crate::error::{CommandError, ProviderError};
use crate::operation::Operation;
use crate::providers::Provider;

const SYMBOL: &str = "BTC";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPrice {
    pub symbol: String,
    pub usd: f64,
    /// 24h change in percent, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDelta {
    pub usd_change: f64,
}

impl Diff for AssetPrice {
    type Delta = PriceDelta;

    fn diff(&self, previous: &Self) -> PriceDelta {
        PriceDelta {
            usd_change: self.usd - previous.usd,
        }
    }
}

/// CoinGecko `/simple/price` response shape.
#[derive(Debug, Deserialize)]
struct CoinGeckoPrice {
    bitcoin: CoinGeckoQuote,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoQuote {
    usd: f64,
    usd_24h_change: Option<f64>,
}

/// Binance `/ticker/24hr` quotes numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTicker {
    last_price: String,
    price_change_percent: String,
}

fn parse_quoted(field: &str, value: &str) -> Result<f64, ProviderError> {
    value
        .parse::<f64>()
        .map_err(|_| ProviderError::invalid(format!("unparseable {field}: {value:?}")))
}

fn parse(provider: &Provider, body: &str) -> Result<AssetPrice, ProviderError> {
    match provider.id.as_str() {
        "binance" => {
            let ticker: BinanceTicker = parse_json(provider, body)?;
            Ok(AssetPrice {
                symbol: SYMBOL.to_string(),
                usd: parse_quoted("lastPrice", &ticker.last_price)?,
                change_24h_percent: Some(parse_quoted(
                    "priceChangePercent",
                    &ticker.price_change_percent,
                )?),
            })
        }
        _ => {
            let price: CoinGeckoPrice = parse_json(provider, body)?;
            Ok(AssetPrice {
                symbol: SYMBOL.to_string(),
                usd: price.bitcoin.usd,
                change_24h_percent: price.bitcoin.usd_24h_change,
            })
        }
    }
}

fn routes(ctx: &AppContext) -> Vec<(Provider, String)> {
    ctx.providers
        .price
        .iter()
        .map(|provider| {
            let path = match provider.id.as_str() {
                "binance" => "/ticker/24hr?symbol=BTCUSDT",
                _ => "/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true",
            };
            (provider.clone(), path.to_string())
        })
        .collect()
}

/// `chainwatch price`
pub struct PriceCommand;

#[async_trait]
impl Operation for PriceCommand {
    type Output = AssetPrice;

    fn name(&self) -> &'static str {
        "price"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<AssetPrice, CommandError> {
        let price = ctx
            .cache
            .get_or_fetch("price", Duration::from_secs(PRICE_TTL_SECS), || async {
                ctx.client.fetch_routed(&routes(ctx), parse).await
            })
            .await?;
        Ok(price)
    }

    fn render(&self, data: &AssetPrice, previous: Option<&AssetPrice>) -> String {
        let mut line = format!("{} ${:.2}", data.symbol, data.usd);
        if let Some(prev) = previous {
            let change = data.diff(prev).usd_change;
            if change != 0.0 {
                line.push_str(&format!(" ({change:+.2})"));
            }
        }
        if let Some(pct) = data.change_24h_percent {
            line.push_str(&format!(" (24h {pct:+.2}%)"));
        }
        line
    }
}
