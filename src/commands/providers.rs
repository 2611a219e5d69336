//! Lists the configured fallback chains without touching the network. Useful
//! for checking which provider answers first for each endpoint.

use async_trait::async_trait;
use serde::Serialize;

use crate::context::AppContext;
use crate::diff::{Diff, EmptyDelta};
use crate::error::CommandError;
use crate::operation::Operation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderList {
    pub chains: Vec<ChainInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainInfo {
    pub endpoint: String,
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub base_url: String,
}

impl Diff for ProviderList {
    type Delta = EmptyDelta;

    // The registry is fixed for the lifetime of the process.
    fn diff(&self, _previous: &Self) -> EmptyDelta {
        EmptyDelta {}
    }
}

/// `chainwatch providers`
pub struct ProvidersCommand;

#[async_trait]
impl Operation for ProvidersCommand {
    type Output = ProviderList;

    fn name(&self) -> &'static str {
        "providers"
    }

    async fn fetch(&self, ctx: &AppContext) -> Result<ProviderList, CommandError> {
        let chains = ctx
            .providers
            .chains()
            .into_iter()
            .map(|(endpoint, providers)| ChainInfo {
                endpoint: endpoint.to_string(),
                providers: providers
                    .iter()
                    .map(|p| ProviderInfo {
                        id: p.id.clone(),
                        base_url: p.base_url.clone(),
                    })
                    .collect(),
            })
            .collect();
        Ok(ProviderList { chains })
    }

    fn render(&self, data: &ProviderList, _previous: Option<&ProviderList>) -> String {
        let mut out = String::from("configured fallback chains");
        for chain in &data.chains {
            let ids: Vec<&str> = chain.providers.iter().map(|p| p.id.as_str()).collect();
            out.push_str(&format!("\n  {:<11} {}", chain.endpoint, ids.join(" -> ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, Config};

    #[tokio::test]
    async fn lists_every_default_chain_offline() {
        let ctx = AppContext::new(Config::default()).unwrap();
        let list = ProvidersCommand.fetch(&ctx).await.unwrap();
        assert_eq!(list.chains.len(), 4);

        let fees = list.chains.iter().find(|c| c.endpoint == "fees").unwrap();
        let ids: Vec<&str> = fees.providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["mempool.space", "blockstream.info"]);
    }

    #[tokio::test]
    async fn render_joins_chain_members_in_order() {
        let ctx = AppContext::new(Config::default()).unwrap();
        let list = ProvidersCommand.fetch(&ctx).await.unwrap();
        let text = ProvidersCommand.render(&list, None);
        assert!(text.contains("price       coingecko -> binance"));
        assert!(text.contains("difficulty  mempool.space"));
    }
}
