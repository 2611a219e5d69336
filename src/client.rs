//! Ordered multi-provider fetch execution
//!
//! [`FetchClient`] walks a fallback chain strictly in the caller-supplied
//! order and returns the first attempt that both answers and parses. Every
//! failed attempt is folded into a [`FailureRecord`] rather than driving
//! control flow through error propagation, so an exhausted chain reports the
//! whole ordered history, not just the last straw.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{FailureRecord, FetchError, ProviderError};
use crate::providers::Provider;

/// Longest error-body excerpt kept in a failure record
const ERROR_BODY_SNIPPET_LEN: usize = 200;

/// HTTP client that executes fetches across an ordered fallback chain
///
/// The client itself is schema-agnostic: the caller supplies a parser that
/// turns a provider's body into the canonical record, and may branch on the
/// provider when chains are heterogeneous.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Builds the client with a per-attempt timeout; the timeout applies to
    /// each provider attempt separately, not to the whole chain walk
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(ProviderError::Network)?;
        Ok(Self { http })
    }

    /// Fetches `base_url + path` from each provider in order until one
    /// succeeds
    ///
    /// Suits chains whose providers mirror the same path layout (the esplora
    /// family). Returns the first parsed value; if every provider fails, the
    /// error carries all failure records in call order.
    pub async fn fetch<T, P>(
        &self,
        path: &str,
        providers: &[Provider],
        parse: P,
    ) -> Result<T, FetchError>
    where
        P: Fn(&Provider, &str) -> Result<T, ProviderError>,
    {
        let routes: Vec<(Provider, String)> = providers
            .iter()
            .map(|p| (p.clone(), path.to_string()))
            .collect();
        self.fetch_routed(&routes, parse).await
    }

    /// Like [`FetchClient::fetch`], but with a provider-specific path per
    /// entry, for chains that do not share a path shape
    pub async fn fetch_routed<T, P>(
        &self,
        routes: &[(Provider, String)],
        parse: P,
    ) -> Result<T, FetchError>
    where
        P: Fn(&Provider, &str) -> Result<T, ProviderError>,
    {
        if routes.is_empty() {
            return Err(FetchError::NoProviders);
        }

        let mut failures: Vec<FailureRecord> = Vec::with_capacity(routes.len());
        for (provider, path) in routes {
            match self.attempt(provider, path, &parse).await {
                Ok(value) => {
                    if !failures.is_empty() {
                        tracing::debug!(
                            provider = %provider.id,
                            failed_before = failures.len(),
                            "fallback provider answered"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    tracing::warn!(
                        provider = %provider.id,
                        error = %err,
                        "provider attempt failed"
                    );
                    failures.push(FailureRecord::new(provider.id.clone(), err.to_string()));
                }
            }
        }

        Err(FetchError::AllProvidersFailed { failures })
    }

    /// One GET against one provider; fails on transport errors, timeouts,
    /// non-success statuses and parser rejections
    async fn attempt<T, P>(
        &self,
        provider: &Provider,
        path: &str,
        parse: &P,
    ) -> Result<T, ProviderError>
    where
        P: Fn(&Provider, &str) -> Result<T, ProviderError>,
    {
        let url = provider.url(path);
        tracing::debug!(provider = %provider.id, %url, "fetching");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::from_request)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status,
                body: snippet(&body),
            });
        }

        let body = response.text().await.map_err(ProviderError::from_request)?;
        parse(provider, &body)
    }
}

/// Deserializes a provider body, mapping serde failures into the attempt
/// taxonomy; usable directly as the parser for homogeneous chains
pub fn parse_json<T: DeserializeOwned>(provider: &Provider, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|err| {
        ProviderError::invalid(format!("{} body did not parse: {err}", provider.id))
    })
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_SNIPPET_LEN {
        trimmed.to_string()
    } else {
        let mut end = ERROR_BODY_SNIPPET_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}
