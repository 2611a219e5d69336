//! End-to-end fallback behavior against mock HTTP providers.
//!
//! Runs real commands through the full client/cache stack with each chain
//! member pointed at its own wiremock server. Per-server `.expect(n)` counts
//! double as ordering proofs: a short-circuited provider shows zero hits, a
//! consulted one shows exactly one.

use std::time::Duration;

use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chainwatch::commands::{FeesCommand, MempoolCommand, PriceCommand};
use chainwatch::context::{AppContext, Config};
use chainwatch::error::CommandError;
use chainwatch::operation::Operation;
use chainwatch::providers::{Provider, ProviderRegistry};
use chainwatch::runner::{self, RunOptions};

const FEES_BODY: &str =
    r#"{"fastestFee":15,"halfHourFee":13,"hourFee":11,"economyFee":8,"minimumFee":1}"#;

fn fees_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(FEES_BODY, "application/json")
}

fn test_config() -> Config {
    Config {
        request_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

fn fees_ctx(chain: Vec<Provider>) -> AppContext {
    let mut registry = ProviderRegistry::default();
    registry.fees = chain;
    AppContext::with_providers(test_config(), registry).unwrap()
}

async fn mount_fees(server: &MockServer, template: ResponseTemplate, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/fees/recommended"))
        .respond_with(template)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fallback_provider_answers_when_the_primary_fails() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    mount_fees(
        &primary,
        ResponseTemplate::new(500).set_body_string("upstream exploded"),
        1,
    )
    .await;
    mount_fees(&secondary, fees_response(), 1).await;

    let ctx = fees_ctx(vec![
        Provider::new("primary", primary.uri()),
        Provider::new("secondary", secondary.uri()),
    ]);

    let fees = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(fees.fastest, 15.0);
}

#[tokio::test]
async fn first_success_never_reaches_later_providers() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    mount_fees(&primary, fees_response(), 1).await;
    // zero expected hits: the chain must short-circuit on the first success
    mount_fees(&secondary, fees_response(), 0).await;

    let ctx = fees_ctx(vec![
        Provider::new("primary", primary.uri()),
        Provider::new("secondary", secondary.uri()),
    ]);

    let fees = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(fees.fastest, 15.0);
}

#[tokio::test]
async fn exhausted_chain_reports_every_failure_in_call_order() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    mount_fees(
        &primary,
        ResponseTemplate::new(500).set_body_string("upstream exploded"),
        1,
    )
    .await;
    mount_fees(
        &secondary,
        ResponseTemplate::new(404).set_body_string("not found"),
        1,
    )
    .await;

    let ctx = fees_ctx(vec![
        Provider::new("primary", primary.uri()),
        Provider::new("secondary", secondary.uri()),
    ]);

    let err = FeesCommand.fetch(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), "all_providers_failed");
    let CommandError::Fetch(fetch_err) = err else {
        panic!("expected a fetch error");
    };

    let failures = fetch_err.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].provider_id, "primary");
    assert!(failures[0].reason.contains("HTTP 500"));
    assert!(failures[0].reason.contains("upstream exploded"));
    assert_eq!(failures[1].provider_id, "secondary");
    assert!(failures[1].reason.contains("HTTP 404"));

    // the headline message names the first failure as the primary cause
    assert!(fetch_err.to_string().contains("primary: HTTP 500"));
}

#[tokio::test]
async fn rate_limited_and_timed_out_attempts_are_tagged() {
    let limited = MockServer::start().await;
    mount_fees(&limited, ResponseTemplate::new(429), 1).await;
    let slow = MockServer::start().await;
    mount_fees(&slow, fees_response().set_delay(Duration::from_secs(5)), 1).await;

    let ctx = fees_ctx(vec![
        Provider::new("limited", limited.uri()),
        Provider::new("slow", slow.uri()),
    ]);

    let err = FeesCommand.fetch(&ctx).await.unwrap_err();
    let CommandError::Fetch(fetch_err) = err else {
        panic!("expected a fetch error");
    };
    let failures = fetch_err.failures();
    assert_eq!(failures[0].reason, "rate limit exceeded");
    assert_eq!(failures[1].reason, "request timed out");
}

#[tokio::test]
async fn parser_rejection_falls_through_to_the_next_provider() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    mount_fees(
        &primary,
        ResponseTemplate::new(200).set_body_string("this is not json"),
        1,
    )
    .await;
    mount_fees(&secondary, fees_response(), 1).await;

    let ctx = fees_ctx(vec![
        Provider::new("primary", primary.uri()),
        Provider::new("secondary", secondary.uri()),
    ]);

    let fees = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(fees.fastest, 15.0);
}

#[tokio::test]
async fn heterogeneous_chains_route_each_provider_to_its_own_shape() {
    let coingecko = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&coingecko)
        .await;

    let binance = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"lastPrice":"43012.84","priceChangePercent":"-0.51"}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&binance)
        .await;

    let mut registry = ProviderRegistry::default();
    registry.price = vec![
        Provider::new("coingecko", coingecko.uri()),
        Provider::new("binance", binance.uri()),
    ];
    let ctx = AppContext::with_providers(test_config(), registry).unwrap();

    let price = PriceCommand.fetch(&ctx).await.unwrap();
    assert_eq!(price.usd, 43012.84);
    assert_eq!(price.change_24h_percent, Some(-0.51));
}

#[tokio::test]
async fn within_ttl_repeat_commands_reuse_the_cached_result() {
    let server = MockServer::start().await;
    // exactly one upstream hit for two command invocations
    mount_fees(&server, fees_response(), 1).await;

    let ctx = fees_ctx(vec![Provider::new("primary", server.uri())]);
    let first = FeesCommand.fetch(&ctx).await.unwrap();
    let second = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn mempool_composes_congestion_and_fees_from_one_shared_fetch() {
    let esplora = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mempool"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"count":45123,"vsize":83420000,"total_fee":214561234,"fee_histogram":[[12.0,250000]]}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&esplora)
        .await;
    let fees = MockServer::start().await;
    // one upstream hit for both commands: the mempool fan-out fills the
    // shared fees slot and the fees command reads it back
    mount_fees(&fees, fees_response(), 1).await;

    let mut registry = ProviderRegistry::default();
    registry.esplora = vec![Provider::new("esplora", esplora.uri())];
    registry.fees = vec![Provider::new("fees", fees.uri())];
    let ctx = AppContext::with_providers(test_config(), registry).unwrap();

    let status = MempoolCommand.fetch(&ctx).await.unwrap();
    assert_eq!(status.tx_count, 45123);
    assert_eq!(status.vsize, 83_420_000);
    assert_eq!(status.total_fee, 214_561_234);
    assert_eq!(status.recommended.fastest, 15.0);

    let recommended = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(recommended, status.recommended);
}

#[tokio::test]
async fn failures_are_never_cached() {
    let server = MockServer::start().await;
    // the 500 mock consumes the first request, then the success mock answers
    Mock::given(method("GET"))
        .and(path("/v1/fees/recommended"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_fees(&server, fees_response(), 1).await;

    let ctx = fees_ctx(vec![Provider::new("primary", server.uri())]);
    assert!(FeesCommand.fetch(&ctx).await.is_err());
    let fees = FeesCommand.fetch(&ctx).await.unwrap();
    assert_eq!(fees.fastest, 15.0);
}

#[tokio::test]
async fn json_failure_document_carries_the_failure_history() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    mount_fees(
        &primary,
        ResponseTemplate::new(502).set_body_string("bad gateway"),
        1,
    )
    .await;
    mount_fees(&secondary, ResponseTemplate::new(429), 1).await;

    let ctx = fees_ctx(vec![
        Provider::new("primary", primary.uri()),
        Provider::new("secondary", secondary.uri()),
    ]);
    let opts = RunOptions {
        watch: false,
        json: true,
        interval: Duration::from_secs(1),
        max_consecutive_failures: None,
    };
    let (_tx, rx) = watch::channel(false);
    let mut out = Vec::new();
    let mut err = Vec::new();

    let code = runner::run_with_io(&ctx, &FeesCommand, &opts, rx, &mut out, &mut err).await;

    assert_eq!(code, 1);
    assert!(out.is_empty());
    let doc: serde_json::Value = serde_json::from_slice(&err).unwrap();
    assert_eq!(doc["op"], "fees");
    assert_eq!(doc["success"], false);
    assert_eq!(doc["error"]["kind"], "all_providers_failed");
    let failures = doc["error"]["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["provider_id"], "primary");
    assert_eq!(failures[1]["provider_id"], "secondary");
    assert_eq!(failures[1]["reason"], "rate limit exceeded");
}
