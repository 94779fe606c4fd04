//! Dedup, retry and cache policy of the fetch gateway, driven by a scripted
//! transport on a paused clock.

mod common;

use common::{ScriptedTransport, Step};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use todak_fetch::{
    CachedResponse, CancellationToken, Error, FetchGateway, FetchOptions, GatewayConfig,
    RequestDescriptor, RetryPolicy,
};

fn gateway(transport: Arc<ScriptedTransport>) -> FetchGateway {
    FetchGateway::new(transport)
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_calls_share_one_network_call() {
    let transport = ScriptedTransport::with_latency(
        vec![Step::Respond(200, r#"{"current":7}"#)],
        Step::Respond(200, r#"{"current":8}"#),
        Duration::from_millis(50),
    );
    let gw = gateway(transport.clone());

    let (a, b) = tokio::join!(gw.get("/api/user/streak"), gw.get("/api/user/streak"));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(transport.calls(), 1);
    assert_eq!(a.text(), b.text());
    assert!(CachedResponse::ptr_eq(&a, &b));
    assert_eq!(gw.stats().dedup_joins, 1);
    assert_eq!(gw.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn different_signatures_are_not_shared() {
    let transport = ScriptedTransport::with_latency(
        Vec::new(),
        Step::Respond(200, "{}"),
        Duration::from_millis(20),
    );
    let gw = gateway(transport.clone());

    let post = FetchOptions::new().method(Method::POST).body("{}");
    let (a, b) = tokio::join!(gw.get("/api/user/streak"), gw.fetch("/api/user/streak", post));
    a.unwrap();
    b.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(gw.stats().dedup_joins, 0);
}

#[tokio::test(start_paused = true)]
async fn descriptor_calls_with_different_bodies_are_not_shared() {
    let transport = ScriptedTransport::with_latency(
        Vec::new(),
        Step::Respond(200, "{}"),
        Duration::from_millis(20),
    );
    let gw = gateway(transport.clone());
    let desc = RequestDescriptor::new(Method::POST, "/api/diary/save");

    let (a, b) = tokio::join!(
        gw.fetch(desc.clone(), FetchOptions::new().body("a")),
        gw.fetch(desc.clone(), FetchOptions::new().body("b")),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(transport.calls(), 2);
    let mut bodies: Vec<_> = transport.seen().into_iter().filter_map(|r| r.body).collect();
    bodies.sort();
    assert_eq!(bodies, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn settled_calls_are_not_reused_without_cache() {
    let transport = ScriptedTransport::always(Step::Respond(200, "ok"));
    let gw = gateway(transport.clone());

    gw.get("/api/user/emotion-stats").await.unwrap();
    gw.get("/api/user/emotion-stats").await.unwrap();

    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn identity_lookup_is_cached_for_its_ttl() {
    let transport = ScriptedTransport::new(
        vec![Step::Respond(200, r#"{"id":"u1"}"#)],
        Step::Respond(200, r#"{"id":"u2"}"#),
    );
    let gw = gateway(transport.clone());

    let first = gw.get("/api/me").await.unwrap();
    tokio::time::advance(Duration::from_millis(1000)).await;
    let second = gw.get("/api/me").await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert!(CachedResponse::ptr_eq(&first, &second));
    assert_eq!(gw.stats().cache_hits, 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    let third = gw.get("/api/me").await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(third.text(), r#"{"id":"u2"}"#);
}

#[tokio::test(start_paused = true)]
async fn per_call_ttl_overrides_the_default() {
    let transport = ScriptedTransport::always(Step::Respond(200, "me"));
    let gw = gateway(transport.clone());
    let opts = || FetchOptions::new().cache_ttl(Duration::from_secs(5));

    gw.fetch("/api/me", opts()).await.unwrap();
    tokio::time::advance(Duration::from_secs(4)).await;
    gw.fetch("/api/me", opts()).await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    gw.fetch("/api/me", opts()).await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_ttl_falls_back_to_the_default() {
    let transport = ScriptedTransport::always(Step::Respond(200, "me"));
    let gw = gateway(transport.clone());
    let opts = || FetchOptions::new().cache_ttl(Duration::ZERO);

    gw.fetch("/api/me", opts()).await.unwrap();
    tokio::time::advance(Duration::from_millis(1400)).await;
    gw.fetch("/api/me", opts()).await.unwrap();

    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn non_identity_endpoints_bypass_the_cache() {
    let transport = ScriptedTransport::always(Step::Respond(200, "{}"));
    let gw = gateway(transport.clone());

    gw.get("/api/diary/today-emotion").await.unwrap();
    gw.get("/api/diary/today-emotion").await.unwrap();
    gw.get(RequestDescriptor::new(Method::GET, "/api/me")).await.unwrap();
    gw.get(RequestDescriptor::new(Method::GET, "/api/me")).await.unwrap();

    assert_eq!(transport.calls(), 4);
    assert_eq!(gw.stats().cache_hits, 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limits_back_off_exponentially_then_succeed() {
    let transport = ScriptedTransport::new(
        vec![Step::Respond(429, "slow down"), Step::Respond(429, "slow down")],
        Step::Respond(200, "done"),
    );
    let gw = gateway(transport.clone());

    let started = Instant::now();
    let resp = gw.get("/api/ai/history").await.unwrap();
    let waited = started.elapsed();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text(), "done");
    assert_eq!(transport.calls(), 3);
    assert!(waited >= Duration::from_millis(1000 + 2000), "waited {waited:?}");
    assert!(waited < Duration::from_millis(1300 + 2300), "waited {waited:?}");
    assert_eq!(gw.stats().rate_limit_retries, 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_rate_limit_returns_the_last_429() {
    let transport = ScriptedTransport::always(Step::Respond(429, r#"{"message":"busy"}"#));
    let gw = gateway(transport.clone());

    let resp = gw.get("/api/online/messages").await.unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(!resp.ok());
    assert_eq!(transport.calls(), 5);
    assert_eq!(gw.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_transport_failures_are_raised() {
    let transport = ScriptedTransport::always(Step::Fail);
    let gw = gateway(transport.clone());

    let started = Instant::now();
    let err = gw.get("/api/online/messages").await.unwrap_err();
    let waited = started.elapsed();

    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert_eq!(transport.calls(), 5);
    assert_eq!(gw.stats().transport_retries, 4);
    assert!(waited >= Duration::from_millis(4 * 500));
    assert!(waited < Duration::from_millis(4 * 900));
}

#[tokio::test(start_paused = true)]
async fn transport_failure_then_success_recovers() {
    let transport = ScriptedTransport::new(vec![Step::Fail], Step::Respond(200, "back"));
    let gw = gateway(transport.clone());

    let resp = gw.get("/api/user/streak").await.unwrap();

    assert_eq!(resp.text(), "back");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn retries_share_one_attempt_budget() {
    let transport = ScriptedTransport::new(
        vec![Step::Respond(429, ""), Step::Fail, Step::Respond(429, ""), Step::Fail],
        Step::Fail,
    );
    let gw = gateway(transport.clone());

    let err = gw.get("/api/user/streak").await.unwrap_err();

    assert!(err.is_transport());
    assert_eq!(transport.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn server_errors_are_values_and_not_retried() {
    let transport = ScriptedTransport::always(Step::Respond(500, "<html>boom</html>"));
    let gw = gateway(transport.clone());

    let resp = gw.get("/api/profile/update").await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json_value(), None);
    assert_eq!(resp.json_value(), None);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn json_reads_are_repeatable() {
    let transport = ScriptedTransport::always(Step::Respond(200, r#"{"items":[1,2]}"#));
    let gw = gateway(transport);

    let resp = gw.get("/api/diary/sessions").await.unwrap();
    let first = resp.json_value();
    let second = resp.clone().json_value();

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn cancellable_calls_never_share() {
    let transport = ScriptedTransport::with_latency(
        Vec::new(),
        Step::Respond(200, "{}"),
        Duration::from_millis(30),
    );
    let gw = gateway(transport.clone());

    let token = CancellationToken::new();
    let (a, b) = tokio::join!(
        gw.fetch("/api/user/streak", FetchOptions::new()),
        gw.fetch(
            "/api/user/streak",
            FetchOptions::new().cancel_token(token.clone())
        ),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(gw.stats().dedup_joins, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_only_the_caller() {
    let transport = ScriptedTransport::with_latency(
        Vec::new(),
        Step::Respond(200, "late"),
        Duration::from_secs(1),
    );
    let gw = gateway(transport.clone());

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        }
    };
    let (cancelled, plain, _) = tokio::join!(
        gw.fetch("/api/ai/chat", FetchOptions::new().cancel_token(token)),
        gw.fetch("/api/ai/chat", FetchOptions::new()),
        canceller,
    );

    assert!(matches!(cancelled, Err(Error::Cancelled)));
    assert_eq!(plain.unwrap().text(), "late");
}

#[tokio::test(start_paused = true)]
async fn failed_request_clears_its_registry_entry() {
    let transport = ScriptedTransport::new(vec![Step::Fail], Step::Respond(200, "fresh"));
    let config = GatewayConfig::default().with_retry(RetryPolicy::default().with_max_retries(0));
    let gw = FetchGateway::builder()
        .transport(transport.clone())
        .config(config)
        .build()
        .unwrap();

    assert!(gw.get("/api/user/streak").await.is_err());
    assert_eq!(gw.in_flight_len(), 0);

    let resp = gw.get("/api/user/streak").await.unwrap();
    assert_eq!(resp.text(), "fresh");
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_request_still_settles_and_unregisters() {
    let transport = ScriptedTransport::with_latency(
        Vec::new(),
        Step::Respond(200, "{}"),
        Duration::from_millis(50),
    );
    let gw = gateway(transport.clone());

    let caller = {
        let gw = gw.clone();
        tokio::spawn(async move { gw.get("/api/online/messages").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(gw.in_flight_len(), 1);
    caller.abort();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gw.in_flight_len(), 0);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn options_reach_the_transport() {
    let transport = ScriptedTransport::always(Step::Respond(201, "{}"));
    let gw = gateway(transport.clone());

    let opts = FetchOptions::new()
        .method(Method::POST)
        .json(&serde_json::json!({"text": "안녕"}))
        .unwrap();
    gw.fetch("/api/online/message", opts).await.unwrap();

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].url, "/api/online/message");
    assert_eq!(seen[0].headers["Content-Type"], "application/json");
    assert_eq!(seen[0].body.as_deref(), Some(r#"{"text":"안녕"}"#));
}
