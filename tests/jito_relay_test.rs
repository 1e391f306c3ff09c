//! Integration tests for the Jito block engine client
//!
//! This test validates against a local HTTP mock:
//! - sendBundle request shape and auth header
//! - Inflight status translation, including landed signatures
//! - Tip account discovery and configured fallback
//! - Rate limiting and JSON-RPC error mapping

use launch_bundler::config::RelayConfig;
use launch_bundler::relay::{JitoRelay, RelayError, RelayService};
use launch_bundler::{Pubkey, TxState};
use mockito::Matcher;
use serde_json::json;
use std::str::FromStr;

const FALLBACK_TIP: &str = "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5";

fn relay_for(server: &mockito::ServerGuard, auth_token: Option<&str>) -> JitoRelay {
    let config = RelayConfig {
        block_engine_url: server.url(),
        auth_token: auth_token.map(str::to_string),
        tip_accounts: vec![FALLBACK_TIP.to_string()],
        requests_per_second: 100,
        ..RelayConfig::default()
    };
    JitoRelay::new(&config).unwrap()
}

fn rpc_result(result: serde_json::Value) -> String {
    json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string()
}

#[tokio::test]
async fn test_send_bundle_posts_base64_batch_with_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bundles")
        .match_header("x-jito-auth", "test-uuid")
        .match_body(Matcher::PartialJson(json!({
            "method": "sendBundle",
            "params": [["dHgx", "dHgy"], {"encoding": "base64"}]
        })))
        .with_status(200)
        .with_body(rpc_result(json!("bundle-abc")))
        .create_async()
        .await;

    let relay = relay_for(&server, Some("test-uuid"));
    let tip = Pubkey::new_unique();
    let bundle_id = relay
        .submit_bundle(&["dHgx".to_string(), "dHgy".to_string()], &tip, 10_000)
        .await
        .unwrap();

    assert_eq!(bundle_id, "bundle-abc");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_landed_status_carries_signatures() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .match_body(Matcher::PartialJson(
            json!({"method": "getInflightBundleStatuses"}),
        ))
        .with_body(rpc_result(json!({
            "context": {"slot": 280},
            "value": [{"bundle_id": "b1", "status": "Landed", "landed_slot": 279}]
        })))
        .create_async()
        .await;
    server
        .mock("POST", "/bundles")
        .match_body(Matcher::PartialJson(json!({"method": "getBundleStatuses"})))
        .with_body(rpc_result(json!({
            "context": {"slot": 280},
            "value": [{
                "bundle_id": "b1",
                "transactions": ["sig1", "sig2", "sig3"],
                "slot": 279,
                "confirmation_status": "confirmed"
            }]
        })))
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    let status = relay.bundle_status("b1").await.unwrap();

    assert_eq!(status.state(), TxState::Confirmed);
    assert_eq!(status.landed_slot, Some(279));
    assert_eq!(status.signatures, vec!["sig1", "sig2", "sig3"]);
}

#[tokio::test]
async fn test_unknown_bundle_stays_pending() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .with_body(rpc_result(json!({"context": {"slot": 1}, "value": []})))
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    let status = relay.bundle_status("missing").await.unwrap();
    assert_eq!(status.status, "Unknown");
    assert_eq!(status.state(), TxState::Pending);
}

#[tokio::test]
async fn test_failed_inflight_status_is_terminal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .with_body(rpc_result(json!({
            "context": {"slot": 1},
            "value": [{"bundle_id": "b2", "status": "Failed", "landed_slot": null}]
        })))
        .expect(1)
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    let status = relay.bundle_status("b2").await.unwrap();
    assert_eq!(status.state(), TxState::Failed);
    assert!(status.signatures.is_empty());
}

#[tokio::test]
async fn test_http_429_is_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    let err = relay
        .submit_bundle(&["dHgx".to_string()], &Pubkey::new_unique(), 1_000)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::RateLimited));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_json_rpc_error_is_rejection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32602, "message": "bundle must contain a tip"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    let err = relay
        .submit_bundle(&["dHgx".to_string()], &Pubkey::new_unique(), 1_000)
        .await
        .unwrap_err();
    match err {
        RelayError::Rejected { code, message } => {
            assert_eq!(code, -32602);
            assert!(message.contains("tip"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_http_and_retryable() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/transactions")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    match relay.send_transaction("dHgx").await.unwrap_err() {
        RelayError::Http { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tip_accounts_from_relay() {
    let mut server = mockito::Server::new_async().await;
    let advertised = Pubkey::new_unique();
    server
        .mock("POST", "/bundles")
        .match_body(Matcher::PartialJson(json!({"method": "getTipAccounts"})))
        .with_body(rpc_result(json!([advertised.to_string(), "not-a-key"])))
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    assert_eq!(relay.tip_accounts().await.unwrap(), vec![advertised]);
    assert_eq!(relay.random_tip_account().await.unwrap(), advertised);
}

#[tokio::test]
async fn test_tip_accounts_fall_back_when_relay_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bundles")
        .with_status(500)
        .create_async()
        .await;

    let relay = relay_for(&server, None);
    assert_eq!(
        relay.tip_accounts().await.unwrap(),
        vec![Pubkey::from_str(FALLBACK_TIP).unwrap()]
    );
}

#[tokio::test]
async fn test_capabilities_follow_config() {
    let server = mockito::Server::new_async().await;
    let relay = relay_for(&server, None);

    let caps = relay.capabilities();
    assert!(caps.preserves_order);
    assert_eq!(caps.max_bundle_len, Some(5));
    // Pool + liquidity + 3 buys fits, 4 buys does not
    assert!(caps.incompatibility(5).is_none());
    assert!(caps.incompatibility(6).is_some());
}
