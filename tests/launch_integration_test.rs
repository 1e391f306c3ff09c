//! End-to-end launch through the public API
//!
//! This test validates:
//! - Settings resolved from a TOML config file
//! - A request parsed from the same TOML shape the CLI reads
//! - The serialized launch report and the rendered metrics
//!
//! Requires the `test_utils` feature for the in-memory collaborators.

use launch_bundler::config::LauncherConfig;
use launch_bundler::test_utils::MockEnvironment;
use launch_bundler::{
    CancelToken, LaunchOrchestrator, LaunchRequestDraft, LaunchSettings, Settlement, TxState,
};
use std::io::Write;
use std::time::Duration;

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", body).unwrap();
    file
}

fn request_toml(mint: &str, use_relay: bool) -> String {
    format!(
        r#"
token_mint = "{}"
token_amount = "1000000"
sol_amount = "5"
total_sniper_sol = "2"
wallet_count = 5
slippage_pct = 10.0
use_relay = {}
tip_lamports = "20000"
"#,
        mint, use_relay
    )
}

#[tokio::test(start_paused = true)]
async fn test_relay_launch_from_config_and_request_files() {
    let env = MockEnvironment::new(5_000_000.0).await;
    let config_file = write_config(
        r#"
[monitor]
poll_interval_ms = 500
max_poll_attempts = 4

[launch]
default_slippage_pct = 2.0
"#,
    );
    let config = LauncherConfig::from_file(config_file.path().to_str().unwrap()).unwrap();
    let settings = LaunchSettings::from_config(&config).unwrap();
    assert_eq!(settings.monitor.poll_interval, Duration::from_millis(500));
    assert_eq!(settings.token_program, env.token_program);

    let draft: LaunchRequestDraft =
        toml::from_str(&request_toml(&env.mint.to_string(), true)).unwrap();
    let orchestrator = LaunchOrchestrator::new(env.services(), settings).unwrap();
    let report = orchestrator.launch_draft(draft, CancelToken::new()).await;

    assert_eq!(report.outcome, Settlement::Success, "error: {:?}", report.error);
    assert_eq!(report.records_in(TxState::Confirmed), 7);
    assert_eq!(env.relay.submitted().await[0].tip_lamports, 20_000);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"], "success");
    assert_eq!(json["mode"], "relay");
    assert_eq!(json["bundle_id"], "mock-bundle-1");
    assert_eq!(json["anything_submitted"], true);
    assert_eq!(json["prestep"]["outcome"], "not_needed");
    assert!(json["relay_fallback"].is_null());
    assert_eq!(json["records"].as_array().unwrap().len(), 7);
    assert_eq!(json["records"][0]["kind"], "pool");
    assert_eq!(json["records"][6]["state"], "confirmed");
    assert_eq!(json["generated_keys"].as_array().unwrap().len(), 5);
    assert!(json["error"].is_null());

    let rendered = orchestrator.metrics().render();
    assert!(rendered.contains("launches_succeeded 1"));
    assert!(rendered.contains("bundles_submitted 1"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_launch_report_is_safe_to_retry() {
    let env = MockEnvironment::new(1.0).await;
    let config = LauncherConfig::default();
    let settings = LaunchSettings::from_config(&config).unwrap();
    let orchestrator = LaunchOrchestrator::new(env.services(), settings).unwrap();

    let draft: LaunchRequestDraft =
        toml::from_str(&request_toml(&env.mint.to_string(), false)).unwrap();
    let report = orchestrator.launch_draft(draft, CancelToken::new()).await;

    assert_eq!(report.outcome, Settlement::Failure);
    assert!(report.safe_to_retry());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"], "failure");
    assert_eq!(json["anything_submitted"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient balance"));
    assert!(orchestrator.metrics().render().contains("launches_failed 1"));
}
