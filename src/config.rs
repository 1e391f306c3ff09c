//! Configuration module for the launch bundler
//!
//! This module handles configuration loading from TOML files and `.env`
//! overrides, and provides the structured configuration types consumed by
//! the ledger client, the relay client, the confirmation monitor and the
//! orchestrator.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;
use std::time::Duration;

/// Well-known Jito tip account used when discovery is unavailable
pub const DEFAULT_TIP_ACCOUNT: &str = "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5";

/// Mainnet block engine JSON-RPC root
pub const DEFAULT_BLOCK_ENGINE_URL: &str = "https://mainnet.block-engine.jito.wtf/api/v1";

/// Token-2022 program, the default owner program for launched mints
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// Main launcher configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LauncherConfig {
    /// Ledger (RPC) client configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Bundle relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Confirmation monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Launch defaults
    #[serde(default)]
    pub launch: LaunchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Commitment used for reads and confirmation (processed|confirmed|finalized)
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Upper bound on a single confirm call
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Signature status poll interval while confirming
    #[serde(default = "default_confirm_poll_interval")]
    pub confirm_poll_interval_ms: u64,

    /// Token program owning the launched mint
    #[serde(default = "default_token_program")]
    pub token_program_id: String,

    /// Retries for idempotent reads (blockhash, accounts)
    #[serde(default = "default_read_retries")]
    pub read_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Block engine JSON-RPC root (without `/bundles`)
    #[serde(default = "default_block_engine_url")]
    pub block_engine_url: String,

    /// Optional UUID sent as `x-jito-auth`
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Fallback tip accounts when `getTipAccounts` is unavailable
    #[serde(default = "default_tip_accounts")]
    pub tip_accounts: Vec<String>,

    /// Timeout applied to every relay HTTP call
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_ms: u64,

    /// Client-side rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Maximum transactions the relay accepts in one bundle
    #[serde(default = "default_max_bundle_len")]
    pub max_bundle_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between bundle status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Poll budget before the bundle is declared timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Slot time used to convert the snipe delay from blocks to wall time
    #[serde(default = "default_block_time")]
    pub block_time_ms: u64,

    /// Tip used when the request does not name one
    #[serde(default = "default_tip_lamports")]
    pub default_tip_lamports: u64,

    /// Slippage used when the request does not name one
    #[serde(default = "default_slippage_pct")]
    pub default_slippage_pct: f64,

    /// Quote asset of the launched pool (wrapped SOL)
    #[serde(default = "default_quote_mint")]
    pub quote_mint: String,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_confirm_timeout() -> u64 { 60 }
fn default_confirm_poll_interval() -> u64 { 500 }
fn default_token_program() -> String { TOKEN_2022_PROGRAM_ID.to_string() }
fn default_read_retries() -> usize { 3 }
fn default_block_engine_url() -> String { DEFAULT_BLOCK_ENGINE_URL.to_string() }
fn default_tip_accounts() -> Vec<String> { vec![DEFAULT_TIP_ACCOUNT.to_string()] }
fn default_submit_timeout() -> u64 { 10_000 }
fn default_requests_per_second() -> u32 { 5 }
fn default_max_bundle_len() -> usize { 5 }
fn default_poll_interval() -> u64 { 2_000 }
fn default_max_poll_attempts() -> u32 { 30 }
fn default_block_time() -> u64 { 400 }
fn default_tip_lamports() -> u64 { 10_000_000 }
fn default_slippage_pct() -> f64 { 0.5 }
fn default_quote_mint() -> String { spl_token::native_mint::id().to_string() }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            confirm_timeout_secs: default_confirm_timeout(),
            confirm_poll_interval_ms: default_confirm_poll_interval(),
            token_program_id: default_token_program(),
            read_retries: default_read_retries(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            block_engine_url: default_block_engine_url(),
            auth_token: None,
            tip_accounts: default_tip_accounts(),
            submit_timeout_ms: default_submit_timeout(),
            requests_per_second: default_requests_per_second(),
            max_bundle_len: default_max_bundle_len(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            block_time_ms: default_block_time(),
            default_tip_lamports: default_tip_lamports(),
            default_slippage_pct: default_slippage_pct(),
            quote_mint: default_quote_mint(),
        }
    }
}

impl LauncherConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: LauncherConfig =
            toml::from_str(&content).with_context(|| format!("Invalid config file: {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` overrides
    ///
    /// `LAUNCH_RPC_URL`, `JITO_BLOCK_ENGINE_URL` and `JITO_AUTH_TOKEN` take
    /// precedence over the file.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LAUNCH_RPC_URL") {
            self.ledger.rpc_url = url;
        }
        if let Ok(url) = std::env::var("JITO_BLOCK_ENGINE_URL") {
            self.relay.block_engine_url = url;
        }
        if let Ok(token) = std::env::var("JITO_AUTH_TOKEN") {
            self.relay.auth_token = Some(token);
        }
    }

    /// Reject values that would make the launcher misbehave at runtime
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("ledger.rpc_url", &self.ledger.rpc_url),
            ("relay.block_engine_url", &self.relay.block_engine_url),
        ] {
            reqwest::Url::parse(url).with_context(|| format!("{} is not a valid URL", name))?;
        }

        self.ledger.commitment_config()?;
        self.ledger.token_program()?;
        self.relay.tip_account_keys()?;
        self.launch.quote_mint()?;

        if self.ledger.confirm_timeout_secs == 0 {
            bail!("ledger.confirm_timeout_secs must be positive");
        }
        if self.ledger.confirm_poll_interval_ms == 0 {
            bail!("ledger.confirm_poll_interval_ms must be positive");
        }
        if self.relay.submit_timeout_ms == 0 {
            bail!("relay.submit_timeout_ms must be positive");
        }
        if self.relay.requests_per_second == 0 {
            bail!("relay.requests_per_second must be positive");
        }
        if self.relay.max_bundle_len < 3 {
            bail!("relay.max_bundle_len must fit at least pool, liquidity and one buy");
        }
        if self.monitor.poll_interval_ms == 0 {
            bail!("monitor.poll_interval_ms must be positive");
        }
        if self.monitor.max_poll_attempts == 0 {
            bail!("monitor.max_poll_attempts must be positive");
        }
        if self.launch.block_time_ms == 0 {
            bail!("launch.block_time_ms must be positive");
        }
        if !(0.1..=10.0).contains(&self.launch.default_slippage_pct) {
            bail!("launch.default_slippage_pct must be within 0.1..=10");
        }
        Ok(())
    }
}

impl LedgerConfig {
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => bail!("unknown commitment level: {}", other),
        }
    }

    pub fn token_program(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.token_program_id).context("ledger.token_program_id is not a pubkey")
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }
}

impl RelayConfig {
    pub fn tip_account_keys(&self) -> anyhow::Result<Vec<Pubkey>> {
        self.tip_accounts
            .iter()
            .map(|s| {
                Pubkey::from_str(s).with_context(|| format!("invalid tip account: {}", s))
            })
            .collect()
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl LaunchConfig {
    pub fn quote_mint(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.quote_mint).context("launch.quote_mint is not a pubkey")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = LauncherConfig::default();
        config.validate().unwrap();
        assert_eq!(config.monitor.max_poll_attempts, 30);
        assert_eq!(config.monitor.poll_interval_ms, 2_000);
        assert_eq!(config.launch.default_tip_lamports, 10_000_000);
        assert_eq!(
            config.relay.tip_account_keys().unwrap()[0].to_string(),
            DEFAULT_TIP_ACCOUNT
        );
        assert_eq!(
            config.launch.quote_mint().unwrap().to_string(),
            "So11111111111111111111111111111111111111112"
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[ledger]
rpc_url = "http://127.0.0.1:8899"
commitment = "finalized"

[monitor]
max_poll_attempts = 5
"#
        )
        .unwrap();

        let config = LauncherConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(
            config.ledger.commitment_config().unwrap(),
            CommitmentConfig::finalized()
        );
        assert_eq!(config.monitor.max_poll_attempts, 5);
        assert_eq!(config.monitor.poll_interval_ms, 2_000);
        assert_eq!(config.relay.submit_timeout_ms, 10_000);
    }

    #[test]
    fn test_rejects_zero_poll_budget() {
        let mut config = LauncherConfig::default();
        config.monitor.max_poll_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_commitment_and_pubkeys() {
        let mut config = LauncherConfig::default();
        config.ledger.commitment = "eventually".to_string();
        assert!(config.validate().is_err());

        let mut config = LauncherConfig::default();
        config.relay.tip_accounts = vec!["not-a-key".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(LauncherConfig::from_file("/nonexistent/launcher.toml").is_err());
    }
}
