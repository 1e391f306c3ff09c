//! Bundle relay abstraction
//!
//! A relay takes an ordered batch of signed transactions plus a tip and
//! tries to land them together. Status vocabularies differ per relay;
//! `translate_relay_status` is the one place that maps them onto `TxState`.

pub mod errors;
pub mod jito;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::monitor::TxState;

pub use errors::RelayError;
pub use jito::JitoRelay;

/// What a relay guarantees about submitted bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCapabilities {
    /// Transactions execute in submission order
    pub preserves_order: bool,
    /// Largest bundle accepted, if bounded
    pub max_bundle_len: Option<usize>,
}

impl RelayCapabilities {
    /// Reason the relay cannot carry a bundle of `len` transactions, if any
    pub fn incompatibility(&self, len: usize) -> Option<String> {
        if !self.preserves_order {
            return Some("relay does not preserve submission order".to_string());
        }
        match self.max_bundle_len {
            Some(max) if len > max => Some(format!(
                "bundle of {} transactions exceeds relay limit of {}",
                len, max
            )),
            _ => None,
        }
    }
}

/// Raw status of one bundle as reported by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayBundleStatus {
    /// Relay vocabulary, e.g. `Landed`, `Pending`, `Failed`, `Invalid`
    pub status: String,
    pub landed_slot: Option<u64>,
    /// Transaction signatures in bundle order, when the relay reports them
    pub signatures: Vec<String>,
}

impl RelayBundleStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            landed_slot: None,
            signatures: Vec::new(),
        }
    }

    pub fn state(&self) -> TxState {
        translate_relay_status(&self.status)
    }
}

/// Map a relay status string onto the three-state model
///
/// Unknown and in-flight statuses stay pending; only an explicit landing
/// confirms.
pub fn translate_relay_status(status: &str) -> TxState {
    let status = status.trim();
    if status.eq_ignore_ascii_case("landed")
        || status.eq_ignore_ascii_case("confirmed")
        || status.eq_ignore_ascii_case("finalized")
    {
        TxState::Confirmed
    } else if status.eq_ignore_ascii_case("failed") || status.eq_ignore_ascii_case("invalid") {
        TxState::Failed
    } else {
        TxState::Pending
    }
}

#[async_trait]
pub trait RelayService: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> RelayCapabilities;

    /// Accounts the relay accepts tips on
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError>;

    /// Submit base64-encoded transactions as one bundle; returns the bundle id
    async fn submit_bundle(
        &self,
        encoded_txs: &[String],
        tip_account: &Pubkey,
        tip_lamports: u64,
    ) -> Result<String, RelayError>;

    async fn bundle_status(&self, bundle_id: &str) -> Result<RelayBundleStatus, RelayError>;

    /// Send one base64-encoded transaction through the relay
    async fn send_transaction(&self, encoded_tx: &str) -> Result<String, RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_relay_status() {
        assert_eq!(translate_relay_status("Landed"), TxState::Confirmed);
        assert_eq!(translate_relay_status("finalized"), TxState::Confirmed);
        assert_eq!(translate_relay_status("Failed"), TxState::Failed);
        assert_eq!(translate_relay_status("Invalid"), TxState::Failed);
        assert_eq!(translate_relay_status("Pending"), TxState::Pending);
        assert_eq!(translate_relay_status("processed"), TxState::Pending);
        assert_eq!(translate_relay_status(""), TxState::Pending);
        assert_eq!(translate_relay_status("SomethingNew"), TxState::Pending);
    }

    #[test]
    fn test_capabilities_incompatibility() {
        let ordered = RelayCapabilities {
            preserves_order: true,
            max_bundle_len: Some(5),
        };
        assert!(ordered.incompatibility(5).is_none());
        assert!(ordered.incompatibility(7).is_some());

        let unordered = RelayCapabilities {
            preserves_order: false,
            max_bundle_len: None,
        };
        assert!(unordered.incompatibility(2).is_some());
    }
}
