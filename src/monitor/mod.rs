//! Transaction records and their confirmation
//!
//! Every transaction handed to the relay or the ledger gets a
//! `TransactionRecord`. Records live in a per-launch `RecordStore` and move
//! `pending → confirmed | failed` exactly once, driven by the
//! `ConfirmationMonitor`.

pub mod confirmation;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

pub use confirmation::{BundleResolution, ConfirmationMonitor, MonitorSettings};
pub use store::{RecordStore, RecordUpdate};

/// Role of a transaction in the launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Pool,
    Liquidity,
    Buy,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::Liquidity => "liquidity",
            Self::Buy => "buy",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform confirmation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
    Pending,
    Confirmed,
    Failed,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submitted transaction and where it stands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Signature, or a placeholder for a transaction that carries none yet
    pub key: String,
    pub kind: TxKind,
    pub wallet_index: Option<usize>,
    pub state: TxState,
    pub bundle_id: Option<String>,
    /// Position inside the bundle, relay mode only
    pub bundle_index: Option<usize>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn pending(key: impl Into<String>, kind: TxKind, wallet_index: Option<usize>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            kind,
            wallet_index,
            state: TxState::Pending,
            bundle_id: None,
            bundle_index: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn in_bundle(mut self, bundle_id: Option<String>, bundle_index: usize) -> Self {
        self.bundle_id = bundle_id;
        self.bundle_index = Some(bundle_index);
        self
    }
}

/// Identity under which a transaction is recorded
///
/// Signed transactions are keyed by their fee-payer signature, which is
/// fixed once signed. Unsigned ones get a placeholder built from `scope`.
pub fn record_key(
    tx: &VersionedTransaction,
    scope: &str,
    kind: TxKind,
    wallet_index: Option<usize>,
) -> String {
    match tx.signatures.first() {
        Some(sig) if *sig != Signature::default() => sig.to_string(),
        _ => match wallet_index {
            Some(i) => format!("{}:{}:{}", scope, kind, i),
            None => format!("{}:{}", scope, kind),
        },
    }
}

/// Cooperative cancellation shared between a caller and a running launch
///
/// Cancelling stops waits and polling. It never retracts anything already
/// sent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration`; returns `false` if cancelled first
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{message::Message, message::VersionedMessage, pubkey::Pubkey};

    #[test]
    fn test_record_key_placeholder_for_unsigned() {
        let payer = Pubkey::new_unique();
        let message = Message::new(&[], Some(&payer));
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        };

        assert_eq!(record_key(&tx, "launch-1", TxKind::Buy, Some(2)), "launch-1:buy:2");
        assert_eq!(record_key(&tx, "launch-1", TxKind::Pool, None), "launch-1:pool");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TxState::Pending.is_terminal());
        assert!(TxState::Confirmed.is_terminal());
        assert!(TxState::Failed.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.sleep(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        assert!(!handle.await.unwrap());
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(800)).await);
    }
}
