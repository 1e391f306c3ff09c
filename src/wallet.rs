//! Key management: the connected wallet and the sniper wallets
//!
//! The connected wallet is reached through `WalletSigner`, which may be an
//! external, user-mediated signer. Sniper wallets are plain keypairs, either
//! generated for the launch or supplied by the caller as key material.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use zeroize::Zeroize;

use crate::errors::LaunchError;
use crate::tx_builder::{output::partial_sign, TransactionBuilderError};

/// Signing surface of the connected wallet
///
/// One call signs one transaction. Implementations may suspend for as long
/// as a user takes to approve.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Public key of the wallet
    fn pubkey(&self) -> Pubkey;

    /// Sign `tx` in the wallet's signer slot and return it
    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionBuilderError>;
}

/// Local keypair acting as the connected wallet
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
}

impl KeypairSigner {
    /// Load a keypair file (64 raw bytes or a JSON byte array)
    pub fn from_file(path: &str) -> Result<Self> {
        let mut keypair_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let keypair = if keypair_bytes.len() == 64 {
            let parsed = keypair_from_bytes(&keypair_bytes);
            keypair_bytes.zeroize();
            parsed.map_err(anyhow::Error::msg)?
        } else {
            let mut json: Vec<u8> = serde_json::from_slice(&keypair_bytes)
                .context("Failed to parse keypair JSON")?;
            keypair_bytes.zeroize();
            let parsed = keypair_from_bytes(&json);
            json.zeroize();
            parsed.map_err(anyhow::Error::msg)?
        };

        Ok(Self::from_keypair(keypair))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(
        &self,
        mut tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        partial_sign(&mut tx, &self.keypair)?;
        Ok(tx)
    }
}

/// Serializes access to a wallet so that no two signing requests overlap
///
/// Wallet UIs are modal; a second request while one is pending is either
/// dropped or confuses the user.
pub struct SingleFlightSigner {
    inner: Arc<dyn WalletSigner>,
    gate: Mutex<()>,
    calls: AtomicUsize,
}

impl SingleFlightSigner {
    pub fn new(inner: Arc<dyn WalletSigner>) -> Self {
        Self {
            inner,
            gate: Mutex::new(()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of signing requests forwarded so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl WalletSigner for SingleFlightSigner {
    fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        let _guard = self.gate.lock().await;
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.sign_transaction(tx).await
    }
}

/// Signer of one sniper wallet
///
/// `Generated` keys are owned by the launch; `Supplied` keys belong to the
/// caller and are only borrowed for signing.
#[derive(Clone)]
pub enum SniperSigner {
    Generated(Arc<Keypair>),
    Supplied(Arc<Keypair>),
}

impl SniperSigner {
    pub fn generate() -> Self {
        Self::Generated(Arc::new(Keypair::new()))
    }

    pub fn keypair(&self) -> &Keypair {
        match self {
            Self::Generated(k) | Self::Supplied(k) => k,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair().pubkey()
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

impl std::fmt::Debug for SniperSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let custody = if self.is_generated() { "generated" } else { "supplied" };
        f.debug_struct("SniperSigner")
            .field("pubkey", &self.pubkey())
            .field("custody", &custody)
            .finish()
    }
}

fn keypair_from_bytes(bytes: &[u8]) -> std::result::Result<Keypair, String> {
    if bytes.len() != 64 {
        return Err(format!(
            "Invalid keypair length: expected 64 bytes, got {}",
            bytes.len()
        ));
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err("Invalid keypair: all-zero key rejected".to_string());
    }
    Keypair::try_from(bytes).map_err(|e| format!("Invalid keypair bytes: {}", e))
}

/// Parse sniper key material, one key per line
///
/// Each non-empty line is either a JSON byte array or a base58 secret key.
pub fn parse_sniper_keys(text: &str) -> std::result::Result<Vec<Keypair>, LaunchError> {
    let mut keys = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut bytes = if line.starts_with('[') {
            serde_json::from_str::<Vec<u8>>(line).map_err(|e| {
                LaunchError::validation(format!(
                    "sniper key on line {}: invalid JSON byte array: {}",
                    line_no + 1,
                    e
                ))
            })?
        } else {
            bs58::decode(line).into_vec().map_err(|e| {
                LaunchError::validation(format!(
                    "sniper key on line {}: invalid base58: {}",
                    line_no + 1,
                    e
                ))
            })?
        };

        let parsed = keypair_from_bytes(&bytes);
        bytes.zeroize();
        let keypair = parsed.map_err(|reason| {
            LaunchError::validation(format!("sniper key on line {}: {}", line_no + 1, reason))
        })?;
        keys.push(keypair);
    }

    Ok(keys)
}
