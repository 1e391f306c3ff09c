//! Bundle assembly and wire encoding
//!
//! A launch bundle is always: pool creation, liquidity seed, then one buy
//! per sniper wallet in wallet-index order. The assembler enforces this
//! order; it neither signs nor submits.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction};

use super::errors::TransactionBuilderError;
use super::instructions::pays_to;
use super::output::BuiltTransaction;
use crate::monitor::TxKind;

/// Relay tip attached to a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TipSpec {
    pub account: Pubkey,
    pub lamports: u64,
}

#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub tx: VersionedTransaction,
    pub kind: TxKind,
    pub wallet_index: Option<usize>,
    pub is_required: bool,
}

impl BundleEntry {
    fn from_built(built: BuiltTransaction) -> Self {
        Self {
            kind: built.kind,
            wallet_index: built.wallet_index,
            tx: built.tx,
            is_required: true,
        }
    }

    /// Fee-payer signature, if signed
    pub fn signature(&self) -> Option<Signature> {
        self.tx
            .signatures
            .first()
            .copied()
            .filter(|sig| *sig != Signature::default())
    }
}

#[derive(Debug, Clone)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
    tip: TipSpec,
}

/// Order the launch transactions into a bundle
///
/// Snipes may arrive in any order; they are placed by wallet index, which
/// must cover `0..snipes.len()` exactly once.
pub fn assemble(
    pool: BuiltTransaction,
    liquidity: BuiltTransaction,
    mut snipes: Vec<BuiltTransaction>,
    tip: TipSpec,
) -> Result<Bundle, TransactionBuilderError> {
    if pool.kind != TxKind::Pool {
        return Err(TransactionBuilderError::invalid_order(format!(
            "first entry must be the pool transaction, got {}",
            pool.kind
        )));
    }
    if liquidity.kind != TxKind::Liquidity {
        return Err(TransactionBuilderError::invalid_order(format!(
            "second entry must be the liquidity transaction, got {}",
            liquidity.kind
        )));
    }
    if snipes.is_empty() {
        return Err(TransactionBuilderError::invalid_order("no buy transactions"));
    }
    if let Some(other) = snipes.iter().find(|s| s.kind != TxKind::Buy) {
        return Err(TransactionBuilderError::invalid_order(format!(
            "{} transaction among buys",
            other.kind
        )));
    }

    snipes.sort_by_key(|s| s.wallet_index);
    for (expected, snipe) in snipes.iter().enumerate() {
        if snipe.wallet_index != Some(expected) {
            return Err(TransactionBuilderError::invalid_order(format!(
                "buy wallet indices must be 0..{}, found {:?} at position {}",
                snipes.len(),
                snipe.wallet_index,
                expected
            )));
        }
    }

    let mut entries = Vec::with_capacity(2 + snipes.len());
    entries.push(BundleEntry::from_built(pool));
    entries.push(BundleEntry::from_built(liquidity));
    entries.extend(snipes.into_iter().map(BundleEntry::from_built));

    Ok(Bundle { entries, tip })
}

impl Bundle {
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tip(&self) -> &TipSpec {
        &self.tip
    }

    /// Whether some entry transfers the tip to the tip account
    pub fn tip_embedded(&self) -> bool {
        self.entries
            .iter()
            .any(|e| pays_to(&e.tx, &self.tip.account, self.tip.lamports))
    }

    /// Re-check the pool → liquidity → buys order
    pub fn verify_order(&self) -> Result<(), TransactionBuilderError> {
        let kinds: Vec<TxKind> = self.entries.iter().map(|e| e.kind).collect();
        match kinds.as_slice() {
            [TxKind::Pool, TxKind::Liquidity, buys @ ..]
                if !buys.is_empty() && buys.iter().all(|k| *k == TxKind::Buy) => {}
            _ => {
                return Err(TransactionBuilderError::invalid_order(format!(
                    "unexpected entry kinds {:?}",
                    kinds
                )))
            }
        }
        if !self.entries[0].is_required {
            return Err(TransactionBuilderError::invalid_order(
                "pool entry must be required",
            ));
        }
        let in_order = self.entries[2..]
            .iter()
            .enumerate()
            .all(|(i, e)| e.wallet_index == Some(i));
        if !in_order {
            return Err(TransactionBuilderError::invalid_order(
                "buys are not in wallet-index order",
            ));
        }
        Ok(())
    }

    /// Relay wire format: base64 of each transaction's bincode bytes
    pub fn encode_wire(&self) -> Result<Vec<String>, TransactionBuilderError> {
        self.entries.iter().map(|e| encode_transaction(&e.tx)).collect()
    }
}

pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, TransactionBuilderError> {
    let bytes =
        bincode::serialize(tx).map_err(|e| TransactionBuilderError::Serialization(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Inverse of [`Bundle::encode_wire`]
pub fn decode_wire(encoded: &[String]) -> Result<Vec<VersionedTransaction>, TransactionBuilderError> {
    encoded
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let bytes = STANDARD.decode(s).map_err(|e| {
                TransactionBuilderError::Serialization(format!("entry {}: {}", i, e))
            })?;
            bincode::deserialize(&bytes).map_err(|e| {
                TransactionBuilderError::Serialization(format!("entry {}: {}", i, e))
            })
        })
        .collect()
}
