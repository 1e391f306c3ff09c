//! Builder output and partial signing
//!
//! Every builder returns a `BuiltTransaction`: the transaction, its role
//! in the launch, and the signers it still needs. Sniper transactions come
//! back already signed by their sniper key; pool and liquidity transactions
//! come back unsigned and are signed by the connected wallet later.

use crate::compat;
use crate::monitor::TxKind;
use crate::tx_builder::errors::TransactionBuilderError;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};

#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    /// The transaction, signed or not
    pub tx: VersionedTransaction,

    pub kind: TxKind,

    /// Sniper wallet index for buys
    pub wallet_index: Option<usize>,

    /// Required signers, in signature-slot order
    pub required_signers: Vec<Pubkey>,
}

impl BuiltTransaction {
    /// Wrap `tx`, making sure it has one signature slot per required signer
    pub fn new(mut tx: VersionedTransaction, kind: TxKind, wallet_index: Option<usize>) -> Self {
        let required_signers = compat::signers(&tx.message).to_vec();
        if tx.signatures.len() < required_signers.len() {
            tx.signatures
                .resize(required_signers.len(), Signature::default());
        }

        Self {
            tx,
            kind,
            wallet_index,
            required_signers,
        }
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// Signers whose slot is still empty
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.required_signers
            .iter()
            .zip(self.tx.signatures.iter())
            .filter(|(_, sig)| **sig == Signature::default())
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Fee-payer signature, once present
    pub fn signature(&self) -> Option<Signature> {
        self.tx
            .signatures
            .first()
            .copied()
            .filter(|sig| *sig != Signature::default())
    }

    /// Replace the transaction with a signed copy of the same message
    pub fn replace_signed(&mut self, signed: VersionedTransaction) -> Result<(), TransactionBuilderError> {
        if signed.message != self.tx.message {
            return Err(TransactionBuilderError::Signing(
                "signer returned a different message".to_string(),
            ));
        }
        self.tx = signed;
        Ok(())
    }
}

/// Sign `tx` with `keypair` in the keypair's own signer slot
///
/// Other slots are left as they are, so signers can sign in any order.
pub fn partial_sign(
    tx: &mut VersionedTransaction,
    keypair: &Keypair,
) -> Result<(), TransactionBuilderError> {
    let signer = keypair.pubkey();
    let position = compat::signer_slot(&tx.message, &signer).ok_or_else(|| {
        TransactionBuilderError::Signing(format!("{} is not a required signer", signer))
    })?;

    let required = compat::signature_count(&tx.message);
    if tx.signatures.len() < required {
        tx.signatures.resize(required, Signature::default());
    }
    tx.signatures[position] = keypair.sign_message(&tx.message.serialize());
    Ok(())
}
