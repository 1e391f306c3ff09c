//! Ledger client abstraction
//!
//! The orchestrator only needs a handful of RPC primitives: a recent
//! blockhash, account reads, the owner's token accounts, and send/confirm of
//! a signed transaction. `RpcLedger` implements them against a Solana JSON
//! RPC node; tests use an in-memory ledger.

pub mod errors;
pub mod rpc_ledger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};

pub use errors::LedgerError;
pub use rpc_ledger::RpcLedger;

/// Parsed token account as returned by `getParsedTokenAccountsByOwner`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAccountSummary {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub ui_amount: f64,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Recent blockhash and its last valid block height
    async fn latest_blockhash(&self) -> Result<(Hash, u64), LedgerError>;

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    /// Token accounts of `owner` under `token_program`
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<TokenAccountSummary>, LedgerError>;

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError>;

    /// Block until `signature` reaches the configured commitment
    ///
    /// Errors when the transaction failed on chain or did not land in time.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), LedgerError>;

    async fn has_token_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<bool, LedgerError> {
        let accounts = self.token_accounts_by_owner(owner, token_program).await?;
        Ok(accounts.iter().any(|a| a.mint == *mint))
    }

    /// Sum of `owner`'s balances of `mint`, in UI units
    async fn token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<f64, LedgerError> {
        let accounts = self.token_accounts_by_owner(owner, token_program).await?;
        Ok(accounts
            .iter()
            .filter(|a| a.mint == *mint)
            .map(|a| a.ui_amount)
            .sum())
    }
}
