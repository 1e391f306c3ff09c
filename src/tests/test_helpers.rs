#![allow(unused_imports)]
//! Test Helper Utilities
//!
//! Shared fixtures for the launch scenario tests:
//! - Request drafts against a [`MockEnvironment`] mint
//! - Sniper key material in the text form users paste
//! - Accessors for fee payer and program data of built transactions

#[cfg(test)]
pub mod test_helpers {
    use solana_sdk::{
        pubkey::Pubkey,
        signature::{Keypair, Signer},
        transaction::VersionedTransaction,
    };

    use crate::orchestrator::LaunchOrchestrator;
    use crate::request::LaunchRequestDraft;
    use crate::test_utils::MockEnvironment;

    /// Wallet balance funded by [`environment`], in UI units
    pub const WALLET_BALANCE: f64 = 2_000_000.0;

    /// Liquidity seeded by [`draft`]: 1,000,000 tokens (6 decimals) against 5 SOL
    pub const LIQUIDITY_TOKENS: &str = "1000000";
    pub const LIQUIDITY_SOL: &str = "5";

    /// 2 SOL split across 5 wallets is 0.4 SOL each
    pub const PER_WALLET_LAMPORTS: u64 = 400_000_000;

    /// Base-token output of a 0.4 SOL buy against 1e12 / 5e9 reserves at 0.25% fee
    pub const QUOTED_TOKENS: u64 = 73_902_574_550;

    /// `desired × 0.4 / 5 × (1 − 10%)`
    pub const MIN_TOKENS_AT_10_PCT: u64 = 72_000_000_000;

    pub async fn environment() -> MockEnvironment {
        MockEnvironment::new(WALLET_BALANCE).await
    }

    pub fn orchestrator(env: &MockEnvironment) -> LaunchOrchestrator {
        LaunchOrchestrator::new(env.services(), env.settings()).unwrap()
    }

    /// Five equal wallets at 10% slippage
    pub fn draft(env: &MockEnvironment, use_relay: bool) -> LaunchRequestDraft {
        LaunchRequestDraft {
            token_mint: env.mint.to_string(),
            token_amount: LIQUIDITY_TOKENS.to_string(),
            sol_amount: LIQUIDITY_SOL.to_string(),
            total_sniper_sol: "2".to_string(),
            wallet_count: 5,
            distribution: Some(vec![20.0; 5]),
            slippage_pct: Some(10.0),
            use_relay,
            tip_lamports: Some("50000".to_string()),
            ..Default::default()
        }
    }

    /// Like [`draft`], buying from the supplied sniper keys
    pub fn draft_with_keys(
        env: &MockEnvironment,
        use_relay: bool,
        keys: &[Keypair],
    ) -> LaunchRequestDraft {
        LaunchRequestDraft {
            sniper_keys: Some(key_lines(keys)),
            ..draft(env, use_relay)
        }
    }

    pub fn sniper_keys(count: usize) -> Vec<Keypair> {
        (0..count).map(|_| Keypair::new()).collect()
    }

    /// One base58 secret key per line
    pub fn key_lines(keys: &[Keypair]) -> String {
        keys.iter()
            .map(|k| k.to_base58_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn payer(tx: &VersionedTransaction) -> Pubkey {
        tx.message.static_account_keys()[0]
    }

    /// Data of the first instruction
    pub fn program_data(tx: &VersionedTransaction) -> &[u8] {
        &tx.message.instructions()[0].data
    }

    pub fn pubkeys(keys: &[Keypair]) -> Vec<Pubkey> {
        keys.iter().map(|k| k.pubkey()).collect()
    }
}
