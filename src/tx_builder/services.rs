//! Construction services consumed by the builders
//!
//! Pool and swap programs are external; these traits are the narrow surface
//! the launcher needs from whatever SDK builds their instructions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, transaction::VersionedTransaction};

use super::context::PoolContext;
use super::curve::{swap_base_input, SwapQuote};
use super::errors::TransactionBuilderError;

/// Inputs of pool creation, in raw units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePoolParams {
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_amount: u64,
    pub quote_amount: u64,
    pub base_token_program: Pubkey,
}

/// Side whose amount is held fixed when seeding liquidity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedSide {
    Base,
    Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLiquidityParams {
    pub base_amount: u64,
    pub quote_amount: u64,
    pub fixed_side: FixedSide,
    pub slippage_pct: f64,
}

/// Pool-creation service result
#[derive(Debug, Clone)]
pub struct CreatedPool {
    /// Unsigned pool-creation transaction
    pub transaction: VersionedTransaction,
    pub pool: PoolContext,
}

/// One swap to build: spend `amount_in` of the quote asset from `owner`
#[derive(Debug, Clone)]
pub struct SwapRequest<'a> {
    pub pool: &'a PoolContext,
    pub owner: Pubkey,
    pub amount_in: u64,
    pub quote: SwapQuote,
    pub min_amount_out: u64,
    pub slippage_pct: f64,
}

#[async_trait]
pub trait PoolService: Send + Sync {
    /// Build the pool-creation transaction, fee-paid by `owner`
    async fn create_pool(
        &self,
        params: &CreatePoolParams,
        owner: &Pubkey,
    ) -> Result<CreatedPool, TransactionBuilderError>;

    /// Build the liquidity-seed transaction
    ///
    /// `extra_instructions` are appended after the deposit and signed
    /// with it.
    async fn add_liquidity(
        &self,
        pool: &PoolContext,
        params: &AddLiquidityParams,
        owner: &Pubkey,
        extra_instructions: &[Instruction],
    ) -> Result<VersionedTransaction, TransactionBuilderError>;
}

#[async_trait]
pub trait SwapService: Send + Sync {
    /// Price a quote-in swap against the pool's reserve snapshot
    fn compute_swap_output(
        &self,
        pool: &PoolContext,
        amount_in: u64,
    ) -> Result<SwapQuote, TransactionBuilderError> {
        swap_base_input(
            amount_in,
            pool.reserves.quote,
            pool.reserves.base,
            pool.fees.trade_fee_rate,
        )
    }

    /// Build the swap transaction with `request.owner` as fee payer
    async fn build_swap(
        &self,
        request: SwapRequest<'_>,
    ) -> Result<VersionedTransaction, TransactionBuilderError>;
}
