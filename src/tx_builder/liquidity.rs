//! Liquidity-seed builder

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::{debug, instrument};

use super::context::PoolContext;
use super::errors::TransactionBuilderError;
use super::output::BuiltTransaction;
use super::services::{AddLiquidityParams, FixedSide, PoolService};
use crate::monitor::TxKind;

pub struct LiquiditySeedBuilder<'a> {
    pools: &'a dyn PoolService,
    owner: Pubkey,
}

impl<'a> LiquiditySeedBuilder<'a> {
    pub fn new(pools: &'a dyn PoolService, owner: Pubkey) -> Self {
        Self { pools, owner }
    }

    /// Build the unsigned deposit, holding the base amount fixed
    ///
    /// `extra_instructions` (the relay tip, in relay mode) ride in the same
    /// transaction.
    #[instrument(skip(self, pool, extra_instructions), fields(pool_id = %pool.pool_id()))]
    pub async fn build(
        &self,
        pool: &PoolContext,
        base_amount: u64,
        quote_amount: u64,
        slippage_pct: f64,
        extra_instructions: &[Instruction],
    ) -> Result<BuiltTransaction, TransactionBuilderError> {
        if base_amount == 0 || quote_amount == 0 {
            return Err(TransactionBuilderError::instruction_failed(
                "liquidity",
                "deposit amounts must be positive",
            ));
        }

        let params = AddLiquidityParams {
            base_amount,
            quote_amount,
            fixed_side: FixedSide::Base,
            slippage_pct,
        };
        let tx = self
            .pools
            .add_liquidity(pool, &params, &self.owner, extra_instructions)
            .await?;

        let built = BuiltTransaction::new(tx, TxKind::Liquidity, None);
        if built.required_signers().first() != Some(&self.owner) {
            return Err(TransactionBuilderError::internal(
                "liquidity transaction is not fee-paid by the wallet",
            ));
        }
        debug!(extra = extra_instructions.len(), "Liquidity transaction built");
        Ok(built)
    }
}
