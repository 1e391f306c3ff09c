//! Snipe (buy) builder
//!
//! Each sniper wallet buys with its own key; the transaction leaves the
//! builder already signed by it.

use tracing::{debug, instrument};

use super::context::PoolContext;
use super::curve::min_amount_out;
use super::errors::TransactionBuilderError;
use super::output::{partial_sign, BuiltTransaction};
use super::services::{SwapRequest, SwapService};
use crate::monitor::TxKind;
use crate::request::SniperAllocation;

/// Launch-wide inputs shared by every snipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnipeParams {
    /// Base tokens seeded into the pool, raw units
    pub desired_tokens: u64,
    /// Quote seeded into the pool, lamports
    pub sol_amount: u64,
    pub slippage_pct: f64,
}

pub struct SnipeBuilder<'a> {
    swaps: &'a dyn SwapService,
    pool: &'a PoolContext,
    params: SnipeParams,
}

impl<'a> SnipeBuilder<'a> {
    pub fn new(swaps: &'a dyn SwapService, pool: &'a PoolContext, params: SnipeParams) -> Self {
        Self {
            swaps,
            pool,
            params,
        }
    }

    /// Build and sign the buy of one sniper wallet
    #[instrument(skip(self, allocation), fields(wallet_index = allocation.index))]
    pub async fn build(
        &self,
        allocation: &SniperAllocation,
    ) -> Result<BuiltTransaction, TransactionBuilderError> {
        if !self.pool.has_liquidity() {
            return Err(TransactionBuilderError::StalePool(format!(
                "pool {} has no reserves",
                self.pool.pool_id()
            )));
        }
        if allocation.lamports == 0 {
            return Err(TransactionBuilderError::instruction_failed(
                "swap",
                "wallet has no SOL allocated",
            ));
        }

        let minimum = min_amount_out(
            self.params.desired_tokens,
            allocation.lamports,
            self.params.sol_amount,
            self.params.slippage_pct,
        );
        let quote = self.swaps.compute_swap_output(self.pool, allocation.lamports)?;
        if quote.amount_out < minimum {
            return Err(TransactionBuilderError::SlippageExceeded {
                quoted: quote.amount_out,
                minimum,
            });
        }

        let keypair = allocation.signer.keypair();
        let tx = self
            .swaps
            .build_swap(SwapRequest {
                pool: self.pool,
                owner: allocation.signer.pubkey(),
                amount_in: allocation.lamports,
                quote,
                min_amount_out: minimum,
                slippage_pct: self.params.slippage_pct,
            })
            .await?;

        let mut built = BuiltTransaction::new(tx, TxKind::Buy, Some(allocation.index));
        partial_sign(&mut built.tx, keypair)?;
        if !built.is_fully_signed() {
            return Err(TransactionBuilderError::Signing(format!(
                "swap needs signers beyond the sniper: {:?}",
                built.missing_signers()
            )));
        }

        debug!(
            amount_in = allocation.lamports,
            quoted = quote.amount_out,
            minimum,
            "Snipe built"
        );
        Ok(built)
    }
}
