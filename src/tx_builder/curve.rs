//! Constant-product curve math
//!
//! Integer math in `u128`; the trade fee is taken from the input side and
//! rounded up, the output is rounded down.

use serde::{Deserialize, Serialize};

use super::context::FEE_RATE_DENOMINATOR;
use super::errors::TransactionBuilderError;

/// Result of pricing one swap against a reserve snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_in: u64,
    pub amount_out: u64,
    pub trade_fee: u64,
}

fn ceil_div(numerator: u128, denominator: u128) -> u128 {
    numerator.div_ceil(denominator)
}

/// Output of swapping `amount_in` into a pool holding `reserve_in`/`reserve_out`
pub fn swap_base_input(
    amount_in: u64,
    reserve_in: u64,
    reserve_out: u64,
    trade_fee_rate: u64,
) -> Result<SwapQuote, TransactionBuilderError> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(TransactionBuilderError::StalePool(format!(
            "empty reserves ({} in, {} out)",
            reserve_in, reserve_out
        )));
    }
    if trade_fee_rate >= FEE_RATE_DENOMINATOR {
        return Err(TransactionBuilderError::internal(format!(
            "trade fee rate {} out of range",
            trade_fee_rate
        )));
    }

    let trade_fee = ceil_div(
        amount_in as u128 * trade_fee_rate as u128,
        FEE_RATE_DENOMINATOR as u128,
    );
    let net_in = amount_in as u128 - trade_fee;
    let amount_out = net_in * reserve_out as u128 / (reserve_in as u128 + net_in);

    Ok(SwapQuote {
        amount_in,
        amount_out: amount_out as u64,
        trade_fee: trade_fee as u64,
    })
}

/// Minimum acceptable output for a snipe
///
/// `desired_tokens * (sol_to_use / sol_amount) * (1 - slippage_pct / 100)`,
/// with token amounts in raw units and SOL amounts in lamports.
pub fn min_amount_out(desired_tokens: u64, sol_to_use: u64, sol_amount: u64, slippage_pct: f64) -> u64 {
    if sol_amount == 0 {
        return 0;
    }
    let proportional = desired_tokens as u128 * sol_to_use as u128 / sol_amount as u128;
    let factor = (1.0 - slippage_pct / 100.0).clamp(0.0, 1.0);
    (proportional as f64 * factor).floor() as u64
}
