//! Pool context returned by the pool-construction service
//!
//! A `PoolContext` is created once per launch attempt and then shared
//! read-only (behind an `Arc`) by the liquidity builder and every snipe
//! builder.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Denominator of the fee-rate table (rates are parts per million)
pub const FEE_RATE_DENOMINATOR: u64 = 1_000_000;

/// Addresses of a constant-product pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKeys {
    pub pool_id: Pubkey,
    pub program_id: Pubkey,
    pub amm_config: Pubkey,
    pub authority: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub lp_mint: Pubkey,
}

/// Fee rates in parts per [`FEE_RATE_DENOMINATOR`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub trade_fee_rate: u64,
    pub protocol_fee_rate: u64,
    pub fund_fee_rate: u64,
}

impl Default for FeeRates {
    fn default() -> Self {
        // 0.25% trade fee
        Self {
            trade_fee_rate: 2_500,
            protocol_fee_rate: 120_000,
            fund_fee_rate: 40_000,
        }
    }
}

/// Reserves at the time the pool transaction was built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub base: u64,
    pub quote: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolContext {
    pub keys: PoolKeys,
    pub reserves: ReserveSnapshot,
    pub fees: FeeRates,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl PoolContext {
    pub fn pool_id(&self) -> &Pubkey {
        &self.keys.pool_id
    }

    /// Reserves usable for pricing a quote-in (SOL → token) swap
    pub fn has_liquidity(&self) -> bool {
        self.reserves.base > 0 && self.reserves.quote > 0
    }

    /// Convert a UI amount of the base token to raw units
    pub fn base_units(&self, ui_amount: f64) -> u64 {
        (ui_amount * 10f64.powi(self.base_decimals as i32)).floor() as u64
    }

    /// Convert a UI amount of the quote token to raw units
    pub fn quote_units(&self, ui_amount: f64) -> u64 {
        (ui_amount * 10f64.powi(self.quote_decimals as i32)).round() as u64
    }
}
