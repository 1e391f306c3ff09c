//! Launch request and per-wallet allocations
//!
//! A `LaunchRequest` can only be obtained by validating a
//! `LaunchRequestDraft`, so every field the orchestrator reads has already
//! been parsed and range-checked.

use serde::{Deserialize, Serialize};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::LaunchConfig;
use crate::distributor::WalletFundDistributor;
use crate::errors::LaunchError;
use crate::wallet::{parse_sniper_keys, SniperSigner};

pub const MIN_SLIPPAGE_PCT: f64 = 0.1;
pub const MAX_SLIPPAGE_PCT: f64 = 10.0;
pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.5;
pub const DEFAULT_TIP_LAMPORTS: u64 = 10_000_000;

/// Smallest tip the block engine accepts
pub const MIN_TIP_LAMPORTS: u64 = 1_000;

/// Request fields as typed by a user, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchRequestDraft {
    pub token_mint: String,
    /// Base-token amount seeded as liquidity (UI units)
    pub token_amount: String,
    /// SOL seeded as liquidity
    pub sol_amount: String,
    pub total_sniper_sol: String,
    pub wallet_count: usize,
    /// Per-wallet percentages; equal split when absent
    pub distribution: Option<Vec<f64>>,
    pub slippage_pct: Option<f64>,
    pub use_relay: bool,
    pub tip_lamports: Option<String>,
    pub tip_account: Option<String>,
    /// One sniper key per line (JSON byte array or base58)
    pub sniper_keys: Option<String>,
    /// Blocks to wait between liquidity confirmation and buys (sequential mode)
    pub snipe_delay_blocks: u32,
}

impl Default for LaunchRequestDraft {
    fn default() -> Self {
        Self {
            token_mint: String::new(),
            token_amount: String::new(),
            sol_amount: String::new(),
            total_sniper_sol: String::new(),
            wallet_count: 5,
            distribution: None,
            slippage_pct: None,
            use_relay: true,
            tip_lamports: None,
            tip_account: None,
            sniper_keys: None,
            snipe_delay_blocks: 0,
        }
    }
}

/// Validated, immutable launch input
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    token_mint: Pubkey,
    token_amount: f64,
    sol_amount: f64,
    total_sniper_sol: f64,
    distribution: Vec<f64>,
    slippage_pct: f64,
    use_relay: bool,
    tip_lamports: u64,
    tip_account: Option<Pubkey>,
    sniper_keys: Vec<Arc<Keypair>>,
    snipe_delay_blocks: u32,
}

fn parse_amount(field: &str, raw: &str) -> Result<f64, LaunchError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| LaunchError::validation(format!("{} is not a number: {:?}", field, raw)))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(LaunchError::validation(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(value)
}

fn parse_pubkey(field: &str, raw: &str) -> Result<Pubkey, LaunchError> {
    Pubkey::from_str(raw.trim())
        .map_err(|_| LaunchError::validation(format!("{} is not a valid address: {:?}", field, raw)))
}

impl LaunchRequestDraft {
    /// Validate with built-in defaults for slippage and tip
    pub fn validate(self) -> Result<LaunchRequest, LaunchError> {
        self.validate_inner(DEFAULT_SLIPPAGE_PCT, DEFAULT_TIP_LAMPORTS)
    }

    /// Validate with slippage and tip defaults taken from configuration
    pub fn validate_with(self, defaults: &LaunchConfig) -> Result<LaunchRequest, LaunchError> {
        self.validate_inner(defaults.default_slippage_pct, defaults.default_tip_lamports)
    }

    fn validate_inner(
        self,
        default_slippage: f64,
        default_tip: u64,
    ) -> Result<LaunchRequest, LaunchError> {
        if self.token_mint.trim().is_empty() {
            return Err(LaunchError::validation("token_mint is required"));
        }
        let token_mint = parse_pubkey("token_mint", &self.token_mint)?;
        let token_amount = parse_amount("token_amount", &self.token_amount)?;
        let sol_amount = parse_amount("sol_amount", &self.sol_amount)?;
        let total_sniper_sol = parse_amount("total_sniper_sol", &self.total_sniper_sol)?;

        let distribution = match self.distribution {
            Some(shares) => {
                if shares.len() != self.wallet_count {
                    return Err(LaunchError::validation(format!(
                        "distribution has {} entries for {} wallets",
                        shares.len(),
                        self.wallet_count
                    )));
                }
                WalletFundDistributor::from_shares(shares)?.into_shares()
            }
            None => WalletFundDistributor::equal_split(self.wallet_count)?,
        };

        let slippage_pct = self.slippage_pct.unwrap_or(default_slippage);
        if !(MIN_SLIPPAGE_PCT..=MAX_SLIPPAGE_PCT).contains(&slippage_pct) {
            return Err(LaunchError::validation(format!(
                "slippage {}% outside {}..={}%",
                slippage_pct, MIN_SLIPPAGE_PCT, MAX_SLIPPAGE_PCT
            )));
        }

        let tip_lamports = match self.tip_lamports.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<u64>().map_err(|_| {
                LaunchError::validation(format!("tip_lamports is not an integer: {:?}", raw))
            })?,
            _ => default_tip,
        };
        if self.use_relay && tip_lamports < MIN_TIP_LAMPORTS {
            return Err(LaunchError::validation(format!(
                "relay tip {} below minimum {} lamports",
                tip_lamports, MIN_TIP_LAMPORTS
            )));
        }

        let tip_account = match self.tip_account.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_pubkey("tip_account", raw)?),
            _ => None,
        };

        let sniper_keys = match self.sniper_keys.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                let keys = parse_sniper_keys(text)?;
                if keys.len() != distribution.len() {
                    return Err(LaunchError::validation(format!(
                        "{} sniper keys supplied for {} wallets",
                        keys.len(),
                        distribution.len()
                    )));
                }
                keys.into_iter().map(Arc::new).collect()
            }
            _ => Vec::new(),
        };

        Ok(LaunchRequest {
            token_mint,
            token_amount,
            sol_amount,
            total_sniper_sol,
            distribution,
            slippage_pct,
            use_relay: self.use_relay,
            tip_lamports,
            tip_account,
            sniper_keys,
            snipe_delay_blocks: self.snipe_delay_blocks,
        })
    }
}

impl LaunchRequest {
    /// Start a request from an empty draft
    pub fn builder() -> LaunchRequestDraft {
        LaunchRequestDraft::default()
    }

    pub fn token_mint(&self) -> &Pubkey {
        &self.token_mint
    }

    pub fn token_amount(&self) -> f64 {
        self.token_amount
    }

    pub fn sol_amount(&self) -> f64 {
        self.sol_amount
    }

    pub fn total_sniper_sol(&self) -> f64 {
        self.total_sniper_sol
    }

    pub fn wallet_count(&self) -> usize {
        self.distribution.len()
    }

    pub fn distribution(&self) -> &[f64] {
        &self.distribution
    }

    pub fn slippage_pct(&self) -> f64 {
        self.slippage_pct
    }

    pub fn use_relay(&self) -> bool {
        self.use_relay
    }

    pub fn tip_lamports(&self) -> u64 {
        self.tip_lamports
    }

    pub fn tip_account(&self) -> Option<&Pubkey> {
        self.tip_account.as_ref()
    }

    pub fn snipe_delay_blocks(&self) -> u32 {
        self.snipe_delay_blocks
    }

    pub fn has_supplied_keys(&self) -> bool {
        !self.sniper_keys.is_empty()
    }

    /// One signer per wallet: the supplied keys, or fresh keypairs
    pub fn sniper_signers(&self) -> Vec<SniperSigner> {
        if self.sniper_keys.is_empty() {
            (0..self.wallet_count()).map(|_| SniperSigner::generate()).collect()
        } else {
            self.sniper_keys
                .iter()
                .cloned()
                .map(SniperSigner::Supplied)
                .collect()
        }
    }
}

/// Funds assigned to one sniper wallet
#[derive(Debug, Clone)]
pub struct SniperAllocation {
    pub index: usize,
    pub percentage: f64,
    pub sol_amount: f64,
    pub lamports: u64,
    pub signer: SniperSigner,
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Split `total_sol` by `shares` percentages
///
/// Amounts are computed in lamports; the rounding remainder goes to wallet
/// 0 (or the largest wallet when wallet 0 cannot absorb it) so the lamport
/// total is exact.
pub fn allocate(
    total_sol: f64,
    shares: &[f64],
    signers: Vec<SniperSigner>,
) -> Result<Vec<SniperAllocation>, LaunchError> {
    if shares.len() != signers.len() {
        return Err(LaunchError::validation(format!(
            "{} shares for {} signers",
            shares.len(),
            signers.len()
        )));
    }
    if shares.is_empty() {
        return Err(LaunchError::validation("no sniper wallets"));
    }

    let total_lamports = sol_to_lamports(total_sol);
    let mut lamports: Vec<u64> = shares
        .iter()
        .map(|pct| (total_lamports as f64 * pct / 100.0).round() as u64)
        .collect();
    let assigned: u64 = lamports.iter().sum();
    let residual = total_lamports as i128 - assigned as i128;
    let target = if lamports[0] as i128 + residual >= 0 {
        0
    } else {
        lamports
            .iter()
            .enumerate()
            .max_by_key(|(_, amount)| **amount)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let adjusted = lamports[target] as i128 + residual;
    if adjusted < 0 {
        return Err(LaunchError::validation("distribution exceeds 100%"));
    }
    lamports[target] = adjusted as u64;

    Ok(signers
        .into_iter()
        .zip(shares.iter().zip(lamports))
        .enumerate()
        .map(|(index, (signer, (pct, amount)))| SniperAllocation {
            index,
            percentage: *pct,
            sol_amount: lamports_to_sol(amount),
            lamports: amount,
            signer,
        })
        .collect())
}
