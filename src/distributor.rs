//! Wallet fund distributor
//!
//! Keeps the per-wallet percentage split of the sniper SOL budget. The
//! split always has `count` entries, none negative, summing to 100 within
//! [`SUM_TOLERANCE`].

use serde::{Deserialize, Serialize};

use crate::errors::LaunchError;

pub const MIN_WALLETS: usize = 1;
pub const MAX_WALLETS: usize = 10;

/// Allowed deviation of the split from 100
pub const SUM_TOLERANCE: f64 = 0.1;

/// Result of a single-slider adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdjustOutcome {
    Applied,
    Rejected { reason: String },
}

impl AdjustOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletFundDistributor {
    shares: Vec<f64>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn check_count(count: usize) -> Result<(), LaunchError> {
    if !(MIN_WALLETS..=MAX_WALLETS).contains(&count) {
        return Err(LaunchError::validation(format!(
            "wallet count {} outside {}..={}",
            count, MIN_WALLETS, MAX_WALLETS
        )));
    }
    Ok(())
}

impl WalletFundDistributor {
    /// Start from an equal split over `count` wallets
    pub fn new(count: usize) -> Result<Self, LaunchError> {
        Ok(Self {
            shares: Self::equal_split(count)?,
        })
    }

    /// Wrap an explicit split, checking it sums to 100
    pub fn from_shares(shares: Vec<f64>) -> Result<Self, LaunchError> {
        check_count(shares.len())?;
        if let Some((i, v)) = shares
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(LaunchError::validation(format!(
                "distribution entry {} is invalid: {}",
                i, v
            )));
        }
        let total: f64 = shares.iter().sum();
        if (total - 100.0).abs() > SUM_TOLERANCE {
            return Err(LaunchError::validation(format!(
                "distribution sums to {:.2}, expected 100",
                total
            )));
        }
        Ok(Self { shares })
    }

    /// `100 / count` rounded to one decimal, residual on wallet 0
    pub fn equal_split(count: usize) -> Result<Vec<f64>, LaunchError> {
        check_count(count)?;
        let share = round1(100.0 / count as f64);
        let mut shares = vec![share; count];
        let residual = 100.0 - share * count as f64;
        shares[0] = round1(shares[0] + residual);
        Ok(shares)
    }

    /// Change the wallet count, clamped to the supported range, and re-split equally
    pub fn resize(&mut self, count: usize) {
        let count = count.clamp(MIN_WALLETS, MAX_WALLETS);
        if let Ok(shares) = Self::equal_split(count) {
            self.shares = shares;
        }
    }

    /// Set wallet `index` to `value` and rebalance the others
    ///
    /// A change that would push the current total above 100 is rejected, so
    /// on a full split only decreases go through. The freed percentage is
    /// spread equally over the other wallets; a wallet that would go below
    /// zero is pinned there and its part carried by the rest. Rejected
    /// adjustments leave the split untouched.
    pub fn adjust(&mut self, index: usize, value: f64) -> AdjustOutcome {
        let count = self.shares.len();
        if index >= count {
            return AdjustOutcome::Rejected {
                reason: format!("wallet index {} out of range", index),
            };
        }
        if !value.is_finite() || value < 0.0 {
            return AdjustOutcome::Rejected {
                reason: format!("percentage {} is not a valid share", value),
            };
        }
        let diff = value - self.shares[index];
        if self.total() + diff > 100.0 + SUM_TOLERANCE {
            return AdjustOutcome::Rejected {
                reason: format!(
                    "raising wallet {} by {:.1} would push the total above 100%",
                    index, diff
                ),
            };
        }
        if count == 1 {
            if (value - 100.0).abs() > SUM_TOLERANCE {
                return AdjustOutcome::Rejected {
                    reason: "a single wallet must hold 100%".to_string(),
                };
            }
            return AdjustOutcome::Applied;
        }

        let mut next = self.shares.clone();
        next[index] = value;

        let mut open: Vec<usize> = (0..count).filter(|&i| i != index).collect();
        let mut remaining = 100.0 - next.iter().sum::<f64>();
        while remaining.abs() > f64::EPSILON && !open.is_empty() {
            let per = remaining / open.len() as f64;
            let mut carried = 0.0;
            let mut still_open = Vec::with_capacity(open.len());
            for &i in &open {
                let target = next[i] + per;
                if target <= 0.0 {
                    carried += target;
                    next[i] = 0.0;
                } else {
                    next[i] = target;
                    still_open.push(i);
                }
            }
            open = still_open;
            remaining = carried;
        }

        for share in next.iter_mut() {
            *share = round1(*share);
        }
        self.fold_residual(&mut next);

        let total: f64 = next.iter().sum();
        debug_assert!((total - 100.0).abs() < SUM_TOLERANCE);
        if (total - 100.0).abs() >= SUM_TOLERANCE {
            return AdjustOutcome::Rejected {
                reason: format!("rebalanced split sums to {:.2}", total),
            };
        }

        self.shares = next;
        AdjustOutcome::Applied
    }

    /// Fold the rounding residual into wallet 0, or the largest wallet if
    /// wallet 0 cannot absorb a negative residual
    fn fold_residual(&self, shares: &mut [f64]) {
        let residual = round1(100.0 - shares.iter().sum::<f64>());
        if residual == 0.0 {
            return;
        }
        let target = if shares[0] + residual >= 0.0 {
            0
        } else {
            shares
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0)
        };
        shares[target] = round1(shares[target] + residual);
    }

    pub fn shares(&self) -> &[f64] {
        &self.shares
    }

    pub fn count(&self) -> usize {
        self.shares.len()
    }

    pub fn total(&self) -> f64 {
        self.shares.iter().sum()
    }

    pub fn into_shares(self) -> Vec<f64> {
        self.shares
    }
}
