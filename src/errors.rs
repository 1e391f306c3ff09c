//! Launch error taxonomy
//!
//! `LaunchError` is what the orchestrator settles with. Each variant keeps
//! the step (and wallet index, for per-sniper steps) that produced it so a
//! caller never has to guess where a launch stopped.

use std::fmt;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::tx_builder::TransactionBuilderError;

/// Launch pipeline step, used as error and log context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchStep {
    Validate,
    BalanceCheck,
    TokenAccountPrestep,
    BuildPool,
    BuildLiquidity,
    BuildSnipe,
    SignPool,
    SignLiquidity,
    AssembleBundle,
    SubmitBundle,
    SendPool,
    SendLiquidity,
    SendBuy,
    ConfirmPool,
    ConfirmLiquidity,
    ConfirmBuy,
    MonitorBundle,
}

impl LaunchStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::BalanceCheck => "balance_check",
            Self::TokenAccountPrestep => "token_account_prestep",
            Self::BuildPool => "build_pool",
            Self::BuildLiquidity => "build_liquidity",
            Self::BuildSnipe => "build_snipe",
            Self::SignPool => "sign_pool",
            Self::SignLiquidity => "sign_liquidity",
            Self::AssembleBundle => "assemble_bundle",
            Self::SubmitBundle => "submit_bundle",
            Self::SendPool => "send_pool",
            Self::SendLiquidity => "send_liquidity",
            Self::SendBuy => "send_buy",
            Self::ConfirmPool => "confirm_pool",
            Self::ConfirmLiquidity => "confirm_liquidity",
            Self::ConfirmBuy => "confirm_buy",
            Self::MonitorBundle => "monitor_bundle",
        }
    }
}

impl fmt::Display for LaunchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn wallet_suffix(wallet_index: &Option<usize>) -> String {
    match wallet_index {
        Some(i) => format!(" (wallet {})", i),
        None => String::new(),
    }
}

/// Terminal error of a launch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaunchError {
    /// Malformed or out-of-range request fields, including key material
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Ledger-reported base-token balance below the liquidity amount
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: f64, available: f64 },

    /// A builder failed to produce a transaction
    #[error("Construction failed at {step}{}: {source}", wallet_suffix(.wallet_index))]
    Construction {
        step: LaunchStep,
        wallet_index: Option<usize>,
        #[source]
        source: TransactionBuilderError,
    },

    /// The relay or the ledger refused a signed transaction or bundle
    #[error("Submission failed at {step}{}: {reason}", wallet_suffix(.wallet_index))]
    Submission {
        step: LaunchStep,
        wallet_index: Option<usize>,
        reason: String,
    },

    /// A read against the ledger failed before anything was submitted
    #[error("Ledger error at {step}: {source}")]
    Ledger {
        step: LaunchStep,
        #[source]
        source: LedgerError,
    },

    /// Poll budget exhausted without a terminal relay status
    #[error("Bundle {bundle_id} not confirmed after {attempts} status polls")]
    ConfirmationTimeout { bundle_id: String, attempts: u32 },

    /// The caller cancelled the launch
    #[error("Launch cancelled")]
    Cancelled,
}

impl LaunchError {
    /// Create a validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Wrap a builder error with the step that produced it
    pub fn construction(
        step: LaunchStep,
        wallet_index: Option<usize>,
        source: TransactionBuilderError,
    ) -> Self {
        Self::Construction {
            step,
            wallet_index,
            source,
        }
    }

    /// Create a submission error
    pub fn submission(
        step: LaunchStep,
        wallet_index: Option<usize>,
        reason: impl fmt::Display,
    ) -> Self {
        Self::Submission {
            step,
            wallet_index,
            reason: reason.to_string(),
        }
    }

    /// Check if re-running the whole launch might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::InsufficientBalance { .. } => false,
            Self::Construction { source, .. } => source.is_retryable(),
            Self::Ledger { source, .. } => source.is_retryable(),
            Self::Submission { .. } => true,
            Self::ConfirmationTimeout { .. } => true,
            Self::Cancelled => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Construction { .. } => "construction",
            Self::Submission { .. } => "submission",
            Self::Ledger { .. } => "ledger",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this error can only arise before any transaction left the process
    ///
    /// Submission, timeout and cancellation errors may follow a partial
    /// submission; the launch report decides using its records.
    pub fn nothing_submitted(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InsufficientBalance { .. }
                | Self::Construction { .. }
                | Self::Ledger { .. }
        )
    }

    /// Step that produced the error, when known
    pub fn step(&self) -> Option<LaunchStep> {
        match self {
            Self::Construction { step, .. }
            | Self::Submission { step, .. }
            | Self::Ledger { step, .. } => Some(*step),
            Self::Validation(_) => Some(LaunchStep::Validate),
            Self::InsufficientBalance { .. } => Some(LaunchStep::BalanceCheck),
            Self::ConfirmationTimeout { .. } => Some(LaunchStep::MonitorBundle),
            Self::Cancelled => None,
        }
    }

    /// Wallet index of the failing sniper, when the step is per-wallet
    pub fn wallet_index(&self) -> Option<usize> {
        match self {
            Self::Construction { wallet_index, .. } | Self::Submission { wallet_index, .. } => {
                *wallet_index
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_error_keeps_context() {
        let err = LaunchError::construction(
            LaunchStep::BuildSnipe,
            Some(3),
            TransactionBuilderError::SlippageExceeded {
                quoted: 10,
                minimum: 20,
            },
        );

        assert_eq!(
            err.to_string(),
            "Construction failed at build_snipe (wallet 3): Slippage exceeded: quoted 10 < minimum 20"
        );
        assert_eq!(err.step(), Some(LaunchStep::BuildSnipe));
        assert_eq!(err.wallet_index(), Some(3));
        assert!(err.nothing_submitted());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_submission_error_display_without_wallet() {
        let err = LaunchError::submission(LaunchStep::SubmitBundle, None, "connection refused");
        assert_eq!(
            err.to_string(),
            "Submission failed at submit_bundle: connection refused"
        );
        assert!(!err.nothing_submitted());
        assert!(err.is_retryable());
        assert_eq!(err.category(), "submission");
    }

    #[test]
    fn test_local_errors_are_not_retryable() {
        assert!(!LaunchError::validation("slippage out of range").is_retryable());
        assert!(!LaunchError::InsufficientBalance {
            required: 10.0,
            available: 1.0
        }
        .is_retryable());
        assert!(!LaunchError::Cancelled.is_retryable());
    }

    #[test]
    fn test_timeout_is_not_nothing_submitted() {
        let err = LaunchError::ConfirmationTimeout {
            bundle_id: "b1".to_string(),
            attempts: 30,
        };
        assert!(!err.nothing_submitted());
        assert_eq!(err.category(), "confirmation_timeout");
    }
}
