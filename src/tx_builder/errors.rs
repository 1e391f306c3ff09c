//! Error types for the transaction builders
//!
//! Every builder (pool creation, liquidity seed, snipe) and the bundle
//! assembler report failures through `TransactionBuilderError`. The
//! orchestrator wraps these into `LaunchError::Construction` together with
//! the step and wallet index that produced them.

use thiserror::Error;

/// Error type for all transaction construction operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionBuilderError {
    /// Mint is missing, malformed, or not present on the ledger
    #[error("Invalid mint: {0}")]
    InvalidMint(String),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program ID that failed to build an instruction
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// A construction service (pool, swap, ledger) could not be reached
    /// or answered with an error
    #[error("{service} service unavailable: {reason}")]
    ServiceUnavailable {
        /// Which collaborator failed
        service: &'static str,
        /// Reason reported by the collaborator
        reason: String,
    },

    /// Quoted swap output does not satisfy the minimum acceptable output
    #[error("Slippage exceeded: quoted {quoted} < minimum {minimum}")]
    SlippageExceeded {
        /// Output the curve quotes for the input amount
        quoted: u64,
        /// Minimum acceptable output after slippage
        minimum: u64,
    },

    /// Pool reserves snapshot cannot be used for pricing
    #[error("Stale pool reserves: {0}")]
    StalePool(String),

    /// Failed to sign the transaction
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Bundle entries are not in pool → liquidity → buys order
    #[error("Invalid bundle order: {0}")]
    InvalidBundleOrder(String),

    /// Wire encoding or decoding of a transaction failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Internal invariant violation or unexpected state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionBuilderError {
    /// Check if this error is potentially retryable
    ///
    /// Builders never retry internally; this is advisory for the caller
    /// deciding whether re-running the whole launch might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ServiceUnavailable { .. } => true,
            Self::StalePool(_) => true,

            Self::InvalidMint(_) => false,
            Self::InstructionBuild { .. } => false,
            Self::SlippageExceeded { .. } => false,
            Self::Signing(_) => false,
            Self::InvalidBundleOrder(_) => false,
            Self::Serialization(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidMint(_) => "mint",
            Self::InstructionBuild { .. } => "instruction",
            Self::ServiceUnavailable { .. } => "service",
            Self::SlippageExceeded { .. } => "slippage",
            Self::StalePool(_) => "pool",
            Self::Signing(_) => "signing",
            Self::InvalidBundleOrder(_) => "bundle",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a service-unavailable error
    pub fn service(service: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid bundle order error
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidBundleOrder(reason.into())
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}
