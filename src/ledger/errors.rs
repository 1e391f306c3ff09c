use thiserror::Error;

/// Errors raised by a `LedgerClient`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Transport or RPC response error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node refused the transaction at send time
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The transaction executed and failed
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// No commitment reached before the confirm deadline
    #[error("Transaction {signature} not confirmed within {secs}s")]
    ConfirmTimeout { signature: String, secs: u64 },

    /// Response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::ConfirmTimeout { .. })
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "rpc",
            Self::Rejected(_) => "rejected",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::ConfirmTimeout { .. } => "confirm_timeout",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<solana_client::client_error::ClientError> for LedgerError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        Self::Rpc(err.to_string())
    }
}
