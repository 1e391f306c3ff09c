use thiserror::Error;

/// Errors raised by a `RelayService`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelayError {
    /// Connection failure or timeout
    #[error("Relay unreachable: {0}")]
    Unreachable(String),

    /// JSON-RPC error object returned by the relay
    #[error("Relay rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Non-success HTTP status
    #[error("Relay HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Relay answered 429 or the local limiter refused
    #[error("Relay rate limited")]
    RateLimited,

    /// Response body did not match the expected shape
    #[error("Relay response decode error: {0}")]
    Decode(String),
}

impl RelayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::RateLimited => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Rejected { .. } | Self::Decode(_) => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "unreachable",
            Self::Rejected { .. } => "rejected",
            Self::Http { .. } => "http",
            Self::RateLimited => "rate_limited",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}
