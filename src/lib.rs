//! Launch Bundler Library
//!
//! Creates a pool for a freshly minted token, seeds it, and buys from N
//! sniper wallets in the same relay bundle, or in order through the ledger
//! when bundling is off or the relay cannot take the bundle.

pub mod compat;
pub mod config;
pub mod distributor;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod monitor;
pub mod observability;
pub mod orchestrator;
pub mod relay;
pub mod request;
pub mod structured_logging;
pub mod submitter;
pub mod tx_builder;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests {
    mod confirmation_monitor_tests;
    mod launch_validation_tests;
    mod relay_launch_tests;
    mod sequential_launch_tests;
    mod test_helpers;
    mod tx_builder_pipeline_tests;
}

// Re-export commonly used types
pub use errors::{LaunchError, LaunchStep};
pub use monitor::{CancelToken, TransactionRecord, TxKind, TxState};
pub use orchestrator::{
    LaunchOrchestrator, LaunchReport, LaunchServices, LaunchSession, LaunchSettings, LaunchState,
    Settlement,
};
pub use request::{LaunchRequest, LaunchRequestDraft};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
