//! Confirmation monitor
//!
//! Drives records from pending to a terminal state. In relay mode it polls
//! the bundle status with a bounded budget; in sequential mode it waits on
//! the ledger's confirm call for one signature at a time. It is the only
//! writer of state transitions besides the submitter's send failures.

use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{CancelToken, RecordStore, TxState};
use crate::config::MonitorConfig;
use crate::ledger::LedgerClient;
use crate::metrics::LaunchMetrics;
use crate::relay::RelayService;
use crate::structured_logging::LaunchLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts.max(1),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// How a bundle watch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleResolution {
    /// The relay reports the bundle landed; every record is confirmed
    Landed {
        slot: Option<u64>,
        /// `(record key, relay signature)` by bundle index
        signatures: Vec<(String, Option<String>)>,
        /// Every signature the relay listed, in bundle order
        relay_signatures: Vec<String>,
    },
    /// The relay reports a terminal failure; every record is failed
    Rejected { status: String },
    /// Poll budget exhausted; pending records were failed
    TimedOut { attempts: u32 },
    /// The caller cancelled; records are left as they are
    Cancelled,
}

impl BundleResolution {
    pub fn is_landed(&self) -> bool {
        matches!(self, Self::Landed { .. })
    }
}

/// Pair record keys with the signatures a relay reported, by position
pub fn map_signatures(keys: &[String], signatures: &[String]) -> Vec<(String, Option<String>)> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| (key.clone(), signatures.get(i).cloned()))
        .collect()
}

pub struct ConfirmationMonitor {
    relay: Arc<dyn RelayService>,
    ledger: Arc<dyn LedgerClient>,
    store: Arc<RecordStore>,
    settings: MonitorSettings,
    metrics: Arc<LaunchMetrics>,
    logger: LaunchLogger,
}

impl ConfirmationMonitor {
    pub fn new(
        relay: Arc<dyn RelayService>,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<RecordStore>,
        settings: MonitorSettings,
        metrics: Arc<LaunchMetrics>,
        logger: LaunchLogger,
    ) -> Self {
        Self {
            relay,
            ledger,
            store,
            settings,
            metrics,
            logger,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Move `key` to `to`, logging and counting the transition if it happened
    pub fn transition(&self, key: &str, to: TxState, error: Option<String>) -> bool {
        let Some(update) = self.store.transition(key, to, error) else {
            return false;
        };
        if let Some(from) = update.previous {
            self.logger
                .log_record_transition(key, update.record.kind, from, to);
        }
        match to {
            TxState::Confirmed => self.metrics.records_confirmed.inc(),
            TxState::Failed => self.metrics.records_failed.inc(),
            TxState::Pending => {}
        }
        true
    }

    fn settle_pending(&self, keys: &[String], to: TxState, error: Option<String>) {
        for key in keys {
            self.transition(key, to, error.clone());
        }
    }

    /// Poll `bundle_id` until it lands, fails, times out or is cancelled
    ///
    /// `keys` are the bundle's records in bundle order. Poll errors count
    /// against the budget like non-terminal statuses.
    #[instrument(skip(self, keys, cancel), fields(records = keys.len()))]
    pub async fn watch_bundle(
        &self,
        bundle_id: &str,
        keys: &[String],
        cancel: &CancelToken,
    ) -> BundleResolution {
        self.store.assign_bundle(keys, bundle_id);
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return BundleResolution::Cancelled;
            }

            self.metrics.relay_polls_total.inc();
            match self.relay.bundle_status(bundle_id).await {
                Ok(status) => {
                    self.logger
                        .log_relay_poll(bundle_id, attempt, &status.status);
                    match status.state() {
                        TxState::Confirmed => {
                            let signatures = map_signatures(keys, &status.signatures);
                            for (key, sig) in &signatures {
                                if let Some(sig) = sig {
                                    if sig != key {
                                        debug!(record = %key, signature = %sig, "Relay signature differs from record key");
                                    }
                                }
                            }
                            self.settle_pending(keys, TxState::Confirmed, None);
                            return BundleResolution::Landed {
                                slot: status.landed_slot,
                                signatures,
                                relay_signatures: status.signatures,
                            };
                        }
                        TxState::Failed => {
                            self.metrics.bundles_rejected.inc();
                            self.settle_pending(
                                keys,
                                TxState::Failed,
                                Some(format!("bundle {}", status.status)),
                            );
                            return BundleResolution::Rejected {
                                status: status.status,
                            };
                        }
                        TxState::Pending => {}
                    }
                }
                Err(e) => {
                    warn!(bundle_id, attempt, error = %e, "Bundle status poll failed");
                    self.logger.log_relay_poll(bundle_id, attempt, e.category());
                }
            }

            if attempt < max_attempts && !cancel.sleep(self.settings.poll_interval).await {
                return BundleResolution::Cancelled;
            }
        }

        self.settle_pending(
            keys,
            TxState::Failed,
            Some(format!(
                "confirmation timeout after {} status polls",
                max_attempts
            )),
        );
        BundleResolution::TimedOut {
            attempts: max_attempts,
        }
    }

    /// Wait for the ledger to confirm `signature` and settle `key`
    pub async fn confirm_signature(&self, key: &str, signature: &Signature) -> TxState {
        match self.ledger.confirm_transaction(signature).await {
            Ok(()) => {
                self.transition(key, TxState::Confirmed, None);
                TxState::Confirmed
            }
            Err(e) => {
                self.transition(key, TxState::Failed, Some(e.to_string()));
                TxState::Failed
            }
        }
    }

    /// Fail `key` with `reason`
    pub fn fail(&self, key: &str, reason: impl Into<String>) {
        self.transition(key, TxState::Failed, Some(reason.into()));
    }
}
