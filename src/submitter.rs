//! Relay submitter
//!
//! Relay mode hands the assembled bundle to the relay in one call. Sequential
//! mode sends through the ledger one step at a time, waiting for each
//! confirmation before the next step and isolating buy failures per record.

use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::errors::{LaunchError, LaunchStep};
use crate::ledger::LedgerClient;
use crate::metrics::LaunchMetrics;
use crate::monitor::{
    record_key, CancelToken, ConfirmationMonitor, RecordStore, TransactionRecord, TxKind, TxState,
};
use crate::relay::RelayService;
use crate::structured_logging::LaunchLogger;
use crate::tx_builder::{Bundle, BuiltTransaction};
use crate::wallet::WalletSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Relay,
    Sequential,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Sequential => "sequential",
        }
    }
}

/// Accepted bundle: relay id plus the record keys in bundle order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSubmission {
    pub bundle_id: String,
    pub keys: Vec<String>,
}

pub struct RelaySubmitter {
    relay: Arc<dyn RelayService>,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn WalletSigner>,
    monitor: Arc<ConfirmationMonitor>,
    store: Arc<RecordStore>,
    metrics: Arc<LaunchMetrics>,
    logger: LaunchLogger,
}

impl RelaySubmitter {
    pub fn new(
        relay: Arc<dyn RelayService>,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn WalletSigner>,
        monitor: Arc<ConfirmationMonitor>,
        metrics: Arc<LaunchMetrics>,
        logger: LaunchLogger,
    ) -> Self {
        let store = monitor.store().clone();
        Self {
            relay,
            ledger,
            wallet,
            monitor,
            store,
            metrics,
            logger,
        }
    }

    /// Pick the mode for a launch of `bundle_len` transactions
    ///
    /// Returns the fallback reason when relay mode was asked for but the
    /// relay cannot carry the bundle.
    pub fn select_mode(&self, use_relay: bool, bundle_len: usize) -> (SubmissionMode, Option<String>) {
        if !use_relay {
            return (SubmissionMode::Sequential, None);
        }
        match self.relay.capabilities().incompatibility(bundle_len) {
            Some(reason) => {
                self.logger.log_fallback(&reason);
                self.metrics.sequential_fallbacks.inc();
                (SubmissionMode::Sequential, Some(reason))
            }
            None => (SubmissionMode::Relay, None),
        }
    }

    /// Have the connected wallet sign a pool or liquidity transaction
    pub async fn sign_with_wallet(
        &self,
        built: BuiltTransaction,
        step: LaunchStep,
    ) -> Result<BuiltTransaction, LaunchError> {
        let log = self.logger.step(step, None);
        let result = self.wallet_sign(built, step).await;
        if let Err(e) = &result {
            log.log_step_failed(step, None, &e.to_string());
        }
        result
    }

    async fn wallet_sign(
        &self,
        mut built: BuiltTransaction,
        step: LaunchStep,
    ) -> Result<BuiltTransaction, LaunchError> {
        let signed = self
            .wallet
            .sign_transaction(built.tx.clone())
            .await
            .map_err(|e| LaunchError::construction(step, None, e))?;
        built
            .replace_signed(signed)
            .map_err(|e| LaunchError::construction(step, None, e))?;
        if !built.is_fully_signed() {
            return Err(LaunchError::construction(
                step,
                None,
                crate::tx_builder::TransactionBuilderError::Signing(format!(
                    "missing signatures from {:?}",
                    built.missing_signers()
                )),
            ));
        }
        Ok(built)
    }

    /// Submit the bundle; records are created before the call
    ///
    /// A relay error fails every record of the bundle and is returned
    /// without retry.
    #[instrument(skip(self, bundle, scope), fields(tx_count = bundle.len()))]
    pub async fn submit_bundle(
        &self,
        bundle: &Bundle,
        scope: &str,
    ) -> Result<BundleSubmission, LaunchError> {
        bundle
            .verify_order()
            .map_err(|e| LaunchError::construction(LaunchStep::AssembleBundle, None, e))?;
        let wire = bundle
            .encode_wire()
            .map_err(|e| LaunchError::construction(LaunchStep::AssembleBundle, None, e))?;

        let tip = *bundle.tip();
        if tip.lamports > 0 && !bundle.tip_embedded() {
            self.logger.warn(&format!(
                "no bundle entry pays the {} lamport tip to {}",
                tip.lamports, tip.account
            ));
        }

        let keys: Vec<String> = bundle
            .entries()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let key = record_key(&entry.tx, scope, entry.kind, entry.wallet_index);
                self.store.insert(
                    TransactionRecord::pending(key.clone(), entry.kind, entry.wallet_index)
                        .in_bundle(None, i),
                );
                key
            })
            .collect();

        let log = self.logger.step(LaunchStep::SubmitBundle, None);
        match self
            .relay
            .submit_bundle(&wire, &tip.account, tip.lamports)
            .await
        {
            Ok(bundle_id) => {
                self.metrics.bundles_submitted.inc();
                self.store.assign_bundle(&keys, &bundle_id);
                log.log_bundle_submitted(&bundle_id, keys.len(), tip.lamports);
                Ok(BundleSubmission { bundle_id, keys })
            }
            Err(e) => {
                self.metrics.bundles_rejected.inc();
                let reason = format!("{} relay: {}", self.relay.name(), e);
                log.log_step_failed(LaunchStep::SubmitBundle, None, &reason);
                for key in &keys {
                    self.monitor.fail(key, reason.clone());
                }
                Err(LaunchError::submission(LaunchStep::SubmitBundle, None, reason))
            }
        }
    }

    /// Send and confirm one wallet-signed step, aborting on any failure
    async fn send_and_confirm(
        &self,
        built: BuiltTransaction,
        scope: &str,
        send_step: LaunchStep,
        confirm_step: LaunchStep,
        cancel: &CancelToken,
    ) -> Result<(), LaunchError> {
        let key = record_key(&built.tx, scope, built.kind, built.wallet_index);
        self.store
            .insert(TransactionRecord::pending(key.clone(), built.kind, None));

        let log = self.logger.step(send_step, None);
        let signature = match self.ledger.send_transaction(&built.tx).await {
            Ok(signature) => signature,
            Err(e) => {
                self.monitor.fail(&key, e.to_string());
                log.log_step_failed(send_step, None, &e.to_string());
                return Err(LaunchError::submission(send_step, None, e));
            }
        };
        log.log_tx_sent(built.kind, None, &signature.to_string());

        let state = tokio::select! {
            state = self.monitor.confirm_signature(&key, &signature) => state,
            _ = cancel.cancelled() => return Err(LaunchError::Cancelled),
        };
        if state != TxState::Confirmed {
            let reason = self
                .store
                .get(&key)
                .and_then(|r| r.error)
                .unwrap_or_else(|| "not confirmed".to_string());
            log.log_step_failed(confirm_step, None, &reason);
            return Err(LaunchError::submission(confirm_step, None, reason));
        }
        Ok(())
    }

    /// Sequential fallback
    ///
    /// `liquidity` is only polled once the pool has confirmed, so the
    /// liquidity transaction is built against a pool that exists. Pool and
    /// liquidity failures end the run; buy failures only fail their record.
    #[instrument(skip_all, fields(buys = snipes.len(), delay_ms = snipe_delay.as_millis() as u64))]
    pub async fn run_sequential<F>(
        &self,
        pool: BuiltTransaction,
        liquidity: F,
        snipes: Vec<BuiltTransaction>,
        snipe_delay: Duration,
        scope: &str,
        cancel: &CancelToken,
    ) -> Result<(), LaunchError>
    where
        F: Future<Output = Result<BuiltTransaction, LaunchError>>,
    {
        let pool = self.sign_with_wallet(pool, LaunchStep::SignPool).await?;
        self.send_and_confirm(pool, scope, LaunchStep::SendPool, LaunchStep::ConfirmPool, cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(LaunchError::Cancelled);
        }
        let log = self.logger.step(LaunchStep::BuildLiquidity, None);
        let liquidity = match liquidity.await {
            Ok(liquidity) => liquidity,
            Err(e) => {
                log.log_step_failed(LaunchStep::BuildLiquidity, None, &e.to_string());
                return Err(e);
            }
        };
        let liquidity = self
            .sign_with_wallet(liquidity, LaunchStep::SignLiquidity)
            .await?;
        self.send_and_confirm(
            liquidity,
            scope,
            LaunchStep::SendLiquidity,
            LaunchStep::ConfirmLiquidity,
            cancel,
        )
        .await?;

        if !snipe_delay.is_zero() {
            debug!(delay_ms = snipe_delay.as_millis() as u64, "Waiting before buys");
            if !cancel.sleep(snipe_delay).await {
                return Err(LaunchError::Cancelled);
            }
        } else if cancel.is_cancelled() {
            return Err(LaunchError::Cancelled);
        }

        let keyed: Vec<(String, BuiltTransaction)> = snipes
            .into_iter()
            .map(|built| {
                let key = record_key(&built.tx, scope, TxKind::Buy, built.wallet_index);
                self.store.insert(TransactionRecord::pending(
                    key.clone(),
                    TxKind::Buy,
                    built.wallet_index,
                ));
                (key, built)
            })
            .collect();

        let sends = keyed.iter().map(|(key, built)| async move {
            let log = self.logger.step(LaunchStep::SendBuy, built.wallet_index);
            match self.ledger.send_transaction(&built.tx).await {
                Ok(signature) => {
                    log.log_tx_sent(TxKind::Buy, built.wallet_index, &signature.to_string());
                    Some((key.as_str(), signature))
                }
                Err(e) => {
                    log.log_step_failed(LaunchStep::SendBuy, built.wallet_index, &e.to_string());
                    self.monitor.fail(key, e.to_string());
                    None
                }
            }
        });
        let sent: Vec<_> = join_all(sends).await.into_iter().flatten().collect();

        let confirms = sent
            .iter()
            .map(|(key, signature)| self.monitor.confirm_signature(key, signature));
        tokio::select! {
            _ = join_all(confirms) => Ok(()),
            _ = cancel.cancelled() => Err(LaunchError::Cancelled),
        }
    }
}
