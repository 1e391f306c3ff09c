//! Structured logging for launch events
//!
//! `LaunchLogger` stamps every event with the launch id and the span of the
//! step that emitted it, so records, relay polls and the final settlement
//! can be correlated in JSON logs.

use crate::errors::LaunchStep;
use crate::monitor::{TxKind, TxState};
use crate::observability::{CorrelationId, TraceContext};

/// Structured logger for launch pipeline events
#[derive(Debug, Clone)]
pub struct LaunchLogger {
    trace: TraceContext,
}

impl LaunchLogger {
    pub fn new(trace: TraceContext) -> Self {
        Self { trace }
    }

    /// Logger rooted at a caller-chosen id, for work outside a launch
    pub fn detached(id: &str, operation: &str) -> Self {
        Self::new(TraceContext::with_correlation(CorrelationId::from(id), operation))
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    pub fn launch_id(&self) -> &str {
        self.trace.correlation_id().as_str()
    }

    pub fn span_id(&self) -> &str {
        self.trace.span_id()
    }

    /// Open a child span for `step` and log its start
    pub fn step(&self, step: LaunchStep, wallet_index: Option<usize>) -> LaunchLogger {
        let child = Self::new(self.trace.child(step.as_str()));
        tracing::debug!(
            launch_id = %child.launch_id(),
            span_id = %child.span_id(),
            parent_span_id = %self.span_id(),
            step = %step,
            wallet_index = ?wallet_index,
            "Step started"
        );
        child
    }

    pub fn log_state(&self, state: &str) {
        tracing::info!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            state = %state,
            "Launch state changed"
        );
    }

    pub fn log_step_failed(&self, step: LaunchStep, wallet_index: Option<usize>, error: &str) {
        tracing::warn!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            step = %step,
            wallet_index = ?wallet_index,
            error = %error,
            "Step failed"
        );
    }

    pub fn log_tx_sent(&self, kind: TxKind, wallet_index: Option<usize>, signature: &str) {
        tracing::info!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            kind = %kind,
            wallet_index = ?wallet_index,
            signature = %signature,
            "Transaction sent"
        );
    }

    pub fn log_bundle_submitted(&self, bundle_id: &str, tx_count: usize, tip_lamports: u64) {
        tracing::info!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            bundle_id = %bundle_id,
            tx_count = %tx_count,
            tip_lamports = %tip_lamports,
            "Bundle submitted"
        );
    }

    pub fn log_relay_poll(&self, bundle_id: &str, attempt: u32, status: &str) {
        tracing::debug!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            bundle_id = %bundle_id,
            attempt = %attempt,
            status = %status,
            "Relay status polled"
        );
    }

    pub fn log_record_transition(&self, key: &str, kind: TxKind, from: TxState, to: TxState) {
        tracing::info!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            record = %key,
            kind = %kind,
            from = %from,
            to = %to,
            "Record transitioned"
        );
    }

    pub fn log_fallback(&self, reason: &str) {
        tracing::warn!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            reason = %reason,
            "Relay cannot carry the bundle, sending sequentially without bundle protection"
        );
    }

    pub fn log_settled(&self, outcome: &str, confirmed: usize, failed: usize, latency_ms: u64) {
        tracing::info!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            outcome = %outcome,
            confirmed = %confirmed,
            failed = %failed,
            latency_ms = %latency_ms,
            "Launch settled"
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            launch_id = %self.launch_id(),
            span_id = %self.span_id(),
            message = %message,
            "Warning"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_logger_is_child_of_launch() {
        let launch = LaunchLogger::new(TraceContext::new_launch());
        let build = launch.step(LaunchStep::BuildSnipe, Some(3));

        assert_eq!(build.launch_id(), launch.launch_id());
        assert_ne!(build.span_id(), launch.span_id());
        assert_eq!(build.trace().parent_span_id(), Some(launch.span_id()));
        assert_eq!(build.trace().operation(), "build_snipe");
    }

    #[test]
    fn test_detached_logger_uses_given_id() {
        let logger = LaunchLogger::detached("bundle-9", "status");
        assert_eq!(logger.launch_id(), "bundle-9");
        assert!(logger.trace().parent_span_id().is_none());
    }
}
