//! Metrics collection and export module
//!
//! Each orchestrator owns its own `LaunchMetrics` and registry; nothing is
//! registered process-wide, so two orchestrators in one process never share
//! counters.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Per-orchestrator launch metrics
pub struct LaunchMetrics {
    registry: Registry,

    // Counters
    pub launches_total: IntCounter,
    pub launches_succeeded: IntCounter,
    pub launches_partial: IntCounter,
    pub launches_failed: IntCounter,
    pub bundles_submitted: IntCounter,
    pub bundles_rejected: IntCounter,
    pub sequential_fallbacks: IntCounter,
    pub records_confirmed: IntCounter,
    pub records_failed: IntCounter,
    pub relay_polls_total: IntCounter,

    // Histograms
    pub build_latency: Histogram,
    pub launch_latency: Histogram,
}

impl LaunchMetrics {
    /// Create new metrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let launches_total =
            IntCounter::with_opts(Opts::new("launches_total", "Total number of launches started"))?;

        let launches_succeeded = IntCounter::with_opts(Opts::new(
            "launches_succeeded",
            "Launches settled with every record confirmed",
        ))?;

        let launches_partial = IntCounter::with_opts(Opts::new(
            "launches_partial",
            "Launches where the pool landed but some buys failed",
        ))?;

        let launches_failed =
            IntCounter::with_opts(Opts::new("launches_failed", "Launches settled as failure"))?;

        let bundles_submitted = IntCounter::with_opts(Opts::new(
            "bundles_submitted",
            "Bundles accepted by the relay",
        ))?;

        let bundles_rejected = IntCounter::with_opts(Opts::new(
            "bundles_rejected",
            "Bundles refused by the relay or reported failed/invalid",
        ))?;

        let sequential_fallbacks = IntCounter::with_opts(Opts::new(
            "sequential_fallbacks",
            "Launches that requested the relay but ran sequentially",
        ))?;

        let records_confirmed = IntCounter::with_opts(Opts::new(
            "records_confirmed",
            "Transaction records that reached confirmed",
        ))?;

        let records_failed = IntCounter::with_opts(Opts::new(
            "records_failed",
            "Transaction records that reached failed",
        ))?;

        let relay_polls_total = IntCounter::with_opts(Opts::new(
            "relay_polls_total",
            "Bundle status polls issued to the relay",
        ))?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Time spent building all launch transactions")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let launch_latency = Histogram::with_opts(
            HistogramOpts::new("launch_latency_seconds", "Time from launch start to settlement")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(launches_total.clone()))?;
        registry.register(Box::new(launches_succeeded.clone()))?;
        registry.register(Box::new(launches_partial.clone()))?;
        registry.register(Box::new(launches_failed.clone()))?;
        registry.register(Box::new(bundles_submitted.clone()))?;
        registry.register(Box::new(bundles_rejected.clone()))?;
        registry.register(Box::new(sequential_fallbacks.clone()))?;
        registry.register(Box::new(records_confirmed.clone()))?;
        registry.register(Box::new(records_failed.clone()))?;
        registry.register(Box::new(relay_polls_total.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(launch_latency.clone()))?;

        Ok(Self {
            registry,
            launches_total,
            launches_succeeded,
            launches_partial,
            launches_failed,
            bundles_submitted,
            bundles_rejected,
            sequential_fallbacks,
            records_confirmed,
            records_failed,
            relay_polls_total,
            build_latency,
            launch_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::debug!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        let duration = self.start.elapsed();
        histogram.observe(duration.as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_registries() {
        let a = LaunchMetrics::new().unwrap();
        let b = LaunchMetrics::new().unwrap();

        a.launches_total.inc();
        a.launches_total.inc();

        assert_eq!(a.launches_total.get(), 2);
        assert_eq!(b.launches_total.get(), 0);
    }

    #[test]
    fn test_render_contains_counters() {
        let metrics = LaunchMetrics::new().unwrap();
        metrics.bundles_submitted.inc();

        let text = metrics.render();
        assert!(text.contains("bundles_submitted 1"));
        assert!(text.contains("launch_latency_seconds"));
    }

    #[test]
    fn test_timer_observes() {
        let metrics = LaunchMetrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&metrics.build_latency);
        assert_eq!(metrics.build_latency.get_sample_count(), 1);
    }
}
