//! Confirmation monitor tests
//!
//! Bundle watches against a scripted relay and single-signature
//! confirmations against the mock ledger.

#[cfg(test)]
mod confirmation_monitor_tests {
    use solana_sdk::signature::Signature;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::metrics::LaunchMetrics;
    use crate::monitor::{
        BundleResolution, CancelToken, ConfirmationMonitor, MonitorSettings, RecordStore,
        TransactionRecord, TxKind, TxState,
    };
    use crate::relay::{RelayBundleStatus, RelayError};
    use crate::structured_logging::LaunchLogger;
    use crate::test_utils::{MockLedger, MockRelay};

    struct Fixture {
        relay: MockRelay,
        store: Arc<RecordStore>,
        metrics: Arc<LaunchMetrics>,
        monitor: ConfirmationMonitor,
        keys: Vec<String>,
    }

    fn fixture(max_attempts: u32) -> Fixture {
        let relay = MockRelay::new();
        let store = Arc::new(RecordStore::new());
        let metrics = Arc::new(LaunchMetrics::new().unwrap());
        let keys: Vec<String> = (0..3).map(|i| format!("watch:{}", i)).collect();
        for (i, (key, kind)) in keys
            .iter()
            .zip([TxKind::Pool, TxKind::Liquidity, TxKind::Buy])
            .enumerate()
        {
            let wallet_index = (kind == TxKind::Buy).then_some(0);
            store.insert(TransactionRecord::pending(key.clone(), kind, wallet_index).in_bundle(None, i));
        }
        let monitor = ConfirmationMonitor::new(
            Arc::new(relay.clone()),
            Arc::new(MockLedger::new()),
            store.clone(),
            MonitorSettings {
                poll_interval: Duration::from_secs(2),
                max_attempts,
            },
            metrics.clone(),
            LaunchLogger::detached("monitor-test", "monitor"),
        );
        Fixture {
            relay,
            store,
            metrics,
            monitor,
            keys,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_landed_bundle_reports_slot_and_signatures() {
        let f = fixture(5);
        f.relay
            .script_statuses(vec![
                Ok(RelayBundleStatus::new("Pending")),
                Ok(RelayBundleStatus {
                    status: "Landed".to_string(),
                    landed_slot: Some(42),
                    signatures: vec!["sig-a".to_string(), "sig-b".to_string()],
                }),
            ])
            .await;

        let started = tokio::time::Instant::now();
        let resolution = f
            .monitor
            .watch_bundle("bundle-1", &f.keys, &CancelToken::new())
            .await;

        assert_eq!(
            resolution,
            BundleResolution::Landed {
                slot: Some(42),
                signatures: vec![
                    ("watch:0".to_string(), Some("sig-a".to_string())),
                    ("watch:1".to_string(), Some("sig-b".to_string())),
                    ("watch:2".to_string(), None),
                ],
                relay_signatures: vec!["sig-a".to_string(), "sig-b".to_string()],
            }
        );
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        for key in &f.keys {
            let record = f.store.get(key).unwrap();
            assert_eq!(record.state, TxState::Confirmed);
            assert_eq!(record.bundle_id.as_deref(), Some("bundle-1"));
        }
        assert_eq!(f.metrics.records_confirmed.get(), 3);
        assert_eq!(f.metrics.relay_polls_total.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_landed_keeps_every_relay_signature() {
        let f = fixture(2);
        let relay_sigs: Vec<String> = (0..7).map(|i| format!("sig-{}", i)).collect();
        f.relay
            .script_statuses(vec![Ok(RelayBundleStatus {
                status: "Landed".to_string(),
                landed_slot: Some(7),
                signatures: relay_sigs.clone(),
            })])
            .await;

        // A watcher that only knows the bundle id tracks a single record
        let key = vec![f.keys[0].clone()];
        match f
            .monitor
            .watch_bundle("bundle-7", &key, &CancelToken::new())
            .await
        {
            BundleResolution::Landed {
                signatures,
                relay_signatures,
                ..
            } => {
                assert_eq!(signatures.len(), 1);
                assert_eq!(relay_signatures, relay_sigs);
            }
            other => panic!("expected landed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_fails_only_pending_records() {
        let f = fixture(4);
        f.relay
            .script_statuses(vec![Err(RelayError::RateLimited)])
            .await;
        // Already terminal before the watch starts
        f.monitor.fail(&f.keys[2], "send refused");

        let started = tokio::time::Instant::now();
        let resolution = f
            .monitor
            .watch_bundle("bundle-2", &f.keys, &CancelToken::new())
            .await;

        assert_eq!(resolution, BundleResolution::TimedOut { attempts: 4 });
        assert_eq!(f.relay.polls().await, 4);
        // No sleep after the last poll
        assert_eq!(started.elapsed(), Duration::from_secs(6));

        let counts = f.store.counts();
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.failed, 3);
        assert_eq!(
            f.store.get(&f.keys[2]).unwrap().error.as_deref(),
            Some("send refused")
        );
        assert_eq!(
            f.store.get(&f.keys[0]).unwrap().error.as_deref(),
            Some("confirmation timeout after 4 status polls")
        );
        assert_eq!(f.metrics.records_failed.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_counts_and_fails_records() {
        let f = fixture(5);
        f.relay
            .script_statuses(vec![Ok(RelayBundleStatus::new("Invalid"))])
            .await;

        let resolution = f
            .monitor
            .watch_bundle("bundle-3", &f.keys, &CancelToken::new())
            .await;

        assert_eq!(
            resolution,
            BundleResolution::Rejected {
                status: "Invalid".to_string()
            }
        );
        assert_eq!(f.metrics.bundles_rejected.get(), 1);
        assert_eq!(f.store.counts().failed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_watch_leaves_records_untouched() {
        let f = fixture(30);
        f.relay
            .script_statuses(vec![Ok(RelayBundleStatus::new("Pending"))])
            .await;
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });
        let resolution = f.monitor.watch_bundle("bundle-4", &f.keys, &cancel).await;

        assert_eq!(resolution, BundleResolution::Cancelled);
        assert_eq!(f.relay.polls().await, 2);
        assert_eq!(f.store.counts().pending, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_record_cannot_be_failed_later() {
        let f = fixture(1);
        let resolution = f
            .monitor
            .watch_bundle("bundle-5", &f.keys, &CancelToken::new())
            .await;
        assert!(resolution.is_landed());

        assert!(!f.monitor.transition(&f.keys[0], TxState::Failed, Some("late".to_string())));
        f.monitor.fail(&f.keys[1], "late failure");
        assert_eq!(f.store.counts().confirmed, 3);
        assert_eq!(f.metrics.records_failed.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_signature_fails_its_record() {
        let f = fixture(1);
        let state = f
            .monitor
            .confirm_signature(&f.keys[0], &Signature::new_unique())
            .await;

        assert_eq!(state, TxState::Failed);
        let record = f.store.get(&f.keys[0]).unwrap();
        assert!(record.error.unwrap().contains("unknown signature"));
    }
}
