//! Launches that stop before anything is submitted
//!
//! Every case here must leave the record list empty so the caller can
//! retry without risking a double launch.

#[cfg(test)]
mod launch_validation_tests {
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Signer;

    use super::super::test_helpers::test_helpers::*;
    use crate::errors::{LaunchError, LaunchStep};
    use crate::ledger::LedgerError;
    use crate::monitor::CancelToken;
    use crate::orchestrator::{LaunchReport, Settlement};
    use crate::request::LaunchRequestDraft;
    use crate::test_utils::MockEnvironment;
    use crate::tx_builder::{PrestepOutcome, TransactionBuilderError};
    use crate::wallet::WalletSigner;

    fn assert_nothing_submitted(report: &LaunchReport) {
        assert_eq!(report.outcome, Settlement::Failure);
        assert!(report.records.is_empty(), "records: {:?}", report.records);
        assert!(report.safe_to_retry());
        assert!(report.error.as_ref().map_or(false, |e| e.nothing_submitted()));
    }

    async fn run(env: &MockEnvironment, draft: LaunchRequestDraft) -> LaunchReport {
        orchestrator(env).launch_draft(draft, CancelToken::new()).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_slippage_is_rejected() {
        let env = environment().await;
        let report = run(
            &env,
            LaunchRequestDraft {
                slippage_pct: Some(20.0),
                ..draft(&env, true)
            },
        )
        .await;

        assert_nothing_submitted(&report);
        assert!(matches!(report.error, Some(LaunchError::Validation(_))));
        assert!(report.mode.is_none());
        assert!(report.prestep.is_none());
        assert!(env.pools.created.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_key_count_is_rejected() {
        let env = environment().await;
        let report = run(&env, draft_with_keys(&env, true, &sniper_keys(3))).await;

        assert_nothing_submitted(&report);
        match report.error {
            Some(LaunchError::Validation(reason)) => {
                assert!(reason.contains("3 sniper keys supplied for 5 wallets"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_balance_stops_before_building() {
        let env = MockEnvironment::new(10.0).await;
        let report = run(&env, draft(&env, true)).await;

        assert_nothing_submitted(&report);
        match report.error {
            Some(LaunchError::InsufficientBalance {
                required,
                available,
            }) => {
                assert_eq!(required, 1_000_000.0);
                assert_eq!(available, 10.0);
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
        assert!(env.pools.created.lock().await.is_empty());
        assert!(env.swaps.calls().await.is_empty());
        assert!(env.wallet.signed().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_lookup_failure_is_a_ledger_error() {
        let env = environment().await;
        env.ledger
            .set_lookup_error(Some(LedgerError::Rpc("node behind".to_string())))
            .await;

        let report = run(&env, draft(&env, true)).await;

        assert_nothing_submitted(&report);
        assert!(matches!(
            report.error,
            Some(LaunchError::Ledger {
                step: LaunchStep::BalanceCheck,
                ..
            })
        ));
        assert!(matches!(report.prestep, Some(PrestepOutcome::Failed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_account_is_created_first() {
        let env = environment().await;
        env.ledger.token_accounts.lock().await.clear();

        let report = run(&env, draft(&env, true)).await;

        let sent = env.ledger.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payer, env.wallet.pubkey());
        assert_eq!(
            report.prestep,
            Some(PrestepOutcome::Created(sent[0].signature.to_string()))
        );
        // The created account is empty, so the launch still stops at the balance check
        assert_nothing_submitted(&report);
        assert!(matches!(
            report.error,
            Some(LaunchError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_token_account_creation_is_reported() {
        let env = environment().await;
        env.ledger.token_accounts.lock().await.clear();
        env.ledger.fail_send_for(env.wallet.pubkey()).await;

        let report = run(&env, draft(&env, true)).await;

        match &report.prestep {
            Some(PrestepOutcome::Failed(reason)) => assert!(reason.contains("send refused")),
            other => panic!("expected failed pre-step, got {:?}", other),
        }
        assert_nothing_submitted(&report);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_slippage_rejects_oversized_buys() {
        let env = environment().await;
        let report = run(
            &env,
            LaunchRequestDraft {
                slippage_pct: None,
                ..draft(&env, true)
            },
        )
        .await;

        assert_nothing_submitted(&report);
        match report.error {
            Some(LaunchError::Construction {
                step: LaunchStep::BuildSnipe,
                wallet_index: Some(_),
                source: TransactionBuilderError::SlippageExceeded { .. },
            }) => {}
            other => panic!("expected slippage failure, got {:?}", other),
        }
        assert!(env.relay.submitted().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_mint_fails_pool_construction() {
        let env = environment().await;
        let unknown = Pubkey::new_unique();
        env.ledger
            .set_token_balance(env.wallet.pubkey(), unknown, WALLET_BALANCE)
            .await;

        let report = run(
            &env,
            LaunchRequestDraft {
                token_mint: unknown.to_string(),
                ..draft(&env, true)
            },
        )
        .await;

        assert_nothing_submitted(&report);
        assert!(matches!(
            report.error,
            Some(LaunchError::Construction {
                step: LaunchStep::BuildPool,
                source: TransactionBuilderError::InvalidMint(_),
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_under_another_token_program_is_rejected() {
        let env = environment().await;
        let classic = Pubkey::new_unique();
        env.ledger.add_mint(classic, spl_token::id(), 6).await;
        env.ledger
            .set_token_balance(env.wallet.pubkey(), classic, WALLET_BALANCE)
            .await;

        let report = run(
            &env,
            LaunchRequestDraft {
                token_mint: classic.to_string(),
                ..draft(&env, true)
            },
        )
        .await;

        assert_nothing_submitted(&report);
        assert_eq!(report.error.as_ref().and_then(|e| e.step()), Some(LaunchStep::BuildPool));
        assert!(env.pools.created.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_service_outage_is_construction_failure() {
        let env = environment().await;
        env.pools
            .fail_create(TransactionBuilderError::service("pool", "upstream 503"))
            .await;

        let report = run(&env, draft(&env, true)).await;

        assert_nothing_submitted(&report);
        assert_eq!(report.error.as_ref().and_then(|e| e.step()), Some(LaunchStep::BuildPool));
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_failure_names_the_wallet() {
        let env = environment().await;
        let keys = sniper_keys(5);
        env.swaps.fail_for_owner(keys[3].pubkey()).await;

        let report = run(&env, draft_with_keys(&env, true, &keys)).await;

        assert_nothing_submitted(&report);
        let error = report.error.unwrap();
        assert_eq!(error.step(), Some(LaunchStep::BuildSnipe));
        assert_eq!(error.wallet_index(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_refusal_stops_before_submission() {
        let env = environment().await;
        env.wallet.set_fail(true).await;

        let report = run(&env, draft(&env, true)).await;

        assert_nothing_submitted(&report);
        assert_eq!(report.error.as_ref().and_then(|e| e.step()), Some(LaunchStep::SignPool));
        assert!(env.relay.submitted().await.is_empty());
    }
}
