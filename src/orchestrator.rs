//! Launch orchestrator
//!
//! Drives one launch through `Idle → Validating → Building → Submitting →
//! Monitoring → Settled`. Every launch gets its own session: record store,
//! state channel and cancel token. Nothing is shared between launches
//! except the collaborators and the metrics registry.

use futures::future::join_all;
use rand::seq::SliceRandom;
use serde::{Serialize, Serializer};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use crate::config::{LaunchConfig, LauncherConfig};
use crate::errors::{LaunchError, LaunchStep};
use crate::ledger::LedgerClient;
use crate::metrics::{LaunchMetrics, Timer};
use crate::monitor::{
    BundleResolution, CancelToken, ConfirmationMonitor, MonitorSettings, RecordStore,
    RecordUpdate, TransactionRecord, TxKind, TxState,
};
use crate::observability::TraceContext;
use crate::relay::RelayService;
use crate::request::{allocate, sol_to_lamports, LaunchRequest, LaunchRequestDraft, SniperAllocation};
use crate::structured_logging::LaunchLogger;
use crate::submitter::{RelaySubmitter, SubmissionMode};
use crate::tx_builder::{
    assemble, instructions::tip_instruction, LiquiditySeedBuilder,
    PoolCreationBuilder, PoolSeed, PoolService, PrestepOutcome, SnipeBuilder, SnipeParams,
    SwapService, TipSpec,
};
use crate::wallet::{SingleFlightSigner, WalletSigner};

/// External collaborators of a launch
#[derive(Clone)]
pub struct LaunchServices {
    pub ledger: Arc<dyn LedgerClient>,
    pub pools: Arc<dyn PoolService>,
    pub swaps: Arc<dyn SwapService>,
    pub relay: Arc<dyn RelayService>,
    pub wallet: Arc<dyn WalletSigner>,
}

/// Launch-independent settings, resolved from configuration once
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub block_time: Duration,
    pub monitor: MonitorSettings,
    pub quote_mint: Pubkey,
    pub token_program: Pubkey,
    /// Used when the relay cannot list its tip accounts
    pub fallback_tip_accounts: Vec<Pubkey>,
    pub defaults: LaunchConfig,
}

impl LaunchSettings {
    pub fn from_config(config: &LauncherConfig) -> anyhow::Result<Self> {
        Ok(Self {
            block_time: Duration::from_millis(config.launch.block_time_ms),
            monitor: MonitorSettings::from_config(&config.monitor),
            quote_mint: config.launch.quote_mint()?,
            token_program: config.ledger.token_program()?,
            fallback_tip_accounts: config.relay.tip_account_keys()?,
            defaults: config.launch.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    Success,
    /// Sequential mode only: pool and liquidity landed, some buys did not
    Partial,
    Failure,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchState {
    Idle,
    Validating,
    Building,
    Submitting,
    Monitoring,
    Settled(Settlement),
}

impl LaunchState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Building => "building",
            Self::Submitting => "submitting",
            Self::Monitoring => "monitoring",
            Self::Settled(s) => s.as_str(),
        }
    }
}

/// Observer handle for one launch
///
/// Subscribe before calling [`LaunchOrchestrator::run`] to see every record
/// from its creation.
pub struct LaunchSession {
    trace: TraceContext,
    store: Arc<RecordStore>,
    state: watch::Sender<LaunchState>,
    cancel: CancelToken,
}

impl LaunchSession {
    pub fn new(cancel: CancelToken) -> Self {
        let (state, _) = watch::channel(LaunchState::Idle);
        Self {
            trace: TraceContext::new_launch(),
            store: Arc::new(RecordStore::new()),
            state,
            cancel,
        }
    }

    pub fn launch_id(&self) -> &str {
        self.trace.correlation_id().as_str()
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    pub fn records(&self) -> broadcast::Receiver<RecordUpdate> {
        self.store.subscribe()
    }

    pub fn states(&self) -> watch::Receiver<LaunchState> {
        self.state.subscribe()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }
}

/// Per-wallet allocation as shown to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSummary {
    pub index: usize,
    pub percentage: f64,
    pub sol_amount: f64,
    pub lamports: u64,
    pub wallet: String,
    pub generated: bool,
}

impl From<&SniperAllocation> for AllocationSummary {
    fn from(a: &SniperAllocation) -> Self {
        Self {
            index: a.index,
            percentage: a.percentage,
            sol_amount: a.sol_amount,
            lamports: a.lamports,
            wallet: a.signer.pubkey().to_string(),
            generated: a.signer.is_generated(),
        }
    }
}

fn serialize_error<S: Serializer>(error: &Option<LaunchError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

/// Terminal result of a launch
#[derive(Debug, Clone, Serialize)]
pub struct LaunchReport {
    pub launch_id: String,
    pub mode: Option<SubmissionMode>,
    pub outcome: Settlement,
    pub records: Vec<TransactionRecord>,
    pub bundle_id: Option<String>,
    /// Why a relay launch went out as sequential sends, without the
    /// bundle's all-or-nothing protection
    pub relay_fallback: Option<String>,
    pub prestep: Option<PrestepOutcome>,
    pub allocations: Vec<AllocationSummary>,
    /// Base58 secret keys of generated sniper wallets; persist them
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generated_keys: Vec<String>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<LaunchError>,
    /// Some transaction left the process
    pub anything_submitted: bool,
    pub latency_ms: u64,
}

impl LaunchReport {
    pub fn is_success(&self) -> bool {
        self.outcome == Settlement::Success
    }

    /// Re-running the whole launch cannot double-submit anything
    pub fn safe_to_retry(&self) -> bool {
        !self.anything_submitted
    }

    pub fn records_in(&self, state: TxState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }
}

/// Everything learned about a launch before it ended, error or not
#[derive(Default)]
struct LaunchProgress {
    mode: Option<SubmissionMode>,
    bundle_id: Option<String>,
    relay_fallback: Option<String>,
    prestep: Option<PrestepOutcome>,
    allocations: Vec<AllocationSummary>,
    generated_keys: Vec<String>,
}

pub struct LaunchOrchestrator {
    services: LaunchServices,
    settings: LaunchSettings,
    metrics: Arc<LaunchMetrics>,
}

impl LaunchOrchestrator {
    /// The wallet is wrapped so that signing requests never overlap
    pub fn new(
        mut services: LaunchServices,
        settings: LaunchSettings,
    ) -> Result<Self, prometheus::Error> {
        services.wallet = Arc::new(SingleFlightSigner::new(services.wallet));
        Ok(Self {
            services,
            settings,
            metrics: Arc::new(LaunchMetrics::new()?),
        })
    }

    pub fn metrics(&self) -> &LaunchMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    /// Run a validated request to settlement
    pub async fn launch(&self, request: LaunchRequest, cancel: CancelToken) -> LaunchReport {
        let session = LaunchSession::new(cancel);
        self.run(&session, request).await
    }

    /// Validate a draft with configured defaults, then launch
    pub async fn launch_draft(&self, draft: LaunchRequestDraft, cancel: CancelToken) -> LaunchReport {
        let session = LaunchSession::new(cancel);
        match draft.validate_with(&self.settings.defaults) {
            Ok(request) => self.run(&session, request).await,
            Err(e) => {
                let logger = LaunchLogger::new(session.trace.clone());
                let timer = Timer::new();
                self.metrics.launches_total.inc();
                self.finish(&session, &logger, LaunchProgress::default(), Err(e), &timer)
            }
        }
    }

    /// Run `request` in `session`
    #[instrument(skip_all, fields(launch_id = %session.launch_id(), wallets = request.wallet_count()))]
    pub async fn run(&self, session: &LaunchSession, request: LaunchRequest) -> LaunchReport {
        let timer = Timer::new();
        let logger = LaunchLogger::new(session.trace.clone());
        self.metrics.launches_total.inc();

        let mut progress = LaunchProgress::default();
        let result = self.drive(session, &logger, &request, &mut progress).await;
        self.finish(session, &logger, progress, result, &timer)
    }

    fn set_state(&self, session: &LaunchSession, logger: &LaunchLogger, state: LaunchState) {
        session.state.send_replace(state);
        logger.log_state(state.label());
    }

    async fn drive(
        &self,
        session: &LaunchSession,
        logger: &LaunchLogger,
        request: &LaunchRequest,
        progress: &mut LaunchProgress,
    ) -> Result<(), LaunchError> {
        let services = &self.services;
        let cancel = &session.cancel;
        let wallet = services.wallet.pubkey();
        let token_program = self.settings.token_program;

        let monitor = Arc::new(ConfirmationMonitor::new(
            services.relay.clone(),
            services.ledger.clone(),
            session.store.clone(),
            self.settings.monitor,
            self.metrics.clone(),
            logger.clone(),
        ));
        let submitter = RelaySubmitter::new(
            services.relay.clone(),
            services.ledger.clone(),
            services.wallet.clone(),
            monitor.clone(),
            self.metrics.clone(),
            logger.clone(),
        );

        // Validating
        self.set_state(session, logger, LaunchState::Validating);
        let pool_builder = PoolCreationBuilder::new(
            services.ledger.as_ref(),
            services.pools.as_ref(),
            services.wallet.as_ref(),
        );
        let prestep_log = logger.step(LaunchStep::TokenAccountPrestep, None);
        let prestep = pool_builder
            .ensure_token_account(request.token_mint(), &token_program)
            .await;
        if let PrestepOutcome::Failed(reason) = &prestep {
            prestep_log.log_step_failed(LaunchStep::TokenAccountPrestep, None, reason);
        }
        progress.prestep = Some(prestep);
        check_cancel(cancel)?;

        logger.step(LaunchStep::BalanceCheck, None);
        let available = services
            .ledger
            .token_balance(&wallet, request.token_mint(), &token_program)
            .await
            .map_err(|source| LaunchError::Ledger {
                step: LaunchStep::BalanceCheck,
                source,
            })?;
        if available < request.token_amount() {
            return Err(LaunchError::InsufficientBalance {
                required: request.token_amount(),
                available,
            });
        }

        let (mode, fallback) = submitter.select_mode(request.use_relay(), 2 + request.wallet_count());
        progress.mode = Some(mode);
        progress.relay_fallback = fallback;
        check_cancel(cancel)?;

        // Building
        self.set_state(session, logger, LaunchState::Building);
        let build_timer = Timer::new();
        let allocations = allocate(
            request.total_sniper_sol(),
            request.distribution(),
            request.sniper_signers(),
        )?;
        progress.allocations = allocations.iter().map(AllocationSummary::from).collect();
        progress.generated_keys = allocations
            .iter()
            .filter(|a| a.signer.is_generated())
            .map(|a| bs58::encode(a.signer.keypair().to_bytes()).into_string())
            .collect();

        let tip = match mode {
            SubmissionMode::Relay => Some(TipSpec {
                account: self.choose_tip_account(request).await?,
                lamports: request.tip_lamports(),
            }),
            SubmissionMode::Sequential => None,
        };

        logger.step(LaunchStep::BuildPool, None);
        let quote_amount = sol_to_lamports(request.sol_amount());
        let pool_output = pool_builder
            .build(&PoolSeed {
                base_mint: *request.token_mint(),
                quote_mint: self.settings.quote_mint,
                base_ui_amount: request.token_amount(),
                quote_amount,
                base_token_program: token_program,
            })
            .await
            .map_err(|e| LaunchError::construction(LaunchStep::BuildPool, None, e))?;
        let pool = pool_output.pool.clone();
        let base_amount = pool_output.params.base_amount;

        let snipe_builder = SnipeBuilder::new(
            services.swaps.as_ref(),
            &pool,
            SnipeParams {
                desired_tokens: base_amount,
                sol_amount: quote_amount,
                slippage_pct: request.slippage_pct(),
            },
        );
        let snipe_builder = &snipe_builder;
        let built_snipes = join_all(allocations.iter().map(|allocation| async move {
            let step = LaunchStep::BuildSnipe;
            let log = logger.step(step, Some(allocation.index));
            snipe_builder.build(allocation).await.map_err(|e| {
                log.log_step_failed(step, Some(allocation.index), &e.to_string());
                LaunchError::construction(step, Some(allocation.index), e)
            })
        }))
        .await;
        let snipes = built_snipes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let liquidity_builder = LiquiditySeedBuilder::new(services.pools.as_ref(), wallet);
        let build_liquidity = |extra: Vec<Instruction>| {
            let liquidity_builder = &liquidity_builder;
            let pool = &pool;
            async move {
                liquidity_builder
                    .build(pool, base_amount, quote_amount, request.slippage_pct(), &extra)
                    .await
                    .map_err(|e| LaunchError::construction(LaunchStep::BuildLiquidity, None, e))
            }
        };

        match tip {
            Some(tip) => {
                let tip_ix = tip_instruction(&wallet, &tip.account, tip.lamports)
                    .map_err(|e| LaunchError::construction(LaunchStep::BuildLiquidity, None, e))?;
                logger.step(LaunchStep::BuildLiquidity, None);
                let liquidity = build_liquidity(vec![tip_ix]).await?;
                build_timer.observe_duration(&self.metrics.build_latency);
                check_cancel(cancel)?;

                let pool_tx = submitter
                    .sign_with_wallet(pool_output.built, LaunchStep::SignPool)
                    .await?;
                let liquidity = submitter
                    .sign_with_wallet(liquidity, LaunchStep::SignLiquidity)
                    .await?;
                logger.step(LaunchStep::AssembleBundle, None);
                let bundle = assemble(pool_tx, liquidity, snipes, tip)
                    .map_err(|e| LaunchError::construction(LaunchStep::AssembleBundle, None, e))?;
                check_cancel(cancel)?;

                // Submitting
                self.set_state(session, logger, LaunchState::Submitting);
                let submission = submitter.submit_bundle(&bundle, session.launch_id()).await?;
                progress.bundle_id = Some(submission.bundle_id.clone());

                // Monitoring
                self.set_state(session, logger, LaunchState::Monitoring);
                match monitor
                    .watch_bundle(&submission.bundle_id, &submission.keys, cancel)
                    .await
                {
                    BundleResolution::Landed { slot, .. } => {
                        info!(bundle_id = %submission.bundle_id, slot = ?slot, "Bundle landed");
                        Ok(())
                    }
                    BundleResolution::Rejected { status } => Err(LaunchError::submission(
                        LaunchStep::MonitorBundle,
                        None,
                        format!("relay reported bundle {}", status),
                    )),
                    BundleResolution::TimedOut { attempts } => {
                        Err(LaunchError::ConfirmationTimeout {
                            bundle_id: submission.bundle_id,
                            attempts,
                        })
                    }
                    BundleResolution::Cancelled => Err(LaunchError::Cancelled),
                }
            }
            None => {
                build_timer.observe_duration(&self.metrics.build_latency);
                check_cancel(cancel)?;

                self.set_state(session, logger, LaunchState::Submitting);
                let delay = self.settings.block_time * request.snipe_delay_blocks();
                submitter
                    .run_sequential(
                        pool_output.built,
                        build_liquidity(Vec::new()),
                        snipes,
                        delay,
                        session.launch_id(),
                        cancel,
                    )
                    .await
            }
        }
    }

    /// The request's tip account, else a random one the relay accepts
    async fn choose_tip_account(&self, request: &LaunchRequest) -> Result<Pubkey, LaunchError> {
        if let Some(account) = request.tip_account() {
            return Ok(*account);
        }
        let accounts = match self.services.relay.tip_accounts().await {
            Ok(accounts) if !accounts.is_empty() => accounts,
            Ok(_) => self.settings.fallback_tip_accounts.clone(),
            Err(e) => {
                warn!(error = %e, "Tip account lookup failed, using configured accounts");
                self.settings.fallback_tip_accounts.clone()
            }
        };
        accounts
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| LaunchError::validation("no relay tip account available"))
    }

    fn finish(
        &self,
        session: &LaunchSession,
        logger: &LaunchLogger,
        progress: LaunchProgress,
        result: Result<(), LaunchError>,
        timer: &Timer,
    ) -> LaunchReport {
        let records = session.store.snapshot();
        let error = result.err();
        let outcome = settle(progress.mode, &records, error.as_ref());
        // The token-account pre-step is idempotent and does not count
        let anything_submitted = !records.is_empty();

        match outcome {
            Settlement::Success => self.metrics.launches_succeeded.inc(),
            Settlement::Partial => self.metrics.launches_partial.inc(),
            Settlement::Failure => self.metrics.launches_failed.inc(),
        }
        timer.observe_duration(&self.metrics.launch_latency);

        if let Some(e) = &error {
            logger.log_step_failed(
                e.step().unwrap_or(LaunchStep::Validate),
                e.wallet_index(),
                &e.to_string(),
            );
        }
        let confirmed = records.iter().filter(|r| r.state == TxState::Confirmed).count();
        let failed = records.iter().filter(|r| r.state == TxState::Failed).count();
        logger.log_settled(outcome.as_str(), confirmed, failed, timer.elapsed_ms());
        session.state.send_replace(LaunchState::Settled(outcome));

        LaunchReport {
            launch_id: session.launch_id().to_string(),
            mode: progress.mode,
            outcome,
            records,
            bundle_id: progress.bundle_id,
            relay_fallback: progress.relay_fallback,
            prestep: progress.prestep,
            allocations: progress.allocations,
            generated_keys: progress.generated_keys,
            error,
            anything_submitted,
            latency_ms: timer.elapsed_ms(),
        }
    }
}

fn check_cancel(cancel: &CancelToken) -> Result<(), LaunchError> {
    if cancel.is_cancelled() {
        Err(LaunchError::Cancelled)
    } else {
        Ok(())
    }
}

/// Classify a finished launch from its records
///
/// `Partial` needs sequential mode with pool and liquidity confirmed; a
/// relay bundle is all or nothing.
pub fn settle(
    mode: Option<SubmissionMode>,
    records: &[TransactionRecord],
    error: Option<&LaunchError>,
) -> Settlement {
    let confirmed = |kind: TxKind| {
        records
            .iter()
            .any(|r| r.kind == kind && r.state == TxState::Confirmed)
    };
    let base_landed = confirmed(TxKind::Pool) && confirmed(TxKind::Liquidity);
    let buys: Vec<_> = records.iter().filter(|r| r.kind == TxKind::Buy).collect();
    let all_buys = !buys.is_empty() && buys.iter().all(|r| r.state == TxState::Confirmed);

    if error.is_none() && base_landed && all_buys {
        Settlement::Success
    } else if mode == Some(SubmissionMode::Sequential) && base_landed && !buys.is_empty() {
        Settlement::Partial
    } else {
        Settlement::Failure
    }
}
