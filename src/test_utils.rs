//! Test Utilities Module
//!
//! In-memory collaborators for deterministic launches: a ledger, pool and
//! swap services, a relay and a connected wallet. Each one keeps a journal
//! of the calls it received and can be scripted to fail.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use spl_token::solana_program::{program_option::COption, program_pack::Pack};
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{LaunchConfig, DEFAULT_TIP_ACCOUNT, TOKEN_2022_PROGRAM_ID};
use crate::ledger::{LedgerClient, LedgerError, TokenAccountSummary};
use crate::monitor::MonitorSettings;
use crate::orchestrator::{LaunchServices, LaunchSettings};
use crate::relay::{RelayBundleStatus, RelayCapabilities, RelayError, RelayService};
use crate::tx_builder::{
    AddLiquidityParams, CreatePoolParams, CreatedPool, FeeRates, PoolContext, PoolKeys,
    PoolService, ReserveSnapshot, SwapRequest, SwapService, TransactionBuilderError,
};
use crate::wallet::{KeypairSigner, WalletSigner};

fn unsigned(instructions: &[Instruction], payer: &Pubkey, blockhash: &Hash) -> VersionedTransaction {
    let message = Message::new_with_blockhash(instructions, Some(payer), blockhash);
    let signers = message.header.num_required_signatures as usize;
    VersionedTransaction {
        signatures: vec![Signature::default(); signers],
        message: VersionedMessage::Legacy(message),
    }
}

fn payer_of(tx: &VersionedTransaction) -> Pubkey {
    tx.message
        .static_account_keys()
        .first()
        .copied()
        .unwrap_or_default()
}

/// One `send_transaction` call seen by [`MockLedger`]
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub signature: Signature,
    pub payer: Pubkey,
    pub at: Instant,
}

/// One successful `confirm_transaction` call
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub signature: Signature,
    pub at: Instant,
}

/// In-memory ledger
///
/// Sends verify every signature; send and confirm failures are scripted
/// per fee payer.
#[derive(Clone)]
pub struct MockLedger {
    pub blockhash: Hash,
    pub accounts: Arc<Mutex<HashMap<Pubkey, Account>>>,
    pub token_accounts: Arc<Mutex<HashMap<Pubkey, Vec<TokenAccountSummary>>>>,
    pub sent: Arc<Mutex<Vec<SentTransaction>>>,
    pub confirmed: Arc<Mutex<Vec<Confirmation>>>,
    pub fail_send: Arc<Mutex<HashSet<Pubkey>>>,
    pub fail_confirm: Arc<Mutex<HashSet<Pubkey>>>,
    pub lookup_error: Arc<Mutex<Option<LedgerError>>>,
    pub confirm_delay: Arc<Mutex<Duration>>,
    payers: Arc<Mutex<HashMap<Signature, Pubkey>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            accounts: Arc::new(Mutex::new(HashMap::new())),
            token_accounts: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            confirmed: Arc::new(Mutex::new(Vec::new())),
            fail_send: Arc::new(Mutex::new(HashSet::new())),
            fail_confirm: Arc::new(Mutex::new(HashSet::new())),
            lookup_error: Arc::new(Mutex::new(None)),
            confirm_delay: Arc::new(Mutex::new(Duration::from_millis(400))),
            payers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register an initialized mint owned by `token_program`
    pub async fn add_mint(&self, mint: Pubkey, token_program: Pubkey, decimals: u8) {
        let state = spl_token::state::Mint {
            mint_authority: COption::Some(Pubkey::new_unique()),
            supply: u64::MAX / 2,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Mint::LEN];
        spl_token::state::Mint::pack(state, &mut data).unwrap();

        self.accounts.lock().await.insert(
            mint,
            Account {
                lamports: 1_461_600,
                data,
                owner: token_program,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Give `owner` a token account for `mint` holding `ui_amount`
    pub async fn set_token_balance(&self, owner: Pubkey, mint: Pubkey, ui_amount: f64) {
        let mut accounts = self.token_accounts.lock().await;
        let entry = accounts.entry(owner).or_default();
        entry.retain(|a| a.mint != mint);
        entry.push(TokenAccountSummary {
            address: Pubkey::new_unique(),
            mint,
            ui_amount,
        });
    }

    pub async fn fail_send_for(&self, payer: Pubkey) {
        self.fail_send.lock().await.insert(payer);
    }

    pub async fn fail_confirm_for(&self, payer: Pubkey) {
        self.fail_confirm.lock().await.insert(payer);
    }

    pub async fn set_lookup_error(&self, error: Option<LedgerError>) {
        *self.lookup_error.lock().await = error;
    }

    pub async fn set_confirm_delay(&self, delay: Duration) {
        *self.confirm_delay.lock().await = delay;
    }

    pub async fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().await.clone()
    }

    pub async fn confirmed(&self) -> Vec<Confirmation> {
        self.confirmed.lock().await.clone()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), LedgerError> {
        Ok((self.blockhash, 1_000))
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        if let Some(e) = self.lookup_error.lock().await.clone() {
            return Err(e);
        }
        Ok(self.accounts.lock().await.get(address).cloned())
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        _token_program: &Pubkey,
    ) -> Result<Vec<TokenAccountSummary>, LedgerError> {
        if let Some(e) = self.lookup_error.lock().await.clone() {
            return Err(e);
        }
        Ok(self
            .token_accounts
            .lock()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError> {
        let payer = payer_of(tx);
        if self.fail_send.lock().await.contains(&payer) {
            return Err(LedgerError::Rejected(format!("send refused for {}", payer)));
        }
        if !tx.verify_with_results().iter().all(|ok| *ok) {
            return Err(LedgerError::Rejected("signature verification failed".to_string()));
        }

        let signature = tx.signatures[0];
        self.payers.lock().await.insert(signature, payer);
        self.sent.lock().await.push(SentTransaction {
            signature,
            payer,
            at: Instant::now(),
        });
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), LedgerError> {
        let delay = *self.confirm_delay.lock().await;
        tokio::time::sleep(delay).await;

        let payer = self.payers.lock().await.get(signature).copied();
        let Some(payer) = payer else {
            return Err(LedgerError::TransactionFailed {
                signature: signature.to_string(),
                reason: "unknown signature".to_string(),
            });
        };
        if self.fail_confirm.lock().await.contains(&payer) {
            return Err(LedgerError::TransactionFailed {
                signature: signature.to_string(),
                reason: "custom program error: 0x1".to_string(),
            });
        }
        self.confirmed.lock().await.push(Confirmation {
            signature: *signature,
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Pool service producing single-instruction transactions against a fake program
#[derive(Clone)]
pub struct MockPoolService {
    pub program_id: Pubkey,
    pub blockhash: Hash,
    pub quote_decimals: u8,
    pub base_decimals: u8,
    pub fees: FeeRates,
    pub create_error: Arc<Mutex<Option<TransactionBuilderError>>>,
    pub liquidity_error: Arc<Mutex<Option<TransactionBuilderError>>>,
    pub created: Arc<Mutex<Vec<CreatePoolParams>>>,
    pub deposits: Arc<Mutex<Vec<(AddLiquidityParams, usize)>>>,
}

impl MockPoolService {
    pub fn new(base_decimals: u8) -> Self {
        Self {
            program_id: Pubkey::new_unique(),
            blockhash: Hash::new_unique(),
            quote_decimals: 9,
            base_decimals,
            fees: FeeRates::default(),
            create_error: Arc::new(Mutex::new(None)),
            liquidity_error: Arc::new(Mutex::new(None)),
            created: Arc::new(Mutex::new(Vec::new())),
            deposits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn fail_create(&self, error: TransactionBuilderError) {
        *self.create_error.lock().await = Some(error);
    }

    pub async fn fail_liquidity(&self, error: TransactionBuilderError) {
        *self.liquidity_error.lock().await = Some(error);
    }
}

#[async_trait]
impl PoolService for MockPoolService {
    async fn create_pool(
        &self,
        params: &CreatePoolParams,
        owner: &Pubkey,
    ) -> Result<CreatedPool, TransactionBuilderError> {
        if let Some(e) = self.create_error.lock().await.clone() {
            return Err(e);
        }
        self.created.lock().await.push(params.clone());

        let keys = PoolKeys {
            pool_id: Pubkey::new_unique(),
            program_id: self.program_id,
            amm_config: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            base_mint: params.base_mint,
            quote_mint: params.quote_mint,
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            lp_mint: Pubkey::new_unique(),
        };
        let mut data = b"create".to_vec();
        data.extend_from_slice(&params.base_amount.to_le_bytes());
        data.extend_from_slice(&params.quote_amount.to_le_bytes());
        let ix = Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(*owner, true),
                AccountMeta::new(keys.pool_id, false),
                AccountMeta::new_readonly(params.base_mint, false),
                AccountMeta::new_readonly(params.quote_mint, false),
            ],
        );

        Ok(CreatedPool {
            transaction: unsigned(&[ix], owner, &self.blockhash),
            pool: PoolContext {
                keys,
                reserves: ReserveSnapshot {
                    base: params.base_amount,
                    quote: params.quote_amount,
                },
                fees: self.fees,
                base_decimals: self.base_decimals,
                quote_decimals: self.quote_decimals,
            },
        })
    }

    async fn add_liquidity(
        &self,
        pool: &PoolContext,
        params: &AddLiquidityParams,
        owner: &Pubkey,
        extra_instructions: &[Instruction],
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        if let Some(e) = self.liquidity_error.lock().await.clone() {
            return Err(e);
        }
        self.deposits
            .lock()
            .await
            .push((params.clone(), extra_instructions.len()));

        let mut data = b"deposit".to_vec();
        data.extend_from_slice(&params.base_amount.to_le_bytes());
        data.extend_from_slice(&params.quote_amount.to_le_bytes());
        let mut instructions = vec![Instruction::new_with_bytes(
            self.program_id,
            &data,
            vec![
                AccountMeta::new(*owner, true),
                AccountMeta::new(pool.keys.pool_id, false),
                AccountMeta::new(pool.keys.base_vault, false),
                AccountMeta::new(pool.keys.quote_vault, false),
            ],
        )];
        instructions.extend_from_slice(extra_instructions);
        Ok(unsigned(&instructions, owner, &self.blockhash))
    }
}

/// Swap request as seen by [`MockSwapService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub owner: Pubkey,
    pub amount_in: u64,
    pub quoted: u64,
    pub min_amount_out: u64,
}

#[derive(Clone)]
pub struct MockSwapService {
    pub blockhash: Hash,
    pub fail_for: Arc<Mutex<HashSet<Pubkey>>>,
    pub calls: Arc<Mutex<Vec<SwapCall>>>,
    pub build_delay: Arc<Mutex<Duration>>,
}

impl MockSwapService {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            fail_for: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            build_delay: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub async fn fail_for_owner(&self, owner: Pubkey) {
        self.fail_for.lock().await.insert(owner);
    }

    pub async fn calls(&self) -> Vec<SwapCall> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockSwapService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapService for MockSwapService {
    async fn build_swap(
        &self,
        request: SwapRequest<'_>,
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        let delay = *self.build_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_for.lock().await.contains(&request.owner) {
            return Err(TransactionBuilderError::service("swap", "mock swap failure"));
        }
        self.calls.lock().await.push(SwapCall {
            owner: request.owner,
            amount_in: request.amount_in,
            quoted: request.quote.amount_out,
            min_amount_out: request.min_amount_out,
        });

        let mut data = b"swap".to_vec();
        data.extend_from_slice(&request.amount_in.to_le_bytes());
        data.extend_from_slice(&request.min_amount_out.to_le_bytes());
        let ix = Instruction::new_with_bytes(
            request.pool.keys.program_id,
            &data,
            vec![
                AccountMeta::new(request.owner, true),
                AccountMeta::new(request.pool.keys.pool_id, false),
                AccountMeta::new(request.pool.keys.base_vault, false),
                AccountMeta::new(request.pool.keys.quote_vault, false),
            ],
        );
        Ok(unsigned(&[ix], &request.owner, &self.blockhash))
    }
}

/// Bundle handed to [`MockRelay::submit_bundle`]
#[derive(Debug, Clone)]
pub struct SubmittedBundle {
    pub encoded_txs: Vec<String>,
    pub tip_account: Pubkey,
    pub tip_lamports: u64,
}

/// Relay with scripted submission result and status sequence
///
/// Statuses are served in order; the last one repeats.
#[derive(Clone)]
pub struct MockRelay {
    pub capabilities: Arc<parking_lot::Mutex<RelayCapabilities>>,
    pub tip_accounts: Vec<Pubkey>,
    pub submit_error: Arc<Mutex<Option<RelayError>>>,
    pub statuses: Arc<Mutex<VecDeque<Result<RelayBundleStatus, RelayError>>>>,
    pub submitted: Arc<Mutex<Vec<SubmittedBundle>>>,
    pub polls: Arc<Mutex<usize>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            capabilities: Arc::new(parking_lot::Mutex::new(RelayCapabilities {
                preserves_order: true,
                max_bundle_len: None,
            })),
            tip_accounts: vec![Pubkey::new_unique()],
            submit_error: Arc::new(Mutex::new(None)),
            statuses: Arc::new(Mutex::new(VecDeque::from(vec![Ok(RelayBundleStatus::new(
                "Landed",
            ))]))),
            submitted: Arc::new(Mutex::new(Vec::new())),
            polls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_capabilities(&self, capabilities: RelayCapabilities) {
        *self.capabilities.lock() = capabilities;
    }

    pub async fn fail_submit(&self, error: RelayError) {
        *self.submit_error.lock().await = Some(error);
    }

    pub async fn script_statuses(&self, statuses: Vec<Result<RelayBundleStatus, RelayError>>) {
        *self.statuses.lock().await = statuses.into();
    }

    pub async fn submitted(&self) -> Vec<SubmittedBundle> {
        self.submitted.lock().await.clone()
    }

    pub async fn polls(&self) -> usize {
        *self.polls.lock().await
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayService for MockRelay {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> RelayCapabilities {
        *self.capabilities.lock()
    }

    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError> {
        Ok(self.tip_accounts.clone())
    }

    async fn submit_bundle(
        &self,
        encoded_txs: &[String],
        tip_account: &Pubkey,
        tip_lamports: u64,
    ) -> Result<String, RelayError> {
        if let Some(e) = self.submit_error.lock().await.clone() {
            return Err(e);
        }
        let mut submitted = self.submitted.lock().await;
        submitted.push(SubmittedBundle {
            encoded_txs: encoded_txs.to_vec(),
            tip_account: *tip_account,
            tip_lamports,
        });
        Ok(format!("mock-bundle-{}", submitted.len()))
    }

    async fn bundle_status(&self, _bundle_id: &str) -> Result<RelayBundleStatus, RelayError> {
        *self.polls.lock().await += 1;
        let mut statuses = self.statuses.lock().await;
        if statuses.len() > 1 {
            statuses
                .pop_front()
                .unwrap_or_else(|| Ok(RelayBundleStatus::new("Pending")))
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(RelayBundleStatus::new("Pending")))
        }
    }

    async fn send_transaction(&self, _encoded_tx: &str) -> Result<String, RelayError> {
        Ok(Signature::new_unique().to_string())
    }
}

/// Connected wallet backed by a local keypair, with a call journal
#[derive(Clone)]
pub struct MockWallet {
    pub signer: Arc<KeypairSigner>,
    pub fail: Arc<Mutex<bool>>,
    pub signed: Arc<Mutex<Vec<Pubkey>>>,
    pub sign_delay: Arc<Mutex<Duration>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self {
            signer: Arc::new(KeypairSigner::from_keypair(Keypair::new())),
            fail: Arc::new(Mutex::new(false)),
            signed: Arc::new(Mutex::new(Vec::new())),
            sign_delay: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    /// Fee payers of every transaction signed so far
    pub async fn signed(&self) -> Vec<Pubkey> {
        self.signed.lock().await.clone()
    }
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockWallet {
    fn pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, TransactionBuilderError> {
        let delay = *self.sign_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail.lock().await {
            return Err(TransactionBuilderError::Signing("user rejected the request".to_string()));
        }
        self.signed.lock().await.push(payer_of(&tx));
        self.signer.sign_transaction(tx).await
    }
}

/// A complete set of mock collaborators around one launched mint
#[derive(Clone)]
pub struct MockEnvironment {
    pub ledger: MockLedger,
    pub pools: MockPoolService,
    pub swaps: MockSwapService,
    pub relay: MockRelay,
    pub wallet: MockWallet,
    pub mint: Pubkey,
    pub token_program: Pubkey,
}

impl MockEnvironment {
    /// Mint with 6 decimals; the wallet holds `balance` tokens in an existing account
    pub async fn new(balance: f64) -> Self {
        let token_program = Pubkey::from_str(TOKEN_2022_PROGRAM_ID).unwrap();
        let env = Self {
            ledger: MockLedger::new(),
            pools: MockPoolService::new(6),
            swaps: MockSwapService::new(),
            relay: MockRelay::new(),
            wallet: MockWallet::new(),
            mint: Pubkey::new_unique(),
            token_program,
        };
        env.ledger.add_mint(env.mint, token_program, 6).await;
        env.ledger
            .set_token_balance(env.wallet.pubkey(), env.mint, balance)
            .await;
        env
    }

    pub fn services(&self) -> LaunchServices {
        LaunchServices {
            ledger: Arc::new(self.ledger.clone()),
            pools: Arc::new(self.pools.clone()),
            swaps: Arc::new(self.swaps.clone()),
            relay: Arc::new(self.relay.clone()),
            wallet: Arc::new(self.wallet.clone()),
        }
    }

    pub fn settings(&self) -> LaunchSettings {
        LaunchSettings {
            block_time: Duration::from_millis(400),
            monitor: MonitorSettings {
                poll_interval: Duration::from_secs(2),
                max_attempts: 30,
            },
            quote_mint: spl_token::native_mint::id(),
            token_program: self.token_program,
            fallback_tip_accounts: vec![Pubkey::from_str(DEFAULT_TIP_ACCOUNT).unwrap()],
            defaults: LaunchConfig::default(),
        }
    }
}
