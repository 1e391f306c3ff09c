//! Pool-creation builder and the token-account pre-step

use serde::Serialize;
use solana_sdk::{
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::context::PoolContext;
use super::errors::TransactionBuilderError;
use super::instructions::create_token_account_instruction;
use super::output::BuiltTransaction;
use super::services::{CreatePoolParams, PoolService};
use crate::ledger::LedgerClient;
use crate::monitor::TxKind;
use crate::wallet::WalletSigner;

/// Outcome of the associated-token-account pre-step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PrestepOutcome {
    /// The wallet already holds a token account for the mint
    NotNeeded,
    /// A creation transaction was sent and confirmed
    Created(String),
    /// The pre-step failed; the launch went on without it
    Failed(String),
}

impl PrestepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// What to create: the launched mint against the quote asset
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSeed {
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    /// Base tokens, UI units
    pub base_ui_amount: f64,
    /// Quote asset, lamports
    pub quote_amount: u64,
    pub base_token_program: Pubkey,
}

#[derive(Debug)]
pub struct PoolBuildOutput {
    pub built: BuiltTransaction,
    /// Shared read-only with the liquidity and snipe builders
    pub pool: Arc<PoolContext>,
    /// Parameters sent to the pool service, in raw units
    pub params: CreatePoolParams,
}

/// Decimals of an SPL mint (Token or Token-2022; both share the base layout)
pub fn mint_decimals(data: &[u8]) -> Option<u8> {
    let base = data.get(..Mint::LEN)?;
    Mint::unpack_unchecked(base)
        .ok()
        .filter(|mint| mint.is_initialized)
        .map(|mint| mint.decimals)
}

pub struct PoolCreationBuilder<'a> {
    ledger: &'a dyn LedgerClient,
    pools: &'a dyn PoolService,
    wallet: &'a dyn WalletSigner,
}

impl<'a> PoolCreationBuilder<'a> {
    pub fn new(
        ledger: &'a dyn LedgerClient,
        pools: &'a dyn PoolService,
        wallet: &'a dyn WalletSigner,
    ) -> Self {
        Self {
            ledger,
            pools,
            wallet,
        }
    }

    /// Make sure the wallet holds a token account for `mint`
    ///
    /// Never fails the launch: errors are returned as
    /// [`PrestepOutcome::Failed`] and logged.
    #[instrument(skip(self), fields(mint = %mint))]
    pub async fn ensure_token_account(&self, mint: &Pubkey, token_program: &Pubkey) -> PrestepOutcome {
        let owner = self.wallet.pubkey();
        match self.ledger.has_token_account(&owner, mint, token_program).await {
            Ok(true) => {
                debug!("Token account present");
                return PrestepOutcome::NotNeeded;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Token account lookup failed");
                return PrestepOutcome::Failed(format!("lookup: {}", e));
            }
        }

        match self.create_token_account(&owner, mint, token_program).await {
            Ok(signature) => {
                info!(signature = %signature, "Token account created");
                PrestepOutcome::Created(signature.to_string())
            }
            Err(reason) => {
                warn!(reason = %reason, "Token account creation failed, continuing");
                PrestepOutcome::Failed(reason)
            }
        }
    }

    async fn create_token_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Signature, String> {
        let (blockhash, _) = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|e| format!("blockhash: {}", e))?;

        let ix = create_token_account_instruction(owner, mint, token_program);
        let message = Message::new_with_blockhash(&[ix], Some(owner), &blockhash);
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::Legacy(message),
        };

        let signed = self
            .wallet
            .sign_transaction(tx)
            .await
            .map_err(|e| format!("sign: {}", e))?;
        let signature = self
            .ledger
            .send_transaction(&signed)
            .await
            .map_err(|e| format!("send: {}", e))?;
        self.ledger
            .confirm_transaction(&signature)
            .await
            .map_err(|e| format!("confirm: {}", e))?;
        Ok(signature)
    }

    /// Build the unsigned pool-creation transaction
    ///
    /// The base amount is converted to raw units with the decimals read
    /// from the mint account.
    #[instrument(skip(self, seed), fields(base_mint = %seed.base_mint))]
    pub async fn build(&self, seed: &PoolSeed) -> Result<PoolBuildOutput, TransactionBuilderError> {
        let mint_account = self
            .ledger
            .get_account_info(&seed.base_mint)
            .await
            .map_err(|e| TransactionBuilderError::service("ledger", e))?
            .ok_or_else(|| {
                TransactionBuilderError::InvalidMint(format!("{} not found", seed.base_mint))
            })?;
        if mint_account.owner != seed.base_token_program {
            return Err(TransactionBuilderError::InvalidMint(format!(
                "{} is owned by {}, expected {}",
                seed.base_mint, mint_account.owner, seed.base_token_program
            )));
        }
        let decimals = mint_decimals(&mint_account.data).ok_or_else(|| {
            TransactionBuilderError::InvalidMint(format!("{} is not a mint account", seed.base_mint))
        })?;

        let params = CreatePoolParams {
            base_mint: seed.base_mint,
            quote_mint: seed.quote_mint,
            base_amount: (seed.base_ui_amount * 10f64.powi(decimals as i32)).floor() as u64,
            quote_amount: seed.quote_amount,
            base_token_program: seed.base_token_program,
        };
        if params.base_amount == 0 || params.quote_amount == 0 {
            return Err(TransactionBuilderError::instruction_failed(
                "pool",
                "seed amounts must be positive",
            ));
        }

        let owner = self.wallet.pubkey();
        let created = self.pools.create_pool(&params, &owner).await?;
        let built = BuiltTransaction::new(created.transaction, TxKind::Pool, None);
        if built.required_signers().first() != Some(&owner) {
            return Err(TransactionBuilderError::internal(
                "pool transaction is not fee-paid by the wallet",
            ));
        }

        debug!(pool_id = %created.pool.pool_id(), "Pool transaction built");
        Ok(PoolBuildOutput {
            built,
            pool: Arc::new(created.pool),
            params,
        })
    }
}
