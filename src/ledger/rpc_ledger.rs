//! `LedgerClient` over the nonblocking Solana RPC client

use async_trait::async_trait;
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, instrument, warn};

use super::{LedgerClient, LedgerError, TokenAccountSummary};
use crate::config::LedgerConfig;

pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
    read_retries: usize,
}

impl RpcLedger {
    pub fn new(config: &LedgerConfig) -> anyhow::Result<Self> {
        let commitment = config.commitment_config()?;
        let rpc = RpcClient::new_with_commitment(config.rpc_url.clone(), commitment);
        Ok(Self {
            rpc: Arc::new(rpc),
            commitment,
            confirm_timeout: config.confirm_timeout(),
            poll_interval: config.confirm_poll_interval(),
            read_retries: config.read_retries,
        })
    }

    fn read_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(50)
            .map(jitter)
            .take(self.read_retries)
    }
}

fn summary_from_parsed(address: &str, data: &UiAccountData) -> Option<TokenAccountSummary> {
    let UiAccountData::Json(parsed) = data else {
        return None;
    };
    let info = parsed.parsed.get("info")?;
    let mint = info.get("mint")?.as_str()?.parse::<Pubkey>().ok()?;
    let amount = info.get("tokenAmount")?;
    let ui_amount = amount
        .get("uiAmount")
        .and_then(|v| v.as_f64())
        .or_else(|| {
            amount
                .get("uiAmountString")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Some(TokenAccountSummary {
        address: Pubkey::from_str(address).ok()?,
        mint,
        ui_amount,
    })
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), LedgerError> {
        Retry::spawn(self.read_strategy(), || async {
            self.rpc
                .get_latest_blockhash_with_commitment(self.commitment)
                .await
                .map_err(LedgerError::from)
        })
        .await
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        Retry::spawn(self.read_strategy(), || async {
            self.rpc
                .get_account_with_commitment(address, self.commitment)
                .await
                .map(|response| response.value)
                .map_err(LedgerError::from)
        })
        .await
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<TokenAccountSummary>, LedgerError> {
        let accounts = Retry::spawn(self.read_strategy(), || async {
            self.rpc
                .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(*token_program))
                .await
                .map_err(LedgerError::from)
        })
        .await?;

        let summaries: Vec<TokenAccountSummary> = accounts
            .iter()
            .filter_map(|keyed| summary_from_parsed(&keyed.pubkey, &keyed.account.data))
            .collect();
        if summaries.len() != accounts.len() {
            debug!(
                owner = %owner,
                skipped = accounts.len() - summaries.len(),
                "Skipped token accounts without parsed data"
            );
        }
        Ok(summaries)
    }

    // Sends are not retried.
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError> {
        self.rpc
            .send_transaction(tx)
            .await
            .map_err(|e| LedgerError::Rejected(e.to_string()))
    }

    #[instrument(skip(self), fields(signature = %signature))]
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), LedgerError> {
        let deadline = Instant::now() + self.confirm_timeout;

        loop {
            match self.rpc.get_signature_statuses(&[*signature]).await {
                Ok(response) => {
                    if let Some(Some(status)) = response.value.first() {
                        if let Some(err) = &status.err {
                            return Err(LedgerError::TransactionFailed {
                                signature: signature.to_string(),
                                reason: err.to_string(),
                            });
                        }
                        if status.satisfies_commitment(self.commitment) {
                            return Ok(());
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Signature status poll failed"),
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(LedgerError::ConfirmTimeout {
                    signature: signature.to_string(),
                    secs: self.confirm_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_account_decoder::parse_account_data::ParsedAccount;

    fn parsed(mint: &Pubkey, ui_amount: serde_json::Value) -> UiAccountData {
        UiAccountData::Json(ParsedAccount {
            program: "spl-token-2022".to_string(),
            parsed: serde_json::json!({
                "type": "account",
                "info": {
                    "mint": mint.to_string(),
                    "owner": Pubkey::new_unique().to_string(),
                    "tokenAmount": {
                        "amount": "1500000000",
                        "decimals": 6,
                        "uiAmount": ui_amount,
                        "uiAmountString": "1500",
                    }
                }
            }),
            space: 165,
        })
    }

    #[test]
    fn test_summary_reads_ui_amount() {
        let mint = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        let summary =
            summary_from_parsed(&address.to_string(), &parsed(&mint, serde_json::json!(1500.0)))
                .unwrap();
        assert_eq!(summary.mint, mint);
        assert_eq!(summary.address, address);
        assert_eq!(summary.ui_amount, 1500.0);
    }

    #[test]
    fn test_summary_falls_back_to_amount_string() {
        let mint = Pubkey::new_unique();
        let summary = summary_from_parsed(
            &Pubkey::new_unique().to_string(),
            &parsed(&mint, serde_json::Value::Null),
        )
        .unwrap();
        assert_eq!(summary.ui_amount, 1500.0);
    }

    #[test]
    fn test_summary_skips_binary_data() {
        let data = UiAccountData::LegacyBinary(String::new());
        assert!(summary_from_parsed(&Pubkey::new_unique().to_string(), &data).is_none());
    }
}
