//! Jito block engine client (JSON-RPC over HTTP)

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use std::num::NonZeroU32;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use super::{RelayBundleStatus, RelayCapabilities, RelayError, RelayService};
use crate::config::RelayConfig;

#[derive(Serialize, Debug)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: T,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize, Debug)]
struct ContextValue<T> {
    value: T,
}

#[derive(Deserialize, Debug)]
struct InflightStatus {
    status: String,
    landed_slot: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct HistoricalStatus {
    #[serde(default)]
    transactions: Vec<String>,
    slot: Option<u64>,
}

pub struct JitoRelay {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    limiter: DefaultDirectRateLimiter,
    fallback_tips: Vec<Pubkey>,
    max_bundle_len: usize,
}

impl JitoRelay {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.submit_timeout()).build()?;
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.block_engine_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            fallback_tips: config.tip_account_keys()?,
            max_bundle_len: config.max_bundle_len,
        })
    }

    async fn call<P, R>(&self, path: &str, method: &'static str, params: P) -> Result<R, RelayError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        self.limiter.until_ready().await;

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let mut builder = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.header("x-jito-auth", token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RelayError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: JsonRpcResponse<R> = response.json().await?;
        if let Some(err) = body.error {
            return Err(RelayError::Rejected {
                code: err.code,
                message: err.message,
            });
        }
        body.result
            .ok_or_else(|| RelayError::Decode(format!("{} returned no result", method)))
    }

    /// Signatures of a landed bundle, in bundle order
    async fn landed_signatures(&self, bundle_id: &str) -> Result<(Vec<String>, Option<u64>), RelayError> {
        let statuses: ContextValue<Vec<Option<HistoricalStatus>>> = self
            .call("bundles", "getBundleStatuses", json!([[bundle_id]]))
            .await?;
        Ok(statuses
            .value
            .into_iter()
            .flatten()
            .next()
            .map(|s| (s.transactions, s.slot))
            .unwrap_or_default())
    }

    /// Pick one tip account at random from those the relay advertises
    pub async fn random_tip_account(&self) -> Result<Pubkey, RelayError> {
        let accounts = self.tip_accounts().await?;
        accounts
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| RelayError::Decode("no tip accounts available".to_string()))
    }
}

#[async_trait]
impl RelayService for JitoRelay {
    fn name(&self) -> &str {
        "jito"
    }

    fn capabilities(&self) -> RelayCapabilities {
        RelayCapabilities {
            preserves_order: true,
            max_bundle_len: Some(self.max_bundle_len),
        }
    }

    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError> {
        match self
            .call::<_, Vec<String>>("bundles", "getTipAccounts", json!([]))
            .await
        {
            Ok(accounts) => {
                let parsed: Vec<Pubkey> = accounts
                    .iter()
                    .filter_map(|s| Pubkey::from_str(s).ok())
                    .collect();
                if parsed.is_empty() {
                    Ok(self.fallback_tips.clone())
                } else {
                    Ok(parsed)
                }
            }
            Err(e) if !self.fallback_tips.is_empty() => {
                warn!(error = %e, "Tip account discovery failed, using configured accounts");
                Ok(self.fallback_tips.clone())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, encoded_txs), fields(tx_count = encoded_txs.len()))]
    async fn submit_bundle(
        &self,
        encoded_txs: &[String],
        tip_account: &Pubkey,
        tip_lamports: u64,
    ) -> Result<String, RelayError> {
        // The tip travels inside the bundle as a transfer; the block engine
        // has no separate tip parameter.
        debug!(tip_account = %tip_account, tip_lamports, "Sending bundle");
        self.call("bundles", "sendBundle", json!([encoded_txs, {"encoding": "base64"}]))
            .await
    }

    async fn bundle_status(&self, bundle_id: &str) -> Result<RelayBundleStatus, RelayError> {
        let inflight: ContextValue<Vec<InflightStatus>> = self
            .call("bundles", "getInflightBundleStatuses", json!([[bundle_id]]))
            .await?;

        let Some(first) = inflight.value.into_iter().next() else {
            return Ok(RelayBundleStatus::new("Unknown"));
        };

        let mut status = RelayBundleStatus {
            status: first.status,
            landed_slot: first.landed_slot,
            signatures: Vec::new(),
        };
        if status.status == "Landed" {
            match self.landed_signatures(bundle_id).await {
                Ok((signatures, slot)) => {
                    status.signatures = signatures;
                    status.landed_slot = status.landed_slot.or(slot);
                }
                Err(e) => debug!(bundle_id, error = %e, "Could not fetch landed signatures"),
            }
        }
        Ok(status)
    }

    async fn send_transaction(&self, encoded_tx: &str) -> Result<String, RelayError> {
        self.call(
            "transactions",
            "sendTransaction",
            json!([encoded_tx, {"encoding": "base64"}]),
        )
        .await
    }
}
