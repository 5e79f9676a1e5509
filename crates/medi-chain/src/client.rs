//! `ChainClient` — typed HTTP client for the chain service.
//!
//! Grounded on `chronx-wallet::rpc_client::WalletRpcClient`: thin `reqwest`
//! wrapper, one method per remote call, `anyhow`-free internally (callers
//! get a typed `MediatorError` instead) with retry-on-transient-failure
//! generalised into its own helper rather than inlined per call.

use std::sync::Arc;
use std::time::Duration;

use medi_core::{
    BurnRecord, Challenge, Deposit, Intent, IntentHash, MediatorError, ProposedSettlement,
    Resolution, SpamProof, VerificationRequest,
};
use medi_config::ChainConfig;
use medi_crypto::{canonical_json, MediatorKeyPair};

use crate::types::{
    BurnResponse, ChallengeResponse, IntentsResponse, OkResponse, SettlementsResponse,
    SignedEntry, SpamProofResponse, SubmitSettlementResponse, VerificationRequestsResponse,
};

pub struct ChainClient {
    http: reqwest::Client,
    config: ChainConfig,
    keypair: Arc<MediatorKeyPair>,
}

impl ChainClient {
    pub fn new(config: ChainConfig, keypair: Arc<MediatorKeyPair>) -> Result<Self, MediatorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MediatorError::config(format!("building chain HTTP client: {e}")))?;
        Ok(Self { http, config, keypair })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn sign_entry<'a, T: serde::Serialize>(&self, entry: &'a T) -> SignedEntry<'a, T> {
        let signature = self.keypair.sign_hex(&canonical_json(entry));
        SignedEntry { entry, signature }
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Run `op` with exponential-backoff retry on transient (`RemoteError`)
    /// failures (spec.md §7: base 500ms, capped attempts).
    async fn with_retry<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T, MediatorError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, MediatorError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.config.retry_max_attempts => {
                    let delay = self.config.retry_base_delay_ms * 2u64.pow(attempt - 1);
                    tracing::warn!(target = %target, attempt, delay_ms = delay, error = %e, "retrying transient chain call");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R, MediatorError> {
        self.with_retry(path, || async {
            let resp = self
                .with_auth(self.http.get(self.url(path)))
                .send()
                .await
                .map_err(|e| MediatorError::remote("chain", e.to_string()))?;
            if !resp.status().is_success() {
                return Err(MediatorError::remote("chain", format!("HTTP {}", resp.status())));
            }
            resp.json::<R>()
                .await
                .map_err(|e| MediatorError::remote("chain", format!("decoding response: {e}")))
        })
        .await
    }

    async fn post_signed<T: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        entry: &T,
    ) -> Result<R, MediatorError> {
        self.with_retry(path, || async {
            let body = self.sign_entry(entry);
            let resp = self
                .with_auth(self.http.post(self.url(path)))
                .json(&body)
                .send()
                .await
                .map_err(|e| MediatorError::remote("chain", e.to_string()))?;
            if !resp.status().is_success() {
                return Err(MediatorError::remote("chain", format!("HTTP {}", resp.status())));
            }
            resp.json::<R>()
                .await
                .map_err(|e| MediatorError::remote("chain", format!("decoding response: {e}")))
        })
        .await
    }

    pub async fn get_pending_intents(&self) -> Result<Vec<Intent>, MediatorError> {
        let resp: IntentsResponse = self.get_json("/api/v1/intents?status=pending").await?;
        Ok(resp.intents)
    }

    pub async fn get_intent(&self, hash: &IntentHash) -> Result<Intent, MediatorError> {
        self.get_json(&format!("/api/v1/intents/{}", hash.to_hex())).await
    }

    pub async fn get_recent_settlements(&self, limit: usize) -> Result<Vec<ProposedSettlement>, MediatorError> {
        let resp: SettlementsResponse = self
            .get_json(&format!("/api/v1/settlements/recent?limit={limit}"))
            .await?;
        Ok(resp.settlements)
    }

    pub async fn submit_settlement(&self, settlement: &ProposedSettlement) -> Result<SubmitSettlementResponse, MediatorError> {
        self.post_signed("/api/v1/settlements", settlement).await
    }

    pub async fn record_burn(&self, burn: &BurnRecord) -> Result<BurnResponse, MediatorError> {
        self.post_signed("/api/v1/burns", burn).await
    }

    pub async fn submit_deposit(&self, deposit: &Deposit) -> Result<OkResponse, MediatorError> {
        self.post_signed("/api/v1/deposits", deposit).await
    }

    pub async fn submit_refund(&self, deposit: &Deposit) -> Result<OkResponse, MediatorError> {
        self.post_signed("/api/v1/refunds", deposit).await
    }

    pub async fn submit_forfeiture(&self, deposit: &Deposit) -> Result<OkResponse, MediatorError> {
        self.post_signed("/api/v1/forfeitures", deposit).await
    }

    pub async fn submit_challenge(&self, challenge: &Challenge) -> Result<ChallengeResponse, MediatorError> {
        self.post_signed("/api/v1/challenges", challenge).await
    }

    /// Spam-proof bodies are already `{proof, prose, signature}` — no
    /// additional `{entry, signature}` wrapping, unlike every other POST.
    pub async fn submit_spam_proof(&self, proof: &SpamProof) -> Result<SpamProofResponse, MediatorError> {
        self.with_retry("/api/v1/spam-proofs", || async {
            let resp = self
                .with_auth(self.http.post(self.url("/api/v1/spam-proofs")))
                .json(proof)
                .send()
                .await
                .map_err(|e| MediatorError::remote("chain", e.to_string()))?;
            if !resp.status().is_success() {
                return Err(MediatorError::remote("chain", format!("HTTP {}", resp.status())));
            }
            resp.json::<SpamProofResponse>()
                .await
                .map_err(|e| MediatorError::remote("chain", format!("decoding response: {e}")))
        })
        .await
    }

    pub async fn get_pending_verification_requests(&self) -> Result<Vec<VerificationRequest>, MediatorError> {
        let resp: VerificationRequestsResponse = self.get_json("/api/v1/verification-requests/pending").await?;
        Ok(resp.requests)
    }

    pub async fn record_outcome(&self, resolution: &Resolution) -> Result<OkResponse, MediatorError> {
        self.post_signed("/api/v1/outcomes", resolution).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ChainConfig {
        ChainConfig {
            base_url: "http://127.0.0.1:9944".into(),
            chain_id: "test".into(),
            bearer_token: None,
            timeout_secs: 5,
            retry_max_attempts: 3,
            retry_base_delay_ms: 10,
        }
    }

    #[test]
    fn url_joins_base_and_path() {
        let client = ChainClient::new(test_config(), Arc::new(MediatorKeyPair::generate())).unwrap();
        assert_eq!(client.url("/api/v1/intents"), "http://127.0.0.1:9944/api/v1/intents");
    }
}
