//! `CoordinationClient` — best-effort fan-out over the HTTP peer mesh
//! (spec.md §4.4, §6).
//!
//! Grounded on `chronx-wallet::rpc_client::WalletRpcClient`'s thin-`reqwest`
//! shape, swapped from a single chain endpoint to a many-peer broadcast:
//! spec.md specifies a literal HTTP peer mesh rather than libp2p gossipsub,
//! so `chronx-p2p::network::P2pNetwork`'s swarm is not reused, only its
//! message-enum shape (`message.rs`).

use std::time::Duration;

use medi_core::{MediatorError, ProposedSettlement};

use crate::message::CoordinationMessage;

pub struct ConsensusVerdict {
    pub summary: String,
    pub approved: bool,
}

/// Best-effort HTTP fan-out to the peer mesh. Every call carries its own
/// timeout and failures on one peer never affect another (spec.md §5:
/// "Promise.allSettled-style fan-out with per-peer failure isolation").
pub struct CoordinationClient {
    http: reqwest::Client,
    broadcast_timeout: Duration,
}

impl CoordinationClient {
    pub fn new(broadcast_timeout_secs: u64) -> Result<Self, MediatorError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MediatorError::config(format!("building coordination HTTP client: {e}")))?;
        Ok(Self { http, broadcast_timeout: Duration::from_secs(broadcast_timeout_secs) })
    }

    /// Broadcast one message to every peer endpoint. Each send gets its
    /// own timeout; a failed peer is logged and otherwise ignored.
    pub async fn broadcast(&self, endpoints: &[String], message: &CoordinationMessage) {
        let sends = endpoints.iter().map(|endpoint| self.send_one(endpoint, message));
        futures::future::join_all(sends).await;
    }

    async fn send_one(&self, endpoint: &str, message: &CoordinationMessage) {
        let url = format!("{}/api/coordination/message", endpoint.trim_end_matches('/'));
        let result = self
            .http
            .post(&url)
            .json(message)
            .timeout(self.broadcast_timeout)
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!(endpoint = %endpoint, error = %e, "coordination broadcast failed");
        }
    }

    /// `GET /api/coordination/peers` against a single bootstrap endpoint.
    pub async fn discover_peers(&self, endpoint: &str) -> Result<Vec<medi_core::Peer>, MediatorError> {
        let url = format!("{}/api/coordination/peers", endpoint.trim_end_matches('/'));
        let resp = self
            .http
            .get(&url)
            .timeout(self.broadcast_timeout)
            .send()
            .await
            .map_err(|e| MediatorError::remote("peer-mesh", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MediatorError::remote("peer-mesh", format!("HTTP {}", resp.status())));
        }
        resp.json::<Vec<medi_core::Peer>>()
            .await
            .map_err(|e| MediatorError::remote("peer-mesh", format!("decoding peers: {e}")))
    }

    /// `POST /api/coordination/consensus` to request a semantic-consensus
    /// verification from one peer (spec.md §4.9, §6).
    pub async fn request_consensus(
        &self,
        endpoint: &str,
        settlement: &ProposedSettlement,
    ) -> Result<ConsensusVerdict, MediatorError> {
        #[derive(serde::Deserialize)]
        struct Response {
            summary: String,
            approved: bool,
        }

        let url = format!("{}/api/coordination/consensus", endpoint.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .json(settlement)
            .timeout(self.broadcast_timeout)
            .send()
            .await
            .map_err(|e| MediatorError::remote("peer-mesh", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MediatorError::remote("peer-mesh", format!("HTTP {}", resp.status())));
        }
        let parsed: Response = resp
            .json()
            .await
            .map_err(|e| MediatorError::remote("peer-mesh", format!("decoding consensus response: {e}")))?;
        Ok(ConsensusVerdict { summary: parsed.summary, approved: parsed.approved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_timeout() {
        assert!(CoordinationClient::new(5).is_ok());
    }
}
