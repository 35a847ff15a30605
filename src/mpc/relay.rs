//! `RelayHttpClient` (§4.5.3, §6): the one wire protocol this core defines.
//! Shared by the session engine and the fast-vault client so the retry/
//! backoff policy (§4.5.4) is written once, grounded in the teacher's own
//! `reqwest` dependency and x402-rs's `FacilitatorClient` shape (a cheap-to-
//! clone wrapper around a pooled `reqwest::Client` with per-call JSON
//! bodies).

use crate::error::TransportError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.vultisig.com/router";
const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// `POST /message/{session_id}` body (§4.5.3). `to` omitted means broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayMessage {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    pub body: String,
}

/// A message as returned by `GET /message/{session_id}/{party}`. `seq` is
/// the relay's own delivery sequence number, used for idempotent
/// de-duplication by `(from, seq)` under at-least-once delivery (§4.5.3);
/// the relay has no notion of MPC "rounds" — round and per-digest routing
/// are carried inside the encrypted envelope (see
/// [`crate::mpc::session::Envelope`]), not the wire schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub seq: u64,
    pub body: String,
}

#[derive(Clone)]
pub struct RelayHttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayHttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn default_relay() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }

    pub async fn start_session(
        &self,
        session_id: &str,
        expected_participants: &[String],
    ) -> Result<(), TransportError> {
        let url = format!("{}/start/{session_id}", self.base_url);
        self.post_with_retry(&url, expected_participants).await?;
        Ok(())
    }

    pub async fn join_session(&self, session_id: &str, party_id: &str) -> Result<(), TransportError> {
        let url = format!("{}/{session_id}", self.base_url);
        self.post_with_retry(&url, &[party_id.to_string()]).await?;
        Ok(())
    }

    pub async fn joined_participants(&self, session_id: &str) -> Result<Vec<String>, TransportError> {
        let url = format!("{}/start/{session_id}", self.base_url);
        self.get_with_retry(&url).await
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        from: &str,
        to: Option<Vec<String>>,
        plaintext: &[u8],
        encryption_key: &crate::mpc::crypto_io::EncryptionKey,
    ) -> Result<(), TransportError> {
        let ciphertext = crate::mpc::crypto_io::encrypt(encryption_key, plaintext);
        let message = RelayMessage {
            from: from.to_string(),
            to,
            body: base64::engine::general_purpose::STANDARD.encode(ciphertext),
        };
        let url = format!("{}/message/{session_id}", self.base_url);
        self.post_with_retry(&url, &message).await?;
        Ok(())
    }

    pub async fn poll_messages(
        &self,
        session_id: &str,
        party_id: &str,
    ) -> Result<Vec<InboundMessage>, TransportError> {
        let url = format!("{}/message/{session_id}/{party_id}", self.base_url);
        self.get_with_retry(&url).await
    }

    pub async fn complete_session(&self, session_id: &str) {
        let url = format!("{}/complete/{session_id}", self.base_url);
        // Best-effort per §4.5.4's cancellation note: errors are ignored.
        let _ = self.client.post(url).send().await;
    }

    pub async fn submit_keysign_result(
        &self,
        session_id: &str,
        signed_payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let url = format!("{}/complete/{session_id}/keysign", self.base_url);
        self.post_with_retry(&url, signed_payload).await?;
        Ok(())
    }

    async fn post_with_retry<B: Serialize>(&self, url: &str, body: &B) -> Result<(), TransportError> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 0..=MAX_RETRIES {
            let response = self.client.post(url).json(body).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) if resp.status().as_u16() == 409 => {
                    return Err(TransportError::NetworkError(format!("{url}: conflict (409)")));
                }
                // §6: "non-2xx responses other than 404 are retriable; 409 is
                // fatal." 404 is fatal too, immediately, not retried.
                Ok(resp) if resp.status().as_u16() == 404 => {
                    return Err(TransportError::NetworkError(format!("{url}: not found (404)")));
                }
                Ok(resp) if attempt == MAX_RETRIES => {
                    return Err(TransportError::NetworkError(format!(
                        "{url}: status {} after {MAX_RETRIES} retries",
                        resp.status()
                    )));
                }
                Err(e) if attempt == MAX_RETRIES => {
                    return Err(TransportError::NetworkError(format!("{url}: {e} after {MAX_RETRIES} retries")));
                }
                _ => {
                    tracing::warn!(url, attempt, "relay post failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        unreachable!("loop always returns by the final retry")
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 0..=MAX_RETRIES {
            let response = self.client.get(url).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| TransportError::NetworkError(format!("{url}: bad json: {e}")));
                }
                // §6: 404 is fatal immediately, never retried.
                Ok(resp) if resp.status().as_u16() == 404 => {
                    return Err(TransportError::NetworkError(format!("{url}: not found (404)")));
                }
                Ok(resp) if attempt == MAX_RETRIES => {
                    return Err(TransportError::NetworkError(format!(
                        "{url}: status {} after {MAX_RETRIES} retries",
                        resp.status()
                    )));
                }
                Err(e) if attempt == MAX_RETRIES => {
                    return Err(TransportError::NetworkError(format!("{url}: {e} after {MAX_RETRIES} retries")));
                }
                _ => {
                    tracing::warn!(url, attempt, "relay get failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
        unreachable!("loop always returns by the final retry")
    }
}
