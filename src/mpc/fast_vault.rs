//! Fast-vault assist (§4.5.5): a 2-of-2 vault where the second share lives
//! on `VultiServer`. The client's only extra step is asking that server to
//! join the same relay session as a peer; from there the engine drives the
//! ceremony exactly as it would against any other party.

use crate::error::{CoreError, StateError, TransportError};
use crate::mpc::crypto_io::EncryptionKey;
use serde::Serialize;
use uuid::Uuid;

const DEFAULT_FAST_VAULT_URL: &str = "https://api.vultisig.com/vault";

/// `POST {fast_vault_url}/vault/sign` body (§4.5.5). `messages` are the
/// base64-encoded digests for this keysign, `derive_path` selects the
/// chain's derivation leaf, and `is_ecdsa` picks the scheme.
#[derive(Debug, Clone, Serialize)]
struct FastVaultSignRequest<'a> {
    session_id: String,
    hex_encryption_key: String,
    messages: &'a [String],
    derive_path: &'a str,
    is_ecdsa: bool,
    vault_password: &'a str,
}

#[derive(Clone)]
pub struct FastVaultClient {
    base_url: String,
    client: reqwest::Client,
}

impl FastVaultClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn default_server() -> Self {
        Self::new(DEFAULT_FAST_VAULT_URL)
    }

    /// Asks the server to join `session_id` as a co-signer. The server
    /// enforces "at most one session per vault" itself (§4.5.5); a 409 here
    /// means another session against this vault is already in flight on the
    /// server side, which the client surfaces identically to its own local
    /// vault-lock rejection (§5) so callers don't need to distinguish them.
    pub async fn request_join(
        &self,
        session_id: Uuid,
        encryption_key: &EncryptionKey,
        messages: &[String],
        derive_path: &str,
        is_ecdsa: bool,
        vault_password: &str,
        vault_id: &str,
    ) -> Result<(), CoreError> {
        let body = FastVaultSignRequest {
            session_id: session_id.to_string(),
            hex_encryption_key: encryption_key.to_hex(),
            messages,
            derive_path,
            is_ecdsa,
            vault_password,
        };
        let url = format!("{}/sign", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Transport(TransportError::NetworkError(e.to_string())))?;

        if response.status().as_u16() == 409 {
            return Err(CoreError::State(StateError::VaultBusy(vault_id.to_string())));
        }
        if !response.status().is_success() {
            return Err(CoreError::Transport(TransportError::NetworkError(format!(
                "fast vault server returned {}",
                response.status()
            ))));
        }
        Ok(())
    }
}
