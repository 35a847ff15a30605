//! Flat error taxonomy for the core, grouped the way the design calls for:
//! validation, state, transport, protocol, crypto, cancellation.
//!
//! Every session-terminal error carries a [`SessionErrorContext`] so logs can
//! always report `session_id`, `vault_id`, `round`, and `peer` without ever
//! including key material.

use crate::vault::PartyId;
use thiserror::Error;

/// Validation errors: raised by the derivation and payload-builder layers,
/// never retried, surfaced verbatim to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid address for chain: {0}")]
    InvalidAddress(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("hardened derivation index not supported in threshold mode")]
    UnhardenedPathOnly,
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// State errors: raised by the builder or engine; the caller may refresh
/// inputs and retry from scratch, but the core itself never retries these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("insufficient funds: need {needed}, have {available}")]
    NotEnoughFunds { needed: String, available: String },
    #[error("missing chain field: {0}")]
    MissingChainField(String),
    #[error("swap quote expired")]
    QuoteExpired,
    #[error("vault {0} is busy with another session")]
    VaultBusy(String),
}

/// Transport errors: recovered locally with retry/backoff up to the round's
/// budget (see [`crate::mpc::relay`]); escalated to a terminal session error
/// only once that budget is exhausted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Protocol errors: fatal for the session that raised them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol primitive rejected a message in round {round} from peer {peer}: {reason}")]
    Rejected {
        round: u32,
        peer: PartyId,
        reason: String,
    },
    #[error("party {0} joined but is not in expected_participants")]
    UnexpectedParty(PartyId),
    #[error("threshold not met before timeout")]
    ThresholdNotMet,
}

/// Crypto errors: fatal, indicate a malicious or broken peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("assembled signature failed verification against the derived public key")]
    SignatureVerificationFailed,
}

/// The reason a session reached its `Aborted` terminal state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("cancelled by caller")]
    Cancelled,
}

/// Top-level error type returned by every public core operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("session cancelled")]
    Cancelled,
}

impl From<AbortReason> for CoreError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Transport(e) => CoreError::Transport(e),
            AbortReason::Protocol(e) => CoreError::Protocol(e),
            AbortReason::Crypto(e) => CoreError::Crypto(e),
            AbortReason::Cancelled => CoreError::Cancelled,
        }
    }
}

/// Attached to every session-terminal error for structured logging.
/// Never carries key shares, nonces, or other secret material.
#[derive(Debug, Clone)]
pub struct SessionErrorContext {
    pub session_id: uuid::Uuid,
    pub vault_id: String,
    pub round: Option<u32>,
    pub peer: Option<PartyId>,
}

impl SessionErrorContext {
    pub fn new(session_id: uuid::Uuid, vault_id: impl Into<String>) -> Self {
        Self {
            session_id,
            vault_id: vault_id.into(),
            round: None,
            peer: None,
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn with_peer(mut self, peer: PartyId) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Emit a `tracing::error!` event carrying only public session metadata.
    pub fn log(&self, reason: &AbortReason) {
        tracing::error!(
            session_id = %self.session_id,
            vault_id = %self.vault_id,
            round = ?self.round,
            peer = ?self.peer,
            %reason,
            "session aborted"
        );
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
