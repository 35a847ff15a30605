//! `MpcPrimitive` (§6, §9): the narrow trait boundary onto the reused
//! black-box DKLS-19 (ECDSA) and FROST/Schnorr (EdDSA) implementations. The
//! engine never inspects a protocol message's contents — only its round
//! number and destination, so the session loop stays chain- and
//! scheme-agnostic.

use crate::vault::{KeyShare, PartyId};

/// Opaque handle to one party's in-progress protocol state for one digest.
/// Owned exclusively by the session that created it (§4.5.1); the primitive
/// implementation decides what, if anything, lives behind the handle.
pub struct Handle(pub u64);

/// Configuration needed to start one protocol instance signing one digest.
pub struct SessionConfig<'a> {
    pub key_share: &'a KeyShare,
    pub local_party: &'a PartyId,
    pub participants: &'a [PartyId],
    pub threshold: u32,
    /// The 32-byte pre-hash for ECDSA, or the raw message bytes for EdDSA
    /// (§4.3's "the engine treats EdDSA digests as opaque message bytes").
    pub message: &'a [u8],
}

/// An outbound protocol message produced by `round_out`, addressed to one
/// peer or broadcast to all (mirrors the relay's own `to: Option<Vec<..>>`
/// convention, §4.5.3).
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: Option<PartyId>,
    pub round: u32,
    pub body: Vec<u8>,
}

/// Outcome of feeding one inbound message to the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStep {
    /// More messages are needed before this round can be finalized.
    AwaitingMessages,
    /// This round is complete; `round_out` now has outbound messages for the
    /// next round (or the session is ready for `finalize`).
    RoundComplete,
}

/// A single-candidate raw scalar pair straight from the protocol, prior to
/// low-s/recovery normalization (§4.4 owns that step, not the primitive).
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: Option<u8>,
}

/// The narrow boundary onto a reused DKLS-19 or FROST/Schnorr library (§6,
/// §9's "opaque WASM primitives" redesign note — here bound directly as a
/// Rust trait rather than through a WASM shim).
pub trait MpcPrimitive: Send {
    fn new_session(&mut self, config: SessionConfig<'_>) -> Handle;
    fn round_in(&mut self, handle: &Handle, message: &[u8]) -> RoundStep;
    fn round_out(&mut self, handle: &Handle) -> Vec<OutboundMessage>;
    fn finalize(&mut self, handle: &Handle) -> Option<PrimitiveSignature>;
}
