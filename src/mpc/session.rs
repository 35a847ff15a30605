//! MPC Session Engine (§4.5) — the most intricate part of the core. Drives
//! the DKLS (ECDSA) or Schnorr (EdDSA) protocol, one [`MpcPrimitive`] handle
//! per digest, through the lifecycle state machine of §4.5.2, coordinating
//! rounds with remote parties over the relay (§4.5.3) under the polling,
//! ordering, and cancellation rules of §4.5.4.

use crate::error::{AbortReason, ProtocolError, TransportError};
use crate::mpc::crypto_io::{self, EncryptionKey};
use crate::mpc::primitive::{MpcPrimitive, OutboundMessage, RoundStep, SessionConfig};
use crate::mpc::relay::RelayHttpClient;
use crate::mpc::vault_lock::VaultLockTable;
use crate::presign::Digests;
use crate::sign::RawSignature;
use crate::vault::{KeyShare, PartyId, Scheme, Vault};
use base64::Engine;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const THRESHOLD_JOIN_POLL: Duration = Duration::from_secs(1);
const THRESHOLD_JOIN_TIMEOUT: Duration = Duration::from_secs(120);
const MESSAGE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const ROUND_TIMEOUT: Duration = Duration::from_secs(60);
const SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// `SigningSession.role` (§3): who announced the session to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Joiner,
}

/// `SigningSession.state` (§4.5.2). `Round(i)` carries the 1-based round
/// number currently in flight.
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    Announced,
    Joining,
    Ready,
    Round(u32),
    Committing,
    Completed,
    Aborted(AbortReason),
}

/// A message's position inside the encrypted relay envelope: which digest's
/// protocol instance it belongs to and which round it was emitted in. The
/// relay's own wire schema (§4.5.3) carries neither field — it is opaque
/// ciphertext to the relay, exactly as §4.5.3 requires ("the relay ... cannot
/// read payloads").
#[derive(Debug, Clone)]
pub struct Envelope {
    pub digest_index: u8,
    pub round: u32,
    pub body: Vec<u8>,
}

impl Envelope {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.body.len());
        out.push(self.digest_index);
        out.extend_from_slice(&self.round.to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 5 {
            return None;
        }
        let digest_index = bytes[0];
        let round = u32::from_le_bytes(bytes[1..5].try_into().ok()?);
        Some(Envelope {
            digest_index,
            round,
            body: bytes[5..].to_vec(),
        })
    }
}

/// Transient per-session state (§3 `SigningSession`), held for the duration
/// of one `run_keysign` call.
pub struct SigningSession {
    pub session_id: Uuid,
    pub hex_encryption_key: EncryptionKey,
    pub expected_participants: BTreeSet<PartyId>,
    pub joined_participants: BTreeSet<PartyId>,
    pub scheme: Scheme,
    pub role: Role,
    pub state: SessionState,
}

/// Cooperative cancellation handle (§4.5.4, §5): polled at the "cancellation
/// check point between rounds." Cloning shares the same flag, so the caller
/// keeps one half and the running session task the other.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one keysign ceremony end-to-end: join/threshold wait, round loop
/// per digest, and delivery of one normalized [`RawSignature`] per digest in
/// input order. Owns the relay client and the process-wide vault lock table
/// (§5); everything else (the vault's private share material) is borrowed
/// for the call's duration only, per §5's shared-resource policy.
pub struct SessionEngine {
    relay: RelayHttpClient,
    vault_locks: VaultLockTable,
}

impl SessionEngine {
    pub fn new(relay: RelayHttpClient, vault_locks: VaultLockTable) -> Self {
        Self { relay, vault_locks }
    }

    /// `initiate(session_id, expected_participants)` through to `Completed`
    /// (§4.5.2). `primitive` is one [`MpcPrimitive`] instance per digest,
    /// already matched to `digests`' length and order; `key_share` is this
    /// party's share for `scheme`. Fails `VaultBusy` immediately, without any
    /// network call, if another session already holds `vault`'s lock (§5) —
    /// that is a pre-session-start rejection, not an `Aborted` terminal
    /// state, so it surfaces through [`crate::error::CoreError`] directly
    /// rather than [`AbortReason`].
    #[allow(clippy::too_many_arguments)]
    pub async fn run_keysign(
        &self,
        vault: &Vault,
        role: Role,
        session_id: Uuid,
        encryption_key: EncryptionKey,
        expected_participants: Vec<PartyId>,
        digests: &Digests,
        key_share: &KeyShare,
        scheme: Scheme,
        primitives: &mut [Box<dyn MpcPrimitive>],
        cancel: CancelToken,
    ) -> crate::error::Result<Vec<RawSignature>> {
        let vault_id = vault.vault_id();
        let _guard = self.vault_locks.acquire(&vault_id)?;

        let mut session = SigningSession {
            session_id,
            hex_encryption_key: encryption_key,
            expected_participants: expected_participants.iter().cloned().collect(),
            joined_participants: BTreeSet::new(),
            scheme,
            role,
            state: SessionState::Idle,
        };

        let session_id_str = session_id.to_string();
        let local = &vault.local_party_id;

        if session.role == Role::Initiator {
            self.relay
                .start_session(&session_id_str, &expected_participants.iter().map(|p| p.0.clone()).collect::<Vec<_>>())
                .await
                .map_err(AbortReason::Transport)?;
        }
        session.state = SessionState::Announced;

        self.relay
            .join_session(&session_id_str, &local.0)
            .await
            .map_err(AbortReason::Transport)?;
        session.state = SessionState::Joining;

        self.wait_for_threshold(&mut session, vault.threshold as usize, local)
            .await?;
        session.state = SessionState::Ready;

        let n_digests = match digests {
            Digests::Fixed32(hashes) => hashes.len(),
            Digests::Opaque(_) => 1,
        };
        assert_eq!(
            primitives.len(),
            n_digests,
            "one MpcPrimitive handle must be supplied per digest"
        );

        let participants: Vec<PartyId> = session.expected_participants.iter().cloned().collect();
        let mut handles = Vec::with_capacity(n_digests);
        for (i, primitive) in primitives.iter_mut().enumerate() {
            let message = digest_message_bytes(digests, i);
            let handle = primitive.new_session(SessionConfig {
                key_share,
                local_party: local,
                participants: &participants,
                threshold: vault.threshold,
                message,
            });
            handles.push(handle);
        }

        let mut current_round: u32 = 1;
        let mut completed: HashSet<usize> = HashSet::new();
        let mut signatures: Vec<Option<RawSignature>> = vec![None; n_digests];
        let mut pending: HashMap<(usize, u32), Vec<Vec<u8>>> = HashMap::new();
        let mut seen_seqs: HashSet<(String, u64)> = HashSet::new();

        // Round 1 outbound: every handle's primitive already queued its
        // first round's messages inside `new_session`.
        self.flush_outbound(&session, &session_id_str, local, primitives, &handles, 1)
            .await?;

        session.state = SessionState::Round(current_round);
        let session_deadline = tokio::time::Instant::now() + SESSION_TIMEOUT;

        while completed.len() < n_digests {
            if tokio::time::Instant::now() >= session_deadline {
                return Err(AbortReason::Transport(TransportError::Timeout(
                    "session deadline exceeded".into(),
                ))
                .into());
            }

            let round_deadline = tokio::time::Instant::now() + ROUND_TIMEOUT;
            let mut round_ready: HashSet<usize> = completed.clone();

            while round_ready.len() < n_digests {
                if tokio::time::Instant::now() >= round_deadline {
                    return Err(AbortReason::Transport(TransportError::Timeout(format!(
                        "round {current_round} deadline exceeded"
                    )))
                    .into());
                }
                if tokio::time::Instant::now() >= session_deadline {
                    return Err(AbortReason::Transport(TransportError::Timeout(
                        "session deadline exceeded".into(),
                    ))
                    .into());
                }

                let inbound = self
                    .relay
                    .poll_messages(&session_id_str, &local.0)
                    .await
                    .map_err(AbortReason::Transport)?;

                for msg in inbound {
                    if !seen_seqs.insert((msg.from.clone(), msg.seq)) {
                        continue; // at-least-once delivery: drop the duplicate (§4.5.3)
                    }
                    if !session.expected_participants.contains(&PartyId(msg.from.clone())) {
                        return Err(AbortReason::Protocol(ProtocolError::UnexpectedParty(PartyId(
                            msg.from,
                        )))
                        .into());
                    }
                    let ciphertext = match base64::engine::general_purpose::STANDARD.decode(&msg.body) {
                        Ok(c) => c,
                        Err(_) => continue,
                    };
                    let Some(plaintext) = crypto_io::decrypt(&session.hex_encryption_key, &ciphertext) else {
                        continue; // tampered or undecryptable: the primitive's own MACs are authoritative
                    };
                    let Some(envelope) = Envelope::decode(&plaintext) else {
                        continue;
                    };
                    let digest_index = envelope.digest_index as usize;
                    if digest_index >= n_digests {
                        continue;
                    }
                    if envelope.round < current_round {
                        continue; // stale message for a round already finalized
                    }
                    if envelope.round > current_round {
                        pending.entry((digest_index, envelope.round)).or_default().push(envelope.body);
                        continue;
                    }
                    if round_ready.contains(&digest_index) {
                        continue;
                    }
                    let step = primitives[digest_index].round_in(&handles[digest_index], &envelope.body);
                    if step == RoundStep::RoundComplete {
                        round_ready.insert(digest_index);
                    }
                }

                if round_ready.len() < n_digests {
                    tokio::time::sleep(MESSAGE_POLL_INTERVAL).await;
                }
            }

            // Cancellation check point between rounds (§4.5.4, §9's
            // suspension-point list item (c)): in-flight network sends
            // already completed are left as-is, only future rounds stop.
            if cancel.is_cancelled() {
                self.relay.complete_session(&session_id_str).await;
                return Err(AbortReason::Cancelled.into());
            }

            // Every handle's current round is complete: try to finalize each
            // one; those that aren't done yet emit round (current_round + 1)
            // messages (§4.5.2's `Round(k) -> Committing` edge applies
            // per-handle, the session as a whole reaches `Committing` only
            // once every digest has finalized).
            let next_round = current_round + 1;
            for i in 0..n_digests {
                if completed.contains(&i) {
                    continue;
                }
                if let Some(sig) = primitives[i].finalize(&handles[i]) {
                    signatures[i] = Some(to_raw_signature(session.scheme, sig));
                    completed.insert(i);
                }
            }
            if completed.len() < n_digests {
                self.flush_outbound(&session, &session_id_str, local, primitives, &handles, next_round)
                    .await?;
                // Deliver any round-(next_round) messages that arrived early
                // while we were still finishing `current_round` (§4.5.4:
                // "the engine buffers messages whose declared round >
                // current-round and delivers them on transition").
                for i in 0..n_digests {
                    if let Some(bodies) = pending.remove(&(i, next_round)) {
                        for body in bodies {
                            let _ = primitives[i].round_in(&handles[i], &body);
                        }
                    }
                }
                current_round = next_round;
                session.state = SessionState::Round(current_round);
            }
        }

        session.state = SessionState::Committing;
        self.relay.complete_session(&session_id_str).await;
        session.state = SessionState::Completed;

        Ok(signatures.into_iter().map(|s| s.expect("every digest finalized before Completed")).collect())
    }

    /// `Joining -> Ready` (§4.5.2): poll `/start/{session_id}` at 1s
    /// intervals until `|joined| >= threshold` and the local party is among
    /// them, or the 120s default timeout elapses.
    async fn wait_for_threshold(
        &self,
        session: &mut SigningSession,
        threshold: usize,
        local: &PartyId,
    ) -> Result<(), AbortReason> {
        let deadline = tokio::time::Instant::now() + THRESHOLD_JOIN_TIMEOUT;
        loop {
            let joined = self
                .relay
                .joined_participants(&session.session_id.to_string())
                .await
                .map_err(AbortReason::Transport)?;
            session.joined_participants = joined.iter().map(|p| PartyId(p.clone())).collect();

            if session.joined_participants.len() >= threshold && session.joined_participants.contains(local) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AbortReason::Protocol(ProtocolError::ThresholdNotMet));
            }
            tokio::time::sleep(THRESHOLD_JOIN_POLL).await;
        }
    }

    /// Sends every handle's currently queued outbound messages for `round`,
    /// tagged with `(digest_index, round)` inside the encrypted envelope.
    async fn flush_outbound(
        &self,
        session: &SigningSession,
        session_id: &str,
        local: &PartyId,
        primitives: &mut [Box<dyn MpcPrimitive>],
        handles: &[crate::mpc::primitive::Handle],
        round: u32,
    ) -> Result<(), AbortReason> {
        for (i, primitive) in primitives.iter_mut().enumerate() {
            let outbound: Vec<OutboundMessage> = primitive.round_out(&handles[i]);
            for msg in outbound {
                let envelope = Envelope {
                    digest_index: i as u8,
                    round,
                    body: msg.body,
                };
                let to = msg.to.map(|p| vec![p.0]);
                self.relay
                    .send_message(
                        session_id,
                        &local.0,
                        to,
                        &envelope.encode(),
                        &session.hex_encryption_key,
                    )
                    .await
                    .map_err(AbortReason::Transport)?;
            }
        }
        Ok(())
    }
}

fn digest_message_bytes(digests: &Digests, index: usize) -> &[u8] {
    match digests {
        Digests::Fixed32(hashes) => hashes[index].as_slice(),
        Digests::Opaque(bytes) => bytes.as_slice(),
    }
}

fn to_raw_signature(scheme: Scheme, sig: crate::mpc::primitive::PrimitiveSignature) -> RawSignature {
    match scheme {
        Scheme::Ecdsa => RawSignature::Ecdsa {
            r: sig.r,
            s: sig.s,
            recovery_id: sig.recovery_id,
        },
        Scheme::EdDsa => RawSignature::EdDsa { r: sig.r, s: sig.s },
    }
}
