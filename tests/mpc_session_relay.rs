//! `SessionEngine::run_keysign` driven against a mocked relay (§4.5.3, §8
//! property 8): the relay duplicates a round's message and the first
//! `/start` call 503s before succeeding on retry. The session must still
//! reach `Completed` with one signature per digest.

use base64::Engine;
use serde_json::json;
use wallet_core::mpc::primitive::{
    Handle, MpcPrimitive, OutboundMessage, PrimitiveSignature, RoundStep, SessionConfig,
};
use wallet_core::mpc::session::{CancelToken, Role, SessionEngine};
use wallet_core::mpc::{EncryptionKey, RelayHttpClient, VaultLockTable};
use wallet_core::presign::Digests;
use wallet_core::vault::{KeyShare, PartyId, Scheme};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A single-round fake primitive: queues one outbound message when the
/// session starts, finalizes as soon as it observes one inbound message for
/// its own round.
struct FakePrimitive {
    pending_out: Vec<OutboundMessage>,
    rounds_seen: u32,
    finalized: bool,
}

impl FakePrimitive {
    fn new() -> Self {
        Self { pending_out: vec![OutboundMessage { to: None, round: 1, body: b"commitment".to_vec() }], rounds_seen: 0, finalized: false }
    }
}

impl MpcPrimitive for FakePrimitive {
    fn new_session(&mut self, _config: SessionConfig<'_>) -> Handle {
        Handle(0)
    }

    fn round_in(&mut self, _handle: &Handle, _message: &[u8]) -> RoundStep {
        self.rounds_seen += 1;
        RoundStep::RoundComplete
    }

    fn round_out(&mut self, _handle: &Handle) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.pending_out)
    }

    fn finalize(&mut self, _handle: &Handle) -> Option<PrimitiveSignature> {
        if self.rounds_seen >= 1 && !self.finalized {
            self.finalized = true;
            Some(PrimitiveSignature { r: [7u8; 32], s: [9u8; 32], recovery_id: Some(0) })
        } else {
            None
        }
    }
}

/// Encrypts an `(digest_index, round, body)` envelope the same way
/// `mpc::session::Envelope::encode` does, so the mocked relay can hand back
/// a message the session will actually decrypt and accept.
fn envelope_ciphertext(key: &EncryptionKey, digest_index: u8, round: u32, body: &[u8]) -> String {
    let mut plaintext = Vec::with_capacity(5 + body.len());
    plaintext.push(digest_index);
    plaintext.extend_from_slice(&round.to_le_bytes());
    plaintext.extend_from_slice(body);
    let ciphertext = wallet_core::mpc::crypto_io::encrypt(key, &plaintext);
    base64::engine::general_purpose::STANDARD.encode(ciphertext)
}

#[tokio::test]
async fn session_completes_despite_start_retry_and_duplicate_round_messages() {
    let server = MockServer::start().await;
    let session_id = uuid::Uuid::new_v4();
    let local = PartyId::from("party-1");
    let encryption_key = EncryptionKey::generate();

    // First /start attempt 503s; the relay client must retry and succeed.
    Mock::given(method("POST"))
        .and(path(format!("/start/{session_id}")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/start/{session_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // Joining and threshold wait: a 1-of-1 vault, so the local party alone
    // satisfies the threshold on the first poll.
    Mock::given(method("POST"))
        .and(path(format!("/{session_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/start/{session_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([local.0])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/message/{session_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // The round-1 inbound poll hands back the *same* sequence number twice
    // — simulating at-least-once redelivery — plus the response is served
    // out of band from the POST above, exercising the engine's
    // `(from, seq)` dedup rather than anything round-ordering related.
    let round1_body = envelope_ciphertext(&encryption_key, 0, 1, b"peer-commitment");
    Mock::given(method("GET"))
        .and(path(format!("/message/{session_id}/{}", local.0)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"from": local.0, "seq": 1, "body": round1_body},
            {"from": local.0, "seq": 1, "body": round1_body},
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/complete/{session_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let relay = RelayHttpClient::new(server.uri());
    let engine = SessionEngine::new(relay, VaultLockTable::new());

    let vault = test_vault(local.clone());
    let digests = Digests::Fixed32(vec![[1u8; 32]]);
    let key_share = KeyShare(vec![0u8; 32]);
    let mut primitives: Vec<Box<dyn MpcPrimitive>> = vec![Box::new(FakePrimitive::new())];

    let signatures = engine
        .run_keysign(
            &vault,
            Role::Initiator,
            session_id,
            encryption_key,
            vec![local.clone()],
            &digests,
            &key_share,
            Scheme::Ecdsa,
            &mut primitives,
            CancelToken::new(),
        )
        .await
        .expect("session should complete despite the 503 retry and duplicate delivery");

    assert_eq!(signatures.len(), 1);
    match &signatures[0] {
        wallet_core::sign::RawSignature::Ecdsa { r, .. } => assert_eq!(*r, [7u8; 32]),
        other => panic!("expected an Ecdsa raw signature, got {other:?}"),
    }
}

/// §6: "non-2xx responses other than 404 are retriable; 409 is fatal" — a
/// 404 must fail immediately too, with exactly one request made, not
/// retried up to `MAX_RETRIES` times like a transient 5xx would be.
#[tokio::test]
async fn relay_client_treats_404_as_fatal_without_retrying() {
    let server = MockServer::start().await;
    let session_id = uuid::Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/start/{session_id}")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let relay = RelayHttpClient::new(server.uri());
    let result = relay.start_session(&session_id.to_string(), &["party-1".to_string()]).await;
    assert!(result.is_err());
}

fn test_vault(local: PartyId) -> wallet_core::vault::Vault {
    wallet_core::vault::Vault {
        name: "test-vault".into(),
        public_keys: wallet_core::vault::PublicKeys { ecdsa: [0x02; 33], eddsa: [0u8; 32] },
        hex_chain_code: [0u8; 32],
        signers: vec![local.clone()],
        local_party_id: local,
        key_shares: wallet_core::vault::KeyShares {
            ecdsa: KeyShare(vec![0u8; 32]),
            eddsa: KeyShare(vec![0u8; 32]),
        },
        lib_type: wallet_core::vault::LibType::Dkls,
        threshold: 1,
    }
}
