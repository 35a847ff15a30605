//! Thin CLI over the core library (§1's scope line: "CLIs ... are either a
//! thin adapter over HTTP/RPC or a presentation concern"). Every subcommand
//! here is a direct call into `wallet_core`; no business logic lives here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wallet_core::derivation::{self, DerivationCache};
use wallet_core::vault::{ChainDescriptor, PublicKeys, UtxoNetwork, Vault};
use wallet_core::{address, presign};

#[derive(Parser)]
#[command(name = "wallet-core")]
#[command(about = "Threshold-signature wallet core: derivation, payload building, and keysign driving", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a chain address from a vault's root public keys.
    DeriveAddress {
        /// Hex-encoded 33-byte compressed secp256k1 root public key.
        #[arg(long)]
        ecdsa_pub: String,

        /// Hex-encoded 32-byte Ed25519 root public key.
        #[arg(long)]
        eddsa_pub: String,

        /// Hex-encoded 32-byte BIP32 chain code.
        #[arg(long)]
        chain_code: String,

        /// Chain to derive for: evm, btc, ltc, cosmos:<chain_id>:<denom>, solana, sui, ripple.
        #[arg(long)]
        chain: String,

        /// EVM chain id, required when --chain evm.
        #[arg(long, default_value_t = 1)]
        evm_chain_id: u64,

        /// Non-hardened account/address index (§4.1).
        #[arg(long, default_value_t = 0)]
        index: u32,
    },

    /// Print the unsigned transaction bytes and digest count for a
    /// `KeysignPayload` read from a JSON file (§4.3).
    PresignDigests {
        /// Path to a JSON-encoded `KeysignPayload`.
        #[arg(long)]
        payload: String,
    },
}

fn parse_chain(spec: &str, evm_chain_id: u64) -> Result<ChainDescriptor> {
    let chain = match spec {
        "evm" => ChainDescriptor::Evm { chain_id: evm_chain_id },
        "btc" => ChainDescriptor::Utxo { network: UtxoNetwork::Btc },
        "ltc" => ChainDescriptor::Utxo { network: UtxoNetwork::Ltc },
        "solana" => ChainDescriptor::Solana,
        "sui" => ChainDescriptor::Sui,
        "ripple" => ChainDescriptor::Ripple,
        "thorchain" => ChainDescriptor::Thorchain,
        other if other.starts_with("cosmos:") => {
            let mut parts = other.trim_start_matches("cosmos:").splitn(2, ':');
            let chain_id = parts.next().context("missing cosmos chain_id")?.to_string();
            let denom = parts.next().context("missing cosmos denom")?.to_string();
            ChainDescriptor::Cosmos { chain_id, denom, decimals: 6 }
        }
        other => anyhow::bail!("unsupported --chain value: {other}"),
    };
    Ok(chain)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DeriveAddress {
            ecdsa_pub,
            eddsa_pub,
            chain_code,
            chain,
            evm_chain_id,
            index,
        } => {
            let ecdsa: [u8; 33] = hex::decode(&ecdsa_pub)
                .context("--ecdsa-pub must be hex")?
                .try_into()
                .map_err(|_| anyhow::anyhow!("--ecdsa-pub must decode to 33 bytes"))?;
            let eddsa: [u8; 32] = hex::decode(&eddsa_pub)
                .context("--eddsa-pub must be hex")?
                .try_into()
                .map_err(|_| anyhow::anyhow!("--eddsa-pub must decode to 32 bytes"))?;
            let chain_code_bytes: [u8; 32] = hex::decode(&chain_code)
                .context("--chain-code must be hex")?
                .try_into()
                .map_err(|_| anyhow::anyhow!("--chain-code must decode to 32 bytes"))?;

            let vault = Vault {
                name: "cli".to_string(),
                public_keys: PublicKeys { ecdsa, eddsa },
                hex_chain_code: chain_code_bytes,
                signers: vec!["cli".into()],
                local_party_id: "cli".into(),
                key_shares: wallet_core::vault::KeyShares {
                    ecdsa: wallet_core::vault::KeyShare(Vec::new()),
                    eddsa: wallet_core::vault::KeyShare(Vec::new()),
                },
                lib_type: wallet_core::vault::LibType::Dkls,
                threshold: 1,
            };

            let chain_descriptor = parse_chain(&chain, evm_chain_id)?;
            let cache = DerivationCache::new();
            let derived = derivation::derive_public_key(&vault, &chain_descriptor, index, &cache)
                .map_err(|e| anyhow::anyhow!(e))?;
            let derived_address = address::derive_address(&derived, &chain_descriptor)
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("{derived_address}");
        }

        Commands::PresignDigests { payload } => {
            let contents = std::fs::read_to_string(&payload).context("reading payload file")?;
            let keysign_payload: wallet_core::payload::KeysignPayload =
                serde_json::from_str(&contents).context("parsing KeysignPayload JSON")?;
            let (unsigned_tx, digests) =
                presign::pre_signing_hashes(&keysign_payload).map_err(|e| anyhow::anyhow!(e))?;
            let digest_count = match &digests {
                presign::Digests::Fixed32(hashes) => hashes.len(),
                presign::Digests::Opaque(_) => 1,
            };
            println!("unsigned_tx: {} bytes", unsigned_tx.len());
            println!("digests: {digest_count}");
        }
    }

    Ok(())
}
