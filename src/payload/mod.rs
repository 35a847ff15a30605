//! Payload Builder (§4.2): turns a high-level intent plus live chain state
//! into an immutable [`types::KeysignPayload`].

pub mod builder;
pub mod chain_source;
pub mod types;
pub mod utxo_select;

pub use builder::{FeeSettings, PayloadBuilder, SwapQuote};
pub use types::{BlockchainSpecific, Erc20ApprovePayload, KeysignPayload, SwapPayload, UtxoInfo};
