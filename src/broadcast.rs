//! `Broadcaster` (§6): the injected boundary the core delegates to once it
//! has produced a signed, chain-encoded transaction. The core itself is not
//! a transaction broadcaster (§1 Non-goals) — it only calls this trait and
//! returns whatever hash comes back.

use crate::vault::ChainDescriptor;
use async_trait::async_trait;

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, chain: &ChainDescriptor, signed_bytes: &[u8]) -> anyhow::Result<String>;
}
