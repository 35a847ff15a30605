//! MPC Session Engine (§4.5) and its supporting relay/fast-vault transport
//! (§4.5.3, §4.5.5), cancellation (§4.5.4), and per-vault concurrency
//! discipline (§5).

pub mod crypto_io;
pub mod fast_vault;
pub mod primitive;
pub mod relay;
pub mod session;
pub mod vault_lock;

pub use crypto_io::EncryptionKey;
pub use primitive::MpcPrimitive;
pub use relay::RelayHttpClient;
pub use session::{CancelToken, Role, SessionEngine, SessionState, SigningSession};
pub use vault_lock::{VaultLockGuard, VaultLockTable};
