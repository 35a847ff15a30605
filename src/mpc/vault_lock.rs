//! The per-`vault_id` lock (§5): "the client must hold a local lock per
//! vault_id for the duration of initiate→complete; attempts to start a
//! second session against a locked vault fail with `VaultBusy`." Implemented
//! as a process-wide table behind an `Arc`, with a guard type whose `Drop`
//! releases the entry — the idiomatic expression of "the lock is released on
//! any terminal transition."

use crate::error::StateError;
use crate::vault::VaultId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct VaultLockTable {
    locked: Arc<Mutex<HashSet<VaultId>>>,
}

impl VaultLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `vault_id`, or fails `VaultBusy` if another
    /// session already holds it (§5, §4.5.5's 409-CONFLICT analog at the
    /// fast-vault server).
    pub fn acquire(&self, vault_id: &VaultId) -> Result<VaultLockGuard, StateError> {
        let mut locked = self.locked.lock();
        if !locked.insert(vault_id.clone()) {
            return Err(StateError::VaultBusy(vault_id.to_string()));
        }
        Ok(VaultLockGuard {
            table: self.locked.clone(),
            vault_id: vault_id.clone(),
        })
    }

    pub fn is_locked(&self, vault_id: &VaultId) -> bool {
        self.locked.lock().contains(vault_id)
    }
}

/// Held for the duration of `initiate -> complete`. Released on `Drop`, so
/// every terminal transition (success, any `Aborted` reason, or an
/// unexpected panic unwinding the session task) releases the vault
/// atomically with going out of scope.
pub struct VaultLockGuard {
    table: Arc<Mutex<HashSet<VaultId>>>,
    vault_id: VaultId,
}

impl Drop for VaultLockGuard {
    fn drop(&mut self) {
        self.table.lock().remove(&self.vault_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault_id(byte: u8) -> VaultId {
        VaultId([byte; 33])
    }

    #[test]
    fn second_acquire_on_same_vault_fails_busy() {
        let table = VaultLockTable::new();
        let _guard = table.acquire(&vault_id(1)).unwrap();
        assert!(matches!(table.acquire(&vault_id(1)), Err(StateError::VaultBusy(_))));
    }

    #[test]
    fn different_vaults_do_not_contend() {
        let table = VaultLockTable::new();
        let _a = table.acquire(&vault_id(1)).unwrap();
        assert!(table.acquire(&vault_id(2)).is_ok());
    }

    #[test]
    fn dropping_the_guard_releases_the_lock() {
        let table = VaultLockTable::new();
        {
            let _guard = table.acquire(&vault_id(1)).unwrap();
            assert!(table.is_locked(&vault_id(1)));
        }
        assert!(!table.is_locked(&vault_id(1)));
        assert!(table.acquire(&vault_id(1)).is_ok());
    }
}
