//! Per-address nonce locks
//!
//! Nonces are never cached here. The lock only guarantees that, for one
//! address, a single fetch-nonce -> sign -> submit sequence is in flight, so
//! two sends can never observe the same pending count.

use dashmap::DashMap;
use ethers::types::Address;
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

lazy_static! {
    static ref GLOBAL_LOCKS: Arc<AddressLocks> = Arc::new(AddressLocks::new());
}

/// Held for the duration of one send; dropping it releases the address
pub type NonceGuard = OwnedMutexGuard<()>;

/// Lazily populated table of one fair mutex per address
///
/// Entries are never removed.
#[derive(Default)]
pub struct AddressLocks {
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl AddressLocks {
    /// Create an empty table, private to its owners
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// The process-wide table shared by every sender that is not given its own
    pub fn global() -> Arc<Self> {
        GLOBAL_LOCKS.clone()
    }

    /// Wait for exclusive access to `address`
    ///
    /// Waiters are granted the lock in the order they started waiting.
    pub async fn acquire(&self, address: Address) -> NonceGuard {
        // Clone the slot out so no map shard stays locked across the await
        let slot = self.slot(address);
        slot.lock_owned().await
    }

    /// Whether a send currently holds the lock for `address`
    #[cfg(test)]
    pub(crate) fn is_locked(&self, address: Address) -> bool {
        match self.locks.get(&address) {
            Some(slot) => {
                // Bound to a local so the try_lock guard drops before the map `Ref`
                let locked = slot.try_lock().is_err();
                locked
            }
            None => false,
        }
    }

    /// Number of addresses that have ever been locked
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn slot(&self, address: Address) -> Arc<Mutex<()>> {
        let entry = self.locks.entry(address).or_insert_with(|| {
            debug!("Created nonce lock for {:?}", address);
            Arc::new(Mutex::new(()))
        });
        entry.value().clone()
    }
}
