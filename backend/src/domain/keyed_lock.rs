//! Per-key async mutual exclusion.
//!
//! Work on different keys proceeds in parallel while work on the same key is
//! serialised. Idle entries are dropped when their last guard is released so
//! the map only holds keys that are currently contended.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map of async locks keyed by `K`.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

/// Guard holding the lock for one key.
pub struct KeyedGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    // Field order matters: the mutex guard is released before the slot
    // reference is given back.
    _guard: OwnedMutexGuard<()>,
    _slot: SlotRef<'a, K>,
}

/// Counted reference to a slot. Whoever drops the last outside reference
/// removes the entry, whether it held the lock or gave up waiting for it.
struct SlotRef<'a, K>
where
    K: Eq + Hash + Clone,
{
    owner: &'a KeyedLocks<K>,
    key: K,
    slot: Option<Arc<AsyncMutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let slot = {
            let mut slots = self.slots();
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let slot_ref = SlotRef {
            owner: self,
            key,
            slot: Some(Arc::clone(&slot)),
        };
        let guard = slot.lock_owned().await;
        KeyedGuard {
            _guard: guard,
            _slot: slot_ref,
        }
    }

    /// Number of keys with live or pending guards.
    pub fn active_keys(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<K, Arc<AsyncMutex<()>>>> {
        // The map holds no invariants beyond its entries, so a poisoned lock
        // is still safe to reuse.
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<K> Drop for SlotRef<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        drop(self.slot.take());
        let mut slots = self.owner.slots();
        if let Some(slot) = slots.get(&self.key) {
            // Only the map holds a reference once every waiter is gone.
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.key);
            }
        }
    }
}
