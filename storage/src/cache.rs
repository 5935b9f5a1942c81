//! `SharedMemCache`: the LRU of resident, unpinned chunk bodies that backs
//! eviction (§3 Lifecycle: "evicted-but-on-disk -> reloaded on access", §5
//! "guarded by one mutex per chunk slot plus a global list mutex").
//!
//! A chunk is linked into the LRU exactly while its pin count is zero. The
//! first `pin()` unlinks it; the last `unpin()` relinks it at the
//! most-recently-used end (§4.2 `pin`/`unPin`).

use crate::persistent_chunk::PersistentChunk;
use array_model::Address;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// §5: "the `SharedMemCache`/LRU is guarded by one mutex per chunk slot plus
/// a global list mutex." The per-slot mutex is realized as
/// `PersistentChunk`'s own internal locking; this type owns only the global
/// list + directory, i.e. the "global list mutex" half of that split.
#[derive(Debug, Default)]
pub struct ChunkCache {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    directory: HashMap<Address, Arc<PersistentChunk>>,
    /// Least-recently-used first. Only unpinned chunks are linked here.
    lru: VecDeque<Address>,
    capacity_bytes: u64,
    resident_bytes: u64,
}

impl ChunkCache {
    pub fn new(capacity_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                capacity_bytes,
                ..Inner::default()
            }),
        })
    }

    /// Registers `chunk` in the directory and attaches `self` as its cache
    /// back-reference, so the chunk's own `pin`/`unpin` can drive
    /// `touch_pinned`/`touch_unpinned` from here on (§4.2). Takes `&Arc<Self>`
    /// rather than `&self` because the back-reference is a `Weak`, which
    /// needs an `Arc` to downgrade from.
    pub fn insert(self: &Arc<Self>, chunk: Arc<PersistentChunk>) {
        chunk.attach_cache(Arc::downgrade(self));
        let mut inner = self.inner.lock();
        inner.directory.insert(chunk.address().clone(), chunk);
    }

    pub fn get(&self, address: &Address) -> Option<Arc<PersistentChunk>> {
        self.inner.lock().directory.get(address).cloned()
    }

    pub fn remove(&self, address: &Address) {
        let mut inner = self.inner.lock();
        inner.directory.remove(address);
        inner.lru.retain(|a| a != address);
    }

    /// Unlink `address` from the LRU: called on the transition from
    /// zero-to-one pins (§4.2 "the first `pin()` unlinks from the LRU").
    pub fn touch_pinned(&self, address: &Address) {
        let mut inner = self.inner.lock();
        inner.lru.retain(|a| a != address);
    }

    /// Relink `address` at the most-recently-used end: called on the
    /// transition from one-to-zero pins (§4.2 "the last `unPin()` relinks
    /// it").
    pub fn touch_unpinned(&self, address: Address, size: u64) {
        let mut inner = self.inner.lock();
        inner.lru.retain(|a| a != &address);
        inner.lru.push_back(address);
        inner.resident_bytes = inner.resident_bytes.saturating_add(size);
        self.evict_if_needed(&mut inner);
    }

    /// Drop resident buffers for unpinned chunks, oldest first, until the
    /// cache is back under `capacity_bytes`. Pinned chunks are never
    /// candidates (they aren't on the LRU to begin with).
    fn evict_if_needed(&self, inner: &mut Inner) {
        while inner.resident_bytes > inner.capacity_bytes {
            let Some(address) = inner.lru.pop_front() else {
                break;
            };
            if let Some(chunk) = inner.directory.get(&address) {
                if chunk.pin_count() > 0 {
                    // Raced with a pin() between relink and eviction; put
                    // it back and stop, the pinning thread owns it now.
                    inner.lru.push_front(address);
                    break;
                }
                let freed = chunk.header().size;
                chunk.free();
                inner.resident_bytes = inner.resident_bytes.saturating_sub(freed);
                observability_deps::tracing::debug!(?address, freed, "evicted chunk body from cache");
            }
        }
    }

    pub fn resident_bytes(&self) -> u64 {
        self.inner.lock().resident_bytes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
