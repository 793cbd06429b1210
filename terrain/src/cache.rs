//! Bounded cache of decoded heightmap tiles.
//!
//! [`TileCache`] keeps at most `capacity` buffers. Each insertion takes the
//! next slot of a ring (an insertion counter modulo the capacity) and evicts
//! whatever tile held that slot before. Reads never change the eviction
//! order, so this is first-in-first-out, not least-recently-used.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::heightmap::TileBuffer;
use crate::tile::Tile;

/// Number of tiles kept by default (~256 MiB of decoded pixels).
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct Ring {
    entries: HashMap<Tile, Arc<TileBuffer>>,
    /// Tile occupying each slot, in insertion order modulo capacity.
    slots: Vec<Option<Tile>>,
    /// Total insertions since creation or the last clear.
    inserted: u64,
    evicted: u64,
}

/// Fixed-capacity, ring-buffer tile cache safe for concurrent use.
///
/// Lookups take a shared lock only long enough to clone an `Arc`;
/// insertions take the exclusive lock only to update the ring. Buffers
/// handed out stay valid after eviction.
///
/// # Example
///
/// ```
/// use std::num::NonZeroUsize;
/// use terrain::{Tile, TileCache};
///
/// let cache = TileCache::new(NonZeroUsize::new(2).unwrap());
/// assert!(cache.get(&Tile::new(1, 0, 0)?).is_none());
/// # Ok::<(), terrain::TerrainError>(())
/// ```
pub struct TileCache {
    capacity: NonZeroUsize,
    ring: RwLock<Ring>,
}

impl TileCache {
    /// Create an empty cache holding at most `capacity` tiles.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            ring: RwLock::new(Ring {
                entries: HashMap::with_capacity(capacity.get()),
                slots: vec![None; capacity.get()],
                inserted: 0,
                evicted: 0,
            }),
        }
    }

    /// Returns the cached buffer for `tile`, if present.
    pub fn get(&self, tile: &Tile) -> Option<Arc<TileBuffer>> {
        self.ring.read().entries.get(tile).cloned()
    }

    /// Stores `buffer` for `tile` and returns the buffer now cached for it.
    ///
    /// If another caller inserted the same tile first, its buffer is kept
    /// and returned, and no slot is consumed.
    pub fn insert(&self, tile: Tile, buffer: Arc<TileBuffer>) -> Arc<TileBuffer> {
        let mut ring = self.ring.write();

        if let Some(existing) = ring.entries.get(&tile) {
            return Arc::clone(existing);
        }

        let slot = (ring.inserted % self.capacity.get() as u64) as usize;
        if let Some(evicted) = ring.slots[slot].take() {
            ring.entries.remove(&evicted);
            ring.evicted += 1;
            debug!(tile = %evicted, slot, "Evicted tile from cache");
        }

        ring.slots[slot] = Some(tile);
        ring.inserted += 1;
        ring.entries.insert(tile, Arc::clone(&buffer));
        buffer
    }

    /// Check if `tile` is currently cached.
    pub fn contains(&self, tile: &Tile) -> bool {
        self.ring.read().entries.contains_key(tile)
    }

    /// Number of tiles currently cached.
    pub fn len(&self) -> usize {
        self.ring.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of tiles the cache holds.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of tiles evicted to make room for new ones.
    pub fn eviction_count(&self) -> u64 {
        self.ring.read().evicted
    }

    /// Drop every cached tile and restart the ring at slot 0.
    pub fn clear(&self) {
        let mut ring = self.ring.write();
        ring.entries.clear();
        ring.slots.iter_mut().for_each(|slot| *slot = None);
        ring.inserted = 0;
    }
}
