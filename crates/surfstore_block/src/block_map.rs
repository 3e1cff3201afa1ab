#[cfg(test)]
#[path = "block_map_test.rs"]
mod block_map_test;

// The BlockStore's entire state: a map from block fingerprint to block
// bytes (spec.md §3, "BlockMap"). Keys are unique, insertion order is
// irrelevant, and blocks are never deleted by the core.

use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory, content-addressed block map. Cheap to clone (an `Arc`
/// around this is held by the gRPC service); every operation takes the
/// single internal mutex for the duration of one map access, matching
/// spec.md §5 ("a simple guard is sufficient — there are no multi-step
/// transactions inside the block store").
#[derive(Default)]
pub struct BlockMap {
    blocks: Mutex<HashMap<String, Vec<u8>>>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the block at `hash`. Idempotent, infallible.
    pub fn store(&self, hash: String, data: Vec<u8>) {
        self.blocks.lock().unwrap().insert(hash, data);
    }

    /// Whether `hash` is a key of the map.
    pub fn has(&self, hash: &str) -> bool {
        self.blocks.lock().unwrap().contains_key(hash)
    }

    /// Returns the stored bytes for `hash`, or `None` if absent. Callers
    /// are expected to call [`BlockMap::has`] first (spec.md §4.1); this
    /// is the defensive fallback path, not the primary one.
    pub fn get(&self, hash: &str) -> Option<Vec<u8>> {
        self.blocks.lock().unwrap().get(hash).cloned()
    }
}
