//! Interning of canonical type encodings.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Type;

/// Maps canonical binary type encodings to small dense ids.
///
/// Structurally equal descriptors produce identical encodings, so two
/// sessions sharing one registry can compare column types by `u64` instead
/// of re-encoding. The table is read-mostly: after the first sighting of
/// each type, lookups take the read lock only.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    ids: FxHashMap<Vec<u8>, u64>,
    next_id: u64,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }

    /// Returns the id for a canonical binary encoding, assigning the next
    /// dense id on first sighting.
    pub fn canonical_id(&self, binary: &[u8]) -> u64 {
        if let Some(id) = self.inner.read().ids.get(binary) {
            return *id;
        }
        let mut inner = self.inner.write();
        // Racing writers may have inserted between the locks.
        if let Some(id) = inner.ids.get(binary) {
            return *id;
        }
        inner.next_id += 1;
        let id = inner.next_id;
        tracing::trace!(id, len = binary.len(), "interned type encoding");
        let _ = inner.ids.insert(binary.to_vec(), id);
        id
    }

    /// Convenience wrapper interning a descriptor's canonical encoding.
    pub fn id_of(&self, type_: &Type) -> u64 { self.canonical_id(&type_.binary()) }
}
