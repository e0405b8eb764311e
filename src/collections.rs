//! Collection types tuned for small simplicial data.
//!
//! Hash-based collections use a fast non-cryptographic hasher; keys are
//! always internal indices or simplices, never attacker-controlled input.
//! Vertex buffers are stack-allocated up to the practical dimension bound.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Optimized `HashMap` for performance-critical internal lookups.
///
/// # Examples
///
/// ```rust
/// use tangential::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` for internal membership testing.
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that uses stack allocation for small collections,
/// with heap fallback when a collection outgrows its inline capacity.
///
/// # Examples
///
/// ```rust
/// use tangential::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<usize, 8> = SmallBuffer::new();
/// buffer.push(42);
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Maximum practical simplex size (vertex count) for stack allocation.
///
/// Reconstructions here target intrinsic dimensions 1-5 with patches one or
/// two dimensions above, so 8 gives comfortable headroom.
pub const MAX_PRACTICAL_DIMENSION_SIZE: usize = 8;

/// Creates a [`FastHashMap`] with pre-allocated capacity, avoiding rehashing
/// when the expected size is known.
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}

/// Creates a [`FastHashSet`] with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}
