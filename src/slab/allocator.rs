//! First-fit size-class dispatch over fixed pools

use core::ptr::NonNull;

use tracing::debug;

use super::config::SlabConfig;
use crate::pool::PoolAllocator;

/// Slab allocator composing fixed pools with ascending block sizes
///
/// Each request is forwarded to the first pool whose payload capacity can
/// hold it; the pool's answer (including exhaustion) is returned unchanged.
/// Requests larger than every class get `None`, indistinguishable to the
/// caller from a single class running dry.
///
/// Class selection reads only the immutable table built at construction, so
/// the dispatcher adds no locking of its own; concurrent use is serialized
/// by each selected pool's own lock.
///
/// # Size contract on `free`
///
/// [`free`](Self::free) re-runs class selection from the caller-supplied
/// size instead of recovering the owning pool from the pointer. The caller
/// must therefore pass the same size used at the matching
/// [`allocate`](Self::allocate); a size that maps to a different class is
/// handed to a pool that never issued the block, which panics with its
/// foreign-pointer diagnostic.
pub struct SlabAllocator {
    /// Ascending payload capacities, parallel to `pools`
    class_sizes: Vec<usize>,
    pools: Vec<PoolAllocator>,
}

impl SlabAllocator {
    /// Creates a slab over the default table (64/128/256/512 bytes, 100
    /// blocks each).
    pub fn new() -> Self {
        Self::with_config(SlabConfig::default())
    }

    /// Creates a slab over an already validated table.
    ///
    /// Each class's pool is constructed independently; a pool whose buffer
    /// the bulk memory source refuses stays unready and serves only `None`,
    /// without affecting its neighbors.
    pub fn with_config(config: SlabConfig) -> Self {
        let mut class_sizes = Vec::with_capacity(config.classes().len());
        let mut pools = Vec::with_capacity(config.classes().len());
        for class in config.classes() {
            class_sizes.push(class.payload_size);
            pools.push(PoolAllocator::new(class.payload_size, class.block_count));
        }
        debug!(classes = ?class_sizes, "slab allocator constructed");
        Self { class_sizes, pools }
    }

    /// First pool able to hold `size` bytes, by ascending capacity
    fn select(&self, size: usize) -> Option<&PoolAllocator> {
        self.class_sizes
            .iter()
            .position(|&capacity| size <= capacity)
            .map(|index| &self.pools[index])
    }

    /// Allocates a block of at least `size` usable bytes.
    ///
    /// Returns `None` when `size` exceeds every class or the selected class
    /// is exhausted. The block comes from exactly one pool; remember `size`
    /// for the matching [`free`](Self::free).
    pub fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        self.select(size)?.allocate()
    }

    /// Frees a block previously allocated with the same `size`.
    ///
    /// Sizes exceeding every class are ignored, mirroring
    /// [`allocate`](Self::allocate)'s refusal to serve them.
    ///
    /// # Panics
    /// Panics via the selected pool's integrity checks when `size` maps to
    /// a different class than the one that issued `ptr`, or when `ptr`
    /// itself is invalid. See [`PoolAllocator::free`].
    pub fn free(&self, ptr: NonNull<u8>, size: usize) {
        if let Some(pool) = self.select(size) {
            pool.free(ptr);
        }
    }

    /// Ascending payload capacities of the classes
    pub fn size_classes(&self) -> &[usize] {
        &self.class_sizes
    }

    /// Largest servable request size
    pub fn largest_class(&self) -> usize {
        self.class_sizes.last().copied().unwrap_or(0)
    }

    /// The pools, ascending by capacity
    pub fn pools(&self) -> &[PoolAllocator] {
        &self.pools
    }
}

impl Default for SlabAllocator {
    fn default() -> Self {
        Self::new()
    }
}
