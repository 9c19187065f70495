//! Main pool allocator implementation
//!
//! # Safety
//!
//! This module implements a thread-safe fixed-block pool allocator:
//! - Equal-size blocks carved out of one buffer obtained from the global
//!   bulk memory source at construction, released once on drop
//! - Free blocks store the next link in their own first bytes (intrusive
//!   singly-linked list), so no per-block heap metadata exists
//! - One coarse mutex guards the free-list head; allocated blocks are
//!   exclusively owned by their callers and never touched until freed
//! - Debug builds stamp each block with a liveness flag, an owner-pool id
//!   and boundary canaries, checked on every free
//!
//! ## Invariants
//!
//! - `block_size` is a multiple of the header's natural alignment
//! - The free list is a null-terminated, acyclic subset of the slots;
//!   free and in-use blocks partition all slots with no overlap
//! - A pool either constructs fully initialized or stays permanently
//!   unready; no partial state is observable

use core::fmt;
use core::mem::{align_of, size_of};
use core::ptr::{self, NonNull};
use std::alloc::{Layout, alloc, dealloc};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::stats::PoolStats;
use crate::error::{AllocError, AllocResult};
use crate::utils::align_up;

/// Sentinel written at both block boundaries in debug builds
#[cfg(debug_assertions)]
const CANARY_VALUE: u32 = 0xDEAD_C0DE;

/// Link threaded through a free block's own memory
///
/// The header only has meaning while the block is on the free list; once a
/// block is handed out, its payload overlaps everything after the header.
#[repr(C)]
struct BlockHeader {
    next: *mut BlockHeader,
    #[cfg(debug_assertions)]
    is_free: bool,
    #[cfg(debug_assertions)]
    pool_id: u32,
    #[cfg(debug_assertions)]
    canary_front: u32,
}

const HEADER_SIZE: usize = size_of::<BlockHeader>();
const HEADER_ALIGN: usize = align_of::<BlockHeader>();

#[cfg(debug_assertions)]
const REAR_CANARY_SIZE: usize = size_of::<u32>();
#[cfg(not(debug_assertions))]
const REAR_CANARY_SIZE: usize = 0;

/// Tail canary slot of a block: the last four bytes of the stride.
///
/// `block_size` is a multiple of `HEADER_ALIGN`, so the slot is 4-aligned.
#[cfg(debug_assertions)]
unsafe fn rear_canary_ptr(block: *mut BlockHeader, block_size: usize) -> *mut u32 {
    // SAFETY: caller guarantees `block` is the start of a live slot of
    // `block_size` bytes inside the pool buffer.
    unsafe { block.cast::<u8>().add(block_size - REAR_CANARY_SIZE).cast::<u32>() }
}

/// Mutable free-list state, guarded by the pool mutex
struct FreeList {
    head: *mut BlockHeader,
    free_count: usize,
}

/// The initialized backing state of a pool
struct MemoryPool {
    /// Start of the owned buffer
    memory: NonNull<u8>,
    /// Layout used for the single alloc/dealloc pair
    layout: Layout,
    /// Byte distance between consecutive slots (header + payload + footer)
    block_size: usize,
    /// Usable bytes per block
    payload_size: usize,
    /// Fixed slot capacity
    block_count: usize,
    /// Free-list head and count; the only mutable state
    free: Mutex<FreeList>,
    #[cfg(debug_assertions)]
    pool_id: u32,
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        // SAFETY: `memory`/`layout` are the exact pair returned by `alloc`
        // in `try_new`, and `MemoryPool` is never cloned, so this releases
        // the buffer exactly once. Outstanding blocks are the callers'
        // responsibility; their memory simply goes away with the buffer.
        unsafe { dealloc(self.memory.as_ptr(), self.layout) }
    }
}

/// Pool allocator for fixed-size blocks
///
/// All blocks share one payload capacity chosen at construction. `allocate`
/// pops the free-list head and `free` pushes back onto it, so blocks are
/// reused most-recently-freed first. Both operations are O(1) and serialized
/// by a single whole-pool lock.
///
/// # Memory Layout
/// ```text
/// [Block0][Block1][Block2][Block3]...[BlockN]
///    ↓       ↓       ↓       ↓           ↓
/// [free] → [free] → [used] → [free] → [used] → null
/// ```
///
/// A pool that fails construction (zero arguments or an exhausted bulk
/// memory source) is permanently unready: `allocate` returns `None` and
/// `free` is a no-op. See [`PoolAllocator::try_new`] for the error detail.
pub struct PoolAllocator {
    pool: Option<MemoryPool>,
}

// SAFETY: PoolAllocator is Send because the buffer is exclusively owned and
// every raw pointer it stores points into that owned buffer.
unsafe impl Send for PoolAllocator {}

// SAFETY: PoolAllocator is Sync because:
// - The free-list head and all free-block memory are only touched while
//   holding the pool mutex
// - Allocated blocks are disjoint from the free list and owned by callers
// - The remaining fields (sizes, buffer bounds) are immutable after init
unsafe impl Sync for PoolAllocator {}

impl fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The buffer and free-list pointers are meaningless to print;
        // report readiness and occupancy instead.
        match &self.pool {
            Some(pool) => f
                .debug_struct("PoolAllocator")
                .field("block_size", &pool.block_size)
                .field("payload_size", &pool.payload_size)
                .field("block_count", &pool.block_count)
                .field("free_blocks", &pool.free.lock().free_count)
                .finish(),
            None => f
                .debug_struct("PoolAllocator")
                .field("initialized", &false)
                .finish(),
        }
    }
}

impl PoolAllocator {
    /// Creates a pool of `block_count` blocks of `payload_size` usable bytes.
    ///
    /// Construction failure is soft: on zero arguments or when the bulk
    /// memory source cannot supply the buffer, the returned instance is
    /// permanently unready rather than an error. Use
    /// [`is_initialized`](Self::is_initialized) to observe the outcome, or
    /// [`try_new`](Self::try_new) to get the cause.
    pub fn new(payload_size: usize, block_count: usize) -> Self {
        match Self::try_new(payload_size, block_count) {
            Ok(pool) => pool,
            Err(err) => {
                warn!(
                    payload_size,
                    block_count,
                    %err,
                    "pool construction failed, allocator is permanently unready"
                );
                Self { pool: None }
            }
        }
    }

    /// Fallible constructor returning the precise construction error.
    ///
    /// # Errors
    /// Returns an error when `payload_size` or `block_count` is zero, when
    /// the stride arithmetic overflows, or when the bulk memory source
    /// cannot supply the backing buffer.
    pub fn try_new(payload_size: usize, block_count: usize) -> AllocResult<Self> {
        if payload_size == 0 {
            return Err(AllocError::InvalidBlockSize);
        }
        if block_count == 0 {
            return Err(AllocError::InvalidBlockCount);
        }

        // Stride: header + payload (+ tail canary in debug builds), rounded
        // up to the header's natural alignment so every slot start and every
        // payload pointer stays pointer-aligned.
        let raw_block_size = HEADER_SIZE
            .checked_add(payload_size)
            .and_then(|size| size.checked_add(REAR_CANARY_SIZE))
            .ok_or(AllocError::SizeOverflow)?;
        let block_size = align_up(raw_block_size, HEADER_ALIGN);

        let total_size = block_size
            .checked_mul(block_count)
            .ok_or(AllocError::SizeOverflow)?;
        let layout = Layout::from_size_align(total_size, HEADER_ALIGN)
            .map_err(|_| AllocError::SizeOverflow)?;

        // One request to the bulk memory source for the whole buffer.
        // SAFETY: `layout` has non-zero size (block_size >= HEADER_SIZE).
        let memory = NonNull::new(unsafe { alloc(layout) }).ok_or(AllocError::OutOfMemory {
            requested: total_size,
        })?;

        #[cfg(debug_assertions)]
        let pool_id = (memory.as_ptr() as usize & 0xFFFF_FFFF) as u32;

        let pool = MemoryPool {
            memory,
            layout,
            block_size,
            payload_size,
            block_count,
            free: Mutex::new(FreeList {
                head: ptr::null_mut(),
                free_count: 0,
            }),
            #[cfg(debug_assertions)]
            pool_id,
        };

        {
            let mut list = pool.free.lock();
            // Thread every slot onto the head in slot order; the highest
            // slot ends up first, and reuse is LIFO from then on.
            for slot in 0..block_count {
                // SAFETY: `slot * block_size` is within the buffer because
                // `total_size = block_size * block_count`, and the offset is
                // a multiple of HEADER_ALIGN.
                let header = unsafe { memory.as_ptr().add(slot * block_size) }.cast::<BlockHeader>();
                // SAFETY: `header` points at `block_size` owned, properly
                // aligned bytes; nothing else references them yet.
                unsafe {
                    (*header).next = list.head;
                    #[cfg(debug_assertions)]
                    {
                        (*header).is_free = true;
                        (*header).pool_id = pool_id;
                        (*header).canary_front = CANARY_VALUE;
                        *rear_canary_ptr(header, block_size) = CANARY_VALUE;
                    }
                }
                list.head = header;
            }
            list.free_count = block_count;
        }

        debug!(payload_size, block_count, block_size, "pool initialized");
        Ok(Self { pool: Some(pool) })
    }

    /// Pops one block off the free list and returns its payload pointer.
    ///
    /// Returns `None` when the pool is unready or exhausted; exhaustion is a
    /// normal outcome and clears itself once outstanding blocks are freed.
    /// The returned pointer is valid for
    /// [`payload_size`](Self::payload_size) bytes and is pointer-aligned.
    /// The block is owned by the caller until passed back to
    /// [`free`](Self::free).
    pub fn allocate(&self) -> Option<NonNull<u8>> {
        let pool = self.pool.as_ref()?;
        let mut list = pool.free.lock();

        let header = list.head;
        if header.is_null() {
            return None;
        }

        // SAFETY: `header` came off the free list, so it is a valid slot
        // start inside the buffer and no caller holds it.
        unsafe {
            list.head = (*header).next;
            list.free_count -= 1;

            #[cfg(debug_assertions)]
            {
                if !(*header).is_free {
                    error!(pool_id = pool.pool_id, "free-list entry not marked free");
                    panic!("pool corruption detected: free-list entry not marked free");
                }
                (*header).is_free = false;
                (*header).canary_front = CANARY_VALUE;
                *rear_canary_ptr(header, pool.block_size) = CANARY_VALUE;
            }
        }

        // Payload sits immediately after the header; HEADER_SIZE is a
        // multiple of HEADER_ALIGN, so the payload is pointer-aligned.
        // SAFETY: HEADER_SIZE < block_size, so the result stays in the slot.
        NonNull::new(unsafe { header.cast::<u8>().add(HEADER_SIZE) })
    }

    /// Returns a block's payload pointer to the free list.
    ///
    /// No-op when the pool is unready. The pointer must be exactly one
    /// returned by [`allocate`](Self::allocate) on this pool and not yet
    /// freed.
    ///
    /// # Panics
    /// Panics on detected misuse, since continuing would corrupt the free
    /// list for every later allocation:
    /// - the pointer does not fall inside this pool's buffer
    /// - the pointer is not on a block boundary
    /// - (debug builds) the block belongs to a different pool, was already
    ///   free, or its boundary canaries were overwritten
    pub fn free(&self, ptr: NonNull<u8>) {
        let Some(pool) = self.pool.as_ref() else {
            return;
        };
        let mut list = pool.free.lock();

        let start = pool.memory.as_ptr() as usize;
        let end = start + pool.block_size * pool.block_count;
        let block_addr = (ptr.as_ptr() as usize).wrapping_sub(HEADER_SIZE);

        if block_addr < start || block_addr >= end {
            error!(ptr = ?ptr.as_ptr(), "freed pointer does not fall inside the pool buffer");
            panic!("invalid free: pointer not from this pool");
        }
        if (block_addr - start) % pool.block_size != 0 {
            error!(ptr = ?ptr.as_ptr(), "freed pointer does not sit on a block boundary");
            panic!("invalid free: pointer not aligned to a block boundary");
        }

        let header = block_addr as *mut BlockHeader;

        #[cfg(debug_assertions)]
        // SAFETY: bounds and stride checks above prove `header` is the start
        // of one of this pool's slots.
        unsafe {
            if (*header).pool_id != pool.pool_id {
                error!(
                    block_pool_id = (*header).pool_id,
                    pool_id = pool.pool_id,
                    "freed block is stamped with a different owner pool"
                );
                panic!("invalid free: block owned by a different pool");
            }
            if (*header).is_free {
                error!(ptr = ?ptr.as_ptr(), "block is already on the free list");
                panic!("double free detected");
            }
            if (*header).canary_front != CANARY_VALUE
                || *rear_canary_ptr(header, pool.block_size) != CANARY_VALUE
            {
                error!(ptr = ?ptr.as_ptr(), "block boundary canary overwritten");
                panic!("memory corruption detected: block canary overwritten");
            }
            (*header).is_free = true;
        }

        // SAFETY: the checks above prove `header` is a slot start owned by
        // this pool and (in debug builds) currently in use.
        unsafe {
            (*header).next = list.head;
        }
        list.head = header;
        list.free_count += 1;
    }

    /// Whether construction succeeded; `false` is permanent
    pub fn is_initialized(&self) -> bool {
        self.pool.is_some()
    }

    /// Byte distance between consecutive slots, zero when unready
    ///
    /// Covers the free-list header, the payload and (debug builds) the tail
    /// canary, rounded up to pointer alignment.
    pub fn block_size(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.block_size)
    }

    /// Usable bytes per block, zero when unready
    pub fn payload_size(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.payload_size)
    }

    /// Total number of blocks, zero when unready
    pub fn block_count(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.block_count)
    }

    /// Total buffer size in bytes, zero when unready
    pub fn capacity(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(0, |pool| pool.block_size * pool.block_count)
    }

    /// Number of blocks currently on the free list
    pub fn free_blocks(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.free.lock().free_count)
    }

    /// Number of blocks currently handed out
    pub fn allocated_blocks(&self) -> usize {
        self.block_count() - self.free_blocks()
    }

    /// Whether no free blocks remain
    pub fn is_full(&self) -> bool {
        self.pool
            .as_ref()
            .is_some_and(|pool| pool.free.lock().head.is_null())
    }

    /// Whether every block is on the free list
    pub fn is_empty(&self) -> bool {
        self.allocated_blocks() == 0
    }

    /// Whether an address falls inside this pool's buffer
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.pool.as_ref().is_some_and(|pool| {
            let addr = ptr as usize;
            let start = pool.memory.as_ptr() as usize;
            addr >= start && addr < start + pool.block_size * pool.block_count
        })
    }

    /// Occupancy snapshot, `None` when unready
    pub fn stats(&self) -> Option<PoolStats> {
        let pool = self.pool.as_ref()?;
        let free_blocks = pool.free.lock().free_count;
        Some(PoolStats {
            block_size: pool.block_size,
            payload_size: pool.payload_size,
            block_count: pool.block_count,
            free_blocks,
            allocated_blocks: pool.block_count - free_blocks,
        })
    }
}
