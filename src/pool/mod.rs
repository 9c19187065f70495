//! Fixed-size block pool allocator
//!
//! A pool owns one contiguous buffer sliced into equal-size blocks and
//! serves O(1) allocation/free for same-sized requests through a
//! singly-linked free list threaded through the unused blocks' own memory.
//!
//! ## Modules
//! - `allocator` - Main [`PoolAllocator`] implementation with intrusive free list
//! - `stats` - Occupancy snapshot type

pub mod allocator;
pub mod stats;

pub use allocator::PoolAllocator;
pub use stats::PoolStats;
