//! Fixed-size block pool allocation with slab size-class dispatch
//!
//! This crate provides two allocation primitives:
//!
//! - [`PoolAllocator`] — owns one contiguous buffer sliced into equal-size
//!   blocks and serves O(1) allocate/free through an intrusive free list
//!   threaded through the unused blocks themselves.
//! - [`SlabAllocator`] — composes several pools with ascending block sizes
//!   and routes each sized request to the first pool large enough to hold it.
//!
//! Exhaustion is a normal outcome reported as `None`; misuse of `free`
//! (foreign pointers, double frees, overwritten block boundaries) is treated
//! as an unrecoverable programmer error and panics with a diagnostic.
//! Debug builds additionally stamp every block with ownership and canary
//! markers so corruption is caught at the `free` that observes it.
//!
//! # Example
//!
//! ```
//! use slabpool::{PoolAllocator, SlabAllocator};
//!
//! // Fixed-size use case: one pool, one block size.
//! let pool = PoolAllocator::new(64, 16);
//! let block = pool.allocate().expect("fresh pool has free blocks");
//! pool.free(block);
//!
//! // Variable-size use case: the slab picks the size class.
//! let slab = SlabAllocator::new();
//! let ptr = slab.allocate(200).expect("fits the 256-byte class");
//! slab.free(ptr, 200);
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod pool;
pub mod slab;
pub mod utils;

pub use error::{AllocError, AllocResult};
pub use pool::{PoolAllocator, PoolStats};
pub use slab::{SizeClass, SlabAllocator, SlabConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
