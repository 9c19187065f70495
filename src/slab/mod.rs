//! Slab size-class dispatcher
//!
//! A slab composes several [`PoolAllocator`](crate::pool::PoolAllocator)s
//! with strictly ascending payload capacities and routes each sized request
//! to the first pool able to hold it. Multi-size support lives entirely
//! here; every pool underneath stays single-size.
//!
//! ## Modules
//! - `allocator` - [`SlabAllocator`] first-fit dispatch
//! - `config` - explicit size-class table ([`SlabConfig`])

pub mod allocator;
pub mod config;

pub use allocator::SlabAllocator;
pub use config::{SizeClass, SlabConfig};
