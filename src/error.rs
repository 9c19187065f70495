//! Error types for pool construction and configuration
//!
//! These errors cover the fallible *setup* surfaces only. The allocation hot
//! path never produces them: exhaustion is reported as `None` from
//! `allocate`, and integrity violations in `free` are unrecoverable and
//! panic (continuing past a corrupted free list would corrupt every
//! subsequent allocation).

use thiserror::Error;

/// Result type for pool setup operations
pub type AllocResult<T> = Result<T, AllocError>;

/// Errors produced while constructing or configuring an allocator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AllocError {
    /// Requested payload size was zero
    #[error("block payload size must be non-zero")]
    InvalidBlockSize,

    /// Requested block count was zero
    #[error("block count must be non-zero")]
    InvalidBlockCount,

    /// Stride or buffer size arithmetic overflowed
    #[error("pool size calculation overflowed")]
    SizeOverflow,

    /// The bulk memory source could not supply the backing buffer
    #[error("bulk memory source refused {requested} bytes")]
    OutOfMemory {
        /// Total buffer size that was requested
        requested: usize,
    },

    /// A slab size-class table failed validation
    #[error("invalid slab configuration: {reason}")]
    InvalidConfig {
        /// What the table violated
        reason: String,
    },
}
