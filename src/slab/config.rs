//! Size-class table for the slab dispatcher
//!
//! The table is an explicit, validated configuration value rather than
//! hidden global state: an ordered list of (payload size, block count)
//! pairs with strictly ascending payload sizes.

use crate::error::{AllocError, AllocResult};

/// Blocks reserved per class by the default table
pub const DEFAULT_BLOCKS_PER_CLASS: usize = 100;

/// Payload capacities of the default table, in bytes
pub const DEFAULT_CLASS_SIZES: [usize; 4] = [64, 128, 256, 512];

/// One size class: a pool stride and its block capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    /// Usable bytes per block in this class
    pub payload_size: usize,
    /// Number of blocks reserved for this class
    pub block_count: usize,
}

impl SizeClass {
    /// Creates a size class entry
    pub const fn new(payload_size: usize, block_count: usize) -> Self {
        Self {
            payload_size,
            block_count,
        }
    }
}

/// Validated, ascending size-class table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlabConfig {
    classes: Vec<SizeClass>,
}

impl SlabConfig {
    /// Builds a table from the given classes.
    ///
    /// # Errors
    /// Returns [`AllocError::InvalidConfig`] when the table is empty, any
    /// entry has a zero size or count, or payload sizes are not strictly
    /// ascending.
    pub fn new(classes: Vec<SizeClass>) -> AllocResult<Self> {
        if classes.is_empty() {
            return Err(invalid("size-class table is empty"));
        }
        for class in &classes {
            if class.payload_size == 0 {
                return Err(invalid("size class with zero payload size"));
            }
            if class.block_count == 0 {
                return Err(invalid("size class with zero block count"));
            }
        }
        for pair in classes.windows(2) {
            if pair[1].payload_size <= pair[0].payload_size {
                return Err(invalid("payload sizes must be strictly ascending"));
            }
        }
        Ok(Self { classes })
    }

    /// Builds a table from `(payload_size, block_count)` pairs.
    ///
    /// # Errors
    /// Same validation as [`SlabConfig::new`].
    pub fn from_pairs(pairs: &[(usize, usize)]) -> AllocResult<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(payload_size, block_count)| SizeClass::new(payload_size, block_count))
                .collect(),
        )
    }

    /// The validated classes, ascending by payload size
    pub fn classes(&self) -> &[SizeClass] {
        &self.classes
    }
}

impl Default for SlabConfig {
    /// The original four-class table: 64, 128, 256 and 512 bytes, 100
    /// blocks each.
    fn default() -> Self {
        Self {
            classes: DEFAULT_CLASS_SIZES
                .iter()
                .map(|&size| SizeClass::new(size, DEFAULT_BLOCKS_PER_CLASS))
                .collect(),
        }
    }
}

fn invalid(reason: &str) -> AllocError {
    AllocError::InvalidConfig {
        reason: reason.to_string(),
    }
}
