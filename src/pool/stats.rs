//! Pool occupancy snapshot

/// Point-in-time view of a pool's layout and occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Byte distance between consecutive block slots (header + payload + footer)
    pub block_size: usize,
    /// Usable bytes per block
    pub payload_size: usize,
    /// Total number of blocks
    pub block_count: usize,
    /// Blocks currently on the free list
    pub free_blocks: usize,
    /// Blocks currently handed out to callers
    pub allocated_blocks: usize,
}

impl PoolStats {
    /// Total buffer size in bytes
    pub fn capacity(&self) -> usize {
        self.block_size * self.block_count
    }

    /// Bytes currently handed out, counted in whole blocks
    pub fn used_bytes(&self) -> usize {
        self.allocated_blocks * self.block_size
    }
}
