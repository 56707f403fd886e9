//! Buffer pool configuration.

use keel_common::constants::{DEFAULT_POOL_SIZE, MIN_POOL_SIZE, PAGE_SIZE};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the buffer pool.
    pub pool_size: usize,
}

impl BufferPoolConfig {
    /// Creates a configuration with the specified number of frames.
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Creates a configuration from a memory budget in bytes.
    #[must_use]
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        Self::new((memory_bytes / PAGE_SIZE).max(MIN_POOL_SIZE))
    }

    /// Returns the total frame memory used by a pool of this size.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.pool_size * PAGE_SIZE
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err("pool_size must be >= 1");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.pool_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_memory() {
        let config = BufferPoolConfig::from_memory_size(64 * 1024 * 1024);
        assert_eq!(config.pool_size, 64 * 1024 * 1024 / PAGE_SIZE);
        assert_eq!(config.memory_usage(), 64 * 1024 * 1024);
    }

    #[test]
    fn test_zero_frames_rejected() {
        let config = BufferPoolConfig::new(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
    }
}
