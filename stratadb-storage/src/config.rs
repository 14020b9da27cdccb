//! Engine configuration.
//!
//! All knobs of the storage layer are collected in [`StorageConfig`], which
//! can be built programmatically or parsed from TOML. Containers take the
//! relevant sections at construction; the defaults match the documented
//! constants in each module.

use crate::buffer::Growth;
use crate::error::{Error, Result};
use byte_unit::Byte;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GROWTH_FACTOR: f64 = 2.0;
pub const MIN_GROWTH_FACTOR: f64 = 1.5;
pub const DEFAULT_MIN_CAPACITY: usize = 8;
pub const DEFAULT_MAX_ALLOC: Byte = Byte::from_u64(4 * 1024 * 1024 * 1024); // 4GB per container
pub const DEFAULT_LEAF_CAPACITY: usize = 256;
pub const DEFAULT_BRANCH_CAPACITY: usize = 64;
pub const DEFAULT_HASH_CAPACITY: usize = 1024;
pub const DEFAULT_HASH_LOAD_FACTOR: f64 = 0.85;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    buffer: BufferConfig,
    index: IndexConfig,
}

impl Default for StorageConfig {
    #[inline]
    fn default() -> Self {
        StorageConfig {
            buffer: BufferConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl StorageConfig {
    #[inline]
    pub fn buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    #[inline]
    pub fn index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Parse a configuration from TOML text and validate it.
    #[inline]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: StorageConfig =
            toml::from_str(s).map_err(|_| Error::InvalidConfig("malformed toml"))?;
        config.validate()?;
        Ok(config)
    }

    /// Growth policy for growable buffers.
    #[inline]
    pub fn growth(&self) -> Growth {
        Growth {
            factor: self.buffer.growth_factor,
            min_capacity: self.buffer.min_capacity,
            max_bytes: self.buffer.max_alloc.as_u64() as usize,
        }
    }

    #[inline]
    pub fn leaf_capacity(&self) -> usize {
        self.index.leaf_capacity
    }

    #[inline]
    pub fn branch_capacity(&self) -> usize {
        self.index.branch_capacity
    }

    #[inline]
    pub fn hash_capacity(&self) -> usize {
        self.index.hash_capacity
    }

    #[inline]
    pub fn hash_load_factor(&self) -> f64 {
        self.index.hash_load_factor
    }

    fn validate(&self) -> Result<()> {
        if self.buffer.growth_factor < MIN_GROWTH_FACTOR {
            return Err(Error::InvalidConfig("growth factor below 1.5"));
        }
        if self.buffer.min_capacity == 0 {
            return Err(Error::InvalidConfig("min capacity must be positive"));
        }
        if self.buffer.max_alloc.as_u64() == 0 {
            return Err(Error::InvalidConfig("max alloc must be positive"));
        }
        if self.index.leaf_capacity < 2 || self.index.branch_capacity < 2 {
            return Err(Error::InvalidConfig("node capacity below 2"));
        }
        if self.index.hash_capacity == 0 {
            return Err(Error::InvalidConfig("hash capacity must be positive"));
        }
        if !(self.index.hash_load_factor > 0.0 && self.index.hash_load_factor < 1.0) {
            return Err(Error::InvalidConfig("hash load factor out of (0,1)"));
        }
        Ok(())
    }
}

/// Growth policy of growable buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    // Multiplier applied to capacity when a push outgrows the buffer.
    pub growth_factor: f64,
    // Capacity in elements of the first allocation.
    pub min_capacity: usize,
    // Upper bound of a single container allocation.
    pub max_alloc: Byte,
}

impl Default for BufferConfig {
    #[inline]
    fn default() -> Self {
        BufferConfig {
            growth_factor: DEFAULT_GROWTH_FACTOR,
            min_capacity: DEFAULT_MIN_CAPACITY,
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }
}

/// Index structure defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    // Key-value pairs per tree leaf.
    pub leaf_capacity: usize,
    // Separator keys per tree branch node.
    pub branch_capacity: usize,
    // Initial slot count of a hash table.
    pub hash_capacity: usize,
    // Occupancy ratio that triggers a rehash.
    pub hash_load_factor: f64,
}

impl Default for IndexConfig {
    #[inline]
    fn default() -> Self {
        IndexConfig {
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            branch_capacity: DEFAULT_BRANCH_CAPACITY,
            hash_capacity: DEFAULT_HASH_CAPACITY,
            hash_load_factor: DEFAULT_HASH_LOAD_FACTOR,
        }
    }
}
