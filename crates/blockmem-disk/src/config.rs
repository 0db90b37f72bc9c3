use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::disk::MIN_BLOCK_SIZE;
use crate::error::{DiskError, DiskResult};

/// Geometry of a [`Disk`](crate::Disk).
///
/// Loadable from TOML:
///
/// ```toml
/// number_of_blocks = 16384
/// block_size = 4096
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Number of blocks the disk accounts for.
    pub number_of_blocks: usize,
    /// Size of each block in bytes. Must be at least [`MIN_BLOCK_SIZE`].
    pub block_size: usize,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            number_of_blocks: 16 * 1024,
            block_size: 4096,
        }
    }
}

impl DiskConfig {
    /// Configuration holding at least `capacity` bytes.
    ///
    /// A `block_size` of zero yields zero blocks, which [`validate`](Self::validate)
    /// rejects.
    pub fn with_capacity(capacity: usize, block_size: usize) -> Self {
        let number_of_blocks = if block_size == 0 {
            0
        } else {
            capacity.div_ceil(block_size)
        };
        Self {
            number_of_blocks,
            block_size,
        }
    }

    /// Total capacity in bytes, or `None` if it does not fit in `usize`.
    pub fn capacity(&self) -> Option<usize> {
        self.number_of_blocks.checked_mul(self.block_size)
    }

    /// Apply the allocator's argument checks.
    pub fn validate(&self) -> DiskResult<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(DiskError::InvalidConfig(format!(
                "block_size {} is below the minimum of {MIN_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if self.number_of_blocks == 0 {
            return Err(DiskError::InvalidConfig(
                "number_of_blocks must be positive".into(),
            ));
        }
        if self.capacity().is_none() {
            return Err(DiskError::InvalidConfig(format!(
                "{} blocks of {} bytes overflow the addressable capacity",
                self.number_of_blocks, self.block_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> DiskResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| DiskError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> DiskResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> DiskResult<String> {
        toml::to_string(self).map_err(|e| DiskError::InvalidConfig(e.to_string()))
    }
}
