//! Capture parameters: NAND geometry and retry policy.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default NAND size: 512 MiB.
pub const DEFAULT_NAND_SIZE: u64 = 512 * 1024 * 1024;
/// Default erase-block size: 128 KiB.
pub const DEFAULT_BLOCK_SIZE: u32 = 128 * 1024;
/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 2048;
/// Default per-page retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("page size must be non-zero")]
    ZeroPageSize,

    #[error("block size {block_size} is not a multiple of page size {page_size}")]
    BlockNotPageMultiple { block_size: u32, page_size: u32 },

    #[error("NAND size {nand_size} is not a multiple of block size {block_size}")]
    NandNotBlockMultiple { nand_size: u64, block_size: u32 },
}

/// Geometry and policy for one capture session; fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureParams {
    /// Total NAND size in bytes.
    pub nand_size: u64,
    /// Erase-block size in bytes.
    pub block_size: u32,
    /// Page size in bytes; every captured page is exactly this long.
    pub page_size: u32,
    /// Attempts per page before the capture is aborted.
    pub max_retries: u32,
    /// The console dumps a spare area after each page's main area.
    pub spare_area: bool,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            nand_size: DEFAULT_NAND_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            spare_area: false,
        }
    }
}

impl CaptureParams {
    /// Check that the geometry divides evenly at every level.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.page_size == 0 {
            return Err(ParamsError::ZeroPageSize);
        }
        if self.block_size == 0 || self.block_size % self.page_size != 0 {
            return Err(ParamsError::BlockNotPageMultiple {
                block_size: self.block_size,
                page_size: self.page_size,
            });
        }
        if self.nand_size == 0 || self.nand_size % u64::from(self.block_size) != 0 {
            return Err(ParamsError::NandNotBlockMultiple {
                nand_size: self.nand_size,
                block_size: self.block_size,
            });
        }
        Ok(())
    }

    /// Pages per erase block.
    pub fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }

    /// Blocks in the whole NAND.
    pub fn blocks(&self) -> u32 {
        (self.nand_size / u64::from(self.block_size)) as u32
    }

    /// Pages in the whole NAND.
    pub fn total_pages(&self) -> u64 {
        self.nand_size / u64::from(self.page_size)
    }

    /// Load parameters from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params: CaptureParams = toml::from_str(&content)?;
        Ok(params)
    }

    /// Save parameters to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
