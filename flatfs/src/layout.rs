//! On-disk geometry.
//!
//! ```text
//! ===========================================================
//! | Bitmaps (block, inode) | Inode table (5 blocks) | Data  |
//! ===========================================================
//!   block 0                  blocks 1..=5             6..n
//! ```
//!
//! Every inode owns exactly one data block, so a file can never grow past [`BLOCK_SIZE`] and the
//! number of usable inodes is bounded by the number of data blocks.

use crate::error::{FsError, Result};

pub const BLOCK_SIZE: usize = 4096;

/// Holds both allocation bitmaps; the block bitmap in the first half, the inode bitmap in the
/// second.
pub const BITMAP_BLOCK: usize = 0;
pub const BITMAP_BYTES: usize = BLOCK_SIZE / 2;

pub const INODE_TABLE_START: usize = 1;
pub const INODE_TABLE_BLOCKS: usize = 5;
pub const INODE_SIZE: usize = 16;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

/// First block handed out to inodes.
pub const DATA_START: usize = INODE_TABLE_START + INODE_TABLE_BLOCKS;

/// The root directory is created once and its id is never reallocated.
pub const ROOT_INUM: u32 = 0;

pub const MAX_NAME_LEN: usize = 24;
pub const DIRENT_SIZE: usize = 32;
pub const DIRENT_COUNT: usize = BLOCK_SIZE / DIRENT_SIZE;

/// A 1M image.
pub const DEFAULT_BLOCK_COUNT: usize = 256;

/// Sizes derived from the total block count of an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub block_count: usize,
    pub inode_count: usize,
}

impl Geometry {
    pub fn new(block_count: usize) -> Result<Self> {
        // Room for the fixed regions plus the root directory's block.
        if block_count <= DATA_START {
            return Err(FsError::InvalidArgument(format!(
                "image needs more than {} blocks, got {}",
                DATA_START, block_count
            )));
        }
        if block_count > BITMAP_BYTES * 8 {
            return Err(FsError::InvalidArgument(format!(
                "image of {} blocks exceeds bitmap capacity of {}",
                block_count,
                BITMAP_BYTES * 8
            )));
        }
        let data_blocks = block_count - DATA_START;
        Ok(Self {
            block_count,
            inode_count: std::cmp::min(data_blocks, INODE_TABLE_BLOCKS * INODES_PER_BLOCK),
        })
    }
}
