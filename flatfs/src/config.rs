use std::fmt;
use std::str::FromStr;

use crate::layout::DEFAULT_BLOCK_COUNT;

/// How a write changes the recorded size of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizePolicy {
    /// `size = max(size, offset + len)`: the size is the high-water mark of written bytes.
    HighWaterMark,
    /// `size += len` on every write, even when overwriting bytes that were already counted.
    /// Matches images produced by earlier tools that kept a running total; overwrites make the
    /// size drift above the real contents.
    Accumulate,
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::HighWaterMark
    }
}

impl FromStr for SizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high-water-mark" => Ok(SizePolicy::HighWaterMark),
            "accumulate" => Ok(SizePolicy::Accumulate),
            other => Err(format!(
                "unknown size policy {:?}, expected \"high-water-mark\" or \"accumulate\"",
                other
            )),
        }
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizePolicy::HighWaterMark => write!(f, "high-water-mark"),
            SizePolicy::Accumulate => write!(f, "accumulate"),
        }
    }
}

/// Mount-time settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total blocks in the image, including the bitmap and inode table blocks. Only consulted
    /// when a new image is created by path; existing images and devices passed in directly
    /// report their own size.
    pub block_count: usize,
    pub size_policy: SizePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_count: DEFAULT_BLOCK_COUNT,
            size_policy: SizePolicy::default(),
        }
    }
}

impl Config {
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    pub fn with_size_policy(mut self, policy: SizePolicy) -> Self {
        self.size_policy = policy;
        self
    }
}
