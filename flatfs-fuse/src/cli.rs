use std::path::PathBuf;

use clap::Parser;
use flatfs::layout::DEFAULT_BLOCK_COUNT;
use flatfs::SizePolicy;

/// Mount a flatfs image through FUSE.
#[derive(Debug, Parser)]
#[command(name = "flatfs-fuse", version)]
pub struct Cli {
    /// Image file; created and formatted when missing
    pub image: PathBuf,

    /// Directory to mount the image on
    pub mountpoint: PathBuf,

    /// Number of 4K blocks when the image is created
    #[arg(long, short, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: usize,

    /// How writes account for the file size
    #[arg(long, default_value_t = SizePolicy::HighWaterMark)]
    pub size_policy: SizePolicy,

    /// Mount options, comma separated
    #[arg(short = 'o', value_delimiter = ',')]
    pub options: Vec<String>,
}
