mod cli;

use std::error::Error;

use clap::Parser;
use flatfs::{Config, FlatFs};
use flatfs_fuse::{mount_options, FlatFuse};
use log::info;

use crate::cli::Cli;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::default()
        .with_block_count(cli.blocks)
        .with_size_policy(cli.size_policy);
    let fs = FlatFs::mount(&cli.image, config)?;
    let usage = fs.usage();
    info!(
        "Mounting {:?} on {:?}: {}/{} blocks free, {}/{} inodes free.",
        cli.image, cli.mountpoint, usage.free_blocks, usage.blocks, usage.free_inodes, usage.inodes
    );

    fuser::mount2(FlatFuse::new(fs), &cli.mountpoint, &mount_options(&cli.options))?;
    Ok(())
}
