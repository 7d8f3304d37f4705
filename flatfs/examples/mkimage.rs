use std::env;

use flatfs::{Config, FlatFs, S_IFREG};

/// Formats (or reopens) an image and drops a greeting into it.
///
/// cargo run --example mkimage -- disk.img
pub fn main() -> Result<(), flatfs::FsError> {
    let image = env::args().nth(1).unwrap_or_else(|| "flatfs.img".to_string());

    let mut fs = FlatFs::mount(&image, Config::default())?;
    if fs.resolve("/hello.txt").is_err() {
        fs.create("/hello.txt", S_IFREG | 0o644)?;
        fs.write("/hello.txt", b"hello, world\n", 0)?;
    }

    for (name, st) in fs.read_dir("/")? {
        println!("{:>6o} {:>5} {}", st.mode, st.size, name);
    }
    let usage = fs.usage();
    println!(
        "{} of {} blocks free, {} of {} inodes free",
        usage.free_blocks, usage.blocks, usage.free_inodes, usage.inodes
    );
    Ok(())
}
