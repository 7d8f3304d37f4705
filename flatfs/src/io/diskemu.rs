use crate::io::{BlockNumber, BlockStorage};
use crate::layout::BLOCK_SIZE;
use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::Path;

/// Emulates block disk/flash storage in userspace using a file as block storage. The image is a
/// flat file of `block_count` 4K blocks with no header.
pub struct FileBlockEmulator {
    /// The file must be a fixed-size file some exact multiple of the size of a block.
    fd: File,
    /// The total number of blocks available in the file store.
    block_count: usize,
}

impl FileBlockEmulator {
    /// Opens the image at `path`, creating it if it does not exist. `nblocks` only sizes a new
    /// (or empty) image; an existing image keeps the block count its length implies.
    pub fn open<P: AsRef<Path>>(path: P, nblocks: usize) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidData,
                "image length is not a whole number of blocks",
            ));
        }
        let blocks = match len {
            0 => nblocks,
            len => (len / BLOCK_SIZE as u64) as usize,
        };
        FileBlockEmulatorBuilder::from(file)
            .with_block_count(blocks)
            .clear_medium(false)
            .build()
    }

    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }

    fn check_range(&self, blocknr: BlockNumber) -> std::io::Result<()> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        Ok(())
    }
}

impl BlockStorage for FileBlockEmulator {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        self.check_range(blocknr)?;
        if buf.len() < BLOCK_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read block",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((blocknr * BLOCK_SIZE) as u64))?;
        self.fd.read_exact(&mut buf[..BLOCK_SIZE])
    }

    /// This method truncates writes that exceed the total block size.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        self.check_range(blocknr)?;
        self.fd
            .seek(SeekFrom::Start((blocknr * BLOCK_SIZE) as u64))?;

        let max = std::cmp::min(BLOCK_SIZE, buf.len());
        self.fd.write_all(&buf[0..max])
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.sync_all()
    }
}

pub struct FileBlockEmulatorBuilder {
    fd: File,
    block_count: usize,
    clear: bool,
}

impl From<File> for FileBlockEmulatorBuilder {
    fn from(fd: File) -> Self {
        FileBlockEmulatorBuilder {
            fd,
            block_count: 0,
            clear: true,
        }
    }
}

impl FileBlockEmulatorBuilder {
    /// Sets the number of desired blocks in the block store device.
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    /// Whether to zero every block of the medium on build. Defaults to `true`; set to `false` to
    /// reopen an image that already holds a file system.
    pub fn clear_medium(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }

    /// This builder assumed ownership of the file descriptor used and, unless told otherwise with
    /// `clear_medium(false)`, does destructive things to prepare the file for use. Additionally,
    /// ownership of the file is transfered to the emulator meaning this builder can only be used
    /// to create one emulator.
    pub fn build(mut self) -> std::io::Result<FileBlockEmulator> {
        if self.block_count == 0 {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block device must have at least one block",
            ));
        }
        if self.clear {
            self.zero_blocks()?;
        } else {
            self.grow_to_size()?;
        }
        Ok(FileBlockEmulator {
            fd: self.fd,
            block_count: self.block_count,
        })
    }

    fn zero_blocks(&mut self) -> std::io::Result<()> {
        self.fd.seek(SeekFrom::Start(0))?;
        let mut bfd = BufWriter::new(&self.fd);
        // Zero out the "disk" block, buffering each write to prevent excessive reads.
        let zeroes = [0x00; BLOCK_SIZE];
        for _ in 0..self.block_count {
            bfd.write_all(&zeroes)?;
        }
        bfd.flush()
    }

    fn grow_to_size(&mut self) -> std::io::Result<()> {
        let want = (self.block_count * BLOCK_SIZE) as u64;
        let have = self.fd.metadata()?.len();
        if have < want {
            log::info!("Growing image from {} to {} bytes.", have, want);
            self.fd.set_len(want)?;
        }
        Ok(())
    }
}
