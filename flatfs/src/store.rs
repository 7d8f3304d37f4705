use std::collections::BTreeSet;

use crate::alloc::{Bitmap, State};
use crate::error::Result;
use crate::io::BlockStorage;
use crate::layout::{Geometry, BITMAP_BLOCK, BITMAP_BYTES, BLOCK_SIZE, DATA_START};

use log::debug;

/// Block-addressed image held in memory.
///
/// The device is read once when the store is opened; afterwards every block lives in an arena of
/// fixed-size buffers and all mutation happens there. Blocks handed out through
/// [`BlockStore::block_mut`] are remembered as dirty and written back by [`BlockStore::flush`].
pub struct BlockStore<T: BlockStorage> {
    dev: T,
    geometry: Geometry,
    blocks: Vec<[u8; BLOCK_SIZE]>,
    dirty: BTreeSet<usize>,
}

impl<T: BlockStorage> BlockStore<T> {
    pub fn open(mut dev: T) -> Result<Self> {
        let geometry = Geometry::new(dev.block_count())?;
        let mut blocks = vec![[0u8; BLOCK_SIZE]; geometry.block_count];
        for (nr, block) in blocks.iter_mut().enumerate() {
            dev.read_block(nr, block)?;
        }
        debug!("Loaded {} blocks from device.", geometry.block_count);

        Ok(Self {
            dev,
            geometry,
            blocks,
            dirty: BTreeSet::new(),
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Panics when `nr` is outside the image; block numbers only come from the allocator and the
    /// fixed layout.
    pub fn block(&self, nr: usize) -> &[u8; BLOCK_SIZE] {
        &self.blocks[nr]
    }

    pub fn block_mut(&mut self, nr: usize) -> &mut [u8; BLOCK_SIZE] {
        self.dirty.insert(nr);
        &mut self.blocks[nr]
    }

    /// Allocation state of data blocks.
    pub fn block_bitmap(&self) -> Bitmap<&[u8]> {
        Bitmap::new(&self.blocks[BITMAP_BLOCK][..BITMAP_BYTES])
    }

    pub fn block_bitmap_mut(&mut self) -> Bitmap<&mut [u8]> {
        Bitmap::new(&mut self.block_mut(BITMAP_BLOCK)[..BITMAP_BYTES])
    }

    /// Allocation state of inode ids.
    pub fn inode_bitmap(&self) -> Bitmap<&[u8]> {
        Bitmap::new(&self.blocks[BITMAP_BLOCK][BITMAP_BYTES..])
    }

    pub fn inode_bitmap_mut(&mut self) -> Bitmap<&mut [u8]> {
        Bitmap::new(&mut self.block_mut(BITMAP_BLOCK)[BITMAP_BYTES..])
    }

    /// Reserves the first free data block and zeroes it so a new owner never sees the contents of
    /// a previous one.
    pub fn alloc_block(&mut self) -> Option<usize> {
        let cap = self.geometry.block_count;
        let nr = (DATA_START..cap).find(|&nr| self.block_bitmap().get(nr) == State::Free)?;
        self.block_bitmap_mut().set_reserved(nr);
        *self.block_mut(nr) = [0; BLOCK_SIZE];
        debug!("alloc_block() -> {}", nr);
        Some(nr)
    }

    pub fn free_block(&mut self, nr: usize) {
        self.block_bitmap_mut().set_free(nr);
        debug!("free_block({})", nr);
    }

    pub fn free_block_count(&self) -> usize {
        let cap = self.geometry.block_count;
        cap - self.block_bitmap().count_used(cap)
    }

    /// Writes every dirty block back to the device and syncs it.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        for &nr in self.dirty.iter() {
            self.dev.write_block(nr, &self.blocks[nr])?;
        }
        debug!("Flushed {} blocks.", self.dirty.len());
        self.dirty.clear();
        self.dev.sync_disk()?;
        Ok(())
    }
}
