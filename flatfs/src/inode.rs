use crate::alloc::State;
use crate::error::{FsError, Result};
use crate::io::BlockStorage;
use crate::layout::{INODES_PER_BLOCK, INODE_TABLE_BLOCKS, INODE_TABLE_START};
use crate::store::BlockStore;

use byteorder::LittleEndian;
use log::{debug, info, warn};
use zerocopy::byteorder::U32;
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

/// Inode number; doubles as the record's index in the inode table.
pub type Inum = u32;

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;
pub const PERMISSION_BITS: u32 = 0o7777;

#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Copy, Clone)]
/// This structure __must be exactly 16 bytes__ (`layout::INODE_SIZE`).
pub struct Inode {
    /// The number of directory entries naming this inode.
    refs: U32<LittleEndian>,
    /// File type and permission bits (e.g. `S_IFDIR | 0o755`).
    mode: U32<LittleEndian>,
    /// Bytes recorded as valid in the data block.
    size: U32<LittleEndian>,
    /// The single data block holding the contents. Fixed for the lifetime of the inode.
    block: U32<LittleEndian>,
}

impl Inode {
    pub fn refs(&self) -> u32 {
        self.refs.get()
    }

    pub fn mode(&self) -> u32 {
        self.mode.get()
    }

    pub fn size(&self) -> u32 {
        self.size.get()
    }

    pub fn block(&self) -> usize {
        self.block.get() as usize
    }

    pub fn is_dir(&self) -> bool {
        self.mode() & S_IFMT == S_IFDIR
    }

    pub fn set_mode(&mut self, mode: u32) {
        self.mode.set(mode);
    }

    pub fn set_size(&mut self, size: u32) {
        self.size.set(size);
    }

    pub fn link(&mut self) {
        self.refs.set(self.refs() + 1);
    }

    /// Drops one reference and returns how many remain.
    pub fn unlink(&mut self) -> Result<u32> {
        let refs = self.refs().checked_sub(1).ok_or_else(|| {
            FsError::PreconditionViolated("unlinking an inode with no references".to_string())
        })?;
        self.refs.set(refs);
        Ok(refs)
    }

    fn reset(&mut self, mode: u32, block: usize) {
        self.refs.set(1);
        self.mode.set(mode);
        self.size.set(0);
        self.block.set(block as u32);
    }
}

/// Manages the inode table, a fixed run of blocks right after the bitmap block.
///
/// The table holds no state of its own; records are typed views into the block store, located by
/// pure arithmetic on the inode number.
pub struct InodeTable;

impl InodeTable {
    /// Marks the table's blocks as used in the block bitmap. Returns `false` if that already
    /// happened on an earlier mount.
    pub fn init<T: BlockStorage>(store: &mut BlockStore<T>) -> bool {
        if store.block_bitmap().get(INODE_TABLE_START) == State::Used {
            return false;
        }
        let mut blocks = store.block_bitmap_mut();
        // The bitmap block itself is never handed out either.
        blocks.set_reserved(0);
        for nr in INODE_TABLE_START..INODE_TABLE_START + INODE_TABLE_BLOCKS {
            blocks.set_reserved(nr);
        }
        info!("Initialized inode table.");
        true
    }

    /// Reserves the lowest free inode number.
    pub fn allocate<T: BlockStorage>(store: &mut BlockStore<T>) -> Result<Inum> {
        let cap = store.geometry().inode_count;
        let inum = store.inode_bitmap().first_free(cap).ok_or(FsError::NoSpace)?;
        store.inode_bitmap_mut().set_reserved(inum);
        debug!("alloc_inode() -> {}", inum);
        Ok(inum as Inum)
    }

    /// Allocates an inode together with its data block and initializes the record to
    /// `{refs: 1, mode, size: 0, block}`. Nothing stays reserved on failure.
    pub fn create<T: BlockStorage>(store: &mut BlockStore<T>, mode: u32) -> Result<Inum> {
        let inum = Self::allocate(store)?;
        Self::attach_block(store, inum, mode)?;
        Ok(inum)
    }

    /// Like [`InodeTable::create`] for a well-known id such as the root.
    pub fn create_at<T: BlockStorage>(store: &mut BlockStore<T>, inum: Inum, mode: u32) -> Result<()> {
        if Self::is_allocated(store, inum) {
            return Err(FsError::PreconditionViolated(format!(
                "inode {} is already allocated",
                inum
            )));
        }
        store.inode_bitmap_mut().set_reserved(inum as usize);
        Self::attach_block(store, inum, mode)
    }

    fn attach_block<T: BlockStorage>(store: &mut BlockStore<T>, inum: Inum, mode: u32) -> Result<()> {
        let block = match store.alloc_block() {
            Some(block) => block,
            None => {
                store.inode_bitmap_mut().set_free(inum as usize);
                warn!("No data block left for inode {}, released it again.", inum);
                return Err(FsError::NoSpace);
            }
        };
        Self::resolve_mut(store, inum).reset(mode, block);
        Ok(())
    }

    /// Returns the id to the free pool. The inode must no longer be referenced.
    pub fn free<T: BlockStorage>(store: &mut BlockStore<T>, inum: Inum) -> Result<()> {
        let refs = Self::resolve(store, inum).refs();
        if refs != 0 {
            return Err(FsError::PreconditionViolated(format!(
                "freeing inode {} with {} references",
                inum, refs
            )));
        }
        store.inode_bitmap_mut().set_free(inum as usize);
        debug!("free_inode({})", inum);
        Ok(())
    }

    /// Releases an unreferenced inode and the data block it owns.
    pub fn release<T: BlockStorage>(store: &mut BlockStore<T>, inum: Inum) -> Result<()> {
        let block = Self::resolve(store, inum).block();
        Self::free(store, inum)?;
        store.free_block(block);
        Ok(())
    }

    pub fn free_count<T: BlockStorage>(store: &BlockStore<T>) -> usize {
        let cap = store.geometry().inode_count;
        cap - store.inode_bitmap().count_used(cap)
    }

    pub fn is_allocated<T: BlockStorage>(store: &BlockStore<T>, inum: Inum) -> bool {
        (inum as usize) < store.geometry().inode_count
            && store.inode_bitmap().get(inum as usize) == State::Used
    }

    /// Resolving an id that is not allocated yields whatever the slot last held.
    pub fn resolve<T: BlockStorage>(store: &BlockStore<T>, inum: Inum) -> &Inode {
        let (block, slot) = Self::locate(inum);
        let records = LayoutVerified::<_, [Inode]>::new_slice_unaligned(&store.block(block)[..])
            .expect("inode table block holds a whole number of records");
        &records.into_slice()[slot]
    }

    pub fn resolve_mut<T: BlockStorage>(store: &mut BlockStore<T>, inum: Inum) -> &mut Inode {
        let (block, slot) = Self::locate(inum);
        let records =
            LayoutVerified::<_, [Inode]>::new_slice_unaligned(&mut store.block_mut(block)[..])
                .expect("inode table block holds a whole number of records");
        &mut records.into_mut_slice()[slot]
    }

    fn locate(inum: Inum) -> (usize, usize) {
        let inum = inum as usize;
        assert!(
            inum < INODE_TABLE_BLOCKS * INODES_PER_BLOCK,
            "inode {} outside the table",
            inum
        );
        (INODE_TABLE_START + inum / INODES_PER_BLOCK, inum % INODES_PER_BLOCK)
    }
}
