use crate::error::{FsError, Result};
use crate::inode::Inum;
use crate::layout::{MAX_NAME_LEN, ROOT_INUM};
use crate::path;

use byteorder::LittleEndian;
use zerocopy::byteorder::U32;
use zerocopy::{AsBytes, ByteSlice, ByteSliceMut, FromBytes, LayoutVerified, Unaligned};

/// Occupancy of a directory entry slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotState {
    /// Never written. Every slot after the first unused one is unused as well, so scans stop here.
    Unused,
    Live,
    /// Previously live and since removed. Reusable, but scans must step over it.
    Tombstoned,
}

impl SlotState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => SlotState::Live,
            2 => SlotState::Tombstoned,
            _ => SlotState::Unused,
        }
    }

    fn into_raw(self) -> u8 {
        match self {
            SlotState::Unused => 0,
            SlotState::Live => 1,
            SlotState::Tombstoned => 2,
        }
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Unaligned, Copy, Clone)]
/// Fixed-width record mapping a name to an inode, `layout::DIRENT_SIZE` bytes on disk.
pub struct DirEntry {
    /// Zero padded; a name of exactly `MAX_NAME_LEN` bytes has no terminator.
    name: [u8; MAX_NAME_LEN],
    inum: U32<LittleEndian>,
    state: u8,
    reserved: [u8; 3],
}

impl DirEntry {
    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.state)
    }

    pub fn inum(&self) -> Inum {
        self.inum.get()
    }

    pub fn name(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        &self.name[..len]
    }

    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(self.name()).into_owned()
    }

    fn is_live_named(&self, name: &str) -> bool {
        self.state() == SlotState::Live && self.name() == name.as_bytes()
    }

    fn fill(&mut self, name: &str, inum: Inum) {
        self.name = [0; MAX_NAME_LEN];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
        self.inum.set(inum);
        self.state = SlotState::Live.into_raw();
    }
}

/// The entry table of one directory: a typed view over the directory's single data block.
///
/// The table never grows; its capacity is `layout::DIRENT_COUNT` slots. Name uniqueness is not
/// enforced here, callers check with [`Directory::lookup`] before inserting.
pub struct Directory<B> {
    slots: LayoutVerified<B, [DirEntry]>,
}

impl<B: ByteSlice> Directory<B> {
    pub fn new(block: B) -> Self {
        Self {
            slots: LayoutVerified::new_slice_unaligned(block)
                .expect("directory block holds a whole number of entries"),
        }
    }

    /// Slots in storage order, up to the unused tail.
    fn written(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots
            .iter()
            .take_while(|entry| entry.state() != SlotState::Unused)
    }

    pub fn lookup(&self, name: &str) -> Option<Inum> {
        self.written()
            .find(|entry| entry.is_live_named(name))
            .map(DirEntry::inum)
    }

    /// Live entries in storage order. Each call rescans from the first slot.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.written()
            .filter(|entry| entry.state() == SlotState::Live)
    }

    pub fn list(&self) -> Vec<String> {
        self.entries().map(DirEntry::name_str).collect()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots
            .iter()
            .any(|entry| entry.state() != SlotState::Live)
    }

    /// Whether only the `.` and `..` entries remain.
    pub fn is_empty(&self) -> bool {
        self.entries()
            .all(|entry| path::is_dot_entry(entry.name()))
    }
}

impl<B: ByteSliceMut> Directory<B> {
    /// Writes a live entry into the first unused or tombstoned slot.
    pub fn insert(&mut self, name: &str, inum: Inum) -> Result<()> {
        path::validate_name(name)?;
        let slot = self
            .slots
            .iter_mut()
            .find(|entry| entry.state() != SlotState::Live)
            .ok_or(FsError::DirectoryFull)?;
        slot.fill(name, inum);
        Ok(())
    }

    /// Tombstones the live entry called `name` and returns the inode it named.
    pub fn remove(&mut self, name: &str) -> Result<Inum> {
        let slot = self
            .slots
            .iter_mut()
            .take_while(|entry| entry.state() != SlotState::Unused)
            .find(|entry| entry.is_live_named(name))
            .ok_or(FsError::NotFound)?;
        slot.state = SlotState::Tombstoned.into_raw();
        Ok(slot.inum())
    }

    /// Points an existing live entry at a different inode.
    pub fn repoint(&mut self, name: &str, inum: Inum) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .take_while(|entry| entry.state() != SlotState::Unused)
            .find(|entry| entry.is_live_named(name))
            .ok_or(FsError::NotFound)?;
        slot.inum.set(inum);
        Ok(())
    }
}

/// Gives path resolution access to directory tables without it knowing where they are stored.
pub trait DirectorySource {
    /// The entry table of directory `inum`; `NotADirectory` if `inum` names a regular file.
    fn directory(&self, inum: Inum) -> Result<Directory<&[u8]>>;
}

/// Walks `path` from the root one component at a time. The root path resolves without any scan;
/// the first missing component fails the whole walk.
pub fn resolve_path<S: DirectorySource + ?Sized>(source: &S, path: &str) -> Result<Inum> {
    path::components(path).try_fold(ROOT_INUM, |dir, name| {
        source.directory(dir)?.lookup(name).ok_or(FsError::NotFound)
    })
}
