use std::path::Path;

use crate::config::{Config, SizePolicy};
use crate::directory::{self, Directory, DirectorySource};
use crate::error::{FsError, Result};
use crate::inode::{Inode, InodeTable, Inum, PERMISSION_BITS, S_IFDIR, S_IFMT, S_IFREG};
use crate::io::{BlockStorage, FileBlockEmulator};
use crate::layout::{BLOCK_SIZE, ROOT_INUM};
use crate::path;
use crate::store::BlockStore;

use log::{debug, info};

/// Attributes of a file or directory as reported by [`FlatFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stat {
    pub inum: Inum,
    pub refs: u32,
    pub mode: u32,
    pub size: u32,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    fn of(inum: Inum, node: &Inode) -> Self {
        Self {
            inum,
            refs: node.refs(),
            mode: node.mode(),
            size: node.size(),
        }
    }
}

/// Capacity figures for the whole image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub blocks: usize,
    pub free_blocks: usize,
    pub inodes: usize,
    pub free_inodes: usize,
}

/// A single-image file system where every file and directory owns exactly one 4K data block.
///
/// # Layout
/// ======================================================
/// | Bitmaps (block, inode) | Inode table | Data Region |
/// ======================================================
///
/// All operations take absolute `/`-delimited paths. Each one either completes or leaves the
/// image untouched, and every mutating operation writes its dirty blocks back to the device
/// before returning.
pub struct FlatFs<T: BlockStorage> {
    store: BlockStore<T>,
    config: Config,
}

impl FlatFs<FileBlockEmulator> {
    /// Opens the image file at `image`, creating and formatting it when it does not exist yet.
    pub fn mount<P: AsRef<Path>>(image: P, config: Config) -> Result<Self> {
        let dev = FileBlockEmulator::open(image, config.block_count)?;
        Self::open(dev, config)
    }
}

impl<T: BlockStorage> FlatFs<T> {
    /// Loads the image from `dev`, reserving the inode table and creating the root directory if
    /// this is the first mount.
    pub fn open(dev: T, config: Config) -> Result<Self> {
        let mut store = BlockStore::open(dev)?;
        InodeTable::init(&mut store);

        let mut fs = Self { store, config };
        if !InodeTable::is_allocated(&fs.store, ROOT_INUM) {
            fs.init_root()?;
        }
        fs.store.flush()?;
        Ok(fs)
    }

    fn init_root(&mut self) -> Result<()> {
        InodeTable::create_at(&mut self.store, ROOT_INUM, S_IFDIR | 0o755)?;
        let mut root = self.directory_mut(ROOT_INUM)?;
        root.insert(".", ROOT_INUM)?;
        root.insert("..", ROOT_INUM)?;
        info!("Initialized root directory.");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves `path` to an inode number.
    pub fn resolve(&self, path: &str) -> Result<Inum> {
        directory::resolve_path(self, path)
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let inum = self.resolve(path)?;
        Ok(self.stat_inum(inum))
    }

    /// Attributes of an inode the caller already resolved.
    pub fn stat_inum(&self, inum: Inum) -> Stat {
        Stat::of(inum, InodeTable::resolve(&self.store, inum))
    }

    /// Creates a file, or a directory populated with `.` and `..` when `mode` carries
    /// `S_IFDIR`. A mode without file-type bits creates a regular file.
    pub fn create(&mut self, path: &str, mode: u32) -> Result<Inum> {
        self.ensure_absent(path)?;
        let (parent, name) = self.parent_of(path)?;
        path::validate_name(name)?;
        if !self.directory(parent)?.has_free_slot() {
            return Err(FsError::DirectoryFull);
        }

        let mode = if mode & S_IFMT == 0 { mode | S_IFREG } else { mode };
        let inum = InodeTable::create(&mut self.store, mode)?;
        self.directory_mut(parent)?.insert(name, inum)?;
        if mode & S_IFMT == S_IFDIR {
            let mut dir = self.directory_mut(inum)?;
            dir.insert(".", inum)?;
            dir.insert("..", parent)?;
        }

        self.store.flush()?;
        debug!("create({}, {:o}) -> {}", path, mode, inum);
        Ok(inum)
    }

    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<Inum> {
        self.create(path, S_IFDIR | (mode & PERMISSION_BITS))
    }

    /// Copies up to `size` bytes starting at `offset` out of the file's block. The recorded file
    /// size is not consulted; only the block boundary limits the read.
    pub fn read(&self, path: &str, size: usize, offset: usize) -> Result<Vec<u8>> {
        let inum = self.resolve(path)?;
        let node = InodeTable::resolve(&self.store, inum);
        if node.is_dir() {
            return Err(FsError::IsADirectory);
        }

        let start = std::cmp::min(offset, BLOCK_SIZE);
        let end = std::cmp::min(start.saturating_add(size), BLOCK_SIZE);
        let data = self.store.block(node.block())[start..end].to_vec();
        debug!("read({}, {} bytes, @+{}) -> {}", path, size, offset, data.len());
        Ok(data)
    }

    /// Writes `data` at `offset` and returns the number of bytes written. Fails with
    /// `CapacityExceeded`, changing nothing, if the write or the resulting size would not fit in
    /// one block. The growth in size is added to the parent directory's size.
    pub fn write(&mut self, path: &str, data: &[u8], offset: usize) -> Result<usize> {
        let inum = self.resolve(path)?;
        let node = *InodeTable::resolve(&self.store, inum);
        if node.is_dir() {
            return Err(FsError::IsADirectory);
        }
        let (parent, _) = self.parent_of(path)?;

        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= BLOCK_SIZE)
            .ok_or(FsError::CapacityExceeded)?;
        let old_size = node.size() as usize;
        let new_size = match self.config.size_policy {
            SizePolicy::HighWaterMark => std::cmp::max(old_size, end),
            SizePolicy::Accumulate => old_size + data.len(),
        };
        if new_size > BLOCK_SIZE {
            return Err(FsError::CapacityExceeded);
        }

        self.store.block_mut(node.block())[offset..end].copy_from_slice(data);
        InodeTable::resolve_mut(&mut self.store, inum).set_size(new_size as u32);
        self.grow(parent, (new_size - old_size) as u32);

        self.store.flush()?;
        debug!("write({}, {} bytes, @+{}) -> {}", path, data.len(), offset, data.len());
        Ok(data.len())
    }

    /// Sets the size of a file, zeroing everything in the block past the new size.
    pub fn truncate(&mut self, path: &str, size: usize) -> Result<()> {
        let inum = self.resolve(path)?;
        let node = *InodeTable::resolve(&self.store, inum);
        if node.is_dir() {
            return Err(FsError::IsADirectory);
        }
        if size > BLOCK_SIZE {
            return Err(FsError::CapacityExceeded);
        }
        let (parent, _) = self.parent_of(path)?;

        for byte in self.store.block_mut(node.block())[size..].iter_mut() {
            *byte = 0;
        }
        InodeTable::resolve_mut(&mut self.store, inum).set_size(size as u32);
        let (old, new) = (node.size(), size as u32);
        if new > old {
            self.grow(parent, new - old);
        } else {
            self.shrink(parent, old - new);
        }

        self.store.flush()?;
        debug!("truncate({}, {} bytes)", path, size);
        Ok(())
    }

    /// Replaces the permission bits; the file type never changes.
    pub fn chmod(&mut self, path: &str, mode: u32) -> Result<()> {
        let inum = self.resolve(path)?;
        let node = InodeTable::resolve_mut(&mut self.store, inum);
        node.set_mode((node.mode() & S_IFMT) | (mode & PERMISSION_BITS));

        self.store.flush()?;
        debug!("chmod({}, {:04o})", path, mode);
        Ok(())
    }

    /// Removes the entry at `path`. The inode and its block are released once no entry names
    /// it anymore; other hard links keep it alive.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent, name) = self.parent_of(path)?;
        let inum = self.unlink_entry(parent, name)?;

        self.store.flush()?;
        debug!("unlink({}) -> {}", path, inum);
        Ok(())
    }

    /// Removes a directory that holds nothing but `.` and `..`.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        if !self.stat(path)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let inum = self.resolve(path)?;
        if !self.directory(inum)?.is_empty() {
            return Err(FsError::NotEmpty);
        }
        self.unlink(path)
    }

    /// Adds `to` as another name for the inode at `from`.
    pub fn link(&mut self, from: &str, to: &str) -> Result<()> {
        self.ensure_absent(to)?;
        let inum = self.resolve(from)?;
        let (parent, name) = self.parent_of(to)?;
        path::validate_name(name)?;

        self.directory_mut(parent)?.insert(name, inum)?;
        let node = InodeTable::resolve_mut(&mut self.store, inum);
        node.link();
        let size = node.size();
        self.grow(parent, size);

        self.store.flush()?;
        debug!("link({} => {}) -> {}", from, to, inum);
        Ok(())
    }

    /// Moves the entry at `from` to `to`, replacing whatever `to` named before. No data is
    /// copied. Renaming a path onto another name for the same inode does nothing.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let inum = self.resolve(from)?;
        let (from_parent, from_name) = self.parent_of(from)?;
        let (to_parent, to_name) = self.parent_of(to)?;
        path::validate_name(to_name)?;
        if path::is_dot_entry(from_name.as_bytes()) || path::is_dot_entry(to_name.as_bytes()) {
            return Err(FsError::InvalidArgument(
                "cannot rename \".\" or \"..\"".to_string(),
            ));
        }

        let replaced = match self.resolve(to) {
            Ok(existing) if existing == inum => return Ok(()),
            Ok(_) => true,
            Err(FsError::NotFound) => false,
            Err(e) => return Err(e),
        };
        let node = *InodeTable::resolve(&self.store, inum);
        if node.is_dir() && self.is_ancestor(inum, to_parent)? {
            return Err(FsError::InvalidArgument(format!(
                "cannot move {} inside itself",
                from
            )));
        }
        if !replaced && from_parent != to_parent && !self.directory(to_parent)?.has_free_slot() {
            return Err(FsError::DirectoryFull);
        }

        if replaced {
            self.unlink_entry(to_parent, to_name)?;
        }
        self.directory_mut(from_parent)?.remove(from_name)?;
        self.shrink(from_parent, node.size());
        self.directory_mut(to_parent)?.insert(to_name, inum)?;
        self.grow(to_parent, node.size());
        if node.is_dir() && from_parent != to_parent {
            self.directory_mut(inum)?.repoint("..", to_parent)?;
        }

        self.store.flush()?;
        debug!("rename({} => {}) -> {}", from, to, inum);
        Ok(())
    }

    /// Names of the live entries of a directory, in storage order.
    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        let inum = self.resolve(path)?;
        Ok(self.directory(inum)?.list())
    }

    /// Names together with the attributes of what they point at.
    pub fn read_dir(&self, path: &str) -> Result<Vec<(String, Stat)>> {
        let inum = self.resolve(path)?;
        let entries = self
            .directory(inum)?
            .entries()
            .map(|entry| (entry.name_str(), self.stat_inum(entry.inum())))
            .collect();
        Ok(entries)
    }

    pub fn usage(&self) -> Usage {
        let geometry = self.store.geometry();
        Usage {
            blocks: geometry.block_count,
            free_blocks: self.store.free_block_count(),
            inodes: geometry.inode_count,
            free_inodes: InodeTable::free_count(&self.store),
        }
    }

    /// Writes any outstanding changes to the device.
    pub fn sync(&mut self) -> Result<()> {
        self.store.flush()
    }

    /// Removes `name` from directory `parent` and drops one reference from its inode, releasing
    /// the inode when none remain. A directory is only released when empty.
    fn unlink_entry(&mut self, parent: Inum, name: &str) -> Result<Inum> {
        if path::is_dot_entry(name.as_bytes()) {
            return Err(FsError::InvalidArgument(
                "cannot unlink \".\" or \"..\"".to_string(),
            ));
        }
        let inum = self
            .directory(parent)?
            .lookup(name)
            .ok_or(FsError::NotFound)?;
        let node = *InodeTable::resolve(&self.store, inum);
        if node.is_dir() && node.refs() <= 1 && !self.directory(inum)?.is_empty() {
            return Err(FsError::NotEmpty);
        }

        self.directory_mut(parent)?.remove(name)?;
        let refs = InodeTable::resolve_mut(&mut self.store, inum).unlink()?;
        self.shrink(parent, node.size());
        if refs == 0 {
            InodeTable::release(&mut self.store, inum)?;
        }
        Ok(inum)
    }

    /// Resolves the directory that would hold `path` and returns it with the final component.
    fn parent_of<'p>(&self, path: &'p str) -> Result<(Inum, &'p str)> {
        let (parent_path, name) = path::split(path)?;
        let parent = self.resolve(&parent_path)?;
        // Fails for regular files.
        self.directory(parent)?;
        Ok((parent, name))
    }

    /// Whether directory `dir` is `of` itself or lies on the `..` chain from `of` up to the root.
    fn is_ancestor(&self, dir: Inum, of: Inum) -> Result<bool> {
        let mut cur = of;
        for _ in 0..self.store.geometry().inode_count {
            if cur == dir {
                return Ok(true);
            }
            if cur == ROOT_INUM {
                return Ok(false);
            }
            let parent = self.directory(cur)?.lookup("..");
            cur = parent.ok_or_else(|| {
                FsError::PreconditionViolated(format!("directory {} has no \"..\"", cur))
            })?;
        }
        Err(FsError::PreconditionViolated(format!(
            "\"..\" entries above directory {} form a cycle",
            of
        )))
    }

    fn ensure_absent(&self, path: &str) -> Result<()> {
        match self.resolve(path) {
            Ok(_) => Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn directory_mut(&mut self, inum: Inum) -> Result<Directory<&mut [u8]>> {
        let node = InodeTable::resolve(&self.store, inum);
        if !node.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let block = node.block();
        Ok(Directory::new(&mut self.store.block_mut(block)[..]))
    }

    fn grow(&mut self, dir: Inum, by: u32) {
        let node = InodeTable::resolve_mut(&mut self.store, dir);
        node.set_size(node.size().saturating_add(by));
    }

    fn shrink(&mut self, dir: Inum, by: u32) {
        let node = InodeTable::resolve_mut(&mut self.store, dir);
        node.set_size(node.size().saturating_sub(by));
    }
}

impl<T: BlockStorage> DirectorySource for FlatFs<T> {
    fn directory(&self, inum: Inum) -> Result<Directory<&[u8]>> {
        let node = InodeTable::resolve(&self.store, inum);
        if !node.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(Directory::new(&self.store.block(node.block())[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileBlockEmulatorBuilder;

    fn create_test_fs(blocks: usize) -> FlatFs<FileBlockEmulator> {
        let dev = FileBlockEmulatorBuilder::from(tempfile::tempfile().unwrap())
            .with_block_count(blocks)
            .build()
            .expect("Could not initialize disk emulator.");
        FlatFs::open(dev, Config::default()).unwrap()
    }

    #[test]
    fn root_dir_resolves_to_root_inode() {
        let fs = create_test_fs(64);
        assert_eq!(fs.resolve("/").unwrap(), ROOT_INUM);
        assert!(fs.stat("/").unwrap().is_dir());
        assert_eq!(fs.list("/").unwrap(), vec![".", ".."]);
    }

    #[test]
    fn file_not_found_returns_error() {
        let fs = create_test_fs(64);
        match fs.stat("/foo").unwrap_err() {
            FsError::NotFound => (),
            _ => assert!(false, "Unexpected error type."),
        }
    }

    #[test]
    fn create_then_resolve_yields_new_inode() {
        let mut fs = create_test_fs(64);
        let inum = fs.create("/foo", S_IFREG | 0o644).unwrap();
        assert_eq!(fs.resolve("/foo").unwrap(), inum);

        let st = fs.stat("/foo").unwrap();
        assert_eq!(st, Stat { inum, refs: 1, mode: S_IFREG | 0o644, size: 0 });
    }

    #[test]
    fn create_without_type_bits_makes_regular_file() {
        let mut fs = create_test_fs(64);
        fs.create("/plain", 0o600).unwrap();
        assert_eq!(fs.stat("/plain").unwrap().mode, S_IFREG | 0o600);
    }

    #[test]
    fn create_under_missing_or_file_parent_fails() {
        let mut fs = create_test_fs(64);
        match fs.create("/nope/foo", S_IFREG).unwrap_err() {
            FsError::NotFound => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        fs.create("/file", S_IFREG).unwrap();
        match fs.create("/file/foo", S_IFREG).unwrap_err() {
            FsError::NotADirectory => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        // Nothing was allocated by the failed calls.
        assert_eq!(fs.usage().free_inodes, fs.usage().inodes - 2);
    }

    #[test]
    fn read_on_directory_is_rejected() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        match fs.read("/d", 10, 0).unwrap_err() {
            FsError::IsADirectory => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        match fs.write("/d", b"x", 0).unwrap_err() {
            FsError::IsADirectory => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn read_is_clamped_to_the_block() {
        let mut fs = create_test_fs(64);
        fs.create("/f", S_IFREG).unwrap();
        assert_eq!(fs.read("/f", 100, BLOCK_SIZE - 10).unwrap().len(), 10);
        assert!(fs.read("/f", 100, BLOCK_SIZE + 10).unwrap().is_empty());
    }

    #[test]
    fn write_updates_parent_size() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/f", S_IFREG).unwrap();
        fs.write("/d/f", b"hello", 0).unwrap();
        assert_eq!(fs.stat("/d").unwrap().size, 5);

        fs.unlink("/d/f").unwrap();
        assert_eq!(fs.stat("/d").unwrap().size, 0);
    }

    #[test]
    fn truncate_zeroes_the_tail() {
        let mut fs = create_test_fs(64);
        fs.create("/f", S_IFREG).unwrap();
        fs.write("/f", b"abcdef", 0).unwrap();
        fs.truncate("/f", 2).unwrap();
        assert_eq!(fs.stat("/f").unwrap().size, 2);
        assert_eq!(fs.stat("/").unwrap().size, 2);

        fs.truncate("/f", 4).unwrap();
        assert_eq!(fs.read("/f", 4, 0).unwrap(), b"ab\0\0".to_vec());
        match fs.truncate("/f", BLOCK_SIZE + 1).unwrap_err() {
            FsError::CapacityExceeded => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn chmod_keeps_file_type() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        fs.chmod("/d", S_IFREG | 0o700).unwrap();
        assert_eq!(fs.stat("/d").unwrap().mode, S_IFDIR | 0o700);
    }

    #[test]
    fn unlink_of_dot_entries_is_rejected() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        match fs.unlink("/d/.").unwrap_err() {
            FsError::InvalidArgument(_) => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        match fs.unlink("/").unwrap_err() {
            FsError::InvalidArgument(_) => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn rmdir_requires_empty_directory() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/f", S_IFREG).unwrap();
        match fs.rmdir("/d").unwrap_err() {
            FsError::NotEmpty => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        match fs.unlink("/d").unwrap_err() {
            FsError::NotEmpty => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        match fs.rmdir("/d/f").unwrap_err() {
            FsError::NotADirectory => (),
            e => panic!("Unexpected error type: {:?}", e),
        }

        fs.unlink("/d/f").unwrap();
        fs.rmdir("/d").unwrap();
        assert_eq!(fs.list("/").unwrap(), vec![".", ".."]);
    }

    #[test]
    fn rename_directory_rewrites_parent_entry() {
        let mut fs = create_test_fs(64);
        let a = fs.mkdir("/a", 0o755).unwrap();
        let b = fs.mkdir("/b", 0o755).unwrap();
        fs.rename("/a", "/b/a").unwrap();

        assert_eq!(fs.resolve("/b/a").unwrap(), a);
        assert_eq!(fs.resolve("/b/a/..").unwrap(), b);
        match fs.rename("/b", "/b/a/b").unwrap_err() {
            FsError::InvalidArgument(_) => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
    }

    #[test]
    fn rename_into_own_subtree_via_dot_dot_is_rejected() {
        let mut fs = create_test_fs(64);
        let a = fs.mkdir("/a", 0o755).unwrap();
        fs.mkdir("/b", 0o755).unwrap();
        fs.mkdir("/a/c", 0o755).unwrap();
        let before = fs.usage();

        for to in &["/b/../a/x", "/b/../a/c/x", "/a/c/../x"] {
            match fs.rename("/a", to).unwrap_err() {
                FsError::InvalidArgument(_) => (),
                e => panic!("Unexpected error type for {}: {:?}", to, e),
            }
        }
        assert_eq!(fs.list("/").unwrap(), vec![".", "..", "a", "b"]);
        assert_eq!(fs.resolve("/a").unwrap(), a);
        assert_eq!(fs.resolve("/a/c/..").unwrap(), a);
        assert_eq!(fs.usage(), before);
    }

    #[test]
    fn rename_through_dot_dot_to_a_sibling_is_allowed() {
        let mut fs = create_test_fs(64);
        let d = fs.mkdir("/d", 0o755).unwrap();
        fs.mkdir("/p", 0o755).unwrap();

        fs.rename("/d", "/d/../e").unwrap();
        assert_eq!(fs.resolve("/e").unwrap(), d);
        assert_eq!(fs.resolve("/e/..").unwrap(), ROOT_INUM);

        let p = fs.resolve("/p").unwrap();
        fs.rename("/e", "/p/../p/e").unwrap();
        assert_eq!(fs.resolve("/p/e").unwrap(), d);
        assert_eq!(fs.resolve("/p/e/..").unwrap(), p);
    }

    #[test]
    fn rename_to_missing_parent_keeps_source() {
        let mut fs = create_test_fs(64);
        let inum = fs.create("/a", S_IFREG).unwrap();
        match fs.rename("/a", "/missing/a").unwrap_err() {
            FsError::NotFound => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        assert_eq!(fs.resolve("/a").unwrap(), inum);
    }

    #[test]
    fn link_to_full_directory_leaves_refs_alone() {
        let mut fs = create_test_fs(64);
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/f", S_IFREG).unwrap();
        // Fill every slot of /d; 126 more entries after "." and "..".
        for i in 0..crate::layout::DIRENT_COUNT - 2 {
            fs.link("/f", &format!("/d/l{}", i)).unwrap();
        }
        let refs = fs.stat("/f").unwrap().refs;
        match fs.link("/f", "/d/extra").unwrap_err() {
            FsError::DirectoryFull => (),
            e => panic!("Unexpected error type: {:?}", e),
        }
        assert_eq!(fs.stat("/f").unwrap().refs, refs);
    }

    #[test]
    fn usage_tracks_allocations() {
        let mut fs = create_test_fs(16);
        let before = fs.usage();
        assert_eq!(before.blocks, 16);
        assert_eq!(before.inodes, 10);
        // Root holds one inode and one data block.
        assert_eq!(before.free_inodes, 9);
        assert_eq!(before.free_blocks, 9);

        fs.create("/f", S_IFREG).unwrap();
        assert_eq!(fs.usage().free_inodes, 8);
        fs.unlink("/f").unwrap();
        assert_eq!(fs.usage(), before);
    }
}
