//! Serves a [`FlatFs`] image to the kernel over FUSE.
//!
//! Every request is translated into one path-based call on the file system and its outcome into
//! a FUSE reply or an errno. Requests are handled one at a time, in the order they arrive.
mod paths;

use std::convert::TryFrom;
use std::ffi::OsStr;
use std::os::raw::c_int;
use std::time::{Duration, SystemTime};

use flatfs::io::BlockStorage;
use flatfs::layout::{BLOCK_SIZE, MAX_NAME_LEN};
use flatfs::path::join;
use flatfs::{FlatFs, FsError, Inum, Stat, PERMISSION_BITS, S_IFDIR, S_IFMT, S_IFREG};
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use log::{debug, error, info};

pub use crate::paths::{PathTable, ROOT_INO};

const TTL: Duration = Duration::from_secs(1);

/// Maps a file system error onto the errno reported to the kernel.
pub fn errno(err: &FsError) -> c_int {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::AlreadyExists => libc::EEXIST,
        FsError::NoSpace | FsError::DirectoryFull => libc::ENOSPC,
        FsError::CapacityExceeded => libc::EFBIG,
        FsError::InvalidArgument(_) => libc::EINVAL,
        FsError::NameTooLong(_) => libc::ENAMETOOLONG,
        FsError::NotADirectory => libc::ENOTDIR,
        FsError::IsADirectory => libc::EISDIR,
        FsError::NotEmpty => libc::ENOTEMPTY,
        FsError::PreconditionViolated(_) | FsError::Io(_) => libc::EIO,
    }
}

/// Translates `-o` style option names into mount options. Unknown names are forwarded verbatim.
pub fn mount_options(opts: &[String]) -> Vec<MountOption> {
    let mut options = vec![MountOption::FSName("flatfs".to_string())];
    for opt in opts.iter().filter(|opt| !opt.is_empty()) {
        let option = match opt.as_str() {
            "ro" => MountOption::RO,
            "rw" => MountOption::RW,
            "allow_other" => MountOption::AllowOther,
            "allow_root" => MountOption::AllowRoot,
            "auto_unmount" => MountOption::AutoUnmount,
            "default_permissions" => MountOption::DefaultPermissions,
            "dev" => MountOption::Dev,
            "nodev" => MountOption::NoDev,
            "suid" => MountOption::Suid,
            "nosuid" => MountOption::NoSuid,
            "exec" => MountOption::Exec,
            "noexec" => MountOption::NoExec,
            "atime" => MountOption::Atime,
            "noatime" => MountOption::NoAtime,
            "sync" => MountOption::Sync,
            "async" => MountOption::Async,
            "dirsync" => MountOption::DirSync,
            other => match other.strip_prefix("fsname=") {
                Some(name) => MountOption::FSName(name.to_string()),
                None => MountOption::CUSTOM(other.to_string()),
            },
        };
        options.push(option);
    }
    options
}

/// FUSE inode numbers start at 1 for the root, inode ids at 0.
pub fn ino_of(inum: Inum) -> u64 {
    u64::from(inum) + 1
}

fn kind_of(st: &Stat) -> FileType {
    if st.is_dir() {
        FileType::Directory
    } else {
        FileType::RegularFile
    }
}

pub struct FlatFuse<T: BlockStorage> {
    fs: FlatFs<T>,
    paths: PathTable,
    /// Reported for every timestamp; the image stores none.
    mounted_at: SystemTime,
}

impl<T: BlockStorage> FlatFuse<T> {
    pub fn new(fs: FlatFs<T>) -> Self {
        Self {
            fs,
            paths: PathTable::new(),
            mounted_at: SystemTime::now(),
        }
    }

    fn path(&self, ino: u64) -> Result<String, FsError> {
        self.paths
            .get(ino)
            .map(str::to_string)
            .ok_or(FsError::NotFound)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, FsError> {
        let name = name
            .to_str()
            .ok_or_else(|| FsError::InvalidArgument(format!("{:?} is not UTF-8", name)))?;
        Ok(join(&self.path(parent)?, name))
    }

    fn attr(&self, req: &Request<'_>, st: &Stat) -> FileAttr {
        FileAttr {
            ino: ino_of(st.inum),
            size: u64::from(st.size),
            blocks: (BLOCK_SIZE / 512) as u64,
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind: kind_of(st),
            perm: (st.mode & PERMISSION_BITS) as u16,
            nlink: st.refs,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        }
    }

    /// Stats `path` and records it as a name of the inode it resolves to.
    fn remember(&mut self, path: String) -> Result<Stat, FsError> {
        let st = self.fs.stat(&path)?;
        self.paths.insert(ino_of(st.inum), path);
        Ok(st)
    }

    fn make_node(&mut self, parent: u64, name: &OsStr, mode: u32) -> Result<Stat, FsError> {
        let path = self.child_path(parent, name)?;
        match mode & S_IFMT {
            0 | S_IFREG => self.fs.create(&path, S_IFREG | (mode & PERMISSION_BITS))?,
            S_IFDIR => self.fs.mkdir(&path, mode)?,
            _ => {
                return Err(FsError::InvalidArgument(
                    "only regular files and directories are supported".to_string(),
                ))
            }
        };
        self.remember(path)
    }

    fn set_attr(&mut self, ino: u64, mode: Option<u32>, size: Option<u64>) -> Result<Stat, FsError> {
        let path = self.path(ino)?;
        if let Some(mode) = mode {
            self.fs.chmod(&path, mode)?;
        }
        if let Some(size) = size {
            let size = usize::try_from(size).map_err(|_| FsError::CapacityExceeded)?;
            self.fs.truncate(&path, size)?;
        }
        self.fs.stat(&path)
    }

    fn remove(&mut self, parent: u64, name: &OsStr, dir: bool) -> Result<(), FsError> {
        let path = self.child_path(parent, name)?;
        if dir {
            self.fs.rmdir(&path)?;
        } else {
            self.fs.unlink(&path)?;
        }
        self.paths.remove(&path);
        Ok(())
    }

    fn move_entry(
        &mut self,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
    ) -> Result<(), FsError> {
        let from = self.child_path(parent, name)?;
        let to = self.child_path(newparent, newname)?;
        self.fs.rename(&from, &to)?;
        self.paths.rename(&from, &to);
        Ok(())
    }

    fn add_link(&mut self, ino: u64, newparent: u64, newname: &OsStr) -> Result<Stat, FsError> {
        let from = self.path(ino)?;
        let to = self.child_path(newparent, newname)?;
        self.fs.link(&from, &to)?;
        self.remember(to)
    }

    /// Reads at most up to the recorded size of the file.
    fn read_data(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>, FsError> {
        let path = self.path(ino)?;
        let offset = usize::try_from(offset)
            .map_err(|_| FsError::InvalidArgument("negative offset".to_string()))?;
        let len = self.fs.stat(&path)?.size as usize;
        let size = std::cmp::min(size as usize, len.saturating_sub(offset));
        self.fs.read(&path, size, offset)
    }

    fn write_data(&mut self, ino: u64, offset: i64, data: &[u8]) -> Result<usize, FsError> {
        let path = self.path(ino)?;
        let offset = usize::try_from(offset)
            .map_err(|_| FsError::InvalidArgument("negative offset".to_string()))?;
        self.fs.write(&path, data, offset)
    }
}

impl<T: BlockStorage> Filesystem for FlatFuse<T> {
    fn destroy(&mut self) {
        match self.fs.sync() {
            Ok(()) => info!("Unmounted cleanly."),
            Err(e) => error!("Failed to sync image on unmount: {}", e),
        }
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.child_path(parent, name).and_then(|path| self.remember(path)) {
            Ok(st) => reply.entry(&TTL, &self.attr(req, &st), 0),
            Err(e) => {
                debug!("lookup({}, {:?}) -> {}", parent, name, e);
                reply.error(errno(&e))
            }
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.path(ino).and_then(|path| self.fs.stat(&path)) {
            Ok(st) => reply.attr(&TTL, &self.attr(req, &st)),
            Err(e) => {
                debug!("getattr({}) -> {}", ino, e);
                reply.error(errno(&e))
            }
        }
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.set_attr(ino, mode, size) {
            Ok(st) => reply.attr(&TTL, &self.attr(req, &st)),
            Err(e) => {
                debug!("setattr({}, {:?}, {:?}) -> {}", ino, mode, size, e);
                reply.error(errno(&e))
            }
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        match self.make_node(parent, name, mode & !umask) {
            Ok(st) => reply.entry(&TTL, &self.attr(req, &st), 0),
            Err(e) => {
                debug!("mknod({}, {:?}, {:o}) -> {}", parent, name, mode, e);
                reply.error(errno(&e))
            }
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        match self.make_node(parent, name, S_IFDIR | (mode & !umask)) {
            Ok(st) => reply.entry(&TTL, &self.attr(req, &st), 0),
            Err(e) => {
                debug!("mkdir({}, {:?}, {:o}) -> {}", parent, name, mode, e);
                reply.error(errno(&e))
            }
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.remove(parent, name, false) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!("unlink({}, {:?}) -> {}", parent, name, e);
                reply.error(errno(&e))
            }
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.remove(parent, name, true) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!("rmdir({}, {:?}) -> {}", parent, name, e);
                reply.error(errno(&e))
            }
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        match self.move_entry(parent, name, newparent, newname) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!("rename({}, {:?} => {}, {:?}) -> {}", parent, name, newparent, newname, e);
                reply.error(errno(&e))
            }
        }
    }

    fn link(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        match self.add_link(ino, newparent, newname) {
            Ok(st) => reply.entry(&TTL, &self.attr(req, &st), 0),
            Err(e) => {
                debug!("link({} => {}, {:?}) -> {}", ino, newparent, newname, e);
                reply.error(errno(&e))
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_data(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                debug!("read({}, {} bytes, @+{}) -> {}", ino, size, offset, e);
                reply.error(errno(&e))
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.write_data(ino, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => {
                debug!("write({}, {} bytes, @+{}) -> {}", ino, data.len(), offset, e);
                reply.error(errno(&e))
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.path(ino).and_then(|path| self.fs.read_dir(&path)) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("readdir({}) -> {}", ino, e);
                return reply.error(errno(&e));
            }
        };
        for (i, (name, st)) in entries.iter().enumerate().skip(offset.max(0) as usize) {
            // The offset handed back is where the next call resumes.
            if reply.add(ino_of(st.inum), (i + 1) as i64, kind_of(st), name) {
                break;
            }
        }
        reply.ok()
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let usage = self.fs.usage();
        reply.statfs(
            usage.blocks as u64,
            usage.free_blocks as u64,
            usage.free_blocks as u64,
            usage.inodes as u64,
            usage.free_inodes as u64,
            BLOCK_SIZE as u32,
            MAX_NAME_LEN as u32,
            BLOCK_SIZE as u32,
        )
    }

    /// Only existence is checked; permission bits are stored but never enforced.
    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.path(ino).and_then(|path| self.fs.resolve(&path)) {
            Ok(_) => reply.ok(),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match self.make_node(parent, name, mode & !umask) {
            Ok(st) => reply.created(&TTL, &self.attr(req, &st), 0, 0, 0),
            Err(e) => {
                debug!("create({}, {:?}, {:o}) -> {}", parent, name, mode, e);
                reply.error(errno(&e))
            }
        }
    }
}
