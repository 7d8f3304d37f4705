//! A minimal single-image file system.
//!
//! A flat image file is split into 4K blocks: one block of allocation bitmaps, a small inode
//! table, and data blocks. Every inode owns exactly one data block, so files are capped at 4K and
//! directories at a fixed number of entries. [`FlatFs`] exposes the file-level operations
//! (create, read, write, link, unlink, rename, ...) on absolute paths.
mod alloc;
mod config;
mod directory;
mod error;
mod fs;
mod inode;
pub mod io;
pub mod layout;
pub mod path;
mod store;

pub use crate::config::{Config, SizePolicy};
pub use crate::directory::{DirEntry, Directory, DirectorySource, SlotState};
pub use crate::error::{FsError, Result};
pub use crate::fs::{FlatFs, Stat, Usage};
pub use crate::inode::{Inum, PERMISSION_BITS, S_IFDIR, S_IFMT, S_IFREG};
