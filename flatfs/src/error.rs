use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("found no file at path")]
    NotFound,
    #[error("file already exists at path")]
    AlreadyExists,
    #[error("no free inodes or data blocks left")]
    NoSpace,
    #[error("directory has no free entry slots")]
    DirectoryFull,
    #[error("write would exceed the single block capacity of a file")]
    CapacityExceeded,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("name longer than {0} bytes")]
    NameTooLong(usize),
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    NotEmpty,
    /// An internal invariant was broken, e.g. releasing an inode that is still referenced. This is
    /// a bug in the caller rather than a condition a user can cause.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),
    #[error("device I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
