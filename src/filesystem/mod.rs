//! Filesystem capabilities the differ and materializer are written against.

mod local;

use std::io;
use std::path::Path;
use std::time::SystemTime;

pub use local::LocalFilesystem;

/// What the differ needs to know about a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_directory: bool,
    pub modified_at: Option<SystemTime>,
}

pub trait Filesystem {
    /// Returns `Ok(None)` when nothing exists at `path`.
    async fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;
    /// Names of the directory's entries, sorted.
    async fn list_directory(&self, path: &Path) -> io::Result<Vec<String>>;
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Creates or truncates the file at `path`.
    async fn write_file(&self, path: &Path, data: Vec<u8>) -> io::Result<()>;
    /// Succeeds if the directory already exists.
    async fn create_directory_recursive(&self, path: &Path) -> io::Result<()>;
    /// Removes a file or a whole directory tree. Succeeds if nothing is there.
    async fn remove(&self, path: &Path) -> io::Result<()>;
}
