//! Storage for materialized kernel files.
//!
//! The registry only needs three things from storage: turn a generated file
//! name into the location the toolkit will open, write exact bytes there,
//! and delete them again.

use std::io;

mod directory;
mod memory;

pub use directory::DirectoryStorage;
pub use memory::MemoryStorage;

/// Write/delete capability for kernel files.
pub trait KernelStorage: Send + Sync {
    /// Location handed to the toolkit for a generated file name.
    fn resolve(&self, file_name: &str) -> String;
    /// Writes `bytes` verbatim at `path`, replacing nothing else.
    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()>;
    /// Deletes the file at `path`.
    fn delete(&self, path: &str) -> io::Result<()>;
}
