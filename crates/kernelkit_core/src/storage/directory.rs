//! Kernel files on the local file system.

use crate::storage::KernelStorage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Writes kernel files under one root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Opens `root`, creating it (and missing parents) when absent.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KernelStorage for DirectoryStorage {
    fn resolve(&self, file_name: &str) -> String {
        self.root.join(file_name).to_string_lossy().into_owned()
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::DirectoryStorage;
    use crate::storage::KernelStorage;
    use std::path::Path;

    #[test]
    fn open_creates_nested_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("a").join("b");
        let storage = DirectoryStorage::open(&root).expect("open");
        assert!(root.is_dir());
        assert_eq!(storage.root(), root.as_path());
    }

    #[test]
    fn write_then_delete_round_trips_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DirectoryStorage::open(dir.path()).expect("open");
        let path = storage.resolve("k_1.bin");
        assert!(Path::new(&path).starts_with(dir.path()));

        storage.write(&path, &[0, 159, 146, 150]).expect("write");
        assert_eq!(std::fs::read(&path).expect("read back"), vec![0, 159, 146, 150]);

        storage.delete(&path).expect("delete");
        assert!(!Path::new(&path).exists());
        assert!(storage.delete(&path).is_err());
    }
}
