//! Kernel files held in process memory.

use crate::storage::KernelStorage;
use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Files {
    by_path: BTreeMap<String, Vec<u8>>,
    write_failure: Option<String>,
    delete_failure: Option<String>,
}

/// Virtual file table; paths are the generated names unchanged.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<Files>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents stored at `path`, if any.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().by_path.get(path).cloned()
    }

    /// Stored paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().by_path.keys().cloned().collect()
    }

    /// Makes every following `write` fail with `message` until cleared.
    pub fn set_write_failure(&self, message: Option<&str>) {
        self.lock().write_failure = message.map(str::to_string);
    }

    /// Makes every following `delete` fail with `message` until cleared.
    pub fn set_delete_failure(&self, message: Option<&str>) {
        self.lock().delete_failure = message.map(str::to_string);
    }

    fn lock(&self) -> MutexGuard<'_, Files> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KernelStorage for MemoryStorage {
    fn resolve(&self, file_name: &str) -> String {
        file_name.to_string()
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let mut files = self.lock();
        if let Some(message) = &files.write_failure {
            return Err(io::Error::other(message.clone()));
        }
        files.by_path.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        let mut files = self.lock();
        if let Some(message) = &files.delete_failure {
            return Err(io::Error::other(message.clone()));
        }
        match files.by_path.remove(path) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no stored kernel at `{path}`"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStorage;
    use crate::storage::KernelStorage;
    use std::io;

    #[test]
    fn stores_exact_bytes_until_deleted() {
        let storage = MemoryStorage::new();
        storage.write("k.bin", b"\x00DAF/SPK").expect("write");
        assert_eq!(storage.read("k.bin").as_deref(), Some(&b"\x00DAF/SPK"[..]));

        storage.delete("k.bin").expect("delete");
        assert!(storage.paths().is_empty());
        let err = storage.delete("k.bin").expect_err("second delete fails");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn injected_write_failure_stores_nothing() {
        let storage = MemoryStorage::new();
        storage.set_write_failure(Some("disk full"));
        assert!(storage.write("k.bin", b"x").is_err());
        assert!(storage.read("k.bin").is_none());
    }

    #[test]
    fn injected_delete_failure_keeps_file() {
        let storage = MemoryStorage::new();
        storage.write("k.bin", b"x").expect("write");
        storage.set_delete_failure(Some("read-only"));
        assert!(storage.delete("k.bin").is_err());
        assert_eq!(storage.read("k.bin").as_deref(), Some(&b"x"[..]));
    }
}
