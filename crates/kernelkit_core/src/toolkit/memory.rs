//! In-process kernel pool that records furnished paths.
//!
//! Used when the native toolkit is not linked (hosts that only need parsing
//! and file lifecycle) and by tests.

use crate::toolkit::{KernelPool, ToolkitError, ToolkitResult};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct PoolState {
    furnished: Vec<String>,
    furnish_failure: Option<String>,
    unload_failure: Option<String>,
}

/// Kernel pool kept in memory, in furnish order.
#[derive(Debug, Default)]
pub struct MemoryKernelPool {
    state: Mutex<PoolState>,
}

impl MemoryKernelPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently furnished, oldest first.
    pub fn furnished(&self) -> Vec<String> {
        self.lock().furnished.clone()
    }

    pub fn is_furnished(&self, path: &str) -> bool {
        self.lock().furnished.iter().any(|entry| entry == path)
    }

    /// Makes every following `furnish` fail with `message` until cleared.
    pub fn set_furnish_failure(&self, message: Option<&str>) {
        self.lock().furnish_failure = message.map(str::to_string);
    }

    /// Makes every following `unload` fail with `message` until cleared.
    pub fn set_unload_failure(&self, message: Option<&str>) {
        self.lock().unload_failure = message.map(str::to_string);
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KernelPool for MemoryKernelPool {
    fn furnish(&self, path: &str) -> ToolkitResult<()> {
        let mut state = self.lock();
        if let Some(message) = &state.furnish_failure {
            return Err(ToolkitError::new("furnish", message.clone()));
        }
        // The toolkit ignores a second furnish of an already loaded file.
        if !state.furnished.iter().any(|entry| entry == path) {
            state.furnished.push(path.to_string());
        }
        Ok(())
    }

    fn unload(&self, path: &str) -> ToolkitResult<()> {
        let mut state = self.lock();
        if let Some(message) = &state.unload_failure {
            return Err(ToolkitError::new("unload", message.clone()));
        }
        state.furnished.retain(|entry| entry != path);
        Ok(())
    }
}
