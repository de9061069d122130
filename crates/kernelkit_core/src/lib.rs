//! Core of kernelkit: metakernel parsing and kernel file lifecycle for an
//! astrodynamics toolkit.
//! The toolkit itself is reached only through the traits in [`toolkit`].

pub mod config;
pub mod loader;
pub mod logging;
pub mod metakernel;
pub mod registry;
pub mod storage;
pub mod toolkit;

pub use config::RegistryConfig;
pub use loader::{load_buffer, LoadError, LoadResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use metakernel::parser::{
    parse_metakernel, parse_metakernel_bytes, MetakernelError, MetakernelResult, ParsedMetakernel,
};
pub use metakernel::sniff::is_metakernel;
pub use metakernel::value::{parse_scalar, FieldTable, FieldValue, Scalar};
pub use registry::{KernelRecord, KernelRegistry, RegistryError, RegistryResult};
pub use storage::{DirectoryStorage, KernelStorage, MemoryStorage};
pub use toolkit::{
    chronos, KernelPool, MemoryKernelPool, TimeConverter, ToolkitError, ToolkitResult,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
