//! Routes a caller buffer to the registry as one kernel or as a metakernel.

use crate::metakernel::parser::{parse_metakernel_bytes, MetakernelError};
use crate::metakernel::sniff::is_metakernel;
use crate::registry::{KernelRegistry, RegistryError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug)]
pub enum LoadError {
    Metakernel(MetakernelError),
    /// The fetch callback could not produce bytes for a listed kernel.
    Fetch { path: String, source: io::Error },
    Registry(RegistryError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Metakernel(err) => write!(f, "{err}"),
            Self::Fetch { path, source } => write!(f, "cannot fetch kernel `{path}`: {source}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Metakernel(err) => Some(err),
            Self::Fetch { source, .. } => Some(source),
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<MetakernelError> for LoadError {
    fn from(value: MetakernelError) -> Self {
        Self::Metakernel(value)
    }
}

impl From<RegistryError> for LoadError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Loads `buffer`, expanding it first when it is a metakernel.
///
/// A metakernel with `KERNELS_TO_LOAD` has each resolved path passed to
/// `fetch` and the bytes loaded in list order under `"{key}#{index}"`
/// (unkeyed when `key` is `None`). Any other buffer, including metakernel
/// look-alikes without a data section, is loaded as a single kernel.
///
/// `key` itself is never recorded for a metakernel: release its kernels one
/// by one with `unload_kernel("{key}#{index}")`. A child key that is already
/// registered (including one the caller chose) fails that load with
/// [`RegistryError::DuplicateKey`].
///
/// Returns generated paths in load order. Kernels loaded before a failure
/// stay loaded.
pub fn load_buffer<F>(
    registry: &KernelRegistry,
    buffer: &[u8],
    key: Option<&str>,
    mut fetch: F,
) -> LoadResult<Vec<String>>
where
    F: FnMut(&str) -> io::Result<Vec<u8>>,
{
    let listed = if is_metakernel(buffer) {
        parse_metakernel_bytes(buffer)?.and_then(|parsed| parsed.paths)
    } else {
        None
    };

    let Some(paths) = listed else {
        return Ok(vec![registry.load_kernel(buffer, key)?]);
    };

    info!(
        "event=metakernel_load module=loader status=start kernels={}",
        paths.len()
    );
    let mut generated = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let bytes = fetch(path).map_err(|source| LoadError::Fetch {
            path: path.clone(),
            source,
        })?;
        let child_key = key.map(|key| format!("{key}#{index}"));
        generated.push(registry.load_kernel(&bytes, child_key.as_deref())?);
    }
    Ok(generated)
}
