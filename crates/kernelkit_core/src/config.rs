//! Registry configuration and environment overrides.
//!
//! # Invariants
//! - Blank environment values are ignored, never applied.
//! - Generated file names are `{file_prefix}{instance_tag}_{counter}.{file_extension}`.

use std::path::PathBuf;
use uuid::Uuid;

/// Overrides the generated file name prefix.
pub const ENV_FILE_PREFIX: &str = "KERNELKIT_FILE_PREFIX";
/// Overrides the per-registry instance tag.
pub const ENV_INSTANCE_TAG: &str = "KERNELKIT_INSTANCE_TAG";
/// Directory backing the host's kernel storage.
pub const ENV_STORAGE_DIR: &str = "KERNELKIT_STORAGE_DIR";

const DEFAULT_FILE_PREFIX: &str = "_buffer_";
const DEFAULT_FILE_EXTENSION: &str = "bin";
const DEFAULT_STORAGE_DIR_NAME: &str = "kernelkit";
const INSTANCE_TAG_LEN: usize = 8;

/// Naming settings for one [`crate::KernelRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub file_prefix: String,
    pub file_extension: String,
    /// Distinguishes registries that share one storage directory.
    pub instance_tag: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            instance_tag: random_instance_tag(),
        }
    }
}

impl RegistryConfig {
    /// Defaults with `KERNELKIT_FILE_PREFIX` / `KERNELKIT_INSTANCE_TAG` applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(prefix) = non_blank(lookup(ENV_FILE_PREFIX)) {
            config.file_prefix = prefix;
        }
        if let Some(tag) = non_blank(lookup(ENV_INSTANCE_TAG)) {
            config.instance_tag = tag;
        }
        config
    }

    /// File name for the `counter`-th load.
    pub fn file_name(&self, counter: u64) -> String {
        format!(
            "{}{}_{}.{}",
            self.file_prefix, self.instance_tag, counter, self.file_extension
        )
    }
}

/// `KERNELKIT_STORAGE_DIR`, or `<temp>/kernelkit` when unset or blank.
pub fn storage_dir_from_env() -> PathBuf {
    non_blank(std::env::var(ENV_STORAGE_DIR).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_STORAGE_DIR_NAME))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn random_instance_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(INSTANCE_TAG_LEN);
    tag
}
