//! FFI use-case API for host-application calls.
//!
//! # Responsibility
//! - Expose metakernel parsing and kernel lifecycle to the host via FRB.
//! - Own the process-scoped registry the host shares across calls.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Failures are reported in response envelopes, never thrown.
//! - Kernel pool calls reach the native toolkit only with the `cspice`
//!   feature; otherwise an in-process pool records registrations.

use kernelkit_core::config::storage_dir_from_env;
use kernelkit_core::{
    core_version as core_version_inner, default_log_level, init_logging as init_logging_inner,
    is_metakernel as is_metakernel_inner, parse_metakernel as parse_metakernel_inner,
    ping as ping_inner, DirectoryStorage, KernelPool, KernelRegistry, RegistryConfig,
};
use log::warn;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<KernelRegistry> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// A blank `level` selects the build's default level. Returns an empty
/// string on success and the error message otherwise. Repeating the call
/// with identical arguments is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = if level.trim().is_empty() {
        default_log_level()
    } else {
        level.as_str()
    };
    match init_logging_inner(level, log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Whether `contents` looks like a metakernel (advisory).
#[flutter_rust_bridge::frb(sync)]
pub fn is_metakernel(contents: Vec<u8>) -> bool {
    is_metakernel_inner(&contents)
}

/// Parse outcome for one metakernel text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetakernelResponse {
    /// False only for malformed data sections.
    pub ok: bool,
    /// Whether a `\begindata` section was found.
    pub has_data: bool,
    /// Resolved `KERNELS_TO_LOAD`, when present.
    pub paths: Option<Vec<String>>,
    /// Field table as a JSON object (`{}` when there is no data section).
    pub fields_json: String,
    pub message: String,
}

/// Outcome of a load or unload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelActionResponse {
    pub ok: bool,
    /// Generated storage path for successful loads.
    pub generated_path: Option<String>,
    pub message: String,
}

impl KernelActionResponse {
    fn success(message: impl Into<String>, generated_path: Option<String>) -> Self {
        Self {
            ok: true,
            generated_path,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            generated_path: None,
            message: message.into(),
        }
    }
}

/// Outcome of a `chronos` conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChronosResponse {
    pub ok: bool,
    /// Trimmed converted time; empty on failure.
    pub output: String,
    pub message: String,
}

/// Parses metakernel text.
///
/// # FFI contract
/// - Sync call, pure; touches neither storage nor the toolkit.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn parse_metakernel(text: String) -> MetakernelResponse {
    let parsed = match parse_metakernel_inner(&text) {
        Ok(parsed) => parsed,
        Err(err) => {
            return MetakernelResponse {
                ok: false,
                has_data: true,
                paths: None,
                fields_json: "{}".to_string(),
                message: format!("parse_metakernel failed: {err}"),
            };
        }
    };

    let Some(parsed) = parsed else {
        return MetakernelResponse {
            ok: true,
            has_data: false,
            paths: None,
            fields_json: "{}".to_string(),
            message: "No data section.".to_string(),
        };
    };

    match serde_json::to_string(&parsed.fields) {
        Ok(fields_json) => MetakernelResponse {
            ok: true,
            has_data: true,
            message: format!("Parsed {} field(s).", parsed.fields.len()),
            paths: parsed.paths,
            fields_json,
        },
        Err(err) => MetakernelResponse {
            ok: false,
            has_data: true,
            paths: parsed.paths,
            fields_json: "{}".to_string(),
            message: format!("parse_metakernel failed: {err}"),
        },
    }
}

/// Stores and furnishes one kernel buffer.
///
/// # FFI contract
/// - Sync call; writes one file under the storage directory.
/// - Never panics.
/// - With `key`, the kernel can be released through [`unload_kernel`].
#[flutter_rust_bridge::frb(sync)]
pub fn load_kernel(buffer: Vec<u8>, key: Option<String>) -> KernelActionResponse {
    let registry = match registry() {
        Ok(registry) => registry,
        Err(err) => return KernelActionResponse::failure(err),
    };
    match registry.load_kernel(&buffer, key.as_deref()) {
        Ok(path) => KernelActionResponse::success("Kernel loaded.", Some(path)),
        Err(err) => KernelActionResponse::failure(format!("load_kernel failed: {err}")),
    }
}

/// Unfurnishes and deletes the kernel registered under `key`.
#[flutter_rust_bridge::frb(sync)]
pub fn unload_kernel(key: String) -> KernelActionResponse {
    let registry = match registry() {
        Ok(registry) => registry,
        Err(err) => return KernelActionResponse::failure(err),
    };
    match registry.unload_kernel(&key) {
        Ok(()) => KernelActionResponse::success("Kernel unloaded.", None),
        Err(err) => KernelActionResponse::failure(format!("unload_kernel failed: {err}")),
    }
}

/// Converts `input_time` with the toolkit's `chronos` command line.
#[flutter_rust_bridge::frb(sync)]
pub fn chronos(input_time: String, command_line: String) -> ChronosResponse {
    match run_chronos(&input_time, &command_line) {
        Ok(output) => ChronosResponse {
            ok: true,
            output,
            message: String::new(),
        },
        Err(err) => ChronosResponse {
            ok: false,
            output: String::new(),
            message: format!("chronos failed: {err}"),
        },
    }
}

fn registry() -> Result<&'static KernelRegistry, String> {
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry);
    }

    let dir = storage_dir_from_env();
    let storage = DirectoryStorage::open(&dir).map_err(|err| {
        warn!(
            "event=registry_init module=ffi status=error dir={}",
            dir.display()
        );
        format!("kernel storage open failed at `{}`: {err}", dir.display())
    })?;
    let registry = KernelRegistry::new(
        Arc::new(storage),
        toolkit_pool()?,
        RegistryConfig::from_env(),
    );
    Ok(REGISTRY.get_or_init(|| registry))
}

#[cfg(feature = "cspice")]
fn native_toolkit() -> Result<Arc<kernelkit_core::toolkit::native::NativeToolkit>, String> {
    static TOOLKIT: OnceLock<Arc<kernelkit_core::toolkit::native::NativeToolkit>> =
        OnceLock::new();
    if let Some(toolkit) = TOOLKIT.get() {
        return Ok(toolkit.clone());
    }
    let toolkit = kernelkit_core::toolkit::native::NativeToolkit::new()
        .map_err(|err| format!("toolkit init failed: {err}"))?;
    Ok(TOOLKIT.get_or_init(|| Arc::new(toolkit)).clone())
}

#[cfg(feature = "cspice")]
fn toolkit_pool() -> Result<Arc<dyn KernelPool>, String> {
    let pool: Arc<dyn KernelPool> = native_toolkit()?;
    Ok(pool)
}

#[cfg(not(feature = "cspice"))]
fn toolkit_pool() -> Result<Arc<dyn KernelPool>, String> {
    let pool: Arc<dyn KernelPool> = Arc::new(kernelkit_core::MemoryKernelPool::new());
    Ok(pool)
}

#[cfg(feature = "cspice")]
fn run_chronos(input_time: &str, command_line: &str) -> Result<String, String> {
    let toolkit = native_toolkit()?;
    kernelkit_core::chronos(toolkit.as_ref(), input_time, command_line)
        .map_err(|err| err.to_string())
}

#[cfg(not(feature = "cspice"))]
fn run_chronos(_input_time: &str, _command_line: &str) -> Result<String, String> {
    Err("native toolkit is not linked (build with the `cspice` feature)".to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        chronos, core_version, init_logging, is_metakernel, load_kernel, parse_metakernel, ping,
        registry, unload_kernel,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_relative_dir_and_bad_level() {
        assert!(!init_logging("info".to_string(), "tmp/logs".to_string()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn init_logging_blank_level_uses_default_and_still_checks_dir() {
        let error = init_logging("  ".to_string(), "tmp/logs".to_string());
        assert!(error.contains("absolute"), "{error}");
    }

    #[test]
    fn padded_key_round_trips_unchanged() {
        let key = format!("  {}  ", unique_token("ffi-padded"));
        let loaded = load_kernel(b"x".to_vec(), Some(key.clone()));
        assert!(loaded.ok, "{}", loaded.message);
        assert!(registry().expect("registry").contains_key(&key));

        let unloaded = unload_kernel(key.clone());
        assert!(unloaded.ok, "{}", unloaded.message);
        assert!(!registry().expect("registry").contains_key(&key));
    }

    #[test]
    fn is_metakernel_probes_bytes() {
        assert!(is_metakernel(b"KERNELS_TO_LOAD = ( 'a' )".to_vec()));
        assert!(!is_metakernel(vec![0, 1, 2]));
    }

    #[test]
    fn parse_metakernel_reports_paths_and_fields_json() {
        let response = parse_metakernel(
            "\\begindata\nKERNELS_TO_LOAD = ( '$A/x.bsp' )\nPATH_SYMBOLS = ( 'A' )\nPATH_VALUES = ( '/k' )\n\\begintext"
                .to_string(),
        );
        assert!(response.ok, "{}", response.message);
        assert!(response.has_data);
        assert_eq!(response.paths, Some(vec!["/k/x.bsp".to_string()]));
        assert!(response.fields_json.contains("\"PATH_VALUES\":[\"/k\"]"));
    }

    #[test]
    fn parse_metakernel_distinguishes_missing_and_malformed_sections() {
        let plain = parse_metakernel("just text".to_string());
        assert!(plain.ok);
        assert!(!plain.has_data);
        assert_eq!(plain.fields_json, "{}");

        let broken = parse_metakernel("\\begindata\nNOPE\n\\begintext".to_string());
        assert!(!broken.ok);
        assert!(broken.message.contains("not an assignment"));
    }

    #[test]
    fn load_and_unload_through_process_registry() {
        let key = unique_token("ffi-kernel");
        let loaded = load_kernel(b"DAF/SPK".to_vec(), Some(key.clone()));
        assert!(loaded.ok, "{}", loaded.message);
        let path = loaded.generated_path.expect("load returns generated path");
        assert_eq!(std::fs::read(&path).expect("file written"), b"DAF/SPK".to_vec());

        let duplicate = load_kernel(b"other".to_vec(), Some(key.clone()));
        assert!(!duplicate.ok);
        assert!(duplicate.message.contains("already registered"));

        let unloaded = unload_kernel(key.clone());
        assert!(unloaded.ok, "{}", unloaded.message);
        assert!(!std::path::Path::new(&path).exists());
        assert!(!registry().expect("registry").contains_key(&key));

        let again = unload_kernel(key);
        assert!(!again.ok);
        assert!(again.message.contains("not registered"));
    }

    #[cfg(not(feature = "cspice"))]
    #[test]
    fn chronos_reports_missing_toolkit() {
        let response = chronos("2000 JAN 01".to_string(), "-FROM UTC -TO ET".to_string());
        assert!(!response.ok);
        assert!(response.output.is_empty());
        assert!(response.message.contains("cspice"));
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
