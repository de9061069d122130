//! Narrow call contract to the native toolkit.
//!
//! # Responsibility
//! - Define the capabilities the registry and callers need from the toolkit:
//!   kernel pool registration and `chronos` time conversion.
//! - Keep calling conventions out of core logic.
//!
//! # Invariants
//! - Toolkit failures pass through unchanged as [`ToolkitError`].

use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
#[cfg(feature = "cspice")]
pub mod native;

pub use memory::MemoryKernelPool;

/// Output buffer capacity handed to the toolkit for `chronos`.
pub const CHRONOS_OUTPUT_CAPACITY: usize = 256;

pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Failure reported by the toolkit for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitError {
    /// Toolkit call that failed, e.g. `furnish`.
    pub operation: &'static str,
    /// Message as reported by the toolkit.
    pub message: String,
}

impl ToolkitError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl Display for ToolkitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "toolkit {} failed: {}", self.operation, self.message)
    }
}

impl Error for ToolkitError {}

/// The toolkit's in-memory kernel pool.
pub trait KernelPool: Send + Sync {
    /// Registers the file at `path` with the pool.
    fn furnish(&self, path: &str) -> ToolkitResult<()>;
    /// Removes a previously furnished file from the pool.
    fn unload(&self, path: &str) -> ToolkitResult<()>;
}

/// Time-string conversion capability (`chronos`).
pub trait TimeConverter {
    /// Converts `input_time` per `command_line`, writing at most
    /// `output_capacity` bytes. The raw output may carry padding.
    fn convert(
        &self,
        command_line: &str,
        input_time: &str,
        output_capacity: usize,
    ) -> ToolkitResult<String>;
}

/// Runs a `chronos` conversion and trims the toolkit's padded output.
pub fn chronos(
    converter: &dyn TimeConverter,
    input_time: &str,
    command_line: &str,
) -> ToolkitResult<String> {
    let raw = converter.convert(command_line, input_time, CHRONOS_OUTPUT_CAPACITY)?;
    Ok(raw
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::{chronos, TimeConverter, ToolkitError, ToolkitResult, CHRONOS_OUTPUT_CAPACITY};
    use std::cell::RefCell;

    #[derive(Default)]
    struct ScriptedConverter {
        calls: RefCell<Vec<(String, String, usize)>>,
    }

    impl TimeConverter for ScriptedConverter {
        fn convert(
            &self,
            command_line: &str,
            input_time: &str,
            capacity: usize,
        ) -> ToolkitResult<String> {
            self.calls
                .borrow_mut()
                .push((command_line.to_string(), input_time.to_string(), capacity));
            if input_time.is_empty() {
                return Err(ToolkitError::new("chronos", "SPICE(BADTIMESTRING)"));
            }
            Ok("  2000-01-01 12:00:00.000   \0\0\0".to_string())
        }
    }

    #[test]
    fn chronos_passes_arguments_and_trims_output() {
        let converter = ScriptedConverter::default();
        let out = chronos(&converter, "2000 JAN 01 12:00", "-FROM UTC -TO ET")
            .expect("conversion succeeds");
        assert_eq!(out, "2000-01-01 12:00:00.000");
        assert_eq!(
            converter.calls.borrow().as_slice(),
            &[(
                "-FROM UTC -TO ET".to_string(),
                "2000 JAN 01 12:00".to_string(),
                CHRONOS_OUTPUT_CAPACITY
            )]
        );
    }

    #[test]
    fn chronos_surfaces_toolkit_failure_unchanged() {
        let err = chronos(&ScriptedConverter::default(), "", "-FROM UTC -TO ET")
            .expect_err("toolkit error propagates");
        assert_eq!(err.message, "SPICE(BADTIMESTRING)");
        assert_eq!(err.to_string(), "toolkit chronos failed: SPICE(BADTIMESTRING)");
    }
}
