//! Binding to the linked native toolkit library.
//!
//! # Invariants
//! - Every toolkit call runs under [`TOOLKIT_LOCK`]; the library keeps global
//!   state and is not thread-safe.
//! - Error action is `RETURN`, so failures are read back with `failed_c`
//!   and cleared with `reset_c` instead of aborting the process.

use crate::toolkit::{KernelPool, TimeConverter, ToolkitError, ToolkitResult};
use std::ffi::{c_char, c_int, CString};
use std::sync::{Mutex, MutexGuard, PoisonError};

const ERROR_MESSAGE_CAPACITY: usize = 1841;

static TOOLKIT_LOCK: Mutex<()> = Mutex::new(());

#[link(name = "cspice")]
extern "C" {
    fn furnsh_c(file: *const c_char);
    fn unload_c(file: *const c_char);
    fn failed_c() -> c_int;
    fn getmsg_c(option: *const c_char, lenout: c_int, msg: *mut c_char);
    fn reset_c();
    fn erract_c(operation: *const c_char, lenout: c_int, action: *mut c_char);
    fn cronos_(
        cmdlin: *const c_char,
        cmdsub: *mut c_int,
        inptim: *const c_char,
        outtim: *mut c_char,
        cmdlin_len: c_int,
        inptim_len: c_int,
        outtim_len: c_int,
    ) -> c_int;
}

/// Kernel pool and time conversion backed by the native library.
#[derive(Debug)]
pub struct NativeToolkit {
    _private: (),
}

impl NativeToolkit {
    /// Switches the toolkit to return-on-error mode.
    pub fn new() -> ToolkitResult<Self> {
        let _guard = lock();
        let operation = to_c_string("erract", "SET")?;
        let mut action = to_c_string("erract", "RETURN")?.into_bytes_with_nul();
        // SAFETY: both buffers are NUL-terminated and outlive the call; with
        // `SET` the toolkit only reads `action`.
        unsafe {
            erract_c(operation.as_ptr(), 0, action.as_mut_ptr().cast::<c_char>());
        }
        Ok(Self { _private: () })
    }
}

impl KernelPool for NativeToolkit {
    fn furnish(&self, path: &str) -> ToolkitResult<()> {
        let file = to_c_string("furnish", path)?;
        let _guard = lock();
        // SAFETY: `file` is a valid NUL-terminated string for the call duration.
        unsafe { furnsh_c(file.as_ptr()) };
        take_failure("furnish")
    }

    fn unload(&self, path: &str) -> ToolkitResult<()> {
        let file = to_c_string("unload", path)?;
        let _guard = lock();
        // SAFETY: `file` is a valid NUL-terminated string for the call duration.
        unsafe { unload_c(file.as_ptr()) };
        take_failure("unload")
    }
}

impl TimeConverter for NativeToolkit {
    fn convert(
        &self,
        command_line: &str,
        input_time: &str,
        output_capacity: usize,
    ) -> ToolkitResult<String> {
        let cmdlin_len = fortran_len("chronos", command_line.len())?;
        let inptim_len = fortran_len("chronos", input_time.len())?;
        let outtim_len = fortran_len("chronos", output_capacity)?;
        let mut output = vec![b' '; output_capacity];
        let mut command_count: c_int = 1;

        let _guard = lock();
        // SAFETY: Fortran strings are passed with explicit lengths and are
        // not required to be NUL-terminated; `output` holds `outtim_len` bytes.
        unsafe {
            cronos_(
                command_line.as_ptr().cast::<c_char>(),
                &mut command_count,
                input_time.as_ptr().cast::<c_char>(),
                output.as_mut_ptr().cast::<c_char>(),
                cmdlin_len,
                inptim_len,
                outtim_len,
            );
        }
        take_failure("chronos")?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

fn lock() -> MutexGuard<'static, ()> {
    TOOLKIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_c_string(operation: &'static str, value: &str) -> ToolkitResult<CString> {
    CString::new(value)
        .map_err(|_| ToolkitError::new(operation, "argument contains an interior NUL byte"))
}

fn fortran_len(operation: &'static str, len: usize) -> ToolkitResult<c_int> {
    c_int::try_from(len).map_err(|_| ToolkitError::new(operation, "argument too long"))
}

/// Converts a signalled toolkit error into `Err` and clears it. Caller holds the lock.
fn take_failure(operation: &'static str) -> ToolkitResult<()> {
    // SAFETY: no arguments; reads toolkit error status.
    if unsafe { failed_c() } == 0 {
        return Ok(());
    }

    let mut message = vec![0u8; ERROR_MESSAGE_CAPACITY];
    let option = to_c_string(operation, "SHORT")?;
    // SAFETY: `message` has `ERROR_MESSAGE_CAPACITY` writable bytes and the
    // toolkit NUL-terminates within `lenout`.
    unsafe {
        getmsg_c(
            option.as_ptr(),
            ERROR_MESSAGE_CAPACITY as c_int,
            message.as_mut_ptr().cast::<c_char>(),
        );
        reset_c();
    }
    let end = message.iter().position(|byte| *byte == 0).unwrap_or(message.len());
    let text = String::from_utf8_lossy(&message[..end]).trim().to_string();
    Err(ToolkitError::new(operation, text))
}
