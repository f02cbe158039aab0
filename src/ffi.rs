// src/ffi.rs
//! C entry points. Nothing here panics across the boundary: failures come
//! back as a status code with the message kept per thread.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char};
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::error;

use crate::error::Error;
use crate::pipeline;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeStatus {
    Ok = 0,
    InvalidArguments = 1,
    InnerVerificationFailed = 2,
    Unsatisfiable = 3,
    ProvingFailed = 4,
    OuterVerificationFailed = 5,
    Io = 6,
    Malformed = 7,
    Panicked = 8,
}

impl From<&Error> for ComposeStatus {
    fn from(e: &Error) -> Self {
        match e {
            Error::InvalidArguments(_) | Error::Parse { .. } => ComposeStatus::InvalidArguments,
            Error::InnerVerificationFailed => ComposeStatus::InnerVerificationFailed,
            Error::UnsatisfiableCircuit(_) => ComposeStatus::Unsatisfiable,
            Error::CompileFailed(_) | Error::SetupFailed(_) | Error::ProveFailed(_) => {
                ComposeStatus::ProvingFailed
            }
            Error::OuterVerificationFailed => ComposeStatus::OuterVerificationFailed,
            Error::Io { .. } => ComposeStatus::Io,
            Error::MalformedBundle { .. }
            | Error::NilPoint(_)
            | Error::CorruptBundle(_)
            | Error::Json(_) => ComposeStatus::Malformed,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(msg: String) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(msg));
}

unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::InvalidArguments(format!("{what} is null")));
    }
    // SAFETY: caller guarantees a NUL-terminated string that outlives the call.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| Error::InvalidArguments(format!("{what} is not UTF-8")))
}

/// Compose the hex-encoded inner proof with the statement in `data_dir`
/// and write the outer artifact there.
///
/// # Safety
/// Both arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn build_groth16(
    data_dir: *const c_char,
    proof: *const c_char,
) -> ComposeStatus {
    LAST_ERROR.with(|slot| slot.borrow_mut().take());
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: forwarded from this function's contract.
        let dir = unsafe { read_str(data_dir, "data_dir") }?;
        let proof_hex = unsafe { read_str(proof, "proof") }?;
        pipeline::build_groth16(dir, proof_hex).map(|_| ())
    }));

    match outcome {
        Ok(Ok(())) => ComposeStatus::Ok,
        Ok(Err(e)) => {
            error!(error = %e, "build_groth16 failed");
            let status = ComposeStatus::from(&e);
            set_last_error(e.to_string());
            status
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            error!(%msg, "build_groth16 panicked");
            set_last_error(msg);
            ComposeStatus::Panicked
        }
    }
}

/// Message for the last failed call on this thread, or null. Release with
/// [`free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn last_error_message() -> *mut c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_deref() {
        Some(msg) => CString::new(msg.replace('\0', " "))
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
        None => std::ptr::null_mut(),
    })
}

/// # Safety
/// `s` must come from [`last_error_message`] and not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        // SAFETY: allocated by CString::into_raw in this crate.
        drop(unsafe { CString::from_raw(s) });
    }
}
