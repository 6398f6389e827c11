use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use windows::Win32::Foundation::E_FAIL;
use windows::core::{Error, HRESULT, Result};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a host-facing call, turning a panic into `E_FAIL` so it never unwinds into Explorer.
pub(crate) fn host_call<T>(operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::debug!(target: "shellext::dll", operation, code = ?e.code(), "Call returned failure");
            Err(e)
        }
        Err(payload) => {
            tracing::error!(
                target: "shellext::dll",
                operation,
                panic = %panic_message(payload.as_ref()),
                "Panic contained at host boundary"
            );
            Err(Error::from(E_FAIL))
        }
    }
}

/// [`host_call`] for exports that return a bare `HRESULT`.
pub(crate) fn host_status(operation: &'static str, f: impl FnOnce() -> Result<()>) -> HRESULT {
    match host_call(operation, f) {
        Ok(()) => HRESULT(0),
        Err(e) => e.code(),
    }
}
