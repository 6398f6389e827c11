//! DLL exports: COM activation and self-registration (`regsvr32`).

use super::guard::host_status;
use super::module::{module_path, set_module_handle};
use super::{CLSID_EXPLORER_COMMAND, ParallelCommandFactory, can_unload};
use crate::registration::{self, RegistrationPlan, RegistrationReport, WindowsRegistry};
use std::ffi::c_void;
use windows::Win32::Foundation::{
    BOOL, CLASS_E_CLASSNOTAVAILABLE, E_POINTER, HMODULE, S_FALSE, S_OK, SELFREG_E_CLASS, TRUE,
};
use windows::Win32::System::Com::IClassFactory;
use windows::Win32::System::SystemServices::DLL_PROCESS_ATTACH;
use windows::core::{Error, GUID, HRESULT, Interface, Result};

/// Start file logging on the first entry point that runs, if configured.
#[cfg(not(test))]
fn ensure_logging() {
    use crate::config::ShellConfig;
    use crate::logging::{LogConfig, LogGuard, init_logging};
    use std::sync::{Mutex, Once};

    static LOGGING: Once = Once::new();
    static LOG_GUARD: Mutex<Option<LogGuard>> = Mutex::new(None);

    LOGGING.call_once(|| {
        let config = ShellConfig::load_or_default();
        if !config.log_to_file {
            return;
        }
        // Another component in the host may already own the global subscriber
        if let Ok(guard) = init_logging(LogConfig::from_shell_config(&config)) {
            if let Ok(mut slot) = LOG_GUARD.lock() {
                *slot = Some(guard);
            }
        }
    });
}

// Unit tests drive the exports directly and install their own subscriber
#[cfg(test)]
fn ensure_logging() {}

fn report_status(report: &RegistrationReport) -> Result<()> {
    for (group, error) in report.failures() {
        tracing::error!(target: "shellext::dll", %group, %error, operation = %report.operation, "Key group failed");
    }
    if report.is_success() {
        Ok(())
    } else {
        Err(Error::from(SELFREG_E_CLASS))
    }
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "system" fn DllMain(module: HMODULE, reason: u32, _reserved: *mut c_void) -> BOOL {
    if reason == DLL_PROCESS_ATTACH {
        set_module_handle(module);
    }
    TRUE
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "system" fn DllGetClassObject(
    rclsid: *const GUID,
    riid: *const GUID,
    ppv: *mut *mut c_void,
) -> HRESULT {
    ensure_logging();
    host_status("DllGetClassObject", || unsafe {
        if ppv.is_null() {
            return Err(Error::from(E_POINTER));
        }
        ppv.write(std::ptr::null_mut());

        if rclsid.is_null() || riid.is_null() {
            return Err(Error::from(E_POINTER));
        }
        if *rclsid != CLSID_EXPLORER_COMMAND {
            tracing::debug!(target: "shellext::dll", clsid = ?*rclsid, "Unknown class requested");
            return Err(Error::from(CLASS_E_CLASSNOTAVAILABLE));
        }

        let factory: IClassFactory = ParallelCommandFactory.into();
        factory.query(riid, ppv).ok()
    })
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "system" fn DllCanUnloadNow() -> HRESULT {
    if can_unload() { S_OK } else { S_FALSE }
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "system" fn DllRegisterServer() -> HRESULT {
    ensure_logging();
    host_status("DllRegisterServer", || {
        let path = module_path()?;
        let plan = RegistrationPlan::for_module(&path).map_err(|e| {
            tracing::error!(target: "shellext::dll", error = %e, "Module path cannot be registered");
            Error::from(SELFREG_E_CLASS)
        })?;
        report_status(&registration::register(&mut WindowsRegistry, &plan))
    })
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "system" fn DllUnregisterServer() -> HRESULT {
    ensure_logging();
    host_status("DllUnregisterServer", || {
        // Removal only needs the key paths, not the module location
        let plan = RegistrationPlan::for_removal();
        report_status(&registration::unregister(&mut WindowsRegistry, &plan))
    })
}
