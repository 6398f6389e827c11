use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use windows::Win32::Foundation::{E_UNEXPECTED, HMODULE, MAX_PATH};
use windows::Win32::System::LibraryLoader::GetModuleFileNameW;
use windows::core::{Error, Result};

/// Handle of this DLL, recorded once at process attach. Stored as an address since raw
/// handles are not `Sync`.
static MODULE_HANDLE: OnceLock<usize> = OnceLock::new();

pub(crate) fn set_module_handle(module: HMODULE) {
    let _ = MODULE_HANDLE.set(module.0 as usize);
}

/// Absolute path of the loaded DLL.
pub fn module_path() -> Result<PathBuf> {
    let handle = MODULE_HANDLE
        .get()
        .map(|address| HMODULE(*address as *mut core::ffi::c_void))
        .ok_or_else(|| Error::from(E_UNEXPECTED))?;

    let mut buffer = vec![0u16; MAX_PATH as usize];
    loop {
        let len = unsafe { GetModuleFileNameW(handle, &mut buffer) } as usize;
        if len == 0 {
            return Err(Error::from_win32());
        }
        if len < buffer.len() {
            return Ok(PathBuf::from(OsString::from_wide(&buffer[..len])));
        }
        // Truncated: long path outside MAX_PATH
        buffer.resize(buffer.len() * 2, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_unavailable_outside_dll_load() {
        // Test binaries are not loaded through DllMain
        assert_eq!(module_path().unwrap_err().code(), E_UNEXPECTED);
    }
}
