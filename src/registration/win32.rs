use super::store::{RegistryError, RegistryRoot, RegistryStore};
use widestring::U16CString;
use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_PATH_NOT_FOUND,
    ERROR_SUCCESS, WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, HKEY_LOCAL_MACHINE, KEY_WRITE, REG_OPTION_NON_VOLATILE, REG_SZ,
    RRF_RT_REG_SZ, RegCloseKey, RegCreateKeyExW, RegDeleteTreeW, RegGetValueW, RegSetValueExW,
};
use windows::core::PCWSTR;

/// The live Windows registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

fn hive(root: RegistryRoot) -> HKEY {
    match root {
        RegistryRoot::ClassesRoot => HKEY_CLASSES_ROOT,
        RegistryRoot::LocalMachine => HKEY_LOCAL_MACHINE,
    }
}

/// Closes the key handle on drop.
struct OwnedKey(HKEY);

impl Drop for OwnedKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

fn wide(root: RegistryRoot, key: &str, s: &str) -> Result<U16CString, RegistryError> {
    U16CString::from_str(s).map_err(|_| RegistryError::InvalidValue {
        root,
        path: key.to_string(),
        reason: "string contains an interior NUL".to_string(),
    })
}

fn check(root: RegistryRoot, key: &str, code: WIN32_ERROR) -> Result<(), RegistryError> {
    if code == ERROR_SUCCESS {
        return Ok(());
    }
    let path = key.to_string();
    Err(if code == ERROR_FILE_NOT_FOUND || code == ERROR_PATH_NOT_FOUND {
        RegistryError::NotFound { root, path }
    } else if code == ERROR_ACCESS_DENIED {
        RegistryError::AccessDenied { root, path }
    } else {
        RegistryError::Os {
            root,
            path,
            code: code.0,
        }
    })
}

fn name_ptr(name: &Option<U16CString>) -> PCWSTR {
    name.as_ref()
        .map_or(PCWSTR::null(), |n| PCWSTR(n.as_ptr()))
}

impl RegistryStore for WindowsRegistry {
    fn set_string(
        &mut self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
        data: &str,
    ) -> Result<(), RegistryError> {
        let subkey = wide(root, key, key)?;
        let name = name.map(|n| wide(root, key, n)).transpose()?;
        let data = wide(root, key, data)?;

        let mut handle = HKEY::default();
        unsafe {
            check(
                root,
                key,
                RegCreateKeyExW(
                    hive(root),
                    PCWSTR(subkey.as_ptr()),
                    0,
                    PCWSTR::null(),
                    REG_OPTION_NON_VOLATILE,
                    KEY_WRITE,
                    None,
                    &mut handle,
                    None,
                ),
            )?;
        }
        let handle = OwnedKey(handle);

        // REG_SZ data is UTF-16 including the terminating NUL
        let units = data.as_slice_with_nul();
        let bytes =
            unsafe { std::slice::from_raw_parts(units.as_ptr().cast::<u8>(), units.len() * 2) };

        unsafe {
            check(
                root,
                key,
                RegSetValueExW(handle.0, name_ptr(&name), 0, REG_SZ, Some(bytes)),
            )
        }
    }

    fn get_string(
        &self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
    ) -> Result<Option<String>, RegistryError> {
        let subkey = wide(root, key, key)?;
        let name = name.map(|n| wide(root, key, n)).transpose()?;

        let mut size: u32 = 0;
        let mut buffer: Vec<u16> = Vec::new();
        loop {
            let data = if buffer.is_empty() {
                None
            } else {
                Some(buffer.as_mut_ptr().cast::<std::ffi::c_void>())
            };
            let status = unsafe {
                RegGetValueW(
                    hive(root),
                    PCWSTR(subkey.as_ptr()),
                    name_ptr(&name),
                    RRF_RT_REG_SZ,
                    None,
                    data,
                    Some(&mut size as *mut u32),
                )
            };

            if status == ERROR_FILE_NOT_FOUND || status == ERROR_PATH_NOT_FOUND {
                return Ok(None);
            }
            if status == ERROR_MORE_DATA || (status == ERROR_SUCCESS && buffer.is_empty()) {
                // Size query, or the value grew between calls
                buffer = vec![0u16; (size as usize).div_ceil(2).max(1)];
                continue;
            }
            check(root, key, status)?;

            let len = (size as usize / 2).min(buffer.len());
            let text = &buffer[..len];
            let text = match text.iter().position(|&c| c == 0) {
                Some(end) => &text[..end],
                None => text,
            };
            return String::from_utf16(text)
                .map(Some)
                .map_err(|_| RegistryError::InvalidValue {
                    root,
                    path: key.to_string(),
                    reason: "value is not valid UTF-16".to_string(),
                });
        }
    }

    fn delete_tree(&mut self, root: RegistryRoot, key: &str) -> Result<(), RegistryError> {
        let subkey = wide(root, key, key)?;
        unsafe { check(root, key, RegDeleteTreeW(hive(root), PCWSTR(subkey.as_ptr()))) }
    }
}
