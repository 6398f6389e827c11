use std::fmt;
use thiserror::Error;

/// Predefined registry hive a record lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegistryRoot {
    ClassesRoot,
    LocalMachine,
}

impl RegistryRoot {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryRoot::ClassesRoot => "HKEY_CLASSES_ROOT",
            RegistryRoot::LocalMachine => "HKEY_LOCAL_MACHINE",
        }
    }
}

impl fmt::Display for RegistryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("access denied: {root}\\{path}")]
    AccessDenied { root: RegistryRoot, path: String },

    #[error("key not found: {root}\\{path}")]
    NotFound { root: RegistryRoot, path: String },

    #[error("invalid value for {root}\\{path}: {reason}")]
    InvalidValue {
        root: RegistryRoot,
        path: String,
        reason: String,
    },

    #[error("registry operation on {root}\\{path} failed with code {code}")]
    Os {
        root: RegistryRoot,
        path: String,
        code: u32,
    },
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

/// Minimal string-valued registry surface the registration manager writes through.
///
/// Paths are backslash-separated and case-insensitive. A `None` value name addresses the
/// key's default value.
pub trait RegistryStore {
    /// Create `key` (and any missing ancestors) and set a `REG_SZ` value on it.
    fn set_string(
        &mut self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
        data: &str,
    ) -> Result<(), RegistryError>;

    /// Read a string value. `Ok(None)` when the key or the value is absent.
    fn get_string(
        &self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
    ) -> Result<Option<String>, RegistryError>;

    /// Delete `key` with all its subkeys and values.
    /// Returns [`RegistryError::NotFound`] when the key does not exist.
    fn delete_tree(&mut self, root: RegistryRoot, key: &str) -> Result<(), RegistryError>;
}
