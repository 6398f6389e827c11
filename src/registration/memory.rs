//! In-memory registry used for dry runs and tests.

use super::store::{RegistryError, RegistryRoot, RegistryStore};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryKey {
    /// Path as first created, for display
    pub path: String,
    /// Values keyed by lowercase name ("" is the default value)
    pub values: BTreeMap<String, MemoryValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryValue {
    pub name: Option<String>,
    pub data: String,
}

/// Full contents of a [`MemoryRegistry`], comparable for round-trip checks.
pub type MemorySnapshot = BTreeMap<(RegistryRoot, String), MemoryKey>;

/// A case-insensitive registry tree kept in memory.
///
/// Writes under prefixes registered with [`MemoryRegistry::deny_writes`] fail with
/// `AccessDenied`, which lets callers model an unprivileged installer.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: MemorySnapshot,
    denied: Vec<(RegistryRoot, String)>,
}

fn normalize(path: &str) -> String {
    path.trim_matches('\\').to_lowercase()
}

fn is_under(key: &str, prefix: &str) -> bool {
    key == prefix || key.starts_with(&format!("{}\\", prefix))
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty key and any missing ancestors.
    pub fn create_key(&mut self, root: RegistryRoot, path: &str) {
        let trimmed = path.trim_matches('\\');
        let mut current = String::new();
        for segment in trimmed.split('\\') {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(segment);
            self.keys
                .entry((root, current.to_lowercase()))
                .or_insert_with(|| MemoryKey {
                    path: current.clone(),
                    values: BTreeMap::new(),
                });
        }
    }

    pub fn contains_key(&self, root: RegistryRoot, path: &str) -> bool {
        self.keys.contains_key(&(root, normalize(path)))
    }

    pub fn deny_writes(&mut self, root: RegistryRoot, prefix: &str) {
        self.denied.push((root, normalize(prefix)));
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        self.keys.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Render the tree in a `.reg`-like text form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for ((root, _), key) in &self.keys {
            let _ = writeln!(out, "[{}\\{}]", root, key.path);
            for value in key.values.values() {
                let name = match &value.name {
                    Some(name) => format!("\"{}\"", name),
                    None => "@".to_string(),
                };
                let _ = writeln!(out, "{}=\"{}\"", name, value.data);
            }
        }
        out
    }

    fn check_writable(&self, root: RegistryRoot, key: &str) -> Result<(), RegistryError> {
        let normalized = normalize(key);
        if self
            .denied
            .iter()
            .any(|(denied_root, prefix)| *denied_root == root && is_under(&normalized, prefix))
        {
            return Err(RegistryError::AccessDenied {
                root,
                path: key.to_string(),
            });
        }
        Ok(())
    }
}

impl RegistryStore for MemoryRegistry {
    fn set_string(
        &mut self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
        data: &str,
    ) -> Result<(), RegistryError> {
        self.check_writable(root, key)?;
        if data.contains('\0') {
            return Err(RegistryError::InvalidValue {
                root,
                path: key.to_string(),
                reason: "string contains an interior NUL".to_string(),
            });
        }

        self.create_key(root, key);
        let entry = self
            .keys
            .get_mut(&(root, normalize(key)))
            .ok_or_else(|| RegistryError::NotFound {
                root,
                path: key.to_string(),
            })?;
        entry.values.insert(
            name.unwrap_or_default().to_lowercase(),
            MemoryValue {
                name: name.map(str::to_string),
                data: data.to_string(),
            },
        );
        Ok(())
    }

    fn get_string(
        &self,
        root: RegistryRoot,
        key: &str,
        name: Option<&str>,
    ) -> Result<Option<String>, RegistryError> {
        Ok(self.keys.get(&(root, normalize(key))).and_then(|entry| {
            entry
                .values
                .get(&name.unwrap_or_default().to_lowercase())
                .map(|value| value.data.clone())
        }))
    }

    fn delete_tree(&mut self, root: RegistryRoot, key: &str) -> Result<(), RegistryError> {
        let normalized = normalize(key);
        if !self.keys.contains_key(&(root, normalized.clone())) {
            return Err(RegistryError::NotFound {
                root,
                path: key.to_string(),
            });
        }
        self.check_writable(root, key)?;

        self.keys
            .retain(|(key_root, path), _| !(*key_root == root && is_under(path, &normalized)));
        Ok(())
    }
}
