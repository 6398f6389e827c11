use super::store::{RegistryError, RegistryRoot};
use crate::keys::{
    ALL_FILES_MENU_HANDLERS, COMMAND_LABEL, COMMAND_STORE_SHELL, COMMAND_STORE_VERB,
    DIRECTORY_MENU_HANDLERS, ICON_INDEX, THREADING_MODEL, clsid_string,
};
use std::fmt;
use std::path::Path;

/// The four record groups that together make the command visible to Explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyGroup {
    /// `HKCR\CLSID\{id}`: module path and threading model
    ComponentServer,
    /// Command-store verb: label, icon and handler CLSID
    CommandStore,
    /// `HKCR\*` context menu binding
    FileMenu,
    /// `HKCR\Directory` context menu binding
    DirectoryMenu,
}

impl KeyGroup {
    pub const ALL: [KeyGroup; 4] = [
        KeyGroup::ComponentServer,
        KeyGroup::CommandStore,
        KeyGroup::FileMenu,
        KeyGroup::DirectoryMenu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyGroup::ComponentServer => "component-server",
            KeyGroup::CommandStore => "command-store",
            KeyGroup::FileMenu => "file-menu",
            KeyGroup::DirectoryMenu => "directory-menu",
        }
    }
}

impl fmt::Display for KeyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryValue {
    /// `None` is the key's default value
    pub name: Option<&'static str>,
    pub data: String,
}

/// One group's registry footprint: the values it writes and the subtree it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub group: KeyGroup,
    pub root: RegistryRoot,
    /// Key the values are written to
    pub key: String,
    /// Subtree deleted on unregister. Equal to `key` or one of its ancestors.
    pub owned_key: String,
    pub values: Vec<RegistryValue>,
}

/// Complete set of records for one module location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPlan {
    module_path: String,
    records: Vec<RegistryRecord>,
}

fn value(name: Option<&'static str>, data: impl Into<String>) -> RegistryValue {
    RegistryValue {
        name,
        data: data.into(),
    }
}

/// Icon reference for a module: `<path>,<index>`.
pub fn icon_reference(module_path: &str) -> String {
    format!("{},{}", module_path, ICON_INDEX)
}

impl RegistrationPlan {
    /// Records for a module at `module_path`.
    ///
    /// The path is written to the registry verbatim, so it must be valid Unicode. A lossy
    /// conversion would register a file that does not exist.
    pub fn for_module(module_path: &Path) -> Result<Self, RegistryError> {
        match module_path.to_str() {
            Some(path) => Ok(Self::build(path.to_string())),
            None => Err(RegistryError::InvalidValue {
                root: RegistryRoot::ClassesRoot,
                path: format!(r"CLSID\{}\InprocServer32", clsid_string()),
                reason: format!("module path is not valid Unicode: {}", module_path.display()),
            }),
        }
    }

    /// Records for removal only. Unregistering deletes by key path and never reads the module
    /// location, so the values carry an empty path.
    pub fn for_removal() -> Self {
        Self::build(String::new())
    }

    fn build(module_path: String) -> Self {
        let clsid = clsid_string();

        let component_key = format!(r"CLSID\{}", clsid);
        let command_key = format!(r"{}\{}", COMMAND_STORE_SHELL, COMMAND_STORE_VERB);
        let file_menu_key = format!(r"{}\{}", ALL_FILES_MENU_HANDLERS, COMMAND_LABEL);
        let directory_menu_key = format!(r"{}\{}", DIRECTORY_MENU_HANDLERS, COMMAND_LABEL);

        let records = vec![
            RegistryRecord {
                group: KeyGroup::ComponentServer,
                root: RegistryRoot::ClassesRoot,
                key: format!(r"{}\InprocServer32", component_key),
                owned_key: component_key,
                values: vec![
                    value(None, module_path.clone()),
                    value(Some("ThreadingModel"), THREADING_MODEL),
                ],
            },
            RegistryRecord {
                group: KeyGroup::CommandStore,
                root: RegistryRoot::LocalMachine,
                key: command_key.clone(),
                owned_key: command_key,
                values: vec![
                    value(Some("ExplorerCommandHandler"), clsid.clone()),
                    value(Some("MUIVerb"), COMMAND_LABEL),
                    value(Some("Icon"), icon_reference(&module_path)),
                ],
            },
            RegistryRecord {
                group: KeyGroup::FileMenu,
                root: RegistryRoot::ClassesRoot,
                key: file_menu_key.clone(),
                owned_key: file_menu_key,
                values: vec![value(None, clsid.clone())],
            },
            RegistryRecord {
                group: KeyGroup::DirectoryMenu,
                root: RegistryRoot::ClassesRoot,
                key: directory_menu_key.clone(),
                owned_key: directory_menu_key,
                values: vec![value(None, clsid)],
            },
        ];

        Self {
            module_path,
            records,
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn records(&self) -> &[RegistryRecord] {
        &self.records
    }

    pub fn record(&self, group: KeyGroup) -> Option<&RegistryRecord> {
        self.records.iter().find(|r| r.group == group)
    }
}

impl fmt::Display for RegistrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "# {}", record.group)?;
            writeln!(f, "[{}\\{}]", record.root, record.key)?;
            for v in &record.values {
                match v.name {
                    Some(name) => writeln!(f, "\"{}\"=\"{}\"", name, v.data)?,
                    None => writeln!(f, "@=\"{}\"", v.data)?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
