//! Identity and registry layout constants for the Parallel command.
//! Shared between the COM DLL and the `parallel-reg` installer.

use uuid::Uuid;

/// CLSID of the Parallel explorer command. Must match DLL exports and registry bindings.
pub const CLSID_PARALLEL_COMMAND_U128: u128 = 0xd194f491_9a76_44bd_84e1_62cdccd49bea;

/// Same CLSID as a `Uuid`, for formatting registry values.
pub const CLSID_PARALLEL_COMMAND: Uuid = Uuid::from_u128(CLSID_PARALLEL_COMMAND_U128);

/// Label shown in the context menu and written as the command-store `MUIVerb`.
pub const COMMAND_LABEL: &str = "Parallel";

/// Verb name of the command-store entry.
pub const COMMAND_STORE_VERB: &str = "SendToService";

/// Index of the icon embedded in the module, used for `<path>,<index>` icon references.
pub const ICON_INDEX: u32 = 0;

pub const THREADING_MODEL: &str = "Apartment";

pub const COMMAND_STORE_SHELL: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\CommandStore\shell";

/// Context menu attachment roots under HKCR: all files, then folders.
pub const ALL_FILES_MENU_HANDLERS: &str = r"*\shellex\ContextMenuHandlers";
pub const DIRECTORY_MENU_HANDLERS: &str = r"Directory\shellex\ContextMenuHandlers";

/// CLSID formatted the way the registry stores it: `{d194f491-...}`.
pub fn clsid_string() -> String {
    CLSID_PARALLEL_COMMAND.braced().to_string()
}
