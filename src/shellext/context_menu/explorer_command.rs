use super::CLSID_EXPLORER_COMMAND;
use crate::command::{BackupCommand, CommandError, Selection};
use crate::shellext::guard::host_call;
use crate::shellext::{object_created, object_released};
use std::path::PathBuf;
use windows::{
    Win32::{Foundation::*, System::Com::*, UI::Shell::*},
    core::*,
};

/// The "Parallel" menu entry as Explorer sees it. One instance per menu build.
#[implement(IExplorerCommand)]
pub struct ParallelExplorerCommand {
    command: BackupCommand,
}

impl ParallelExplorerCommand {
    pub fn new() -> Self {
        object_created();
        Self {
            command: BackupCommand::new(),
        }
    }
}

impl Default for ParallelExplorerCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParallelExplorerCommand {
    fn drop(&mut self) {
        object_released();
    }
}

/// Collect file system paths of the selected items. Items without one (virtual folders,
/// search results from some providers) are skipped.
fn resolve_selection(items: Option<&IShellItemArray>) -> std::result::Result<Selection, CommandError> {
    let Some(items) = items else {
        // Nothing selected, but still triggered from a folder background
        return Ok(Selection::empty());
    };

    let count = unsafe { items.GetCount() }.map_err(|e| CommandError::Selection(e.to_string()))?;
    let mut paths = Vec::with_capacity(count as usize);

    for index in 0..count {
        let name = unsafe {
            items
                .GetItemAt(index)
                .and_then(|item| item.GetDisplayName(SIGDN_FILESYSPATH))
        };
        match name {
            Ok(name) => {
                let path = unsafe { name.to_string() };
                unsafe { CoTaskMemFree(Some(name.0 as *const core::ffi::c_void)) };
                match path {
                    Ok(path) => paths.push(PathBuf::from(path)),
                    Err(e) => {
                        tracing::warn!(target: "shellext::context_menu", index, error = %e, "Skipping item with undecodable path")
                    }
                }
            }
            Err(e) => {
                tracing::debug!(target: "shellext::context_menu", index, error = %e, "Skipping item without a file system path")
            }
        }
    }

    Ok(Selection::from_paths(paths))
}

impl IExplorerCommand_Impl for ParallelExplorerCommand_Impl {
    fn GetTitle(&self, _items: Option<&IShellItemArray>) -> Result<PWSTR> {
        host_call("GetTitle", || {
            // Allocated with the COM task allocator; the shell frees it
            let hstring = HSTRING::from(self.command.title());
            unsafe { SHStrDupW(&hstring) }
        })
    }

    fn GetIcon(&self, _items: Option<&IShellItemArray>) -> Result<PWSTR> {
        host_call("GetIcon", || match self.command.icon() {
            Some(icon) => {
                let hstring = HSTRING::from(icon);
                unsafe { SHStrDupW(&hstring) }
            }
            None => Ok(PWSTR::null()),
        })
    }

    fn GetToolTip(&self, _items: Option<&IShellItemArray>) -> Result<PWSTR> {
        Err(Error::from(E_NOTIMPL))
    }

    fn GetCanonicalName(&self) -> Result<GUID> {
        Ok(CLSID_EXPLORER_COMMAND)
    }

    fn GetState(&self, _items: Option<&IShellItemArray>, _oktobeslow: BOOL) -> Result<u32> {
        Ok(ECS_ENABLED.0 as u32)
    }

    fn Invoke(
        &self,
        selection: Option<&IShellItemArray>,
        _bindctx: Option<&IBindCtx>,
    ) -> Result<()> {
        host_call("Invoke", || {
            let selection = resolve_selection(selection).map_err(|e| {
                tracing::error!(target: "shellext::context_menu", error = %e, "Invoke failed");
                Error::from(E_FAIL)
            })?;

            // The shell ignores this result, so failures are only visible in the log
            match self.command.invoke(&selection) {
                Ok(outcome) => {
                    tracing::debug!(target: "shellext::context_menu", ?outcome, "Invoke finished");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(target: "shellext::context_menu", error = %e, "Invoke failed");
                    Err(Error::from(E_FAIL))
                }
            }
        })
    }

    fn GetFlags(&self) -> Result<u32> {
        Ok(ECF_DEFAULT.0 as u32)
    }

    fn EnumSubCommands(&self) -> Result<IEnumExplorerCommand> {
        Err(Error::from(E_NOTIMPL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shellext::serial_lock_count;
    use windows::Win32::UI::Shell::Common::ITEMIDLIST;

    fn init_com() {
        unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        }
    }

    fn take_string(value: PWSTR) -> String {
        unsafe {
            let text = value.to_string().unwrap();
            CoTaskMemFree(Some(value.0 as *const core::ffi::c_void));
            text
        }
    }

    fn shell_items(paths: &[PathBuf]) -> IShellItemArray {
        unsafe {
            let pidls: Vec<*mut ITEMIDLIST> = paths
                .iter()
                .map(|path| {
                    let mut pidl = std::ptr::null_mut();
                    SHParseDisplayName(&HSTRING::from(path.as_os_str()), None, &mut pidl, 0, None)
                        .unwrap();
                    pidl
                })
                .collect();
            let ids: Vec<*const ITEMIDLIST> = pidls.iter().map(|p| *p as *const _).collect();
            let array = SHCreateShellItemArrayFromIDLists(&ids).unwrap();
            for pidl in pidls {
                CoTaskMemFree(Some(pidl as *const core::ffi::c_void));
            }
            array
        }
    }

    fn temp_files(dir: &std::path::Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("file {} ä.txt", i));
                std::fs::write(&path, b"data").unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_title_is_parallel_for_any_selection() {
        let _serial = serial_lock_count();
        init_com();
        let dir = tempfile::tempdir().unwrap();
        let command: IExplorerCommand = ParallelExplorerCommand::new().into();

        let one = shell_items(&temp_files(dir.path(), 1));
        let many = shell_items(&temp_files(dir.path(), 3));

        for items in [None, Some(&one), Some(&many)] {
            let title = unsafe { command.GetTitle(items) }.unwrap();
            assert_eq!(take_string(title), "Parallel");
        }
    }

    #[test]
    fn test_no_icon_is_not_a_failure() {
        let _serial = serial_lock_count();
        init_com();
        let command: IExplorerCommand = ParallelExplorerCommand::new().into();
        let icon = unsafe { command.GetIcon(None) }.unwrap();
        assert!(icon.is_null());
    }

    #[test]
    fn test_invoke_succeeds_and_leaves_files_alone() {
        let _serial = serial_lock_count();
        init_com();
        let dir = tempfile::tempdir().unwrap();
        let files = temp_files(dir.path(), 3);

        for count in [0, 1, 3] {
            let command: IExplorerCommand = ParallelExplorerCommand::new().into();
            let items = (count > 0).then(|| shell_items(&files[..count]));
            unsafe { command.Invoke(items.as_ref(), None) }.unwrap();
        }

        for file in &files {
            assert_eq!(std::fs::read(file).unwrap(), b"data");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_selection_resolves_file_system_paths() {
        init_com();
        let dir = tempfile::tempdir().unwrap();
        let files = temp_files(dir.path(), 2);
        let items = shell_items(&files);

        let selection = resolve_selection(Some(&items)).unwrap();
        assert_eq!(selection.len(), 2);
        assert!(resolve_selection(None).unwrap().is_empty());
    }

    #[test]
    fn test_fixed_capabilities() {
        let _serial = serial_lock_count();
        let command: IExplorerCommand = ParallelExplorerCommand::new().into();
        unsafe {
            assert_eq!(command.GetState(None, FALSE).unwrap(), ECS_ENABLED.0 as u32);
            assert_eq!(command.GetFlags().unwrap(), ECF_DEFAULT.0 as u32);
            assert_eq!(command.GetToolTip(None).unwrap_err().code(), E_NOTIMPL);
            assert!(command.EnumSubCommands().is_err());
        }
    }
}
