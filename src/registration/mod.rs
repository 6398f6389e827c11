//! Self-registration for the Parallel explorer command.
//!
//! Registration is data: a [`RegistrationPlan`] lists the records Explorer reads to populate its
//! context menu, and [`register`] / [`unregister`] apply or remove them through a
//! [`RegistryStore`]. Each group is written independently so a failure on one (for example a
//! missing HKLM privilege) leaves the others in place and is reported per group.

mod memory;
mod plan;
mod report;
mod store;
#[cfg(windows)]
mod win32;

pub use memory::{MemoryKey, MemoryRegistry, MemorySnapshot, MemoryValue};
pub use plan::{KeyGroup, RegistrationPlan, RegistryRecord, RegistryValue, icon_reference};
pub use report::{GroupReport, Operation, RegistrationReport};
pub use store::{RegistryError, RegistryRoot, RegistryStore};
#[cfg(windows)]
pub use win32::WindowsRegistry;

/// Write every record in the plan. Later values and groups are attempted even after a failure.
pub fn register(store: &mut impl RegistryStore, plan: &RegistrationPlan) -> RegistrationReport {
    tracing::info!(target: "registration", module = plan.module_path(), "Registering explorer command");

    let groups = plan
        .records()
        .iter()
        .map(|record| {
            let mut outcome = Ok(());
            for value in &record.values {
                if let Err(e) = store.set_string(record.root, &record.key, value.name, &value.data)
                {
                    tracing::warn!(
                        target: "registration",
                        group = %record.group,
                        key = %record.key,
                        value = value.name.unwrap_or("(default)"),
                        error = %e,
                        "Failed to write registry value"
                    );
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
            GroupReport {
                group: record.group,
                outcome,
            }
        })
        .collect();

    finish(Operation::Register, groups)
}

/// Delete every subtree the plan owns. Keys that are already gone count as removed.
pub fn unregister(store: &mut impl RegistryStore, plan: &RegistrationPlan) -> RegistrationReport {
    tracing::info!(target: "registration", "Unregistering explorer command");

    let groups = plan
        .records()
        .iter()
        .map(|record| {
            let outcome = match store.delete_tree(record.root, &record.owned_key) {
                Err(e) if e.is_not_found() => {
                    tracing::debug!(target: "registration", group = %record.group, "Already absent");
                    Ok(())
                }
                other => other,
            };
            if let Err(e) = &outcome {
                tracing::warn!(
                    target: "registration",
                    group = %record.group,
                    key = %record.owned_key,
                    error = %e,
                    "Failed to delete registry key"
                );
            }
            GroupReport {
                group: record.group,
                outcome,
            }
        })
        .collect();

    finish(Operation::Unregister, groups)
}

fn finish(operation: Operation, groups: Vec<GroupReport>) -> RegistrationReport {
    let report = RegistrationReport { operation, groups };
    if report.is_success() {
        tracing::info!(target: "registration", %operation, "All key groups processed");
    } else {
        tracing::error!(
            target: "registration",
            %operation,
            failed = report.failures().count(),
            "Some key groups failed"
        );
    }
    report
}

/// Presence of one group's records in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    /// Every value exists and matches the plan
    Current,
    /// Some values exist but differ from or are missing relative to the plan
    Stale,
    Absent,
}

/// Compare the registry against the plan, group by group.
pub fn status(
    store: &impl RegistryStore,
    plan: &RegistrationPlan,
) -> Result<Vec<(KeyGroup, GroupStatus)>, RegistryError> {
    plan.records()
        .iter()
        .map(|record| {
            let mut matching = 0;
            let mut present = 0;
            for value in &record.values {
                if let Some(data) = store.get_string(record.root, &record.key, value.name)? {
                    present += 1;
                    if data == value.data {
                        matching += 1;
                    }
                }
            }
            let status = if matching == record.values.len() {
                GroupStatus::Current
            } else if present == 0 {
                GroupStatus::Absent
            } else {
                GroupStatus::Stale
            };
            Ok((record.group, status))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::COMMAND_STORE_SHELL;
    use std::path::Path;

    const MODULE: &str = r"C:\Program Files\Parallel\Parallel.Shell.dll";

    /// A registry with the shell-owned parent keys that exist on every Windows install,
    /// plus an unrelated handler that must survive.
    fn seeded_registry() -> MemoryRegistry {
        let mut reg = MemoryRegistry::new();
        reg.create_key(RegistryRoot::ClassesRoot, "CLSID");
        reg.create_key(RegistryRoot::ClassesRoot, r"*\shellex\ContextMenuHandlers");
        reg.create_key(RegistryRoot::ClassesRoot, r"Directory\shellex\ContextMenuHandlers");
        reg.create_key(RegistryRoot::LocalMachine, COMMAND_STORE_SHELL);
        reg.set_string(
            RegistryRoot::ClassesRoot,
            r"*\shellex\ContextMenuHandlers\Other",
            None,
            "{00000000-0000-0000-0000-000000000001}",
        )
        .unwrap();
        reg
    }

    fn plan() -> RegistrationPlan {
        RegistrationPlan::for_module(Path::new(MODULE)).unwrap()
    }

    #[test]
    fn test_register_writes_all_groups() {
        let mut reg = seeded_registry();
        let report = register(&mut reg, &plan());
        assert!(report.is_success());
        assert_eq!(report.groups.len(), 4);

        let clsid = "{d194f491-9a76-44bd-84e1-62cdccd49bea}";
        let get = |root: RegistryRoot, key: &str, name: Option<&str>| {
            reg.get_string(root, key, name).unwrap()
        };

        assert_eq!(
            get(
                RegistryRoot::ClassesRoot,
                &format!(r"CLSID\{}\InprocServer32", clsid),
                None
            ),
            Some(MODULE.to_string())
        );
        assert_eq!(
            get(
                RegistryRoot::ClassesRoot,
                &format!(r"CLSID\{}\InprocServer32", clsid),
                Some("ThreadingModel")
            ),
            Some("Apartment".to_string())
        );

        let store_key = format!(r"{}\SendToService", COMMAND_STORE_SHELL);
        assert_eq!(
            get(RegistryRoot::LocalMachine, &store_key, Some("ExplorerCommandHandler")),
            Some(clsid.to_string())
        );
        assert_eq!(
            get(RegistryRoot::LocalMachine, &store_key, Some("MUIVerb")),
            Some("Parallel".to_string())
        );
        assert_eq!(
            get(RegistryRoot::LocalMachine, &store_key, Some("Icon")),
            Some(format!("{},0", MODULE))
        );

        for menu in [
            r"*\shellex\ContextMenuHandlers\Parallel",
            r"Directory\shellex\ContextMenuHandlers\Parallel",
        ] {
            assert_eq!(
                get(RegistryRoot::ClassesRoot, menu, None),
                Some(clsid.to_string())
            );
        }
    }

    #[test]
    fn test_register_then_unregister_restores_registry() {
        let mut reg = seeded_registry();
        let before = reg.snapshot();

        assert!(register(&mut reg, &plan()).is_success());
        assert_ne!(reg.snapshot(), before);

        assert!(unregister(&mut reg, &plan()).is_success());
        assert_eq!(reg.snapshot(), before);
    }

    #[test]
    fn test_unregister_when_absent_is_noop_success() {
        let mut reg = seeded_registry();
        let before = reg.snapshot();

        let report = unregister(&mut reg, &plan());
        assert!(report.is_success());
        assert_eq!(report.operation, Operation::Unregister);
        assert_eq!(reg.snapshot(), before);

        assert!(unregister(&mut reg, &plan()).is_success());
        assert_eq!(reg.snapshot(), before);
    }

    #[test]
    fn test_register_twice_matches_register_once() {
        let mut once = seeded_registry();
        register(&mut once, &plan());

        let mut twice = seeded_registry();
        register(&mut twice, &plan());
        register(&mut twice, &plan());

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_reregister_from_new_location_overwrites_paths() {
        let mut reg = seeded_registry();
        register(&mut reg, &plan());

        let moved =
            RegistrationPlan::for_module(Path::new(r"D:\Apps\Parallel.Shell.dll")).unwrap();
        register(&mut reg, &moved);

        assert_eq!(
            status(&reg, &moved).unwrap(),
            KeyGroup::ALL
                .iter()
                .map(|g| (*g, GroupStatus::Current))
                .collect::<Vec<_>>()
        );
        assert_eq!(
            status(&reg, &plan()).unwrap()[0],
            (KeyGroup::ComponentServer, GroupStatus::Stale)
        );
    }

    #[test]
    fn test_icon_reference_keeps_spaces_and_non_ascii() {
        let path = r"C:\Users\Jörg Müller\アプリ\Parallel Shell.dll";
        let plan = RegistrationPlan::for_module(Path::new(path)).unwrap();
        let mut reg = MemoryRegistry::new();
        register(&mut reg, &plan);

        let record = plan.record(KeyGroup::CommandStore).unwrap();
        assert_eq!(
            reg.get_string(record.root, &record.key, Some("Icon")).unwrap(),
            Some(format!("{},0", path))
        );
        assert_eq!(icon_reference(path), format!("{},0", path));
    }

    #[cfg(unix)]
    fn non_unicode_module() -> std::path::PathBuf {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        Path::new(OsStr::from_bytes(b"/opt/par\xffallel/shell.dll")).to_path_buf()
    }

    #[cfg(windows)]
    fn non_unicode_module() -> std::path::PathBuf {
        use std::ffi::OsString;
        use std::os::windows::ffi::OsStringExt;
        // Unpaired high surrogate, as GetModuleFileNameW can return
        let mut wide: Vec<u16> = r"C:\par".encode_utf16().collect();
        wide.push(0xD800);
        wide.extend(r"allel\shell.dll".encode_utf16());
        OsString::from_wide(&wide).into()
    }

    #[test]
    fn test_non_unicode_module_path_is_rejected() {
        let err = RegistrationPlan::for_module(&non_unicode_module()).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidValue {
                root: RegistryRoot::ClassesRoot,
                ..
            }
        ));
    }

    #[test]
    fn test_removal_plan_unregisters_any_module() {
        let mut reg = seeded_registry();
        let before = reg.snapshot();
        register(&mut reg, &plan());

        let report = unregister(&mut reg, &RegistrationPlan::for_removal());
        assert!(report.is_success());
        assert_eq!(reg.snapshot(), before);
    }

    #[test]
    fn test_denied_group_reported_and_others_still_written() {
        let mut reg = seeded_registry();
        reg.deny_writes(RegistryRoot::LocalMachine, "SOFTWARE");

        let report = register(&mut reg, &plan());
        assert!(!report.is_success());

        let failures: Vec<_> = report.failures().map(|(g, _)| g).collect();
        assert_eq!(failures, vec![KeyGroup::CommandStore]);
        assert!(matches!(
            report.outcome_of(KeyGroup::CommandStore),
            Some(Err(RegistryError::AccessDenied { .. }))
        ));

        let statuses = status(&reg, &plan()).unwrap();
        assert_eq!(
            statuses,
            vec![
                (KeyGroup::ComponentServer, GroupStatus::Current),
                (KeyGroup::CommandStore, GroupStatus::Absent),
                (KeyGroup::FileMenu, GroupStatus::Current),
                (KeyGroup::DirectoryMenu, GroupStatus::Current),
            ]
        );
    }

    #[test]
    fn test_unregister_reports_denied_group() {
        let mut reg = seeded_registry();
        register(&mut reg, &plan());
        reg.deny_writes(RegistryRoot::ClassesRoot, r"Directory\shellex");

        let report = unregister(&mut reg, &plan());
        let failures: Vec<_> = report.failures().map(|(g, _)| g).collect();
        assert_eq!(failures, vec![KeyGroup::DirectoryMenu]);

        let statuses = status(&reg, &plan()).unwrap();
        assert_eq!(statuses[0], (KeyGroup::ComponentServer, GroupStatus::Absent));
        assert_eq!(statuses[3], (KeyGroup::DirectoryMenu, GroupStatus::Current));
    }

    #[test]
    fn test_report_display_lists_each_group() {
        let mut reg = MemoryRegistry::new();
        reg.deny_writes(RegistryRoot::ClassesRoot, r"*\shellex");
        let text = register(&mut reg, &plan()).to_string();

        assert!(text.contains("component-server"));
        assert!(
            text.lines()
                .any(|l| l.starts_with("file-menu") && l.contains("FAILED"))
        );
        assert_eq!(text.lines().count(), 4);
    }
}
