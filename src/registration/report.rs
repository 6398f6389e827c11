use super::plan::KeyGroup;
use super::store::RegistryError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Unregister,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Register => f.write_str("register"),
            Operation::Unregister => f.write_str("unregister"),
        }
    }
}

/// Outcome for one record group. Only the first error of the group is kept; later writes in
/// the same group are still attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub group: KeyGroup,
    pub outcome: Result<(), RegistryError>,
}

/// Aggregate result of a register or unregister pass, one entry per key group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub operation: Operation,
    pub groups: Vec<GroupReport>,
}

impl RegistrationReport {
    pub fn is_success(&self) -> bool {
        self.groups.iter().all(|g| g.outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (KeyGroup, &RegistryError)> {
        self.groups
            .iter()
            .filter_map(|g| g.outcome.as_ref().err().map(|e| (g.group, e)))
    }

    pub fn outcome_of(&self, group: KeyGroup) -> Option<&Result<(), RegistryError>> {
        self.groups
            .iter()
            .find(|g| g.group == group)
            .map(|g| &g.outcome)
    }
}

impl fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            match &group.outcome {
                Ok(()) => writeln!(f, "{:<18} ok", group.group)?,
                Err(e) => writeln!(f, "{:<18} FAILED: {}", group.group, e)?,
            }
        }
        Ok(())
    }
}
