//! The Parallel command, independent of the COM surface that exposes it to Explorer.
//!
//! One instance lives for one context-menu build. The host may query the title and icon any
//! number of times, then invokes the command at most once if the user picks it.

use crate::keys::COMMAND_LABEL;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to resolve selection: {0}")]
    Selection(String),
}

/// Items the user had selected when the menu was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<PathBuf>,
}

impl Selection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_paths(items: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandState {
    Created = 0,
    Queried = 1,
    Invoked = 2,
}

impl CommandState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CommandState::Created,
            1 => CommandState::Queried,
            _ => CommandState::Invoked,
        }
    }
}

/// Result of [`BackupCommand::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    Completed,
    /// The instance was already invoked; nothing was done
    AlreadyInvoked,
}

#[derive(Debug)]
pub struct BackupCommand {
    state: AtomicU8,
}

impl Default for BackupCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupCommand {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(CommandState::Created as u8),
        }
    }

    pub fn state(&self) -> CommandState {
        CommandState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn mark_queried(&self) {
        let _ = self.state.compare_exchange(
            CommandState::Created as u8,
            CommandState::Queried as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Menu label. Not localized, and the same for every selection.
    pub fn title(&self) -> &'static str {
        self.mark_queried();
        COMMAND_LABEL
    }

    /// Icon reference for the menu entry. `None` leaves the icon unset, which is not an error.
    pub fn icon(&self) -> Option<String> {
        self.mark_queried();
        None
    }

    /// Run the command for the selection.
    ///
    /// This is a no-op today. A real action must not block the caller: it runs on the shell's
    /// UI thread, and the host discards the result, so outcomes have to be reported through
    /// logs or notifications instead.
    pub fn invoke(&self, selection: &Selection) -> Result<InvokeOutcome, CommandError> {
        let previous = self
            .state
            .swap(CommandState::Invoked as u8, Ordering::AcqRel);
        if CommandState::from_u8(previous) == CommandState::Invoked {
            tracing::warn!(target: "shellext::context_menu", "Command already invoked on this instance, ignoring");
            return Ok(InvokeOutcome::AlreadyInvoked);
        }

        tracing::debug!(target: "shellext::context_menu", items = selection.len(), "Parallel command invoked");
        Ok(InvokeOutcome::Completed)
    }
}
