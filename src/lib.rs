pub mod command;
pub mod config;
pub mod keys;
pub mod logging;
pub mod registration;
#[cfg(windows)]
pub mod shellext;

// Re-export commonly used types
pub use command::{BackupCommand, Selection};
pub use config::ShellConfig;
pub use logging::{LogConfig, LogGuard};
pub use registration::{RegistrationPlan, RegistrationReport};
