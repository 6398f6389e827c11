//! Installer tool for the Parallel shell extension.
//!
//! Usage:
//!   parallel-reg plan --module <dll>                 - Print the registry records
//!   parallel-reg install --module <dll> [--dry-run]  - Register the explorer command
//!   parallel-reg uninstall [--dry-run]               - Remove all registry entries
//!   parallel-reg status --module <dll>               - Compare the registry with the records

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use parallel_shell::config::LogLevel;
use parallel_shell::logging::{LogConfig, init_logging};
use parallel_shell::registration::{
    self, GroupStatus, MemoryRegistry, RegistrationPlan, RegistrationReport,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "parallel-reg", about = "Register the Parallel explorer command")]
struct Cli {
    /// Log registry operations to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registry records for a module location
    Plan {
        #[arg(long)]
        module: PathBuf,
    },
    /// Write the registry records
    Install {
        #[arg(long)]
        module: PathBuf,
        /// Apply to an in-memory registry and print the result
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove the registry records
    Uninstall {
        #[arg(long)]
        dry_run: bool,
    },
    /// Show which key groups are present
    Status {
        #[arg(long)]
        module: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _log_guard = if cli.verbose {
        Some(
            init_logging(LogConfig {
                file: false,
                stderr: true,
                level: LogLevel::Debug,
                ..LogConfig::default()
            })
            .context("Failed to initialize logging system")?,
        )
    } else {
        None
    };

    match cli.command {
        Command::Plan { module } => {
            let plan = RegistrationPlan::for_module(&absolute(&module)?)?;
            print!("{}", plan);
            Ok(ExitCode::SUCCESS)
        }
        Command::Install { module, dry_run } => {
            let module = absolute(&module)?;
            let plan = RegistrationPlan::for_module(&module)?;
            if dry_run {
                let mut store = MemoryRegistry::new();
                let report = registration::register(&mut store, &plan);
                print!("{}", store.render());
                return Ok(finish(&report));
            }
            if !module.is_file() {
                bail!("Module not found: {}", module.display());
            }
            let mut store = live_registry()?;
            Ok(finish(&registration::register(&mut store, &plan)))
        }
        Command::Uninstall { dry_run } => {
            let plan = RegistrationPlan::for_removal();
            if dry_run {
                for record in plan.records() {
                    println!("delete [{}\\{}]", record.root, record.owned_key);
                }
                return Ok(finish(&simulate_uninstall(&plan)));
            }
            let mut store = live_registry()?;
            Ok(finish(&registration::unregister(&mut store, &plan)))
        }
        Command::Status { module } => {
            let plan = RegistrationPlan::for_module(&absolute(&module)?)?;
            let store = live_registry()?;
            let statuses = registration::status(&store, &plan).context("Failed to read registry")?;
            let mut complete = true;
            for (group, status) in statuses {
                complete &= status == GroupStatus::Current;
                println!("{:<18} {:?}", group, status);
            }
            Ok(if complete {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid module path: {}", path.display()))
}

/// Remove the plan from an in-memory registry that holds a complete installation.
fn simulate_uninstall(plan: &RegistrationPlan) -> RegistrationReport {
    let mut store = MemoryRegistry::new();
    registration::register(&mut store, plan);
    registration::unregister(&mut store, plan)
}

fn finish(report: &RegistrationReport) -> ExitCode {
    print!("{}", report);
    if report.is_success() {
        println!("{} complete", report.operation);
        ExitCode::SUCCESS
    } else {
        eprintln!("{} incomplete: run as administrator and retry", report.operation);
        ExitCode::FAILURE
    }
}

#[cfg(windows)]
fn live_registry() -> Result<impl registration::RegistryStore> {
    Ok(registration::WindowsRegistry)
}

#[cfg(not(windows))]
fn live_registry() -> Result<MemoryRegistry> {
    bail!("Writing the live registry is only supported on Windows; use --dry-run")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallel_shell::registration::{KeyGroup, Operation};

    #[test]
    fn test_simulated_uninstall_reports_every_group() {
        let report = simulate_uninstall(&RegistrationPlan::for_removal());
        assert_eq!(report.operation, Operation::Unregister);
        assert!(report.is_success());
        assert_eq!(
            report.groups.iter().map(|g| g.group).collect::<Vec<_>>(),
            KeyGroup::ALL.to_vec()
        );
        assert_eq!(finish(&report), ExitCode::SUCCESS);
    }

    #[test]
    fn test_cli_parses_uninstall_dry_run() {
        let cli = Cli::try_parse_from(["parallel-reg", "uninstall", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Command::Uninstall { dry_run: true }));
    }
}
