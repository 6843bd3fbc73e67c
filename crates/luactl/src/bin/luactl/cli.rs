//! luactl cli interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; luactl ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    /// Set logging level
    ///
    /// Ignored when LUACTL_LOG is set.
    #[clap(short = 'l', long = "log-level", global(true), default_value_t)]
    pub log_level: LogLevel,

    /// Global command timeout
    #[clap(
        short = 't',
        long = "timeout",
        global(true),
        default_value = "2m",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Syncs variables from addon submodules to the root module
    ///
    /// Reads variables.tf files from nested addon modules within the
    /// modules directory and generates corresponding variables-<addon-name>.tf
    /// files in the target directory.
    Sync(SyncCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Args, Debug)]
pub struct SyncCommand {
    /// Directory containing Terraform modules
    #[clap(short = 'd', long = "modules-dir", default_value = ".terraform/modules")]
    pub modules_dir: PathBuf,

    /// Directory of the root module
    #[clap(long = "target-dir", default_value = ".")]
    pub target_dir: PathBuf,

    /// Directory inside each module holding the nested addon module
    #[clap(long = "nested-dir", default_value = "modules")]
    pub nested_dir: String,

    #[clap(long = "mode", default_value_t)]
    pub mode: SyncMode,

    /// Local holding addon overrides (local.<namespace>)
    #[clap(long = "namespace", default_value = "addon")]
    pub namespace: String,

    /// Leave lookups of undeclared variables untouched instead of defaulting to null
    #[clap(long = "skip-missing-defaults")]
    pub skip_missing_defaults: bool,

    /// Print a summary of the run
    #[arg(short = 'F', long = "output-format")]
    pub format: Option<OutputFormat>,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum SyncMode {
    /// Only generate variables-<addon-name>.tf
    #[default]
    GenerateRootOnly,
    /// Also rewrite lookups in <addon-name>.tf
    RewriteConsumer,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::GenerateRootOnly => f.write_str("generate-root-only"),
            SyncMode::RewriteConsumer => f.write_str("rewrite-consumer"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => f.write_str("debug"),
            LogLevel::Info => f.write_str("info"),
            LogLevel::Warn => f.write_str("warn"),
            LogLevel::Error => f.write_str("error"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Dump the variable declarations found in a file
    Declarations { file: PathBuf },
    /// Dump a parsed file
    Document { file: PathBuf },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_defaults() {
        let cli = Cli::parse_from(["luactl", "sync"]);
        assert_eq!(cli.timeout, Duration::from_secs(120));
        assert!(matches!(cli.log_level, LogLevel::Info));

        let Command::Sync(sync) = cli.command else {
            panic!("expected sync command");
        };
        assert_eq!(sync.modules_dir, PathBuf::from(".terraform/modules"));
        assert!(matches!(sync.mode, SyncMode::GenerateRootOnly));
        assert!(sync.format.is_none());
    }

    #[test]
    fn warning_is_an_alias() {
        let cli = Cli::parse_from(["luactl", "-l", "warning", "sync", "--mode", "rewrite-consumer"]);
        assert!(matches!(cli.log_level, LogLevel::Warn));
    }
}
