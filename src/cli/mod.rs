//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{BuildCommand, CheckCommand, DevCommand, RunCommand, TasksCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Static site asset pipeline
#[derive(Debug, Parser, Clone)]
#[command(name = "sitepipe")]
#[command(version)]
#[command(about = "Builds and serves static site assets", long_about = None)]
pub struct Cli {
    /// Command to run; `dev` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (default: sitepipe.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a one-shot production build
    Build(BuildCommand),

    /// Build, serve the output and rebuild on change
    Dev(DevCommand),

    /// Run individual tasks in series
    Run(RunCommand),

    /// Remove the build directory
    Clean,

    /// Validate the configuration
    Check(CheckCommand),

    /// List tasks and graphs
    Tasks(TasksCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The command to run, defaulting to `dev`
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Dev(DevCommand::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::SchedulingStrategyArg;

    #[test]
    fn test_no_subcommand_means_dev() {
        let cli = Cli::try_parse_from(["sitepipe"]).unwrap();
        assert!(matches!(cli.command(), Command::Dev(cmd) if !cmd.no_build && cmd.port.is_none()));
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::try_parse_from([
            "sitepipe",
            "-v",
            "build",
            "--graph",
            "assets",
            "--strategy",
            "parallel-limited",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command() {
            Command::Build(cmd) => {
                assert_eq!(cmd.graph, "assets");
                assert_eq!(cmd.strategy, SchedulingStrategyArg::ParallelLimited);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_tasks() {
        assert!(Cli::try_parse_from(["sitepipe", "run"]).is_err());

        let cli = Cli::try_parse_from(["sitepipe", "run", "styles", "html", "-c", "site.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("site.yaml")));
        assert!(matches!(cli.command(), Command::Run(cmd) if cmd.tasks == ["styles", "html"]));
    }
}
