//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;

/// Run a one-shot production build
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Task graph to run
    #[arg(short, long, default_value = "build")]
    pub graph: String,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Parallel)]
    pub strategy: SchedulingStrategyArg,
}

/// Build, serve and watch
#[derive(Debug, Args, Clone, Default)]
pub struct DevCommand {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serve the existing build directory without building first
    #[arg(long)]
    pub no_build: bool,
}

/// Run individual tasks
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task names, run one after another
    #[arg(required = true)]
    pub tasks: Vec<String>,
}

/// Validate the configuration
#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    /// Print the resolved configuration as JSON
    #[arg(long)]
    pub json: bool,
}

/// List tasks and graphs
#[derive(Debug, Args, Clone)]
pub struct TasksCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(4),
        }
    }
}
