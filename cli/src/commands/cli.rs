use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fabflow", version, about = "FPGA build-flow task engine")]
pub struct Args {
    /// Configuration file; defaults to ~/.fabflow/config.toml, then ./fabflow.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable the terminal progress bar.
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every enabled stage of the pipeline in order.
    Run,
    /// Run a single task by name, e.g. `synthesis` or `routing-clean`.
    Task(TaskArgs),
    /// Print the task tree and the execution queue.
    List,
    /// List a stage's reports, or print one.
    Report(ReportArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TaskArgs {
    pub name: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Stage name, e.g. `synthesis`, `placement`, `routing`, `timing-sign-off`.
    pub stage: String,

    /// Report id as listed without one.
    pub report_id: Option<String>,
}
