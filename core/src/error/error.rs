use thiserror::Error;

use super::flow::FlowError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),
    #[error("config error: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("run failed at {0}")]
    RunFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failures raised while driving an external EDA tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("cannot find executable: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("tool io error: {context} {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
    #[error("{tool} exited with status {code}")]
    NonZeroExit { tool: String, code: i32 },
    #[error("{0} was cancelled")]
    Cancelled(String),
    #[error("stage precondition failed: {0}")]
    Precondition(String),
}
