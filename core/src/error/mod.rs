#[allow(clippy::module_inception)]
pub mod error;
pub mod flow;

pub use error::{CliError, ToolError};
pub use flow::{FlowError, NotRunnableReason};
