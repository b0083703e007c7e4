pub mod tool;

pub use tool::{ToolCommand, ToolOutcome, ToolRunner};
