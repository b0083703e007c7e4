//! Task Manager: the arena owning every task, the static sub-task wiring and
//! the fixed execution queue.
//!
//! ```text
//! tasks:  [IP Generate, Analysis, Clean, Synthesis, Clean, Edit settings..., ...]
//!            ^ index == TaskId
//! queue:  IP Generate → Analysis → Clean → Synthesis → Clean → ... → Bitstream → Clean
//! full run: IP Generate → Analysis → Synthesis → ... → Bitstream
//! ```

pub mod ids;
mod manager;
mod paths;
mod pipeline;

pub use ids::{task_id_by_name, task_name, CompilerAction};
pub use manager::{StatusChange, StatusListener, TaskManager};
pub use paths::{resolve_log_path, PROJECT_OSRCDIR};
pub use pipeline::{EXECUTION_QUEUE, FULL_RUN_STAGES};
