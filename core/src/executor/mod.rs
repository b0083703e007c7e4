//! Run sequencing over the task graph.
//!
//! ```text
//! start_all() / start_task(id)
//!   ↓  (reject if a run is active or the target is not runnable)
//! run stack = enabled ∧ bound stages in full-run order
//!   ↓
//! loop: head → invalidate_downstream(head) → InProgress → action → Success | Fail
//!   ↓        Success: pop head, continue      Fail: clear stack
//! FlowEvent::{Started, Progress, TaskStatusChanged, Done} → observers
//! ```

mod controller;
mod events;
mod progress;

pub use controller::{FlowController, RunSummary};
pub use events::{FlowEvent, FlowObserver};
pub use progress::ProgressMonitor;
