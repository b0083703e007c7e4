//! Task nodes: identity, status and the action bound to them.
//!
//! Tasks never mutate their own status; every write goes through
//! [`crate::graph::TaskManager`] so that status listeners observe it.

pub mod action;
#[allow(clippy::module_inception)]
pub mod task;
pub mod transitions;
pub mod types;

pub use action::{simple_action, ActionContext, CancelToken, SimpleAction, TaskAction};
pub use task::Task;
pub use transitions::{StatusTransition, TransitionError};
pub use types::{TaskId, TaskStatus, TaskType};
