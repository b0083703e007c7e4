use serde::Serialize;

use crate::task::{TaskId, TaskStatus};

/// Events raised by [`super::FlowController`] while it drives a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// A run was accepted. Emitted once per `start_*` call.
    Started,
    /// `completed` of `total` stages are finished; `message` names the last one.
    Progress {
        completed: usize,
        total: usize,
        message: String,
    },
    /// Any status write observed on the task graph.
    TaskStatusChanged { id: TaskId, status: TaskStatus },
    /// The run stack drained, by success or abort.
    Done,
}

impl FlowEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowEvent::Started => "started",
            FlowEvent::Progress { .. } => "progress",
            FlowEvent::TaskStatusChanged { .. } => "task_status_changed",
            FlowEvent::Done => "done",
        }
    }
}

/// Receives controller events.
///
/// Observers are called synchronously from the thread driving the run, with
/// the controller lock released. Keep them short.
pub trait FlowObserver: Send {
    fn on_event(&mut self, event: &FlowEvent);
}

impl<F> FlowObserver for F
where
    F: FnMut(&FlowEvent) + Send,
{
    fn on_event(&mut self, event: &FlowEvent) {
        self(event)
    }
}
