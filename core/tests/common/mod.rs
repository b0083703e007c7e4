use std::sync::{Arc, Mutex};

use fabflow_core::executor::{FlowController, FlowEvent};
use fabflow_core::graph::TaskManager;
use fabflow_core::task::{ActionContext, TaskId, TaskType};

pub type Calls = Arc<Mutex<Vec<TaskId>>>;
pub type Events = Arc<Mutex<Vec<FlowEvent>>>;

/// The FPGA pipeline with every Regular and Clean task bound to an action
/// that records its id. `failing` tasks report failure.
pub fn bound_pipeline(failing: &[TaskId]) -> (TaskManager, Calls) {
    let mut m = TaskManager::fpga_pipeline();
    let calls: Calls = Arc::default();
    let ids: Vec<TaskId> = m
        .tasks()
        .filter(|(_, t)| matches!(t.task_type(), TaskType::Regular | TaskType::Clean))
        .map(|(id, _)| id)
        .collect();
    for id in ids {
        let calls = calls.clone();
        let fail = failing.contains(&id);
        m.bind_task_command(id, move |ctx: &ActionContext| -> anyhow::Result<bool> {
            calls.lock().unwrap().push(ctx.task_id);
            Ok(!fail)
        })
        .unwrap();
    }
    (m, calls)
}

pub fn record_events(c: &FlowController) -> Events {
    let events: Events = Arc::default();
    let sink = events.clone();
    c.add_observer(move |ev: &FlowEvent| sink.lock().unwrap().push(ev.clone()));
    events
}

pub fn progress_messages(events: &[FlowEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|ev| match ev {
            FlowEvent::Progress { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("fabflow_core=debug")
        .try_init();
}
