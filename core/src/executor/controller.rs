use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::error::FlowError;
use crate::graph::{StatusChange, TaskManager};
use crate::report::{ReportRegistry, TaskReport};
use crate::task::action::invoke;
use crate::task::{CancelToken, TaskId, TaskStatus};

use super::events::{FlowEvent, FlowObserver};

/// Outcome of one `start_*` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Stages placed on the run stack.
    pub total: usize,
    /// Stages that reached `Success` or `Fail`.
    pub finished: usize,
    /// The stage that aborted the run.
    pub failed: Option<TaskId>,
    /// `stop_current_task` was called while the run was active.
    pub stopped: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failed.is_none() && !self.stopped && self.finished == self.total
    }
}

struct RunState {
    manager: TaskManager,
    stack: Vec<TaskId>,
    counter: usize,
    total: usize,
    failed: Option<TaskId>,
    stopped: bool,
}

impl RunState {
    fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    fn begin_run(&mut self, stack: Vec<TaskId>) {
        self.total = stack.len();
        self.stack = stack;
        self.counter = 0;
        self.failed = None;
        self.stopped = false;
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total,
            finished: self.counter,
            failed: self.failed,
            stopped: self.stopped,
        }
    }

    fn title(&self, id: TaskId) -> String {
        self.manager
            .task(id)
            .map(|t| t.title().to_string())
            .unwrap_or_default()
    }

    /// Turns the status writes since the last call into events, advancing the
    /// run stack on the way.
    fn process_changes(&mut self) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        for StatusChange { id, status } in self.manager.drain_changes() {
            events.push(FlowEvent::TaskStatusChanged { id, status });
            if !self.stack.contains(&id) {
                continue;
            }
            match status {
                TaskStatus::InProgress => {
                    if self.counter == 0 && self.total != 0 {
                        events.push(FlowEvent::Progress {
                            completed: 0,
                            total: self.total,
                            message: format!("{} Running", self.title(id)),
                        });
                    }
                }
                TaskStatus::Success | TaskStatus::Fail => {
                    self.counter += 1;
                    let outcome = if status == TaskStatus::Success {
                        "Complete"
                    } else {
                        "Failed"
                    };
                    let message = format!("{} {outcome}", self.title(id));
                    tracing::debug!(
                        task_id = %id,
                        status = %status,
                        completed = self.counter,
                        total = self.total,
                        "{message}"
                    );
                    events.push(FlowEvent::Progress {
                        completed: self.counter,
                        total: self.total,
                        message,
                    });

                    if status == TaskStatus::Success {
                        self.stack.retain(|t| *t != id);
                    } else {
                        self.failed.get_or_insert(id);
                        self.stack.clear();
                    }
                    if self.stack.is_empty() {
                        events.push(FlowEvent::Done);
                    }
                }
                TaskStatus::None => {}
            }
        }
        events
    }
}

/// Sequences runs over a [`TaskManager`].
///
/// All run state sits behind one mutex. Bound actions are invoked with the
/// lock released, so [`FlowController::stop_current_task`] may be called from
/// another thread while a tool is running. Observers are called after each
/// step with the lock released, before the next task is triggered.
pub struct FlowController {
    state: Mutex<RunState>,
    observers: Mutex<Vec<Box<dyn FlowObserver>>>,
    reports: ReportRegistry,
    cancel: CancelToken,
}

impl FlowController {
    pub fn new(mut manager: TaskManager) -> Self {
        manager.record_changes(true);
        Self {
            state: Mutex::new(RunState {
                manager,
                stack: Vec::new(),
                counter: 0,
                total: 0,
                failed: None,
                stopped: false,
            }),
            observers: Mutex::new(Vec::new()),
            reports: ReportRegistry::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_reports(mut self, reports: ReportRegistry) -> Self {
        self.reports = reports;
        self
    }

    pub fn reports(&self) -> &ReportRegistry {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut ReportRegistry {
        &mut self.reports
    }

    /// Registers an observer. Must not be called from inside an observer.
    pub fn add_observer(&self, observer: impl FlowObserver + 'static) {
        self.lock_observers().push(Box::new(observer));
    }

    /// Read access to the task graph.
    pub fn inspect<R>(&self, f: impl FnOnce(&TaskManager) -> R) -> R {
        f(&self.lock_state().manager)
    }

    /// Mutable access to the task graph. Status writes made by `f` are
    /// reported to observers like any other.
    ///
    /// Do not call `TaskManager::trigger` from here: the action would run
    /// under the controller lock.
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut TaskManager) -> R) -> R {
        let (result, events) = {
            let mut st = self.lock_state();
            let result = f(&mut st.manager);
            (result, st.process_changes())
        };
        self.dispatch(events);
        result
    }

    pub fn into_manager(self) -> TaskManager {
        let mut manager = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .manager;
        manager.record_changes(false);
        manager
    }

    /// Aggregate status of the graph.
    pub fn status(&self) -> TaskStatus {
        self.lock_state().manager.status()
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_active()
    }

    /// Remaining tasks of the active run, head first.
    pub fn run_stack(&self) -> Vec<TaskId> {
        self.lock_state().stack.clone()
    }

    /// Summary of the current or last run.
    pub fn last_run(&self) -> RunSummary {
        self.lock_state().summary()
    }

    /// Runs every enabled, bound stage of the full-run order.
    ///
    /// Blocks until the run settles.
    pub fn start_all(&self) -> Result<RunSummary, FlowError> {
        let events = {
            let mut st = self.lock_state();
            if st.is_active() {
                tracing::warn!("start_all rejected: a run is already active");
                return Err(FlowError::RunActive);
            }
            st.manager.reset();
            let stack: Vec<TaskId> = st
                .manager
                .full_run_order()
                .iter()
                .copied()
                .filter(|id| {
                    st.manager
                        .task(*id)
                        .is_some_and(|t| t.is_enabled() && t.is_valid())
                })
                .collect();
            tracing::info!(total = stack.len(), "starting full run");
            self.start_locked(&mut st, stack)
        };
        self.dispatch(events);
        self.drive();
        Ok(self.last_run())
    }

    /// Runs a single task. Rejected when a run is active or the task is
    /// unknown, unbound or disabled.
    pub fn start_task(&self, id: TaskId) -> Result<RunSummary, FlowError> {
        let events = {
            let mut st = self.lock_state();
            if st.is_active() {
                tracing::warn!(task_id = %id, "start_task rejected: a run is already active");
                return Err(FlowError::RunActive);
            }
            let task = st.manager.task(id).ok_or(FlowError::UnknownTask(id))?;
            if let Err(reason) = task.check_runnable() {
                tracing::warn!(task_id = %id, title = %task.title(), %reason, "start_task rejected");
                return Err(FlowError::NotRunnable { id, reason });
            }
            tracing::info!(task_id = %id, title = %task.title(), "starting task");
            self.start_locked(&mut st, vec![id])
        };
        self.dispatch(events);
        self.drive();
        Ok(self.last_run())
    }

    fn start_locked(&self, st: &mut RunState, stack: Vec<TaskId>) -> Vec<FlowEvent> {
        self.cancel.reset();
        let empty = stack.is_empty();
        st.begin_run(stack);
        let mut events = st.process_changes();
        events.push(FlowEvent::Started);
        if empty {
            events.push(FlowEvent::Done);
        }
        events
    }

    /// Forces every running task to `Fail` and raises the cancel token.
    ///
    /// The controller handles the forced `Fail` exactly like a tool failure;
    /// there is no separate cancelled state. Returns whether anything was
    /// running.
    pub fn stop_current_task(&self) -> bool {
        let (events, any) = {
            let mut st = self.lock_state();
            let running: Vec<TaskId> = st
                .manager
                .tasks()
                .filter(|(_, t)| t.status() == TaskStatus::InProgress)
                .map(|(id, _)| id)
                .collect();
            if st.is_active() {
                st.stopped = true;
                self.cancel.cancel();
            }
            for id in &running {
                tracing::warn!(task_id = %id, title = %st.title(*id), "stopping task");
                let _ = st.manager.set_status(*id, TaskStatus::Fail);
            }
            (st.process_changes(), !running.is_empty())
        };
        self.dispatch(events);
        any
    }

    /// Asks the report manager of `stage` for `report_id`.
    ///
    /// Without a stage the running task, or else the head of the run stack, is
    /// used. Sub-tasks fall back to their parent stage's manager.
    pub fn create_report(
        &self,
        stage: Option<TaskId>,
        report_id: &str,
    ) -> Result<Option<TaskReport>, FlowError> {
        let stage = {
            let st = self.lock_state();
            let id = match stage {
                Some(id) => id,
                None => {
                    let running = st
                        .manager
                        .tasks()
                        .find(|(_, t)| t.status() == TaskStatus::InProgress)
                        .map(|(id, _)| id);
                    match running.or_else(|| st.stack.first().copied()) {
                        Some(id) => id,
                        None => return Ok(None),
                    }
                }
            };
            let task = st.manager.task(id).ok_or(FlowError::UnknownTask(id))?;
            match task.parent() {
                Some(parent) if self.reports.manager(id).is_none() => parent,
                _ => id,
            }
        };
        Ok(self.reports.create_report(stage, report_id))
    }

    /// Advances the run stack until it is empty.
    fn drive(&self) {
        loop {
            let (step, events) = {
                let mut st = self.lock_state();
                let Some(head) = st.stack.first().copied() else {
                    return;
                };
                st.manager.invalidate_downstream(head);
                let step = match st.manager.begin_trigger(head, self.cancel.clone()) {
                    Ok(step) => Some(step),
                    Err(e) => {
                        // Unbound or disabled after the run was built.
                        tracing::error!(task_id = %head, "cannot trigger queued task: {e}");
                        let _ = st.manager.set_status(head, TaskStatus::Fail);
                        None
                    }
                };
                (step, st.process_changes())
            };
            self.dispatch(events);

            let Some((action, ctx)) = step else {
                continue;
            };
            tracing::debug!(task_id = %ctx.task_id, title = %ctx.title, "task triggered");
            let ok = invoke(action.as_ref(), &ctx);

            let events = {
                let mut st = self.lock_state();
                st.manager.finish_trigger(ctx.task_id, ok);
                st.process_changes()
            };
            self.dispatch(events);
        }
    }

    fn dispatch(&self, events: Vec<FlowEvent>) {
        if events.is_empty() {
            return;
        }
        let mut observers = self.lock_observers();
        for event in &events {
            for observer in observers.iter_mut() {
                observer.on_event(event);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observers(&self) -> MutexGuard<'_, Vec<Box<dyn FlowObserver>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.lock_state();
        f.debug_struct("FlowController")
            .field("stack", &st.stack)
            .field("counter", &st.counter)
            .field("total", &st.total)
            .finish()
    }
}
