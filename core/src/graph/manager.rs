use std::sync::Arc;

use crate::error::{FlowError, NotRunnableReason};
use crate::task::action::invoke;
use crate::task::{ActionContext, CancelToken, StatusTransition, Task, TaskAction, TaskId, TaskStatus, TaskType};

/// Callback fired on every status write, same-value writes included.
pub type StatusListener = Box<dyn FnMut(TaskId, TaskStatus) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub id: TaskId,
    pub status: TaskStatus,
}

/// Owns every task and the order in which they run.
#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<Task>,
    /// Declared execution queue, walked linearly by downstream invalidation.
    queue: Vec<TaskId>,
    /// Stages appended to the run stack by a full run.
    full_run: Vec<TaskId>,
    listeners: Vec<StatusListener>,
    journal: Option<Vec<StatusChange>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `task` to the arena. Ids are handed out in insertion order.
    pub fn add_task(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.tasks.len() as u32);
        self.tasks.push(task);
        id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id.index())
    }

    /// Reverse lookup by identity; `TaskId::INVALID` for foreign tasks.
    pub fn task_id(&self, task: &Task) -> TaskId {
        self.tasks
            .iter()
            .position(|t| std::ptr::eq(t, task))
            .map(|i| TaskId(i as u32))
            .unwrap_or(TaskId::INVALID)
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (TaskId(i as u32), t))
    }

    pub fn status_of(&self, id: TaskId) -> Option<TaskStatus> {
        self.task(id).map(Task::status)
    }

    /// Makes `child` a sub-task of `parent`.
    ///
    /// The forest stays two levels deep: a sub-task cannot own sub-tasks, a
    /// parent cannot itself be a sub-task, and a child has a single parent.
    pub fn append_sub_task(&mut self, parent: TaskId, child: TaskId) -> Result<(), FlowError> {
        let p = self.task(parent).ok_or(FlowError::UnknownTask(parent))?;
        let c = self.task(child).ok_or(FlowError::UnknownTask(child))?;
        if parent == child || p.parent().is_some() || !c.sub_tasks().is_empty() {
            return Err(FlowError::NestingTooDeep { parent, child });
        }
        if let Some(existing) = c.parent() {
            return Err(FlowError::DuplicateSubTask {
                parent: existing,
                child,
            });
        }
        self.link(parent, child);
        Ok(())
    }

    pub(crate) fn link(&mut self, parent: TaskId, child: TaskId) {
        self.tasks[parent.index()].push_sub_task(child);
        self.tasks[child.index()].set_parent(parent);
    }

    pub fn bind_task_command(
        &mut self,
        id: TaskId,
        action: impl TaskAction + 'static,
    ) -> Result<(), FlowError> {
        self.bind_shared(id, Arc::new(action))
    }

    pub fn bind_shared(&mut self, id: TaskId, action: Arc<dyn TaskAction>) -> Result<(), FlowError> {
        let task = self.task_mut(id).ok_or(FlowError::UnknownTask(id))?;
        task.bind(action);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: TaskId, enabled: bool) -> Result<(), FlowError> {
        let task = self.task_mut(id).ok_or(FlowError::UnknownTask(id))?;
        task.set_enabled(enabled);
        Ok(())
    }

    /// `InProgress` while any task runs, `None` otherwise.
    pub fn status(&self) -> TaskStatus {
        if self
            .tasks
            .iter()
            .any(|t| t.status() == TaskStatus::InProgress)
        {
            TaskStatus::InProgress
        } else {
            TaskStatus::None
        }
    }

    /// Writes `None` to every task, notifying for each.
    pub fn reset(&mut self) {
        for i in 0..self.tasks.len() {
            self.write_status(TaskId(i as u32), TaskStatus::None);
        }
    }

    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Result<(), FlowError> {
        if self.task(id).is_none() {
            return Err(FlowError::UnknownTask(id));
        }
        self.write_status(id, status);
        Ok(())
    }

    pub fn add_status_listener<F>(&mut self, listener: F)
    where
        F: FnMut(TaskId, TaskStatus) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Runs `id` to completion on the calling thread.
    ///
    /// Returns the status the task settled in.
    pub fn trigger(&mut self, id: TaskId) -> Result<TaskStatus, FlowError> {
        let (action, ctx) = self.begin_trigger(id, CancelToken::new())?;
        let ok = invoke(action.as_ref(), &ctx);
        self.finish_trigger(id, ok);
        Ok(self.status_of(id).unwrap_or_default())
    }

    /// Checks the task and moves it to `InProgress`.
    pub(crate) fn begin_trigger(
        &mut self,
        id: TaskId,
        cancel: CancelToken,
    ) -> Result<(Arc<dyn TaskAction>, ActionContext), FlowError> {
        let task = self.task(id).ok_or(FlowError::UnknownTask(id))?;
        task.check_runnable()
            .map_err(|reason| FlowError::NotRunnable { id, reason })?;
        let action = task.action().ok_or(FlowError::NotRunnable {
            id,
            reason: NotRunnableReason::Unbound,
        })?;
        let ctx = ActionContext {
            task_id: id,
            title: task.title().to_string(),
            cancel,
        };
        self.write_status(id, TaskStatus::InProgress);
        Ok((action, ctx))
    }

    /// Records the action outcome unless the task left `InProgress` meanwhile
    /// (stopped or reset); returns the written status.
    pub(crate) fn finish_trigger(&mut self, id: TaskId, ok: bool) -> Option<TaskStatus> {
        if self.status_of(id) != Some(TaskStatus::InProgress) {
            tracing::debug!(task_id = %id, "discarding outcome of task no longer in progress");
            return None;
        }
        let status = if ok {
            TaskStatus::Success
        } else {
            TaskStatus::Fail
        };
        self.write_status(id, status);
        Some(status)
    }

    pub fn execution_queue(&self) -> &[TaskId] {
        &self.queue
    }

    /// Replaces the execution queue; every id must exist.
    pub fn set_execution_queue(&mut self, queue: Vec<TaskId>) -> Result<(), FlowError> {
        self.check_ids(&queue)?;
        self.queue = queue;
        Ok(())
    }

    pub fn full_run_order(&self) -> &[TaskId] {
        &self.full_run
    }

    pub fn set_full_run_order(&mut self, order: Vec<TaskId>) -> Result<(), FlowError> {
        self.check_ids(&order)?;
        self.full_run = order;
        Ok(())
    }

    pub(crate) fn install_order(&mut self, queue: Vec<TaskId>, full_run: Vec<TaskId>) {
        self.queue = queue;
        self.full_run = full_run;
    }

    fn check_ids(&self, ids: &[TaskId]) -> Result<(), FlowError> {
        match ids.iter().find(|id| self.task(**id).is_none()) {
            Some(missing) => Err(FlowError::MissingQueueEntry(*missing)),
            None => Ok(()),
        }
    }

    /// Resets every queued task from `id` to the end of the execution queue.
    ///
    /// A Clean task starts one position earlier, at its parent. Tasks absent
    /// from the queue invalidate nothing.
    pub fn invalidate_downstream(&mut self, id: TaskId) {
        let Some(mut pos) = self.queue.iter().position(|q| *q == id) else {
            return;
        };
        let is_clean = self.task(id).map(Task::task_type) == Some(TaskType::Clean);
        if is_clean && pos > 0 {
            pos -= 1;
        }
        let downstream = self.queue[pos..].to_vec();
        for t in downstream {
            self.write_status(t, TaskStatus::None);
        }
    }

    /// The task's own log template, or its parent's.
    pub fn log_file_template(&self, id: TaskId) -> Option<&str> {
        let task = self.task(id)?;
        task.log_file_template().or_else(|| {
            task.parent()
                .and_then(|p| self.task(p))
                .and_then(Task::log_file_template)
        })
    }

    /// Re-checks the structural invariants.
    pub fn validate(&self) -> Result<(), FlowError> {
        self.check_ids(&self.queue)?;
        self.check_ids(&self.full_run)?;
        for (id, task) in self.tasks() {
            for child in task.sub_tasks() {
                let c = self.task(*child).ok_or(FlowError::UnknownTask(*child))?;
                if task.parent().is_some() || !c.sub_tasks().is_empty() {
                    return Err(FlowError::NestingTooDeep { parent: id, child: *child });
                }
                if c.parent() != Some(id) {
                    return Err(FlowError::DuplicateSubTask {
                        parent: id,
                        child: *child,
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn record_changes(&mut self, enabled: bool) {
        self.journal = enabled.then(Vec::new);
    }

    pub(crate) fn drain_changes(&mut self) -> Vec<StatusChange> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn write_status(&mut self, id: TaskId, status: TaskStatus) {
        let Some(task) = self.tasks.get_mut(id.index()) else {
            return;
        };
        let previous = task.write_status(status);
        if let Err(e) = StatusTransition::validate(previous, status) {
            tracing::debug!(task_id = %id, title = %task.title(), "{e}");
        }
        for listener in self.listeners.iter_mut() {
            listener(id, status);
        }
        if let Some(journal) = self.journal.as_mut() {
            journal.push(StatusChange { id, status });
        }
    }
}
