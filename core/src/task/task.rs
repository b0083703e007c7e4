use std::sync::Arc;

use crate::error::NotRunnableReason;

use super::action::TaskAction;
use super::types::{TaskId, TaskStatus, TaskType};

/// A single pipeline stage or sub-action.
///
/// Owned by the task manager arena; sub-task and parent links are ids.
pub struct Task {
    title: String,
    status: TaskStatus,
    task_type: TaskType,
    enabled: bool,
    sub_tasks: Vec<TaskId>,
    parent: Option<TaskId>,
    settings_key: Option<String>,
    log_file: Option<String>,
    action: Option<Arc<dyn TaskAction>>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_type(title, TaskType::Regular)
    }

    pub fn with_type(title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            title: title.into(),
            status: TaskStatus::None,
            task_type,
            enabled: true,
            sub_tasks: Vec::new(),
            parent: None,
            settings_key: None,
            log_file: None,
            action: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// True once an action is bound.
    pub fn is_valid(&self) -> bool {
        self.action.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn sub_tasks(&self) -> &[TaskId] {
        &self.sub_tasks
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn settings_key(&self) -> Option<&str> {
        self.settings_key.as_deref()
    }

    pub fn set_settings_key(&mut self, key: impl Into<String>) {
        self.settings_key = Some(key.into());
    }

    /// Log file template, e.g. `$OSRCDIR/synthesis.rpt`.
    pub fn log_file_template(&self) -> Option<&str> {
        self.log_file.as_deref()
    }

    pub fn set_log_file_template(&mut self, path: impl Into<String>) {
        self.log_file = Some(path.into());
    }

    /// Binds `action`, replacing any previous one.
    pub fn bind(&mut self, action: Arc<dyn TaskAction>) {
        self.action = Some(action);
    }

    pub fn unbind(&mut self) {
        self.action = None;
    }

    pub fn check_runnable(&self) -> Result<(), NotRunnableReason> {
        if !self.is_valid() {
            return Err(NotRunnableReason::Unbound);
        }
        if !self.enabled {
            return Err(NotRunnableReason::Disabled);
        }
        Ok(())
    }

    pub(crate) fn action(&self) -> Option<Arc<dyn TaskAction>> {
        self.action.clone()
    }

    pub(crate) fn write_status(&mut self, status: TaskStatus) -> TaskStatus {
        std::mem::replace(&mut self.status, status)
    }

    pub(crate) fn push_sub_task(&mut self, child: TaskId) {
        self.sub_tasks.push(child);
    }

    pub(crate) fn set_parent(&mut self, parent: TaskId) {
        self.parent = Some(parent);
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("title", &self.title)
            .field("status", &self.status)
            .field("task_type", &self.task_type)
            .field("enabled", &self.enabled)
            .field("valid", &self.is_valid())
            .field("sub_tasks", &self.sub_tasks)
            .finish()
    }
}
