use std::collections::BTreeMap;

use crate::task::TaskId;

use super::types::TaskReport;

/// Produces reports for one stage, usually by parsing its tool log.
pub trait ReportManager: Send + Sync {
    /// Report ids this manager knows how to build.
    fn available_report_ids(&self) -> Vec<String>;

    /// `None` when the id is unknown or the data is not there yet.
    fn create_report(&self, report_id: &str) -> Option<TaskReport>;
}

/// One report manager per stage task.
#[derive(Default)]
pub struct ReportRegistry {
    managers: BTreeMap<TaskId, Box<dyn ReportManager>>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `manager` for `stage`, replacing any earlier one.
    pub fn register(&mut self, stage: TaskId, manager: Box<dyn ReportManager>) {
        self.managers.insert(stage, manager);
    }

    pub fn manager(&self, stage: TaskId) -> Option<&dyn ReportManager> {
        self.managers.get(&stage).map(|m| m.as_ref())
    }

    pub fn stages(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.managers.keys().copied()
    }

    pub fn create_report(&self, stage: TaskId, report_id: &str) -> Option<TaskReport> {
        self.manager(stage)?.create_report(report_id)
    }
}

impl std::fmt::Debug for ReportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRegistry")
            .field("stages", &self.managers.keys().collect::<Vec<_>>())
            .finish()
    }
}
