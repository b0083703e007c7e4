use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::graph::TaskManager;
use crate::task::{TaskId, TaskStatus};

use super::events::{FlowEvent, FlowObserver};

/// Terminal progress for a run: one overall bar plus a spinner per running task.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    task_bars: HashMap<TaskId, ProgressBar>,
    titles: HashMap<TaskId, String>,
    enabled: bool,
}

impl ProgressMonitor {
    /// `enabled = false` yields a monitor that ignores every event (JSONL
    /// output, non-interactive runs).
    pub fn new(manager: &TaskManager, enabled: bool) -> Self {
        let titles = manager
            .tasks()
            .map(|(id, t)| {
                let title = match t.parent().and_then(|p| manager.task(p)) {
                    Some(parent) => format!("{} / {}", parent.title(), t.title()),
                    None => t.title().to_string(),
                };
                (id, title)
            })
            .collect();

        if !enabled {
            return Self {
                multi: MultiProgress::new(),
                overall: ProgressBar::hidden(),
                task_bars: HashMap::new(),
                titles,
                enabled: false,
            };
        }

        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stages ({percent}%) {msg}")
        {
            overall.set_style(style.progress_chars("█▓▒░  "));
        }
        overall.set_message("Starting...");

        Self {
            multi,
            overall,
            task_bars: HashMap::new(),
            titles,
            enabled: true,
        }
    }

    fn title(&self, id: TaskId) -> String {
        self.titles
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("task {id}"))
    }

    fn start_task(&mut self, id: TaskId) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.set_message(format!("⏳ {}", self.title(id)));
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Some(old) = self.task_bars.insert(id, bar) {
            old.finish_and_clear();
        }
    }

    fn finish_task(&mut self, id: TaskId, success: bool) {
        if let Some(bar) = self.task_bars.remove(&id) {
            let icon = if success { "✅" } else { "❌" };
            let elapsed = bar.elapsed().as_millis();
            bar.finish_with_message(format!("{} {} ({}ms)", icon, self.title(id), elapsed));
        }
    }
}

impl FlowObserver for ProgressMonitor {
    fn on_event(&mut self, event: &FlowEvent) {
        if !self.enabled {
            return;
        }
        match event {
            FlowEvent::Started => {
                self.overall.reset();
                self.overall.set_message("Starting...");
            }
            FlowEvent::Progress {
                completed,
                total,
                message,
            } => {
                self.overall.set_length(*total as u64);
                self.overall.set_position(*completed as u64);
                self.overall.set_message(message.clone());
            }
            FlowEvent::TaskStatusChanged { id, status } => match status {
                TaskStatus::InProgress => self.start_task(*id),
                TaskStatus::Success => self.finish_task(*id, true),
                TaskStatus::Fail => self.finish_task(*id, false),
                TaskStatus::None => {}
            },
            FlowEvent::Done => {
                for (_, bar) in self.task_bars.drain() {
                    bar.finish_and_clear();
                }
                let done = self.overall.position() >= self.overall.length().unwrap_or(0);
                let msg = if done {
                    "✅ All stages completed"
                } else {
                    "❌ Run aborted"
                };
                self.overall.finish_with_message(msg);
            }
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.task_bars.drain() {
            bar.finish_and_clear();
        }
    }
}
