use std::fmt::Write as _;

use fabflow_core::graph::{task_name, TaskManager};
use fabflow_core::task::{Task, TaskId};

fn row(out: &mut String, id: TaskId, task: &Task, indent: &str) {
    let name = task_name(id).unwrap_or("-");
    let _ = writeln!(
        out,
        "{id:>3}  {indent}{name:<30} {title:<22} {kind:<8} {enabled:<8} {bound}",
        title = task.title(),
        kind = task.task_type().as_str(),
        enabled = if task.is_enabled() { "enabled" } else { "disabled" },
        bound = if task.is_valid() { "bound" } else { "unbound" },
    );
}

/// Task tree, stages first with their sub-tasks indented, then the queue.
pub fn render_task_list(manager: &TaskManager) -> String {
    let mut out = String::new();
    for (id, task) in manager.tasks().filter(|(_, t)| t.parent().is_none()) {
        row(&mut out, id, task, "");
        for child in task.sub_tasks() {
            if let Some(sub) = manager.task(*child) {
                row(&mut out, *child, sub, "  ");
            }
        }
    }
    let queue: Vec<String> = manager
        .execution_queue()
        .iter()
        .map(|id| task_name(*id).unwrap_or("-").to_string())
        .collect();
    let _ = writeln!(out, "\nexecution queue: {}", queue.join(" -> "));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_tasks_are_indented_under_their_stage() {
        let text = render_task_list(&TaskManager::fpga_pipeline());
        let lines: Vec<&str> = text.lines().collect();
        let routing = lines.iter().position(|l| l.contains(" routing ")).unwrap();
        assert!(lines[routing + 1].contains("  routing-clean"));
        assert!(lines[routing].contains("unbound"));
        assert!(text.contains("execution queue: ip-generate -> analysis -> analysis-clean"));
    }
}
