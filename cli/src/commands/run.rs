use std::sync::Arc;

use fabflow_core::config::FlowConfig;
use fabflow_core::error::{CliError, FlowError};
use fabflow_core::events_out::{start_events_out, JsonlEventSink};
use fabflow_core::executor::{FlowController, ProgressMonitor, RunSummary};
use fabflow_core::graph::{task_id_by_name, task_name};
use fabflow_core::task::TaskId;
use fabflow_plugins::factory::build_controller;

/// What a run starts from.
#[derive(Debug, Clone)]
pub enum RunTarget {
    All,
    Task(String),
}

/// Builds the controller, attaches observers, runs `target` on a blocking
/// thread and stops the running tool on Ctrl-C.
pub async fn run_flow(cfg: &FlowConfig, target: RunTarget, progress: bool) -> Result<i32, CliError> {
    let task = match &target {
        RunTarget::All => None,
        RunTarget::Task(name) => Some(
            task_id_by_name(name).ok_or_else(|| FlowError::UnknownTaskName(name.clone()))?,
        ),
    };

    let controller = build_controller(cfg, tokio::runtime::Handle::current())
        .map_err(|e| CliError::Config(format!("{e:#}")))?;
    let controller = Arc::new(controller);

    let show_progress = progress && cfg.progress.enabled && atty::is(atty::Stream::Stderr);
    let monitor = controller.inspect(|m| ProgressMonitor::new(m, show_progress));
    controller.add_observer(monitor);

    let events_out = start_events_out(&cfg.events_out)
        .await
        .map_err(CliError::Config)?;
    let writer = match events_out {
        Some((tx, handle)) => {
            let sink = JsonlEventSink::new(tx);
            tracing::info!(run_id = %sink.run_id(), "writing events to {}", cfg.events_out.path);
            controller.add_observer(sink);
            Some(handle)
        }
        None => None,
    };

    let stopper = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping the running task");
                stop_current(controller).await;
            }
        })
    };

    let result = {
        let controller = Arc::clone(&controller);
        tokio::task::spawn_blocking(move || match task {
            None => controller.start_all(),
            Some(id) => controller.start_task(id),
        })
        .await
        .map_err(|e| CliError::Command(format!("run thread failed: {e}")))?
    };

    stopper.abort();
    let _ = stopper.await;
    // Last handle: dropping it closes the events channel.
    drop(controller);
    if let Some(writer) = writer {
        let _ = writer.await;
    }

    let summary = result?;
    report_summary(&summary);
    if summary.succeeded() {
        Ok(0)
    } else {
        Err(CliError::RunFailed(describe_failure(&summary)))
    }
}

/// Stops the running task from async code. Observers may block, so the stop
/// runs on a blocking thread.
async fn stop_current(controller: Arc<FlowController>) -> bool {
    tokio::task::spawn_blocking(move || controller.stop_current_task())
        .await
        .unwrap_or(false)
}

fn label(id: TaskId) -> String {
    task_name(id).map(str::to_string).unwrap_or_else(|| id.to_string())
}

fn describe_failure(summary: &RunSummary) -> String {
    match (summary.failed, summary.stopped) {
        (Some(id), true) => format!("{} (stopped)", label(id)),
        (Some(id), false) => label(id),
        (None, true) => "stop request".to_string(),
        (None, false) => format!("{}/{} stages", summary.finished, summary.total),
    }
}

fn report_summary(summary: &RunSummary) {
    if summary.succeeded() {
        tracing::info!(total = summary.total, "run finished");
    } else {
        tracing::error!(
            total = summary.total,
            completed = summary.finished,
            failed = ?summary.failed.map(label),
            stopped = summary.stopped,
            "run failed"
        );
    }
}

/// Why a task could not start, for the user.
pub fn explain(err: &FlowError) -> String {
    match err {
        FlowError::NotRunnable { id, reason } => format!("{} cannot run: {reason}", label(*id)),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabflow_core::config::EventsOutConfig;
    use fabflow_core::graph::ids::ROUTING;
    use fabflow_core::graph::TaskManager;
    use fabflow_core::task::{ActionContext, Task, TaskStatus};
    use std::time::Duration;

    #[test]
    fn failure_names_the_stage() {
        let summary = RunSummary {
            total: 10,
            finished: 7,
            failed: Some(ROUTING),
            stopped: false,
        };
        assert_eq!(describe_failure(&summary), "routing");

        let stopped = RunSummary {
            stopped: true,
            ..summary
        };
        assert_eq!(describe_failure(&stopped), "routing (stopped)");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn interrupt_stops_the_task_and_records_the_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.events.jsonl");
        let cfg = EventsOutConfig {
            enabled: true,
            path: path.to_string_lossy().to_string(),
            channel_capacity: 64,
            drop_when_full: false,
        };
        let (tx, writer) = start_events_out(&cfg).await.unwrap().unwrap();

        let mut m = TaskManager::new();
        let id = m.add_task(Task::new("Routing"));
        m.set_execution_queue(vec![id]).unwrap();
        m.set_full_run_order(vec![id]).unwrap();
        m.bind_task_command(id, |ctx: &ActionContext| -> anyhow::Result<bool> {
            while !ctx.cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(true)
        })
        .unwrap();
        let controller = Arc::new(FlowController::new(m));
        controller.add_observer(JsonlEventSink::new(tx));

        let run = {
            let controller = Arc::clone(&controller);
            tokio::task::spawn_blocking(move || controller.start_all())
        };
        while controller.inspect(|m| m.status_of(id)) != Some(TaskStatus::InProgress) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(stop_current(Arc::clone(&controller)).await);
        let summary = run.await.unwrap().unwrap();
        assert!(summary.stopped);
        drop(controller);
        writer.await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\":\"done\""), "{text}");
    }
}
