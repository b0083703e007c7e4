use std::path::{Path, PathBuf};
use std::sync::Arc;

use fabflow_core::error::FlowError;
use fabflow_core::graph::ids::*;
use fabflow_core::graph::{resolve_log_path, task_id_by_name, TaskManager};
use fabflow_core::task::{ActionContext, TaskId};

use super::openfpga::OpenFpgaFlow;

type StageFn = fn(&OpenFpgaFlow, &ActionContext, Option<&Path>) -> anyhow::Result<bool>;

const STAGES: [(TaskId, StageFn); 19] = [
    (IP_GENERATE, OpenFpgaFlow::ip_generate),
    (ANALYSIS, OpenFpgaFlow::analysis),
    (ANALYSIS_CLEAN, OpenFpgaFlow::analysis_clean),
    (SYNTHESIS, OpenFpgaFlow::synthesis),
    (SYNTHESIS_CLEAN, OpenFpgaFlow::synthesis_clean),
    (PACKING, OpenFpgaFlow::packing),
    (PACKING_CLEAN, OpenFpgaFlow::packing_clean),
    (GLOBAL_PLACEMENT, OpenFpgaFlow::global_placement),
    (GLOBAL_PLACEMENT_CLEAN, OpenFpgaFlow::global_placement_clean),
    (PLACEMENT, OpenFpgaFlow::placement),
    (PLACEMENT_CLEAN, OpenFpgaFlow::placement_clean),
    (ROUTING, OpenFpgaFlow::routing),
    (ROUTING_CLEAN, OpenFpgaFlow::routing_clean),
    (TIMING_SIGN_OFF, OpenFpgaFlow::timing_analysis),
    (TIMING_SIGN_OFF_CLEAN, OpenFpgaFlow::timing_clean),
    (POWER, OpenFpgaFlow::power_analysis),
    (POWER_CLEAN, OpenFpgaFlow::power_clean),
    (BITSTREAM, OpenFpgaFlow::bitstream),
    (BITSTREAM_CLEAN, OpenFpgaFlow::bitstream_clean),
];

/// Binds every compiler stage and its Clean sub-task to `flow`.
///
/// Each action is handed the resolved log file of its task, so Clean
/// sub-tasks see their parent's log.
pub fn bind_all(flow: Arc<OpenFpgaFlow>, manager: &mut TaskManager) -> Result<(), FlowError> {
    for (id, stage) in STAGES {
        let log: Option<PathBuf> = manager
            .log_file_template(id)
            .map(|template| resolve_log_path(template, flow.work_dir()));
        let flow = Arc::clone(&flow);
        manager.bind_task_command(id, move |ctx: &ActionContext| {
            stage(&flow, ctx, log.as_deref())
        })?;
    }
    tracing::debug!(stages = STAGES.len(), "compiler stages bound");
    Ok(())
}

/// Disables the named tasks. Returns the names that match no task.
pub fn apply_disabled(manager: &mut TaskManager, names: &[String]) -> Result<Vec<String>, FlowError> {
    let mut unknown = Vec::new();
    for name in names {
        match task_id_by_name(name) {
            Some(id) => manager.set_enabled(id, false)?,
            None => {
                tracing::warn!("unknown stage in stages.disabled: {name}");
                unknown.push(name.clone());
            }
        }
    }
    Ok(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolRunner;
    use fabflow_core::config::FlowConfig;

    #[test]
    fn every_queue_entry_is_bound() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let flow = Arc::new(OpenFpgaFlow::new(
            &FlowConfig::default(),
            ToolRunner::new(rt.handle().clone()),
        ));
        let mut m = TaskManager::fpga_pipeline();
        bind_all(flow, &mut m).unwrap();

        for id in m.execution_queue() {
            assert!(m.task(*id).unwrap().is_valid(), "{id} unbound");
        }
        assert!(!m.task(SIMULATE_RTL).unwrap().is_valid());
    }

    #[test]
    fn disabled_names_are_resolved() {
        let mut m = TaskManager::fpga_pipeline();
        let unknown = apply_disabled(
            &mut m,
            &["power".to_string(), "Timing_Sign_Off".to_string(), "lint".to_string()],
        )
        .unwrap();
        assert_eq!(unknown, vec!["lint".to_string()]);
        assert!(!m.task(POWER).unwrap().is_enabled());
        assert!(!m.task(TIMING_SIGN_OFF).unwrap().is_enabled());
        assert!(m.task(ROUTING).unwrap().is_enabled());
    }
}
