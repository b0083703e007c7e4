use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;

use fabflow_core::config::FlowConfig;
use fabflow_core::executor::FlowController;
use fabflow_core::graph::TaskManager;

use crate::flow::{apply_disabled, bind_all, OpenFpgaFlow};
use crate::reports::build_report_registry;
use crate::runner::ToolRunner;

pub fn build_flow(cfg: &FlowConfig, handle: Handle) -> Arc<OpenFpgaFlow> {
    Arc::new(OpenFpgaFlow::new(cfg, ToolRunner::new(handle)))
}

/// The FPGA pipeline with every compiler stage bound to `flow` and the
/// configured stages disabled.
pub fn build_pipeline(cfg: &FlowConfig, flow: Arc<OpenFpgaFlow>) -> Result<TaskManager> {
    let mut manager = TaskManager::fpga_pipeline();
    bind_all(flow, &mut manager)?;
    let unknown = apply_disabled(&mut manager, &cfg.stages.disabled)?;
    if !unknown.is_empty() {
        anyhow::bail!("unknown stages in stages.disabled: {}", unknown.join(", "));
    }
    Ok(manager)
}

/// Controller over the bound pipeline, with the stage report managers
/// reading logs from the flow's work directory.
pub fn build_controller(cfg: &FlowConfig, handle: Handle) -> Result<FlowController> {
    let flow = build_flow(cfg, handle);
    let work_dir = flow.work_dir().to_path_buf();
    let manager = build_pipeline(cfg, flow)?;
    let reports = build_report_registry(&manager, &work_dir);
    Ok(FlowController::new(manager).with_reports(reports))
}
