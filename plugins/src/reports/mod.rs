//! Report managers that parse stage logs into tables.

mod synthesis;
mod timing;
mod vpr;

use std::path::{Path, PathBuf};

use fabflow_core::graph::ids::{PLACEMENT, ROUTING, SYNTHESIS, TIMING_SIGN_OFF};
use fabflow_core::graph::{resolve_log_path, TaskManager};
use fabflow_core::report::{ReportManager, ReportRegistry, TableReport, TaskReport};

pub const SYNTHESIS_UTILIZATION: &str = "Synthesis - Report Resource Utilization";
pub const SYNTHESIS_CELLS: &str = "Synthesis - Cell Usage";
pub const RESOURCE_REPORT: &str = "Report Resource Utilization";
pub const CIRCUIT_REPORT: &str = "Circuit Statistics Report";
pub const STA_RESOURCE_REPORT: &str = "STA - Report Resource Utilization";
pub const STA_TIMING_REPORT: &str = "STA - Report Static Timing";
pub const STA_CIRCUIT_REPORT: &str = "STA - Circuit Statistics Report";

fn read_log(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(path = %path.display(), "log not readable: {e}");
            None
        }
    }
}

fn single_table(name: &str, table: TableReport) -> TaskReport {
    TaskReport {
        name: name.to_string(),
        tables: vec![table],
    }
}

/// Yosys statistics from the synthesis log.
#[derive(Debug, Clone)]
pub struct SynthesisReportManager {
    log: PathBuf,
}

impl SynthesisReportManager {
    pub fn new(log: impl Into<PathBuf>) -> Self {
        Self { log: log.into() }
    }
}

impl ReportManager for SynthesisReportManager {
    fn available_report_ids(&self) -> Vec<String> {
        vec![SYNTHESIS_UTILIZATION.to_string(), SYNTHESIS_CELLS.to_string()]
    }

    fn create_report(&self, report_id: &str) -> Option<TaskReport> {
        let table = match report_id {
            SYNTHESIS_UTILIZATION => synthesis::statistics,
            SYNTHESIS_CELLS => synthesis::cell_usage,
            _ => return None,
        };
        let log = read_log(&self.log)?;
        Some(single_table(report_id, table(&log)))
    }
}

/// Placement and routing logs: resource utilization and circuit statistics,
/// with report ids prefixed by the stage name.
#[derive(Debug, Clone)]
pub struct VprReportManager {
    prefix: String,
    log: PathBuf,
}

impl VprReportManager {
    pub fn new(prefix: impl Into<String>, log: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            log: log.into(),
        }
    }

    fn id(&self, report: &str) -> String {
        format!("{} - {report}", self.prefix)
    }
}

impl ReportManager for VprReportManager {
    fn available_report_ids(&self) -> Vec<String> {
        vec![self.id(RESOURCE_REPORT), self.id(CIRCUIT_REPORT)]
    }

    fn create_report(&self, report_id: &str) -> Option<TaskReport> {
        let table = if report_id == self.id(RESOURCE_REPORT) {
            vpr::resource_utilization
        } else if report_id == self.id(CIRCUIT_REPORT) {
            vpr::circuit_statistics
        } else {
            return None;
        };
        let log = read_log(&self.log)?;
        Some(single_table(report_id, table(&log)))
    }
}

/// Static timing analysis log.
#[derive(Debug, Clone)]
pub struct TimingReportManager {
    log: PathBuf,
}

impl TimingReportManager {
    pub fn new(log: impl Into<PathBuf>) -> Self {
        Self { log: log.into() }
    }
}

impl ReportManager for TimingReportManager {
    fn available_report_ids(&self) -> Vec<String> {
        vec![
            STA_CIRCUIT_REPORT.to_string(),
            STA_RESOURCE_REPORT.to_string(),
            STA_TIMING_REPORT.to_string(),
        ]
    }

    fn create_report(&self, report_id: &str) -> Option<TaskReport> {
        if !self.available_report_ids().iter().any(|id| id == report_id) {
            return None;
        }
        let log = read_log(&self.log)?;
        let tables = match report_id {
            STA_RESOURCE_REPORT => vec![vpr::resource_utilization(&log)],
            STA_CIRCUIT_REPORT => vec![vpr::circuit_statistics(&log)],
            _ => {
                let mut tables = vec![timing::timing_summary(&log)];
                tables.extend(timing::histograms(&log));
                tables
            }
        };
        Some(TaskReport {
            name: report_id.to_string(),
            tables,
        })
    }
}

/// Registers the report managers of the synthesis, placement, routing and
/// timing stages, each reading its task's log under `work_dir`.
pub fn build_report_registry(manager: &TaskManager, work_dir: &Path) -> ReportRegistry {
    let log = |id| {
        manager
            .log_file_template(id)
            .map(|template| resolve_log_path(template, work_dir))
            .unwrap_or_default()
    };
    let mut registry = ReportRegistry::new();
    registry.register(SYNTHESIS, Box::new(SynthesisReportManager::new(log(SYNTHESIS))));
    registry.register(
        PLACEMENT,
        Box::new(VprReportManager::new("Placement", log(PLACEMENT))),
    );
    registry.register(
        ROUTING,
        Box::new(VprReportManager::new("Routing", log(ROUTING))),
    );
    registry.register(
        TIMING_SIGN_OFF,
        Box::new(TimingReportManager::new(log(TIMING_SIGN_OFF))),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, file: &str, text: &str) {
        std::fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn registry_reads_stage_logs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "synthesis.rpt", synthesis::SAMPLE_SYNTH_LOG);
        write(dir.path(), "routing.rpt", vpr::SAMPLE_ROUTING_LOG);
        write(
            dir.path(),
            "timing_analysis.rpt",
            &format!("{}{}", vpr::SAMPLE_ROUTING_LOG, timing::SAMPLE_TIMING_LOG),
        );
        let registry = build_report_registry(&TaskManager::fpga_pipeline(), dir.path());

        let synth = registry.create_report(SYNTHESIS, SYNTHESIS_CELLS).unwrap();
        assert_eq!(synth.tables[0].rows.len(), 2);

        let routing = registry
            .create_report(ROUTING, "Routing - Circuit Statistics Report")
            .unwrap();
        assert_eq!(routing.tables[0].rows[0][1], "42");

        let sta = registry.create_report(TIMING_SIGN_OFF, STA_TIMING_REPORT).unwrap();
        assert_eq!(sta.tables.len(), 3);
        assert!(sta.render_text().contains("FMax"));
    }

    #[test]
    fn unknown_ids_and_missing_logs_give_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_report_registry(&TaskManager::fpga_pipeline(), dir.path());

        assert!(registry.create_report(PLACEMENT, "Placement - Circuit Statistics Report").is_none());
        assert!(registry.create_report(ROUTING, "Placement - Circuit Statistics Report").is_none());
        assert!(registry.create_report(SYNTHESIS, STA_TIMING_REPORT).is_none());
        assert_eq!(
            registry.manager(PLACEMENT).unwrap().available_report_ids(),
            vec![
                "Placement - Report Resource Utilization".to_string(),
                "Placement - Circuit Statistics Report".to_string(),
            ]
        );
    }
}
