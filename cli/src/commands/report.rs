use fabflow_core::error::{CliError, FlowError};
use fabflow_core::executor::FlowController;
use fabflow_core::graph::task_id_by_name;

/// Lists the stage's report ids when `report_id` is `None`, otherwise
/// renders that report.
pub fn render_report(
    controller: &FlowController,
    stage: &str,
    report_id: Option<&str>,
) -> Result<String, CliError> {
    let id = task_id_by_name(stage).ok_or_else(|| FlowError::UnknownTaskName(stage.to_string()))?;

    let Some(report_id) = report_id else {
        let stage_id = controller
            .inspect(|m| m.task(id).and_then(|t| t.parent()))
            .unwrap_or(id);
        let manager = controller
            .reports()
            .manager(stage_id)
            .ok_or_else(|| CliError::Command(format!("{stage} has no reports")))?;
        let mut out = String::new();
        for rid in manager.available_report_ids() {
            out.push_str(&rid);
            out.push('\n');
        }
        return Ok(out);
    };

    match controller.create_report(Some(id), report_id)? {
        Some(report) => Ok(report.render_text()),
        None => Err(CliError::Command(format!(
            "report '{report_id}' is not available for {stage}; has the stage run?"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabflow_core::graph::ids::ROUTING;
    use fabflow_core::graph::TaskManager;
    use fabflow_core::report::{
        Alignment, ReportColumn, ReportManager, ReportRegistry, TableReport, TaskReport,
    };

    struct Fixed;

    impl ReportManager for Fixed {
        fn available_report_ids(&self) -> Vec<String> {
            vec!["Routing - Circuit Statistics Report".into()]
        }

        fn create_report(&self, report_id: &str) -> Option<TaskReport> {
            let mut table =
                TableReport::new("", vec![ReportColumn::new("Block type", Alignment::Left)]);
            table.push_row(["clb"]);
            Some(TaskReport {
                name: report_id.into(),
                tables: vec![table],
            })
        }
    }

    fn controller() -> FlowController {
        let mut reports = ReportRegistry::new();
        reports.register(ROUTING, Box::new(Fixed));
        FlowController::new(TaskManager::fpga_pipeline()).with_reports(reports)
    }

    #[test]
    fn lists_ids_through_sub_tasks() {
        let out = render_report(&controller(), "routing-clean", None).unwrap();
        assert_eq!(out, "Routing - Circuit Statistics Report\n");
    }

    #[test]
    fn renders_a_report() {
        let out = render_report(&controller(), "routing", Some("any")).unwrap();
        assert!(out.starts_with("== any =="));
        assert!(out.contains("clb"));
    }

    #[test]
    fn stage_without_reports_is_an_error() {
        assert!(render_report(&controller(), "power", None).is_err());
        assert!(render_report(&controller(), "nonsense", None).is_err());
    }
}
