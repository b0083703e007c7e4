use crate::task::{Task, TaskId, TaskType};

use super::ids::*;
use super::manager::TaskManager;

/// Full-pipeline execution queue, Clean sub-tasks adjacent to their stage.
pub const EXECUTION_QUEUE: [TaskId; 19] = [
    IP_GENERATE,
    ANALYSIS,
    ANALYSIS_CLEAN,
    SYNTHESIS,
    SYNTHESIS_CLEAN,
    PACKING,
    PACKING_CLEAN,
    GLOBAL_PLACEMENT,
    GLOBAL_PLACEMENT_CLEAN,
    PLACEMENT,
    PLACEMENT_CLEAN,
    ROUTING,
    ROUTING_CLEAN,
    TIMING_SIGN_OFF,
    TIMING_SIGN_OFF_CLEAN,
    POWER,
    POWER_CLEAN,
    BITSTREAM,
    BITSTREAM_CLEAN,
];

/// Stages a full run appends to its run stack.
pub const FULL_RUN_STAGES: [TaskId; 10] = [
    IP_GENERATE,
    ANALYSIS,
    SYNTHESIS,
    PACKING,
    GLOBAL_PLACEMENT,
    PLACEMENT,
    ROUTING,
    TIMING_SIGN_OFF,
    POWER,
    BITSTREAM,
];

const SETTINGS_TITLE: &str = "Edit settings...";

impl TaskManager {
    /// The fixed FPGA build pipeline with no actions bound.
    pub fn fpga_pipeline() -> Self {
        let mut m = TaskManager::new();

        let regular = |t: &str| Task::new(t);
        let clean = || Task::with_type("Clean", TaskType::Clean);
        let settings = || Task::with_type(SETTINGS_TITLE, TaskType::Settings);

        // Insertion order must match the constants in `ids`.
        let tasks = [
            regular("IP Generate"),
            regular("Analysis"),
            clean(),
            regular("Synthesis"),
            clean(),
            settings(),
            regular("Write netlist"),
            regular("Timing report"),
            regular("Packing"),
            clean(),
            regular("Global Placement"),
            clean(),
            regular("Placement"),
            clean(),
            settings(),
            regular("Write netlist"),
            regular("Timing report"),
            regular("Routing"),
            clean(),
            settings(),
            regular("Write netlist"),
            regular("Timing Analysis"),
            clean(),
            regular("Power"),
            clean(),
            regular("Bitstream Generation"),
            clean(),
            Task::with_type("P&R View", TaskType::Button),
            regular("Simulate RTL"),
            clean(),
            settings(),
            regular("Simulate Gate"),
            clean(),
            settings(),
            regular("Simulate PNR"),
            clean(),
            settings(),
            regular("Simulate Bitstream"),
            clean(),
            settings(),
        ];
        for task in tasks {
            m.add_task(task);
        }

        let wiring: [(TaskId, &[TaskId]); 13] = [
            (PACKING, &[PACKING_CLEAN]),
            (GLOBAL_PLACEMENT, &[GLOBAL_PLACEMENT_CLEAN]),
            (ANALYSIS, &[ANALYSIS_CLEAN]),
            (
                SYNTHESIS,
                &[
                    SYNTHESIS_CLEAN,
                    SYNTHESIS_SETTINGS,
                    SYNTHESIS_WRITE_NETLIST,
                    SYNTHESIS_TIMING_REPORT,
                ],
            ),
            (
                PLACEMENT,
                &[
                    PLACEMENT_CLEAN,
                    PLACEMENT_SETTINGS,
                    PLACEMENT_WRITE_NETLIST,
                    PLACEMENT_TIMING_REPORT,
                ],
            ),
            (
                ROUTING,
                &[ROUTING_CLEAN, ROUTING_SETTINGS, ROUTING_WRITE_NETLIST],
            ),
            (BITSTREAM, &[BITSTREAM_CLEAN]),
            (POWER, &[POWER_CLEAN]),
            (TIMING_SIGN_OFF, &[TIMING_SIGN_OFF_CLEAN]),
            (SIMULATE_RTL, &[SIMULATE_RTL_CLEAN, SIMULATE_RTL_SETTINGS]),
            (SIMULATE_GATE, &[SIMULATE_GATE_CLEAN, SIMULATE_GATE_SETTINGS]),
            (SIMULATE_PNR, &[SIMULATE_PNR_CLEAN, SIMULATE_PNR_SETTINGS]),
            (
                SIMULATE_BITSTREAM,
                &[SIMULATE_BITSTREAM_CLEAN, SIMULATE_BITSTREAM_SETTINGS],
            ),
        ];
        for (parent, children) in wiring {
            for child in children {
                m.link(parent, *child);
            }
        }

        let settings_keys = [
            (SYNTHESIS_SETTINGS, "Synthesis"),
            (PLACEMENT_SETTINGS, "Placement"),
            (ROUTING_SETTINGS, "Routing"),
            (SIMULATE_RTL_SETTINGS, "Simulate RTL"),
            (SIMULATE_GATE_SETTINGS, "Simulate Gate"),
            (SIMULATE_PNR_SETTINGS, "Simulate PNR"),
            (SIMULATE_BITSTREAM_SETTINGS, "Simulate Bitstream"),
        ];
        for (id, key) in settings_keys {
            if let Some(task) = m.task_mut(id) {
                task.set_settings_key(key);
            }
        }

        // Sub-tasks open their parent's log unless given one of their own.
        let log_files = [
            (IP_GENERATE, "ip_generate.rpt"),
            (ANALYSIS, "analysis.rpt"),
            (SYNTHESIS, "synthesis.rpt"),
            (PACKING, "packing.rpt"),
            (GLOBAL_PLACEMENT, "global_placement.rpt"),
            (PLACEMENT, "placement.rpt"),
            (ROUTING, "routing.rpt"),
            (TIMING_SIGN_OFF, "timing_analysis.rpt"),
            (POWER, "power_analysis.rpt"),
            (BITSTREAM, "bitstream.rpt"),
        ];
        for (id, file) in log_files {
            if let Some(task) = m.task_mut(id) {
                task.set_log_file_template(format!("{}/{file}", super::PROJECT_OSRCDIR));
            }
        }

        m.install_order(EXECUTION_QUEUE.to_vec(), FULL_RUN_STAGES.to_vec());
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn pipeline_is_well_formed() {
        let m = TaskManager::fpga_pipeline();
        assert_eq!(m.len(), 40);
        assert!(m.validate().is_ok());
        assert_eq!(m.execution_queue(), &EXECUTION_QUEUE);
        assert_eq!(m.full_run_order(), &FULL_RUN_STAGES);
    }

    #[test]
    fn ids_match_titles() {
        let m = TaskManager::fpga_pipeline();
        let title = |id| m.task(id).unwrap().title().to_string();
        assert_eq!(title(IP_GENERATE), "IP Generate");
        assert_eq!(title(ROUTING), "Routing");
        assert_eq!(title(TIMING_SIGN_OFF), "Timing Analysis");
        assert_eq!(title(BITSTREAM), "Bitstream Generation");
        assert_eq!(title(SIMULATE_BITSTREAM_SETTINGS), "Edit settings...");
        assert_eq!(
            m.task(PLACE_AND_ROUTE_VIEW).unwrap().task_type(),
            TaskType::Button
        );
    }

    #[test]
    fn stages_carry_their_sub_tasks() {
        let m = TaskManager::fpga_pipeline();
        assert_eq!(
            m.task(ROUTING).unwrap().sub_tasks(),
            &[ROUTING_CLEAN, ROUTING_SETTINGS, ROUTING_WRITE_NETLIST]
        );
        assert_eq!(
            m.task(SIMULATE_GATE).unwrap().sub_tasks(),
            &[SIMULATE_GATE_CLEAN, SIMULATE_GATE_SETTINGS]
        );
        assert_eq!(m.task(PACKING_CLEAN).unwrap().parent(), Some(PACKING));
    }

    #[test]
    fn clean_entries_follow_their_stage_in_queue() {
        let m = TaskManager::fpga_pipeline();
        for pair in EXECUTION_QUEUE.windows(2) {
            let next = m.task(pair[1]).unwrap();
            if next.task_type() == TaskType::Clean {
                assert_eq!(next.parent(), Some(pair[0]));
            }
        }
    }

    #[test]
    fn settings_and_logs_are_attached() {
        let m = TaskManager::fpga_pipeline();
        assert_eq!(
            m.task(SIMULATE_PNR_SETTINGS).unwrap().settings_key(),
            Some("Simulate PNR")
        );
        assert_eq!(
            m.log_file_template(PLACEMENT_CLEAN),
            Some("$OSRCDIR/placement.rpt")
        );
        assert_eq!(m.log_file_template(SIMULATE_RTL), None);
    }

    #[test]
    fn fresh_pipeline_is_idle_and_unbound() {
        let m = TaskManager::fpga_pipeline();
        assert_eq!(m.status(), TaskStatus::None);
        assert!(m.tasks().all(|(_, t)| !t.is_valid() && t.is_enabled()));
    }
}
