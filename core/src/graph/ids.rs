//! Stable ids of the FPGA pipeline tasks, in construction order.

use crate::task::TaskId;

pub const IP_GENERATE: TaskId = TaskId(0);
pub const ANALYSIS: TaskId = TaskId(1);
pub const ANALYSIS_CLEAN: TaskId = TaskId(2);
pub const SYNTHESIS: TaskId = TaskId(3);
pub const SYNTHESIS_CLEAN: TaskId = TaskId(4);
pub const SYNTHESIS_SETTINGS: TaskId = TaskId(5);
pub const SYNTHESIS_WRITE_NETLIST: TaskId = TaskId(6);
pub const SYNTHESIS_TIMING_REPORT: TaskId = TaskId(7);
pub const PACKING: TaskId = TaskId(8);
pub const PACKING_CLEAN: TaskId = TaskId(9);
pub const GLOBAL_PLACEMENT: TaskId = TaskId(10);
pub const GLOBAL_PLACEMENT_CLEAN: TaskId = TaskId(11);
pub const PLACEMENT: TaskId = TaskId(12);
pub const PLACEMENT_CLEAN: TaskId = TaskId(13);
pub const PLACEMENT_SETTINGS: TaskId = TaskId(14);
pub const PLACEMENT_WRITE_NETLIST: TaskId = TaskId(15);
pub const PLACEMENT_TIMING_REPORT: TaskId = TaskId(16);
pub const ROUTING: TaskId = TaskId(17);
pub const ROUTING_CLEAN: TaskId = TaskId(18);
pub const ROUTING_SETTINGS: TaskId = TaskId(19);
pub const ROUTING_WRITE_NETLIST: TaskId = TaskId(20);
pub const TIMING_SIGN_OFF: TaskId = TaskId(21);
pub const TIMING_SIGN_OFF_CLEAN: TaskId = TaskId(22);
pub const POWER: TaskId = TaskId(23);
pub const POWER_CLEAN: TaskId = TaskId(24);
pub const BITSTREAM: TaskId = TaskId(25);
pub const BITSTREAM_CLEAN: TaskId = TaskId(26);
pub const PLACE_AND_ROUTE_VIEW: TaskId = TaskId(27);
pub const SIMULATE_RTL: TaskId = TaskId(28);
pub const SIMULATE_RTL_CLEAN: TaskId = TaskId(29);
pub const SIMULATE_RTL_SETTINGS: TaskId = TaskId(30);
pub const SIMULATE_GATE: TaskId = TaskId(31);
pub const SIMULATE_GATE_CLEAN: TaskId = TaskId(32);
pub const SIMULATE_GATE_SETTINGS: TaskId = TaskId(33);
pub const SIMULATE_PNR: TaskId = TaskId(34);
pub const SIMULATE_PNR_CLEAN: TaskId = TaskId(35);
pub const SIMULATE_PNR_SETTINGS: TaskId = TaskId(36);
pub const SIMULATE_BITSTREAM: TaskId = TaskId(37);
pub const SIMULATE_BITSTREAM_CLEAN: TaskId = TaskId(38);
pub const SIMULATE_BITSTREAM_SETTINGS: TaskId = TaskId(39);

/// Command-line names, one per task.
static TASK_NAMES: &[(&str, TaskId)] = &[
    ("ip-generate", IP_GENERATE),
    ("analysis", ANALYSIS),
    ("analysis-clean", ANALYSIS_CLEAN),
    ("synthesis", SYNTHESIS),
    ("synthesis-clean", SYNTHESIS_CLEAN),
    ("synthesis-settings", SYNTHESIS_SETTINGS),
    ("synthesis-write-netlist", SYNTHESIS_WRITE_NETLIST),
    ("synthesis-timing-report", SYNTHESIS_TIMING_REPORT),
    ("packing", PACKING),
    ("packing-clean", PACKING_CLEAN),
    ("global-placement", GLOBAL_PLACEMENT),
    ("global-placement-clean", GLOBAL_PLACEMENT_CLEAN),
    ("placement", PLACEMENT),
    ("placement-clean", PLACEMENT_CLEAN),
    ("placement-settings", PLACEMENT_SETTINGS),
    ("placement-write-netlist", PLACEMENT_WRITE_NETLIST),
    ("placement-timing-report", PLACEMENT_TIMING_REPORT),
    ("routing", ROUTING),
    ("routing-clean", ROUTING_CLEAN),
    ("routing-settings", ROUTING_SETTINGS),
    ("routing-write-netlist", ROUTING_WRITE_NETLIST),
    ("timing-sign-off", TIMING_SIGN_OFF),
    ("timing-sign-off-clean", TIMING_SIGN_OFF_CLEAN),
    ("power", POWER),
    ("power-clean", POWER_CLEAN),
    ("bitstream", BITSTREAM),
    ("bitstream-clean", BITSTREAM_CLEAN),
    ("pnr-view", PLACE_AND_ROUTE_VIEW),
    ("simulate-rtl", SIMULATE_RTL),
    ("simulate-rtl-clean", SIMULATE_RTL_CLEAN),
    ("simulate-rtl-settings", SIMULATE_RTL_SETTINGS),
    ("simulate-gate", SIMULATE_GATE),
    ("simulate-gate-clean", SIMULATE_GATE_CLEAN),
    ("simulate-gate-settings", SIMULATE_GATE_SETTINGS),
    ("simulate-pnr", SIMULATE_PNR),
    ("simulate-pnr-clean", SIMULATE_PNR_CLEAN),
    ("simulate-pnr-settings", SIMULATE_PNR_SETTINGS),
    ("simulate-bitstream", SIMULATE_BITSTREAM),
    ("simulate-bitstream-clean", SIMULATE_BITSTREAM_CLEAN),
    ("simulate-bitstream-settings", SIMULATE_BITSTREAM_SETTINGS),
];

/// Case-insensitive; `_` and spaces are accepted in place of `-`.
pub fn task_id_by_name(name: &str) -> Option<TaskId> {
    let normalized = name.trim().to_ascii_lowercase().replace(['_', ' '], "-");
    TASK_NAMES
        .iter()
        .find(|(n, _)| *n == normalized)
        .map(|(_, id)| *id)
}

pub fn task_name(id: TaskId) -> Option<&'static str> {
    TASK_NAMES.iter().find(|(_, t)| *t == id).map(|(n, _)| *n)
}

/// Compiler-level actions as issued by scripted commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerAction {
    NoAction,
    IPGen,
    Synthesis,
    Pack,
    Global,
    Detailed,
    Routing,
    STA,
    Power,
    Bitstream,
    Batch,
}

impl CompilerAction {
    pub fn task_id(self) -> Option<TaskId> {
        match self {
            Self::Synthesis => Some(SYNTHESIS),
            Self::Global => Some(GLOBAL_PLACEMENT),
            Self::Detailed => Some(PLACEMENT),
            Self::Pack => Some(PACKING),
            Self::Routing => Some(ROUTING),
            Self::STA => Some(TIMING_SIGN_OFF),
            Self::Bitstream => Some(BITSTREAM),
            Self::Power => Some(POWER),
            Self::IPGen => Some(IP_GENERATE),
            Self::NoAction | Self::Batch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_loosely() {
        assert_eq!(task_id_by_name("Synthesis"), Some(SYNTHESIS));
        assert_eq!(task_id_by_name("global_placement"), Some(GLOBAL_PLACEMENT));
        assert_eq!(task_id_by_name("timing sign off"), Some(TIMING_SIGN_OFF));
        assert_eq!(task_id_by_name("yosys"), None);
        assert_eq!(task_name(ROUTING_CLEAN), Some("routing-clean"));
    }

    #[test]
    fn every_id_has_exactly_one_name() {
        for (i, (_, id)) in TASK_NAMES.iter().enumerate() {
            assert_eq!(id.0 as usize, i);
        }
    }

    #[test]
    fn batch_and_no_action_have_no_task() {
        assert_eq!(CompilerAction::Batch.task_id(), None);
        assert_eq!(CompilerAction::NoAction.task_id(), None);
        assert_eq!(CompilerAction::STA.task_id(), Some(TIMING_SIGN_OFF));
    }
}
