mod common;

use common::{bound_pipeline, init_tracing, progress_messages, record_events};
use fabflow_core::executor::{FlowController, FlowEvent};
use fabflow_core::graph::{ids::*, task_id_by_name, FULL_RUN_STAGES};
use fabflow_core::task::TaskStatus;
use pretty_assertions::assert_eq;

#[test]
fn full_run_visits_stages_in_pipeline_order() {
    init_tracing();
    let (m, calls) = bound_pipeline(&[]);
    let c = FlowController::new(m);
    let events = record_events(&c);

    let summary = c.start_all().unwrap();

    assert!(summary.succeeded());
    assert_eq!(summary.total, FULL_RUN_STAGES.len());
    assert_eq!(*calls.lock().unwrap(), FULL_RUN_STAGES.to_vec());
    let events = events.lock().unwrap();
    let messages = progress_messages(&events);
    assert_eq!(messages.first().map(String::as_str), Some("IP Generate Running"));
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Bitstream Generation Complete")
    );
    assert_eq!(events.last(), Some(&FlowEvent::Done));
}

#[test]
fn disabled_stages_are_absent_from_the_run() {
    let (mut m, calls) = bound_pipeline(&[]);
    for name in ["power", "global-placement"] {
        let id = task_id_by_name(name).unwrap();
        m.set_enabled(id, false).unwrap();
    }
    let c = FlowController::new(m);

    let summary = c.start_all().unwrap();

    assert_eq!(summary.total, 8);
    let calls = calls.lock().unwrap();
    assert!(!calls.contains(&POWER));
    assert!(!calls.contains(&GLOBAL_PLACEMENT));
    assert_eq!(calls.last(), Some(&BITSTREAM));
    assert_eq!(c.inspect(|m| m.status_of(POWER)), Some(TaskStatus::None));
}

#[test]
fn routing_failure_stops_before_timing() {
    let (m, calls) = bound_pipeline(&[ROUTING]);
    let c = FlowController::new(m);
    let events = record_events(&c);

    let summary = c.start_all().unwrap();

    assert_eq!(summary.failed, Some(ROUTING));
    assert_eq!(calls.lock().unwrap().last(), Some(&ROUTING));
    for id in [TIMING_SIGN_OFF, POWER, BITSTREAM] {
        assert_eq!(c.inspect(|m| m.status_of(id)), Some(TaskStatus::None));
    }
    assert_eq!(
        progress_messages(&events.lock().unwrap()).last().map(String::as_str),
        Some("Routing Failed")
    );
    assert!(c.run_stack().is_empty());
}

#[test]
fn cleaning_a_stage_invalidates_it_and_everything_after() {
    let (m, _) = bound_pipeline(&[]);
    let c = FlowController::new(m);
    c.start_all().unwrap();

    c.start_task(PLACEMENT_CLEAN).unwrap();

    let status = |id| c.inspect(|m| m.status_of(id)).unwrap();
    assert_eq!(status(GLOBAL_PLACEMENT), TaskStatus::Success);
    assert_eq!(status(PLACEMENT), TaskStatus::None);
    assert_eq!(status(PLACEMENT_CLEAN), TaskStatus::Success);
    assert_eq!(status(ROUTING), TaskStatus::None);
    assert_eq!(status(BITSTREAM), TaskStatus::None);
}

#[test]
fn simulation_runs_leave_the_pipeline_alone() {
    let (m, _) = bound_pipeline(&[]);
    let c = FlowController::new(m);
    c.start_all().unwrap();

    let summary = c.start_task(SIMULATE_RTL).unwrap();

    assert!(summary.succeeded());
    assert_eq!(c.inspect(|m| m.status_of(BITSTREAM)), Some(TaskStatus::Success));
    assert_eq!(c.inspect(|m| m.status_of(SIMULATE_RTL)), Some(TaskStatus::Success));
}

#[test]
fn settings_tasks_cannot_be_started_unbound() {
    let (m, _) = bound_pipeline(&[]);
    let c = FlowController::new(m);
    assert!(c.start_task(SYNTHESIS_SETTINGS).is_err());
    assert!(!c.is_running());
}
