mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{Calls, ScriptedApi, finished, frame, no_frame, open_video, running};
use matchlens_terminal::error::{ApiError, ErrorKind};
use matchlens_terminal::model::PerformanceMode;
use matchlens_terminal::session::{
    Dispatch, RESULTS_UNAVAILABLE_MESSAGE, SessionController, SessionEvent, SessionPhase,
};

const POLL: Duration = Duration::from_millis(500);

fn ready_controller(api: &Arc<ScriptedApi>, tag: &str) -> SessionController {
    let mut controller = SessionController::new(api.clone());
    controller.upload_video(&open_video(tag)).unwrap();
    controller
}

fn logs(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Log(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn three_frames_then_backend_done_completes_once() {
    let api = Arc::new(ScriptedApi::new());
    api.push_frame(Ok(frame(10)));
    api.push_frame(Ok(frame(20)));
    api.push_frame(Ok(frame(30)));
    api.push_status(Ok(running()));
    api.push_status(Ok(running()));
    api.push_status(Ok(finished()));

    let mut controller = ready_controller(&api, "happy");
    let t0 = Instant::now();
    assert_eq!(
        controller.start(PerformanceMode::Fast, t0).unwrap(),
        Dispatch::Accepted
    );
    assert_eq!(controller.phase(), SessionPhase::Running);
    assert_eq!(controller.pending_timers(), 2);

    let mut seen = Vec::new();
    for tick in 1..=3u32 {
        controller.pump(t0 + POLL * tick);
        seen.push(controller.session().frame_count);
    }
    assert_eq!(seen, vec![10, 20, 30]);
    assert_eq!(controller.phase(), SessionPhase::Completed);
    assert_eq!(Calls::get(&api.calls.results), 1);
    assert_eq!(controller.pending_timers(), 0);

    let events = controller.take_events();
    let completed = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Completed(_)))
        .count();
    assert_eq!(completed, 1);

    // Nothing left to fire.
    controller.pump(t0 + Duration::from_secs(30));
    assert_eq!(Calls::get(&api.calls.frame), 3);
    assert_eq!(Calls::get(&api.calls.results), 1);
}

#[test]
fn start_rejection_surfaces_backend_message() {
    let api = Arc::new(ScriptedApi::new());
    api.fail_start(ApiError::from_body(
        ErrorKind::StartFailed,
        r#"{"error":"no video"}"#,
        "Failed to start analysis",
    ));
    let mut controller = ready_controller(&api, "start_fail");

    let err = controller
        .start(PerformanceMode::Balanced, Instant::now())
        .unwrap_err();
    assert_eq!(err.message, "no video");
    assert_eq!(controller.phase(), SessionPhase::Failed);
    assert_eq!(
        controller
            .session()
            .last_error
            .as_ref()
            .map(|e| e.message.as_str()),
        Some("no video")
    );
    assert_eq!(controller.pending_timers(), 0);
    let events = controller.take_events();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::Failed(_))));
    assert!(logs(&events).iter().any(|l| l.starts_with("[ERROR]")));
}

#[test]
fn five_soft_misses_then_frame_keeps_running() {
    let api = Arc::new(ScriptedApi::new());
    for _ in 0..5 {
        api.push_frame(Err(no_frame()));
    }
    api.push_frame(Ok(frame(0)));

    let mut controller = ready_controller(&api, "misses");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();
    controller.take_events();

    for tick in 1..=5u32 {
        controller.pump(t0 + POLL * tick);
        assert_eq!(controller.phase(), SessionPhase::Running);
        assert!(controller.frame().is_none());
    }
    controller.pump(t0 + POLL * 6);
    assert_eq!(controller.phase(), SessionPhase::Running);
    assert!(controller.frame().is_some());
    // Server reported 0, so the client counts the frame itself.
    assert_eq!(controller.session().frame_count, 1);

    let waiting = logs(&controller.take_events())
        .into_iter()
        .filter(|l| l.contains("Waiting for frames"))
        .count();
    assert_eq!(waiting, 1);
}

#[test]
fn double_start_runs_a_single_loop() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "double_start");
    let t0 = Instant::now();

    assert_eq!(
        controller.start(PerformanceMode::Fast, t0).unwrap(),
        Dispatch::Accepted
    );
    assert_eq!(
        controller.start(PerformanceMode::Quality, t0).unwrap(),
        Dispatch::Ignored
    );
    assert_eq!(Calls::get(&api.calls.start), 1);
    assert_eq!(controller.pending_timers(), 2);
    assert_eq!(controller.session().mode, Some(PerformanceMode::Fast));

    controller.pump(t0 + POLL);
    assert_eq!(Calls::get(&api.calls.frame), 1);
}

#[test]
fn stop_outside_running_sends_nothing() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "idle_stop");
    assert_eq!(controller.stop(Instant::now()).unwrap(), Dispatch::Ignored);
    assert_eq!(Calls::get(&api.calls.stop), 0);
    assert_eq!(controller.phase(), SessionPhase::Idle);
}

#[test]
fn double_stop_calls_backend_once_and_settles() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "double_stop");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();

    let t1 = t0 + Duration::from_millis(1_200);
    assert_eq!(controller.stop(t1).unwrap(), Dispatch::Accepted);
    assert_eq!(controller.stop(t1).unwrap(), Dispatch::Ignored);
    assert_eq!(Calls::get(&api.calls.stop), 1);
    assert_eq!(controller.phase(), SessionPhase::Stopping);
    // Only the settle timer remains.
    assert_eq!(controller.pending_timers(), 1);

    controller.pump(t1 + Duration::from_millis(999));
    assert_eq!(Calls::get(&api.calls.results), 0);
    controller.pump(t1 + Duration::from_secs(1));
    assert_eq!(Calls::get(&api.calls.results), 1);
    assert_eq!(controller.phase(), SessionPhase::Completed);
    // Stopping cancelled polling: no frame requests went out.
    assert_eq!(Calls::get(&api.calls.frame), 0);
}

#[test]
fn results_failure_after_stop_fails_session() {
    let api = Arc::new(ScriptedApi::new());
    api.set_results(Err(ApiError::new(ErrorKind::FetchFailed, "boom")));
    let mut controller = ready_controller(&api, "results_fail");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();
    controller.stop(t0).unwrap();
    controller.pump(t0 + Duration::from_secs(2));

    assert_eq!(controller.phase(), SessionPhase::Failed);
    let err = controller.session().last_error.clone().unwrap();
    assert_eq!(err.kind, ErrorKind::ResultsUnavailable);
    assert_eq!(err.message, format!("{RESULTS_UNAVAILABLE_MESSAGE}: boom"));
    assert_eq!(controller.pending_timers(), 0);
}

#[test]
fn auto_finalize_with_error_body_fails_instead_of_completing() {
    let api = Arc::new(ScriptedApi::new());
    api.push_frame(Ok(frame(4)));
    api.push_status(Ok(finished()));
    api.set_results(Err(ApiError::new(ErrorKind::FetchFailed, "Results not ready")));
    let mut controller = ready_controller(&api, "auto_finalize_fail");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();
    controller.pump(t0 + POLL);

    assert_eq!(controller.phase(), SessionPhase::Failed);
    assert_eq!(controller.pending_timers(), 0);
    let events = controller.take_events();
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Completed(_))));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Failed(err)
            if err.kind == ErrorKind::ResultsUnavailable
                && err.message.ends_with("Results not ready")
    )));
}

#[test]
fn stop_failure_fails_session() {
    let api = Arc::new(ScriptedApi::new());
    api.fail_stop(ApiError::new(ErrorKind::StopFailed, "Failed to stop analysis"));
    let mut controller = ready_controller(&api, "stop_fail");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();

    let err = controller.stop(t0).unwrap_err();
    assert_eq!(err.kind, ErrorKind::StopFailed);
    assert_eq!(controller.phase(), SessionPhase::Failed);
    assert_eq!(controller.pending_timers(), 0);
    controller.pump(t0 + Duration::from_secs(5));
    assert_eq!(Calls::get(&api.calls.results), 0);
}

#[test]
fn dispose_mid_run_leaves_no_timers() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "dispose");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();
    controller.pump(t0 + POLL);

    controller.dispose();
    assert_eq!(controller.pending_timers(), 0);
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(controller.upload().is_none());

    let frames_before = Calls::get(&api.calls.frame);
    controller.pump(t0 + Duration::from_secs(60));
    assert_eq!(Calls::get(&api.calls.frame), frames_before);
    assert_eq!(Calls::get(&api.calls.stop), 0);
}

#[test]
fn reset_is_refused_while_running_and_clears_after_failure() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "reset");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();
    assert_eq!(controller.reset(), Dispatch::Ignored);
    assert_eq!(controller.phase(), SessionPhase::Running);

    api.fail_stop(ApiError::new(ErrorKind::StopFailed, "nope"));
    let _ = controller.stop(t0);
    assert_eq!(controller.phase(), SessionPhase::Failed);

    assert_eq!(controller.reset(), Dispatch::Accepted);
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert_eq!(controller.pending_timers(), 0);
    assert!(controller.session().last_error.is_none());
    // Upload survives a reset, so the run can be retried.
    assert!(controller.upload().is_some());
}

#[test]
fn timers_stay_quiet_after_reset_of_completed_run() {
    let api = Arc::new(ScriptedApi::new());
    api.push_frame(Ok(frame(8)));
    let mut controller = ready_controller(&api, "reset_completed");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Balanced, t0).unwrap();
    controller.pump(t0 + POLL);
    controller.stop(t0 + POLL).unwrap();
    controller.pump(t0 + POLL + Duration::from_secs(1));
    assert_eq!(controller.phase(), SessionPhase::Completed);

    assert_eq!(controller.reset(), Dispatch::Accepted);
    let frames = Calls::get(&api.calls.frame);
    let statuses = Calls::get(&api.calls.status);
    let results = Calls::get(&api.calls.results);
    controller.take_events();

    controller.pump(t0 + Duration::from_secs(60));
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(controller.frame().is_none());
    assert_eq!(controller.session().frame_count, 0);
    assert_eq!(Calls::get(&api.calls.frame), frames);
    assert_eq!(Calls::get(&api.calls.status), statuses);
    assert_eq!(Calls::get(&api.calls.results), results);
    assert!(controller.take_events().is_empty());
}

#[test]
fn late_pump_fires_one_tick_without_catch_up() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = ready_controller(&api, "late");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();

    controller.pump(t0 + Duration::from_millis(100));
    assert_eq!(Calls::get(&api.calls.frame), 0);

    controller.pump(t0 + Duration::from_secs(5));
    assert_eq!(Calls::get(&api.calls.frame), 1);
    assert_eq!(Calls::get(&api.calls.status), 1);
    assert_eq!(controller.session().elapsed_secs, 5);

    // Re-armed relative to the late tick.
    controller.pump(t0 + Duration::from_millis(5_300));
    assert_eq!(Calls::get(&api.calls.frame), 1);
    controller.pump(t0 + Duration::from_millis(5_500));
    assert_eq!(Calls::get(&api.calls.frame), 2);
}

#[test]
fn frame_count_never_goes_backwards() {
    let api = Arc::new(ScriptedApi::new());
    api.push_frame(Ok(frame(40)));
    api.push_frame(Ok(frame(12)));
    api.push_frame(Ok(frame(0)));
    let mut controller = ready_controller(&api, "monotonic");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();

    let mut last = 0;
    for tick in 1..=3u32 {
        controller.pump(t0 + POLL * tick);
        let count = controller.session().frame_count;
        assert!(count >= last);
        last = count;
    }
    assert_eq!(last, 41);
}

#[test]
fn status_error_is_a_soft_miss() {
    let api = Arc::new(ScriptedApi::new());
    api.push_frame(Ok(frame(3)));
    api.push_status(Err(ApiError::new(ErrorKind::FetchFailed, "Failed to get status")));
    let mut controller = ready_controller(&api, "status_err");
    let t0 = Instant::now();
    controller.start(PerformanceMode::Fast, t0).unwrap();

    controller.pump(t0 + POLL);
    assert_eq!(controller.phase(), SessionPhase::Running);
    assert_eq!(controller.pending_timers(), 2);
    assert!(
        logs(&controller.take_events())
            .iter()
            .any(|l| l.starts_with("[WARN] Status check failed"))
    );
}

#[test]
fn start_needs_an_upload_and_upload_needs_a_settled_session() {
    let api = Arc::new(ScriptedApi::new());
    let mut controller = SessionController::new(api.clone());
    let err = controller
        .start(PerformanceMode::Fast, Instant::now())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationFailed);
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert_eq!(Calls::get(&api.calls.start), 0);

    controller.upload_video(&open_video("busy")).unwrap();
    controller.start(PerformanceMode::Fast, Instant::now()).unwrap();
    let err = controller.upload_video(&open_video("busy2")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationFailed);
    assert_eq!(Calls::get(&api.calls.upload), 1);
}
