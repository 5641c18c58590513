use std::path::PathBuf;

use matchlens_terminal::demo_feed::mock_analysis_result;
use matchlens_terminal::error::{ApiError, ErrorKind};
use matchlens_terminal::model::{MatchPrediction, UploadReceipt};
use matchlens_terminal::session::{Session, SessionPhase};
use matchlens_terminal::state::{AppState, Delta, Screen, apply_delta};
use matchlens_terminal::video::VideoFile;
use matchlens_terminal::view::{PredictionView, ResultsTab, prediction_view};

fn uploaded(state: &mut AppState) {
    apply_delta(
        state,
        Delta::Uploaded {
            video: VideoFile {
                path: PathBuf::from("/videos/final.mp4"),
                name: "final.mp4".to_string(),
                size_bytes: 1_572_864,
            },
            receipt: UploadReceipt {
                message: "File uploaded successfully".to_string(),
                filename: "final.mp4".to_string(),
                path: "uploads/final.mp4".to_string(),
            },
        },
    );
}

fn session_in(phase: SessionPhase) -> Session {
    Session {
        phase,
        ..Session::default()
    }
}

#[test]
fn upload_moves_to_choose_screen() {
    let mut state = AppState::default();
    state.uploading = true;
    uploaded(&mut state);

    assert_eq!(state.screen, Screen::ChooseAnalysis);
    assert!(!state.uploading);
    assert!(state.can_start());
    assert_eq!(state.path_input, "/videos/final.mp4");
    assert_eq!(
        state.video.as_ref().map(|v| v.size_label()),
        Some("1.5 MB".to_string())
    );
}

#[test]
fn running_session_switches_to_live_and_locks_uploads() {
    let mut state = AppState::default();
    uploaded(&mut state);
    apply_delta(&mut state, Delta::SessionUpdated(session_in(SessionPhase::Running)));

    assert_eq!(state.screen, Screen::Live);
    assert!(state.session_busy());
    assert!(!state.can_start());
}

#[test]
fn completion_shows_results_on_overview() {
    let mut state = AppState::default();
    uploaded(&mut state);
    state.results_tab = ResultsTab::Sentiment;
    apply_delta(&mut state, Delta::SessionUpdated(session_in(SessionPhase::Running)));
    apply_delta(
        &mut state,
        Delta::Completed(Box::new(mock_analysis_result())),
    );
    apply_delta(
        &mut state,
        Delta::SessionUpdated(session_in(SessionPhase::Completed)),
    );

    assert_eq!(state.screen, Screen::Results);
    assert_eq!(state.results_tab, ResultsTab::Overview);
    assert!(state.result.is_some());
    assert!(!state.session_busy());
}

#[test]
fn failure_keeps_message_for_display() {
    let mut state = AppState::default();
    let err = ApiError::new(ErrorKind::StartFailed, "no video");
    apply_delta(&mut state, Delta::Failed(err));
    assert_eq!(state.last_error.as_deref(), Some("no video"));

    apply_delta(
        &mut state,
        Delta::CommandFailed(ApiError::validation("Not a video file: notes.txt")),
    );
    assert_eq!(state.last_error.as_deref(), Some("Not a video file: notes.txt"));
    assert!(
        state
            .logs
            .back()
            .is_some_and(|l| l.starts_with("[WARN] validation failed"))
    );
}

#[test]
fn requested_prediction_overrides_bundled_one() {
    let mut state = AppState::default();
    apply_delta(
        &mut state,
        Delta::Completed(Box::new(mock_analysis_result())),
    );
    assert!(matches!(
        prediction_view(state.effective_prediction()),
        PredictionView::Available { ref outcome, .. } if outcome == "Home Win"
    ));

    state.prediction_loading = true;
    apply_delta(
        &mut state,
        Delta::Prediction(MatchPrediction {
            predicted_outcome: "Away Win".to_string(),
            away_win_probability: 0.52,
            error: Some("model offline, baseline used".to_string()),
            ..MatchPrediction::default()
        }),
    );
    assert!(!state.prediction_loading);
    assert!(matches!(
        prediction_view(state.effective_prediction()),
        PredictionView::Available { away_pct: 52, ref note, .. } if note.is_some()
    ));
}

#[test]
fn new_analysis_returns_to_upload_keeping_video() {
    let mut state = AppState::default();
    uploaded(&mut state);
    apply_delta(
        &mut state,
        Delta::Completed(Box::new(mock_analysis_result())),
    );
    state.new_analysis();

    assert_eq!(state.screen, Screen::Upload);
    assert!(state.result.is_none());
    assert!(state.upload.is_some());
    assert_eq!(state.session.phase, SessionPhase::Idle);
}
