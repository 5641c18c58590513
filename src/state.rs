use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;

use crate::demo_feed::{ScriptedProcessing, mock_analysis_result};
use crate::error::ApiError;
use crate::model::{
    AnalysisResult, MatchPrediction, PerformanceMode, SentimentResponse, TeamFeedbackResponse,
    UploadReceipt,
};
use crate::session::{FrameSnapshot, Session, SessionPhase};
use crate::video::VideoFile;
use crate::view::{
    LiveView, PipelineProgress, ProgressView, ResultsTab, live_progress, live_view, progress_view,
};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Upload,
    ChooseAnalysis,
    Live,
    Processing,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisKind {
    #[default]
    Live,
    /// Scripted demo walk-through, no backend involved.
    Traditional,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Live => "Live Analysis",
            AnalysisKind::Traditional => "Traditional Analysis (demo)",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            AnalysisKind::Live => AnalysisKind::Traditional,
            AnalysisKind::Traditional => AnalysisKind::Live,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub active: bool,
    pub done: bool,
    pub path: Option<String>,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub error_count: usize,
    pub last_updated: Option<Instant>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self {
            active: false,
            done: false,
            path: None,
            current: 0,
            total: 0,
            message: String::new(),
            error_count: 0,
            last_updated: None,
        }
    }

    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        if !self.active || !self.done {
            return;
        }
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::new();
        }
    }
}

pub struct AppState {
    pub screen: Screen,
    pub path_input: String,
    pub video: Option<VideoFile>,
    pub upload: Option<UploadReceipt>,
    pub uploading: bool,
    pub analysis_kind: AnalysisKind,
    pub mode: PerformanceMode,
    pub session: Session,
    pub frame: Option<FrameSnapshot>,
    pub scripted: Option<ScriptedProcessing>,
    pub progress: PipelineProgress,
    pub result: Option<AnalysisResult>,
    pub results_tab: ResultsTab,
    pub sentiment: Option<SentimentResponse>,
    pub sentiment_loading: bool,
    pub team_feedback: Option<TeamFeedbackResponse>,
    pub feedback_loading: bool,
    pub prediction: Option<MatchPrediction>,
    pub prediction_loading: bool,
    pub last_error: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub export: ExportState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(PerformanceMode::default())
    }
}

impl AppState {
    pub fn new(mode: PerformanceMode) -> Self {
        Self {
            screen: Screen::Upload,
            path_input: String::new(),
            video: None,
            upload: None,
            uploading: false,
            analysis_kind: AnalysisKind::default(),
            mode,
            session: Session::default(),
            frame: None,
            scripted: None,
            progress: PipelineProgress::default(),
            result: None,
            results_tab: ResultsTab::default(),
            sentiment: None,
            sentiment_loading: false,
            team_feedback: None,
            feedback_loading: false,
            prediction: None,
            prediction_loading: false,
            last_error: None,
            logs: VecDeque::new(),
            help_overlay: false,
            export: ExportState::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    pub fn cycle_mode(&mut self) {
        self.mode = self.mode.next();
    }

    pub fn cycle_tab_next(&mut self) {
        self.results_tab = self.results_tab.next();
    }

    pub fn cycle_tab_prev(&mut self) {
        self.results_tab = self.results_tab.prev();
    }

    /// A live session is in flight; uploads and resets are locked out.
    pub fn session_busy(&self) -> bool {
        !self.session.phase.is_settled()
    }

    pub fn can_start(&self) -> bool {
        self.upload.is_some() && self.session.phase == SessionPhase::Idle && self.scripted.is_none()
    }

    /// Starts the scripted walk-through used by the traditional analysis.
    pub fn begin_traditional(&mut self, now: Instant) {
        self.scripted = Some(ScriptedProcessing::start(now));
        self.progress = PipelineProgress {
            current_step: 1,
            percent: 0.0,
            processing: true,
        };
        self.result = None;
        self.screen = Screen::Processing;
        self.push_log("[INFO] DEMO: traditional analysis started");
    }

    /// Advances the scripted walk-through, if one is running.
    pub fn tick(&mut self, now: Instant) {
        let Some(run) = self.scripted else {
            return;
        };
        self.progress = run.progress(now);
        if run.is_done(now) {
            self.scripted = None;
            self.show_results(mock_analysis_result());
            self.push_log("[INFO] DEMO: traditional analysis complete");
        }
    }

    /// Back to the upload screen for a new analysis. The uploaded video stays
    /// selected; the live session is reset by the driver.
    pub fn new_analysis(&mut self) {
        self.screen = Screen::Upload;
        self.session = Session::default();
        self.frame = None;
        self.scripted = None;
        self.progress = PipelineProgress::default();
        self.result = None;
        self.results_tab = ResultsTab::default();
        self.sentiment = None;
        self.team_feedback = None;
        self.prediction = None;
        self.last_error = None;
    }

    pub fn live_view(&self) -> LiveView {
        live_view(&self.session, self.frame.as_ref())
    }

    pub fn progress_view(&self) -> ProgressView {
        if self.scripted.is_some() || self.analysis_kind == AnalysisKind::Traditional {
            progress_view(&self.progress)
        } else {
            progress_view(&live_progress(self.session.phase))
        }
    }

    /// Prediction to display: an on-demand one wins over the one bundled with
    /// the results.
    pub fn effective_prediction(&self) -> Option<&MatchPrediction> {
        self.prediction
            .as_ref()
            .or_else(|| self.result.as_ref().and_then(|r| r.match_prediction.as_ref()))
    }

    fn show_results(&mut self, result: AnalysisResult) {
        self.result = Some(result);
        self.results_tab = ResultsTab::Overview;
        self.prediction = None;
        self.sentiment = None;
        self.team_feedback = None;
        self.screen = Screen::Results;
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    Uploaded {
        video: VideoFile,
        receipt: UploadReceipt,
    },
    SessionUpdated(Session),
    Frame(FrameSnapshot),
    Completed(Box<AnalysisResult>),
    Failed(ApiError),
    /// A command was refused before reaching the session (validation, upload).
    CommandFailed(ApiError),
    Sentiment(SentimentResponse),
    TeamFeedback(TeamFeedbackResponse),
    Prediction(MatchPrediction),
    ExportStarted {
        path: String,
        total: usize,
    },
    ExportProgress {
        current: usize,
        total: usize,
        message: String,
    },
    ExportFinished {
        path: String,
        sheets: usize,
        rows: usize,
        errors: usize,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    Upload { path: String },
    Start { mode: PerformanceMode },
    Stop,
    Reset,
    Sentiment { team_name: String, match_data: Value },
    TeamFeedback { team_name: String },
    Predict { analysis: Option<Box<AnalysisResult>> },
    Export { path: PathBuf, result: Box<AnalysisResult> },
    Shutdown,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Uploaded { video, receipt } => {
            state.uploading = false;
            state.last_error = None;
            state.push_log(format!(
                "[INFO] Server stored {} at {}",
                receipt.filename, receipt.path
            ));
            state.path_input = video.path.display().to_string();
            state.video = Some(video);
            state.upload = Some(receipt);
            state.session = Session::default();
            state.frame = None;
            state.result = None;
            state.screen = Screen::ChooseAnalysis;
        }
        Delta::SessionUpdated(session) => {
            if matches!(
                session.phase,
                SessionPhase::Starting | SessionPhase::Running | SessionPhase::Stopping
            ) && state.screen == Screen::ChooseAnalysis
            {
                state.screen = Screen::Live;
            }
            if session.phase == SessionPhase::Idle {
                state.frame = None;
            }
            state.session = session;
        }
        Delta::Frame(frame) => {
            state.frame = Some(frame);
        }
        Delta::Completed(result) => {
            state.show_results(*result);
        }
        Delta::Failed(err) => {
            state.last_error = Some(err.message);
        }
        Delta::CommandFailed(err) => {
            state.uploading = false;
            state.push_log(format!("[WARN] {}: {}", err.kind, err.message));
            state.last_error = Some(err.message);
        }
        Delta::Sentiment(resp) => {
            state.sentiment_loading = false;
            state.push_log(format!("[INFO] Sentiment ready for {}", resp.team_name));
            state.sentiment = Some(resp);
        }
        Delta::TeamFeedback(resp) => {
            state.feedback_loading = false;
            state.push_log(format!(
                "[INFO] Team feedback ready for {} ({} matches)",
                resp.team_name,
                resp.data.matches.len()
            ));
            state.team_feedback = Some(resp);
        }
        Delta::Prediction(prediction) => {
            state.prediction_loading = false;
            if let Some(reason) = prediction.error.as_deref() {
                state.push_log(format!("[WARN] Prediction fallback: {reason}"));
            }
            state.prediction = Some(prediction);
        }
        Delta::ExportStarted { path, total } => {
            state.export.active = true;
            state.export.path = Some(path);
            state.export.total = total;
            state.export.current = 0;
            state.export.message = "Starting export".to_string();
            state.export.done = false;
            state.export.error_count = 0;
            state.export.last_updated = Some(Instant::now());
        }
        Delta::ExportProgress {
            current,
            total,
            message,
        } => {
            state.export.active = true;
            state.export.total = total;
            state.export.current = current;
            state.export.message = message;
            state.export.last_updated = Some(Instant::now());
        }
        Delta::ExportFinished {
            path,
            sheets,
            rows,
            errors,
        } => {
            state.export.active = true;
            state.export.path = Some(path.clone());
            state.export.current = sheets;
            state.export.total = sheets;
            state.export.message = format!("Done: {sheets} sheets, {rows} rows ({errors} errors)");
            state.export.done = true;
            state.export.error_count = errors;
            state.export.last_updated = Some(Instant::now());
            state.push_log(format!("[INFO] Report exported to {path} ({errors} errors)"));
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn logs_are_capped() {
        let mut state = AppState::default();
        for idx in 0..(MAX_LOGS + 25) {
            state.push_log(format!("line {idx}"));
        }
        assert_eq!(state.logs.len(), MAX_LOGS);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 25"));
    }

    #[test]
    fn traditional_walkthrough_ends_on_results() {
        let mut state = AppState::default();
        let t0 = Instant::now();
        state.begin_traditional(t0);
        assert_eq!(state.screen, Screen::Processing);

        state.tick(t0 + Duration::from_secs(4));
        assert_eq!(state.progress.current_step, 2);
        assert!(state.result.is_none());

        state.tick(t0 + ScriptedProcessing::total_duration());
        assert_eq!(state.screen, Screen::Results);
        assert!(state.scripted.is_none());
        let result = state.result.as_ref().unwrap();
        assert_eq!(result.ml_scores.team_a.name, "Team Alpha");
    }

    #[test]
    fn export_banner_clears_after_keep_window() {
        let mut state = AppState::default();
        apply_delta(
            &mut state,
            Delta::ExportFinished {
                path: "report.xlsx".to_string(),
                sheets: 6,
                rows: 40,
                errors: 0,
            },
        );
        assert!(state.export.done);
        let later = Instant::now() + Duration::from_secs(9);
        state.maybe_clear_export(later);
        assert!(!state.export.active);
    }
}
