//! Live-analysis session controller.
//!
//! The controller is driven by a single event loop: callers hand in `now` and
//! call [`SessionController::pump`] whenever time passes. Timers are deadlines
//! owned by the controller, so cancelling one is clearing a field, and every
//! timer handler re-checks the phase before doing anything.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};

use crate::analytics_api::AnalyticsApi;
use crate::error::{ApiError, ErrorKind};
use crate::model::{AnalysisResult, FrameStats, LiveFrame, PerformanceMode, UploadReceipt};
use crate::video::VideoFile;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const ELAPSED_INTERVAL: Duration = Duration::from_secs(1);
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

pub const RESULTS_UNAVAILABLE_MESSAGE: &str = "Failed to get analysis results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub elapsed_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            elapsed_interval: ELAPSED_INTERVAL,
            settle_delay: SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }

    /// Phases in which a new upload or a reset is allowed.
    pub fn is_settled(self) -> bool {
        self == SessionPhase::Idle || self.is_terminal()
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Idle => "Ready to Analyze",
            SessionPhase::Starting => "Starting Analysis...",
            SessionPhase::Running => "Live Analysis Running",
            SessionPhase::Stopping => "Stopping Analysis...",
            SessionPhase::Completed => "Analysis Complete",
            SessionPhase::Failed => "Analysis Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub phase: SessionPhase,
    pub mode: Option<PerformanceMode>,
    pub started_at: Option<Instant>,
    pub started_at_utc: Option<DateTime<Utc>>,
    pub frame_count: u64,
    pub elapsed_secs: u64,
    pub last_error: Option<ApiError>,
}

/// Latest live frame. Replaced on every successful poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub image_base64: String,
    pub stats: FrameStats,
    pub frame_count: u64,
}

impl FrameSnapshot {
    pub fn image_len(&self) -> Option<usize> {
        BASE64
            .decode(self.image_base64.trim().as_bytes())
            .ok()
            .map(|bytes| bytes.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Frame(FrameSnapshot),
    Completed(Box<AnalysisResult>),
    Failed(ApiError),
    Log(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Accepted,
    /// Not valid in the current phase; nothing happened and no request was sent.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Timers {
    poll: Option<Instant>,
    elapsed: Option<Instant>,
    finalize: Option<Instant>,
}

impl Timers {
    fn armed(&self) -> usize {
        [self.poll, self.elapsed, self.finalize]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }

    fn cancel_live(&mut self) {
        self.poll = None;
        self.elapsed = None;
    }

    fn cancel_all(&mut self) {
        *self = Timers::default();
    }
}

pub struct SessionController {
    api: Arc<dyn AnalyticsApi>,
    timing: SessionTiming,
    session: Session,
    frame: Option<FrameSnapshot>,
    upload: Option<UploadReceipt>,
    timers: Timers,
    miss_streak: u32,
    events: Vec<SessionEvent>,
}

impl SessionController {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self::with_timing(api, SessionTiming::default())
    }

    pub fn with_timing(api: Arc<dyn AnalyticsApi>, timing: SessionTiming) -> Self {
        Self {
            api,
            timing,
            session: Session::default(),
            frame: None,
            upload: None,
            timers: Timers::default(),
            miss_streak: 0,
            events: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn frame(&self) -> Option<&FrameSnapshot> {
        self.frame.as_ref()
    }

    pub fn upload(&self) -> Option<&UploadReceipt> {
        self.upload.as_ref()
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    /// Number of armed timers. Zero whenever the session is not live or stopping.
    pub fn pending_timers(&self) -> usize {
        self.timers.armed()
    }

    /// Earliest armed deadline, for event loops that want to sleep precisely.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.timers.poll, self.timers.elapsed, self.timers.finalize]
            .into_iter()
            .flatten()
            .min()
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Uploads a new video. A new upload discards the previous session.
    pub fn upload_video(&mut self, video: &VideoFile) -> Result<UploadReceipt, ApiError> {
        if !self.session.phase.is_settled() {
            return Err(ApiError::validation(
                "Stop the running analysis before uploading a new video",
            ));
        }
        self.clear();
        self.upload = None;
        let receipt = self.api.upload_video(&video.path)?;
        self.log(format!(
            "[INFO] Uploaded {} ({})",
            video.name,
            video.size_label()
        ));
        self.upload = Some(receipt.clone());
        Ok(receipt)
    }

    /// Starts a remote analysis job. Rejected unless Idle; a failing backend
    /// call moves the session to Failed and is returned to the caller.
    pub fn start(&mut self, mode: PerformanceMode, now: Instant) -> Result<Dispatch, ApiError> {
        if self.session.phase != SessionPhase::Idle {
            return Ok(Dispatch::Ignored);
        }
        if self.upload.is_none() {
            return Err(ApiError::validation("Upload a video before starting analysis"));
        }

        self.session.phase = SessionPhase::Starting;
        self.session.mode = Some(mode);
        match self.api.start_analysis(mode) {
            Ok(receipt) => {
                self.session.phase = SessionPhase::Running;
                self.session.started_at = Some(now);
                self.session.started_at_utc = Some(Utc::now());
                self.session.frame_count = 0;
                self.session.elapsed_secs = 0;
                self.miss_streak = 0;
                self.timers.poll = Some(now + self.timing.poll_interval);
                self.timers.elapsed = Some(now + self.timing.elapsed_interval);
                let detail = if receipt.message.is_empty() {
                    format!("mode {mode}")
                } else {
                    receipt.message
                };
                self.log(format!("[INFO] Analysis started: {detail}"));
                Ok(Dispatch::Accepted)
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Single stop entry point for the stop key and the cancellation key.
    /// No-op, with no request sent, unless Running.
    pub fn stop(&mut self, now: Instant) -> Result<Dispatch, ApiError> {
        if self.session.phase != SessionPhase::Running {
            return Ok(Dispatch::Ignored);
        }
        self.session.phase = SessionPhase::Stopping;
        self.timers.cancel_live();

        match self.api.stop_analysis() {
            Ok(_) => {
                self.timers.finalize = Some(now + self.timing.settle_delay);
                self.log("[INFO] Analysis stopped, collecting results");
                Ok(Dispatch::Accepted)
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Returns to Idle from Idle or a terminal phase. The uploaded video is
    /// kept so a failed start can be retried; a new upload replaces it.
    pub fn reset(&mut self) -> Dispatch {
        if !self.session.phase.is_settled() {
            return Dispatch::Ignored;
        }
        self.clear();
        Dispatch::Accepted
    }

    /// Teardown: cancels every timer whatever the phase, sends nothing.
    pub fn dispose(&mut self) {
        self.clear();
        self.upload = None;
    }

    /// Runs every timer whose deadline has passed.
    pub fn pump(&mut self, now: Instant) {
        self.on_elapsed_timer(now);
        self.on_poll_timer(now);
        self.on_finalize_timer(now);
    }

    fn on_elapsed_timer(&mut self, now: Instant) {
        let Some(due) = self.timers.elapsed else {
            return;
        };
        if self.session.phase != SessionPhase::Running {
            self.timers.elapsed = None;
            return;
        }
        if now < due {
            return;
        }
        if let Some(started) = self.session.started_at {
            self.session.elapsed_secs = now.saturating_duration_since(started).as_secs();
        }
        let mut next = due + self.timing.elapsed_interval;
        if next <= now {
            next = now + self.timing.elapsed_interval;
        }
        self.timers.elapsed = Some(next);
    }

    fn on_poll_timer(&mut self, now: Instant) {
        let Some(due) = self.timers.poll else {
            return;
        };
        if self.session.phase != SessionPhase::Running {
            self.timers.poll = None;
            return;
        }
        if now < due {
            return;
        }
        // Disarmed while the tick's requests are outstanding.
        self.timers.poll = None;

        match self.api.current_frame() {
            Ok(frame) => self.accept_frame(frame),
            Err(err) => self.soft_miss(&err),
        }

        match self.api.status() {
            Ok(status) => {
                if status.finished_with_results() && self.session.phase == SessionPhase::Running {
                    self.log("[INFO] Backend finished processing, fetching results");
                    self.timers.cancel_live();
                    self.finalize();
                    return;
                }
            }
            Err(err) => self.log(format!("[WARN] Status check failed: {err}")),
        }

        if self.session.phase == SessionPhase::Running {
            self.timers.poll = Some(now + self.timing.poll_interval);
        }
    }

    fn on_finalize_timer(&mut self, now: Instant) {
        let Some(due) = self.timers.finalize else {
            return;
        };
        if self.session.phase != SessionPhase::Stopping {
            self.timers.finalize = None;
            return;
        }
        if now < due {
            return;
        }
        self.timers.finalize = None;
        self.finalize();
    }

    fn accept_frame(&mut self, frame: LiveFrame) {
        if self.miss_streak > 0 {
            self.log(format!(
                "[INFO] Live feed active after {} empty polls",
                self.miss_streak
            ));
        }
        self.miss_streak = 0;
        let reported = frame.stats.frame_count;
        self.session.frame_count = if reported > 0 {
            self.session.frame_count.max(reported)
        } else {
            self.session.frame_count + 1
        };
        let snapshot = FrameSnapshot {
            image_base64: frame.frame,
            stats: frame.stats,
            frame_count: self.session.frame_count,
        };
        self.frame = Some(snapshot.clone());
        self.events.push(SessionEvent::Frame(snapshot));
    }

    fn soft_miss(&mut self, err: &ApiError) {
        if self.miss_streak == 0 {
            self.log(format!("[INFO] Waiting for frames... ({err})"));
        }
        self.miss_streak = self.miss_streak.saturating_add(1);
    }

    fn finalize(&mut self) {
        match self.api.results() {
            Ok(result) => {
                self.session.phase = SessionPhase::Completed;
                self.timers.cancel_all();
                let prediction = if result.match_prediction.is_some() {
                    "ML predictions included"
                } else {
                    "no ML predictions available"
                };
                self.log(format!("[INFO] Analysis complete, {prediction}"));
                self.events.push(SessionEvent::Completed(Box::new(result)));
            }
            Err(err) => {
                self.fail(ApiError::new(
                    ErrorKind::ResultsUnavailable,
                    format!("{RESULTS_UNAVAILABLE_MESSAGE}: {err}"),
                ));
            }
        }
    }

    fn fail(&mut self, err: ApiError) {
        self.session.phase = SessionPhase::Failed;
        self.timers.cancel_all();
        self.log(format!("[ERROR] {}: {err}", err.kind));
        self.session.last_error = Some(err.clone());
        self.events.push(SessionEvent::Failed(err));
    }

    fn clear(&mut self) {
        self.session = Session::default();
        self.frame = None;
        self.timers.cancel_all();
        self.miss_streak = 0;
    }

    fn log(&mut self, msg: impl Into<String>) {
        self.events.push(SessionEvent::Log(msg.into()));
    }
}
