//! Event loop that owns the [`SessionController`].
//!
//! The UI thread sends [`SessionCommand`]s; the driver runs them, pumps the
//! controller's timers and publishes [`Delta`]s. All live-session requests are
//! issued from this one thread, so poll ticks never overlap. Side requests
//! (sentiment, feedback, prediction, export) run on their own threads since
//! they never touch the session.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::analytics_api::AnalyticsApi;
use crate::error::{ApiError, ErrorKind};
use crate::report_export;
use crate::session::{Dispatch, Session, SessionController, SessionEvent, SessionTiming};
use crate::state::{Delta, SessionCommand};
use crate::video::VideoFile;

const IDLE_WAIT: Duration = Duration::from_millis(250);

pub fn spawn_session_driver(
    api: Arc<dyn AnalyticsApi>,
    timing: SessionTiming,
    tx: Sender<Delta>,
    cmd_rx: Receiver<SessionCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut driver = SessionDriver::new(api, timing, tx);
        driver.run(&cmd_rx);
    })
}

pub struct SessionDriver {
    api: Arc<dyn AnalyticsApi>,
    controller: SessionController,
    tx: Sender<Delta>,
    published: Session,
}

impl SessionDriver {
    pub fn new(api: Arc<dyn AnalyticsApi>, timing: SessionTiming, tx: Sender<Delta>) -> Self {
        Self {
            controller: SessionController::with_timing(api.clone(), timing),
            api,
            tx,
            published: Session::default(),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Runs until `Shutdown` or until the UI drops its sender, then disposes
    /// the controller.
    pub fn run(&mut self, cmd_rx: &Receiver<SessionCommand>) {
        loop {
            let now = Instant::now();
            let wait = self
                .controller
                .next_deadline()
                .map(|due| due.saturating_duration_since(now))
                .unwrap_or(IDLE_WAIT)
                .min(IDLE_WAIT);

            match cmd_rx.recv_timeout(wait) {
                Ok(cmd) => {
                    if !self.handle(cmd, Instant::now()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick(Instant::now());
        }
        self.controller.dispose();
        self.flush();
    }

    /// Fires due timers and publishes whatever changed.
    pub fn tick(&mut self, now: Instant) {
        self.controller.pump(now);
        self.flush();
    }

    /// Returns false when the loop should stop.
    pub fn handle(&mut self, cmd: SessionCommand, now: Instant) -> bool {
        match cmd {
            SessionCommand::Upload { path } => {
                let upload = VideoFile::open(&path)
                    .and_then(|video| self.controller.upload_video(&video).map(|r| (video, r)));
                match upload {
                    Ok((video, receipt)) => self.send(Delta::Uploaded { video, receipt }),
                    Err(err) => self.send(Delta::CommandFailed(err)),
                }
            }
            SessionCommand::Start { mode } => match self.controller.start(mode, now) {
                Ok(Dispatch::Accepted) => {}
                Ok(Dispatch::Ignored) => self.send(Delta::Log(format!(
                    "[INFO] Start ignored while {}",
                    self.controller.phase().label()
                ))),
                // Validation errors never reach the session.
                Err(err) if err.kind == ErrorKind::ValidationFailed => {
                    self.send(Delta::CommandFailed(err))
                }
                Err(_) => {}
            },
            SessionCommand::Stop => {
                if let Ok(Dispatch::Ignored) = self.controller.stop(now) {
                    self.send(Delta::Log(
                        "[INFO] Stop ignored: no analysis running".to_string(),
                    ));
                }
            }
            SessionCommand::Reset => {
                if self.controller.reset() == Dispatch::Ignored {
                    self.send(Delta::Log(
                        "[WARN] Reset ignored while analysis is running".to_string(),
                    ));
                }
            }
            SessionCommand::Sentiment {
                team_name,
                match_data,
            } => {
                self.spawn_side(move |api| {
                    api.analyze_sentiment(&team_name, &match_data)
                        .map(Delta::Sentiment)
                });
            }
            SessionCommand::TeamFeedback { team_name } => {
                self.spawn_side(move |api| api.team_feedback(&team_name).map(Delta::TeamFeedback));
            }
            SessionCommand::Predict { analysis } => {
                self.spawn_side(move |api| {
                    api.predict_outcome(analysis.as_deref())
                        .map(Delta::Prediction)
                });
            }
            SessionCommand::Export { path, result } => {
                let tx = self.tx.clone();
                thread::spawn(move || {
                    let display = path.display().to_string();
                    let _ = tx.send(Delta::ExportStarted {
                        path: display.clone(),
                        total: 0,
                    });
                    let progress_tx = tx.clone();
                    let report =
                        report_export::export_report_with_progress(&path, &result, |progress| {
                            let _ = progress_tx.send(Delta::ExportProgress {
                                current: progress.current,
                                total: progress.total,
                                message: progress.message,
                            });
                        });
                    match report {
                        Ok(report) => {
                            for err in &report.errors {
                                let _ = tx.send(Delta::Log(format!("[WARN] Export: {err}")));
                            }
                            let _ = tx.send(Delta::ExportFinished {
                                path: display,
                                sheets: report.sheets,
                                rows: report.rows,
                                errors: report.errors.len(),
                            });
                        }
                        Err(err) => {
                            let _ = tx.send(Delta::ExportFinished {
                                path: display,
                                sheets: 0,
                                rows: 0,
                                errors: 1,
                            });
                            let _ = tx.send(Delta::Log(format!("[WARN] Export failed: {err:#}")));
                        }
                    }
                });
            }
            SessionCommand::Shutdown => return false,
        }
        self.flush();
        true
    }

    fn spawn_side<F>(&self, job: F)
    where
        F: FnOnce(&dyn AnalyticsApi) -> Result<Delta, ApiError> + Send + 'static,
    {
        let api = self.api.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let delta = job(api.as_ref()).unwrap_or_else(Delta::CommandFailed);
            let _ = tx.send(delta);
        });
    }

    fn flush(&mut self) {
        for event in self.controller.take_events() {
            let delta = match event {
                SessionEvent::Frame(frame) => Delta::Frame(frame),
                SessionEvent::Completed(result) => Delta::Completed(result),
                SessionEvent::Failed(err) => Delta::Failed(err),
                SessionEvent::Log(msg) => Delta::Log(msg),
            };
            self.send(delta);
        }
        if *self.controller.session() != self.published {
            self.published = self.controller.session().clone();
            self.send(Delta::SessionUpdated(self.published.clone()));
        }
    }

    fn send(&self, delta: Delta) {
        let _ = self.tx.send(delta);
    }
}
