#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use matchlens_terminal::analytics_api::AnalyticsApi;
use matchlens_terminal::demo_feed::mock_analysis_result;
use matchlens_terminal::error::{ApiError, ErrorKind};
use matchlens_terminal::model::{
    AnalysisResult, AnalysisStatus, FrameStats, LiveFrame, MatchPrediction, PerformanceMode,
    SentimentResponse, StartReceipt, StopReceipt, TeamFeedbackResponse, UploadReceipt,
};
use matchlens_terminal::video::VideoFile;

#[derive(Default)]
pub struct Calls {
    pub upload: AtomicUsize,
    pub start: AtomicUsize,
    pub stop: AtomicUsize,
    pub results: AtomicUsize,
    pub status: AtomicUsize,
    pub frame: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory backend driven by queued responses.
pub struct ScriptedApi {
    pub calls: Calls,
    start_error: Mutex<Option<ApiError>>,
    stop_error: Mutex<Option<ApiError>>,
    results: Mutex<Option<Result<AnalysisResult, ApiError>>>,
    frames: Mutex<VecDeque<Result<LiveFrame, ApiError>>>,
    statuses: Mutex<VecDeque<Result<AnalysisStatus, ApiError>>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            calls: Calls::default(),
            start_error: Mutex::new(None),
            stop_error: Mutex::new(None),
            results: Mutex::new(None),
            frames: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_start(&self, err: ApiError) {
        *self.start_error.lock().unwrap() = Some(err);
    }

    pub fn fail_stop(&self, err: ApiError) {
        *self.stop_error.lock().unwrap() = Some(err);
    }

    pub fn set_results(&self, result: Result<AnalysisResult, ApiError>) {
        *self.results.lock().unwrap() = Some(result);
    }

    pub fn push_frame(&self, frame: Result<LiveFrame, ApiError>) {
        self.frames.lock().unwrap().push_back(frame);
    }

    pub fn push_status(&self, status: Result<AnalysisStatus, ApiError>) {
        self.statuses.lock().unwrap().push_back(status);
    }
}

impl AnalyticsApi for ScriptedApi {
    fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        self.calls.upload.fetch_add(1, Ordering::SeqCst);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(UploadReceipt {
            message: "File uploaded successfully".to_string(),
            path: format!("uploads/{filename}"),
            filename,
        })
    }

    fn start_analysis(&self, mode: PerformanceMode) -> Result<StartReceipt, ApiError> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.start_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(StartReceipt {
            message: "Analysis started".to_string(),
            mode: mode.to_string(),
        })
    }

    fn stop_analysis(&self) -> Result<StopReceipt, ApiError> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.stop_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(StopReceipt {
            message: "Analysis stopped".to_string(),
        })
    }

    fn results(&self) -> Result<AnalysisResult, ApiError> {
        self.calls.results.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(mock_analysis_result()))
    }

    fn status(&self) -> Result<AnalysisStatus, ApiError> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().pop_front().unwrap_or(Ok(AnalysisStatus {
            is_processing: true,
            has_video: true,
            has_results: false,
        }))
    }

    fn current_frame(&self) -> Result<LiveFrame, ApiError> {
        self.calls.frame.fetch_add(1, Ordering::SeqCst);
        self.frames
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(no_frame()))
    }

    fn analyze_sentiment(
        &self,
        team_name: &str,
        _match_data: &Value,
    ) -> Result<SentimentResponse, ApiError> {
        Ok(SentimentResponse {
            success: true,
            team_name: team_name.to_string(),
            ..SentimentResponse::default()
        })
    }

    fn team_feedback(&self, team_name: &str) -> Result<TeamFeedbackResponse, ApiError> {
        Err(ApiError::new(
            ErrorKind::FetchFailed,
            format!("No feedback found for team: {team_name}"),
        ))
    }

    fn predict_outcome(
        &self,
        _analysis: Option<&AnalysisResult>,
    ) -> Result<MatchPrediction, ApiError> {
        Ok(MatchPrediction {
            predicted_outcome: "Draw".to_string(),
            draw_probability: 0.5,
            ..MatchPrediction::default()
        })
    }

    fn health(&self) -> Result<Value, ApiError> {
        Ok(json!({ "status": "healthy" }))
    }
}

pub fn no_frame() -> ApiError {
    ApiError::from_body(
        ErrorKind::FetchFailed,
        r#"{"error":"No frame data available"}"#,
        "No frame data available",
    )
}

pub fn frame(count: u64) -> LiveFrame {
    LiveFrame {
        frame: "/9j/AA==".to_string(),
        stats: FrameStats {
            frame_count: count,
            processing_time: 0.4,
            goals: 1,
            ..FrameStats::default()
        },
    }
}

pub fn running() -> AnalysisStatus {
    AnalysisStatus {
        is_processing: true,
        has_video: true,
        has_results: false,
    }
}

pub fn finished() -> AnalysisStatus {
    AnalysisStatus {
        is_processing: false,
        has_video: true,
        has_results: true,
    }
}

/// Writes a small placeholder video file and returns its path.
pub fn temp_video(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matchlens_tests_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{tag}.mp4"));
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42").unwrap();
    path
}

pub fn open_video(tag: &str) -> VideoFile {
    VideoFile::open(&temp_video(tag).display().to_string()).unwrap()
}
