//! DEMO MODE ONLY.
//!
//! An offline stand-in for the analytics backend plus the scripted
//! "traditional analysis" walk-through. Nothing here talks to the network and
//! the payloads are hardcoded; enable it with `MATCHLENS_DEMO=1` or pick the
//! traditional analysis on the choose screen.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use serde_json::{Value, json};

use crate::analytics_api::AnalyticsApi;
use crate::error::{ApiError, ErrorKind};
use crate::model::{
    AnalysisResult, AnalysisStatus, EventCounts, FrameStats, LiveFrame, MatchPrediction, MlScores,
    PerformanceMode, PlayerRating, Recommendations, SentimentAnalysis, SentimentResponse,
    SentimentSummary, SoccerAnalytics, StartReceipt, StopReceipt, TeamFeedback,
    TeamFeedbackResponse, TeamMetrics, TeamScore, TeamSummary, TimelineEvent, UploadReceipt,
    VideoMetrics,
};
use crate::view::{PIPELINE_STEPS, PipelineProgress};

// Model warm-up before the first frame shows up.
const WARMUP: Duration = Duration::from_millis(1_200);

#[derive(Debug, Default)]
struct DemoState {
    video: Option<String>,
    processing: bool,
    started: Option<Instant>,
    mode: PerformanceMode,
    frames: u64,
    goals: u32,
    possession_a: f64,
    events: EventCounts,
    has_results: bool,
}

pub struct DemoBackend {
    state: Mutex<DemoState>,
    finish_after_frames: Option<u64>,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBackend {
    /// Loops the video until stopped, like the real backend.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DemoState::default()),
            finish_after_frames: None,
        }
    }

    /// Stops on its own once `frames` frames were produced.
    pub fn finishing_after(frames: u64) -> Self {
        Self {
            state: Mutex::new(DemoState::default()),
            finish_after_frames: Some(frames.max(1)),
        }
    }
}

impl AnalyticsApi for DemoBackend {
    fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());
        let mut state = self.state.lock().expect("demo state lock poisoned");
        *state = DemoState {
            video: Some(filename.clone()),
            ..DemoState::default()
        };
        Ok(UploadReceipt {
            message: "File uploaded successfully (demo)".to_string(),
            filename: filename.clone(),
            path: format!("uploads/{filename}"),
        })
    }

    fn start_analysis(&self, mode: PerformanceMode) -> Result<StartReceipt, ApiError> {
        let mut state = self.state.lock().expect("demo state lock poisoned");
        if state.video.is_none() {
            return Err(ApiError::new(ErrorKind::StartFailed, "No video uploaded"));
        }
        if state.processing {
            return Err(ApiError::new(ErrorKind::StartFailed, "Analysis already running"));
        }
        state.processing = true;
        state.started = Some(Instant::now());
        state.mode = mode;
        state.frames = 0;
        state.goals = 0;
        state.possession_a = 50.0;
        state.events = EventCounts::default();
        state.has_results = false;
        Ok(StartReceipt {
            message: format!("Analysis started in {mode} mode (demo)"),
            mode: mode.to_string(),
        })
    }

    fn stop_analysis(&self) -> Result<StopReceipt, ApiError> {
        let mut state = self.state.lock().expect("demo state lock poisoned");
        if !state.processing {
            return Err(ApiError::new(ErrorKind::StopFailed, "No analysis running"));
        }
        state.processing = false;
        state.has_results = true;
        Ok(StopReceipt {
            message: "Analysis stopped (demo)".to_string(),
        })
    }

    fn results(&self) -> Result<AnalysisResult, ApiError> {
        let state = self.state.lock().expect("demo state lock poisoned");
        if !state.has_results {
            return Err(ApiError::new(ErrorKind::FetchFailed, "No results available"));
        }
        let mut result = mock_analysis_result();
        if let Some(analytics) = result.soccer_analytics.as_mut() {
            analytics.goals_detected = state.goals;
        }
        result.ml_scores.team_a.metrics.possession = Some(state.possession_a.round());
        result.ml_scores.team_b.metrics.possession = Some((100.0 - state.possession_a).round());
        Ok(result)
    }

    fn status(&self) -> Result<AnalysisStatus, ApiError> {
        let state = self.state.lock().expect("demo state lock poisoned");
        Ok(AnalysisStatus {
            is_processing: state.processing,
            has_video: state.video.is_some(),
            has_results: state.has_results,
        })
    }

    fn current_frame(&self) -> Result<LiveFrame, ApiError> {
        let mut state = self.state.lock().expect("demo state lock poisoned");
        let warming = state
            .started
            .map(|t| t.elapsed() < WARMUP)
            .unwrap_or(true);
        if !state.processing || warming {
            return Err(ApiError::new(ErrorKind::FetchFailed, "No frame data available"));
        }

        let mut rng = rand::thread_rng();
        let step = match state.mode {
            PerformanceMode::Fast => rng.gen_range(10..16),
            PerformanceMode::Balanced => rng.gen_range(6..11),
            PerformanceMode::Quality => rng.gen_range(3..7),
        };
        state.frames += step;
        state.possession_a = (state.possession_a + rng.gen_range(-1.5..1.5)).clamp(25.0, 75.0);
        if rng.gen_bool(0.01) {
            state.goals += 1;
        }
        if rng.gen_bool(0.02) {
            state.events.free_kicks += 1;
        }
        if rng.gen_bool(0.008) {
            state.events.yellow_cards += 1;
        }

        if let Some(limit) = self.finish_after_frames
            && state.frames >= limit
        {
            state.processing = false;
            state.has_results = true;
        }

        let mut possession = BTreeMap::new();
        possession.insert("0".to_string(), state.possession_a);
        possession.insert("1".to_string(), 100.0 - state.possession_a);
        let elapsed = state.started.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0);

        Ok(LiveFrame {
            frame: BASE64.encode(demo_frame_bytes(state.frames)),
            stats: FrameStats {
                frame_count: state.frames,
                processing_time: elapsed,
                possession,
                pass_stats: Value::Null,
                events: Some(state.events),
                goals: state.goals,
                performance: json!({ "mode": state.mode.as_str() }),
            },
        })
    }

    fn analyze_sentiment(
        &self,
        team_name: &str,
        _match_data: &Value,
    ) -> Result<SentimentResponse, ApiError> {
        Ok(SentimentResponse {
            success: true,
            team_name: team_name.to_string(),
            sentiment_analysis: SentimentAnalysis {
                positive: 52.0,
                negative: 18.0,
                neutral: 30.0,
                keywords: vec!["pressing".to_string(), "set pieces".to_string()],
                insights: vec![format!("{team_name} fans respond well to high pressing")],
                recommendations: vec!["Keep the front three narrow".to_string()],
            },
            api_key_available: false,
        })
    }

    fn team_feedback(&self, team_name: &str) -> Result<TeamFeedbackResponse, ApiError> {
        Ok(TeamFeedbackResponse {
            success: true,
            team_name: team_name.to_string(),
            feedback_file: "demo".to_string(),
            data: TeamFeedback {
                team: team_name.to_string(),
                source: "demo".to_string(),
                matches: Vec::new(),
                team_summary: TeamSummary {
                    avg_insights: vec!["Dominant in wide areas".to_string()],
                    priority_actions: vec!["Defend quick transitions".to_string()],
                },
            },
        })
    }

    fn predict_outcome(
        &self,
        _analysis: Option<&AnalysisResult>,
    ) -> Result<MatchPrediction, ApiError> {
        Ok(mock_prediction())
    }

    fn health(&self) -> Result<Value, ApiError> {
        Ok(json!({ "status": "healthy", "mode": "demo" }))
    }
}

fn demo_frame_bytes(frame: u64) -> Vec<u8> {
    // JPEG SOI/EOI markers around the frame number; enough for size readouts.
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&frame.to_be_bytes());
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// Scripted five-step walk-through of the traditional analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedProcessing {
    started: Instant,
}

const SUB_STEPS: u32 = 10;
const SUB_STEP: Duration = Duration::from_millis(200);
const STEP_PAUSE: Duration = Duration::from_millis(1_000);

impl ScriptedProcessing {
    pub fn start(now: Instant) -> Self {
        Self { started: now }
    }

    fn step_len() -> Duration {
        SUB_STEP * (SUB_STEPS + 1) + STEP_PAUSE
    }

    fn steps() -> u32 {
        (PIPELINE_STEPS.len() - 1) as u32
    }

    pub fn total_duration() -> Duration {
        Self::step_len() * Self::steps()
    }

    pub fn progress(&self, now: Instant) -> PipelineProgress {
        let elapsed = now.saturating_duration_since(self.started);
        let step_len = Self::step_len();
        let step_idx = (elapsed.as_millis() / step_len.as_millis()) as u32;
        if step_idx >= Self::steps() {
            return PipelineProgress {
                current_step: PIPELINE_STEPS.len() - 1,
                percent: 100.0,
                processing: false,
            };
        }
        let within = elapsed - step_len * step_idx;
        let sub = ((within.as_millis() / SUB_STEP.as_millis()) as u32).min(SUB_STEPS);
        let per_step = 100.0 / f64::from(Self::steps());
        PipelineProgress {
            current_step: step_idx as usize + 1,
            percent: f64::from(step_idx) * per_step + f64::from(sub) * per_step / f64::from(SUB_STEPS),
            processing: true,
        }
    }

    pub fn is_done(&self, now: Instant) -> bool {
        !self.progress(now).processing
    }
}

pub fn mock_prediction() -> MatchPrediction {
    MatchPrediction {
        home_win_probability: 0.65,
        draw_probability: 0.20,
        away_win_probability: 0.15,
        predicted_outcome: "Home Win".to_string(),
        confidence: 0.65,
        model_used: "mock_neural_network".to_string(),
        features_used: Some(16),
        error: None,
    }
}

pub fn mock_analysis_result() -> AnalysisResult {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let event = |kind: &str, time: &str, description: &str| TimelineEvent {
        kind: kind.to_string(),
        time: time.to_string(),
        description: description.to_string(),
    };
    let ids = |values: &[(&str, f64)]| {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>()
    };

    AnalysisResult {
        video_metrics: VideoMetrics {
            duration: "90:00".to_string(),
            events: vec![
                event("Goal", "23:45", "Team A scores from penalty"),
                event("Yellow Card", "34:12", "Player #7 cautioned for tackle"),
                event("Goal", "67:30", "Team B equalizes with header"),
                event("Substitution", "75:00", "Team A brings on fresh striker"),
            ],
            highlights: strings(&["Goal at 23:45", "Critical save at 45:20", "Goal at 67:30"]),
        },
        ml_scores: MlScores {
            team_a: TeamScore {
                name: "Team Alpha".to_string(),
                score: 7.8,
                metrics: TeamMetrics {
                    possession: Some(58.0),
                    passes: Some(432.0),
                    accuracy: Some(84.0),
                },
            },
            team_b: TeamScore {
                name: "Team Beta".to_string(),
                score: 7.2,
                metrics: TeamMetrics {
                    possession: Some(42.0),
                    passes: Some(376.0),
                    accuracy: Some(79.0),
                },
            },
            player_ratings: vec![
                PlayerRating {
                    name: "Player #10".to_string(),
                    position: "Midfielder".to_string(),
                    rating: 8.5,
                },
                PlayerRating {
                    name: "Player #9".to_string(),
                    position: "Forward".to_string(),
                    rating: 8.2,
                },
                PlayerRating {
                    name: "Player #4".to_string(),
                    position: "Defender".to_string(),
                    rating: 7.8,
                },
            ],
        },
        sentiment: SentimentSummary {
            positive: 45.0,
            negative: 25.0,
            neutral: 30.0,
            keywords: strings(&["exciting", "disappointed", "great save", "poor defense"]),
        },
        recommendations: Recommendations {
            formation: "4-3-3".to_string(),
            tactics: strings(&[
                "Increase wing play to exploit weak flanks",
                "Press higher up the pitch in second half",
                "Use quick counter-attacks after defensive actions",
            ]),
            substitutions: strings(&[
                "Bring on fresh legs in midfield around 60th minute",
                "Consider defensive midfielder if leading by 70th minute",
            ]),
            key_insights: strings(&[
                "Team shows vulnerability to fast counter-attacks",
                "Left flank offers most attacking opportunities",
                "Set pieces are a major strength to leverage",
            ]),
        },
        soccer_analytics: Some(SoccerAnalytics {
            total_distance_covered: 15_000.0,
            average_speeds: ids(&[("1", 2.5), ("2", 3.1), ("3", 2.8), ("4", 2.9)]),
            max_speeds: ids(&[("1", 8.5), ("2", 9.2), ("3", 7.8), ("4", 8.9)]),
            ball_touches: ids(&[("1", 45.0), ("2", 23.0), ("3", 38.0), ("4", 19.0)]),
            pass_network: ids(&[("1", 25.0), ("2", 15.0), ("3", 20.0), ("4", 10.0)]),
            team_classification: ids(&[("1", 1.0), ("2", 0.0), ("3", 1.0), ("4", 0.0)]),
            analysis_duration: 120.0,
            goals_detected: 2,
        }),
        match_prediction: Some(mock_prediction()),
    }
}
