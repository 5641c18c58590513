use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    Fast,
    Balanced,
    Quality,
}

impl PerformanceMode {
    pub const ALL: [PerformanceMode; 3] = [
        PerformanceMode::Fast,
        PerformanceMode::Balanced,
        PerformanceMode::Quality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PerformanceMode::Fast => "fast",
            PerformanceMode::Balanced => "balanced",
            PerformanceMode::Quality => "quality",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PerformanceMode::Fast => "Fast",
            PerformanceMode::Balanced => "Balanced",
            PerformanceMode::Quality => "Quality",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PerformanceMode::Fast => {
                "Lowest quality, fastest performance - recommended for large videos"
            }
            PerformanceMode::Balanced => "Good balance of quality and performance",
            PerformanceMode::Quality => "Best quality, may be slower with large videos",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PerformanceMode::Fast => PerformanceMode::Balanced,
            PerformanceMode::Balanced => PerformanceMode::Quality,
            PerformanceMode::Quality => PerformanceMode::Fast,
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(PerformanceMode::Fast),
            "balanced" => Ok(PerformanceMode::Balanced),
            "quality" => Ok(PerformanceMode::Quality),
            other => Err(format!("unknown performance mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StopReceipt {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisStatus {
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub has_results: bool,
}

impl AnalysisStatus {
    /// Backend stopped on its own and has results waiting.
    pub fn finished_with_results(&self) -> bool {
        !self.is_processing && self.has_results
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveFrame {
    /// Base64-encoded JPEG.
    #[serde(default)]
    pub frame: String,
    #[serde(default)]
    pub stats: FrameStats,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameStats {
    #[serde(default)]
    pub frame_count: u64,
    #[serde(default)]
    pub processing_time: f64,
    // JSON object keys are team ids as strings ("0", "1").
    #[serde(default)]
    pub possession: BTreeMap<String, f64>,
    #[serde(default)]
    pub pass_stats: Value,
    #[serde(default)]
    pub events: Option<EventCounts>,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub performance: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    #[serde(default)]
    pub yellow_cards: u32,
    #[serde(default)]
    pub red_cards: u32,
    #[serde(default)]
    pub free_kicks: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub video_metrics: VideoMetrics,
    #[serde(default)]
    pub ml_scores: MlScores,
    #[serde(default)]
    pub sentiment: SentimentSummary,
    #[serde(default)]
    pub recommendations: Recommendations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soccer_analytics: Option<SoccerAnalytics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_prediction: Option<MatchPrediction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoMetrics {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlScores {
    #[serde(default)]
    pub team_a: TeamScore,
    #[serde(default)]
    pub team_b: TeamScore,
    #[serde(default)]
    pub player_ratings: Vec<PlayerRating>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamScore {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metrics: TeamMetrics,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamMetrics {
    #[serde(default)]
    pub possession: Option<f64>,
    #[serde(default)]
    pub passes: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerRating {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentSummary {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    #[serde(default)]
    pub formation: String,
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub substitutions: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoccerAnalytics {
    #[serde(default)]
    pub total_distance_covered: f64,
    #[serde(default)]
    pub average_speeds: BTreeMap<String, f64>,
    #[serde(default)]
    pub max_speeds: BTreeMap<String, f64>,
    #[serde(default)]
    pub ball_touches: BTreeMap<String, f64>,
    #[serde(default)]
    pub pass_network: BTreeMap<String, f64>,
    #[serde(default)]
    pub team_classification: BTreeMap<String, f64>,
    #[serde(default)]
    pub analysis_duration: f64,
    #[serde(default)]
    pub goals_detected: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchPrediction {
    #[serde(default)]
    pub home_win_probability: f64,
    #[serde(default)]
    pub draw_probability: f64,
    #[serde(default)]
    pub away_win_probability: f64,
    #[serde(default)]
    pub predicted_outcome: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub sentiment_analysis: SentimentAnalysis,
    #[serde(default)]
    pub api_key_available: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamFeedbackResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub feedback_file: String,
    #[serde(default)]
    pub data: TeamFeedback,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamFeedback {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub matches: Vec<MatchFeedback>,
    #[serde(default)]
    pub team_summary: TeamSummary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchFeedback {
    #[serde(rename = "match", default)]
    pub fixture: String,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub analysis: MatchFeedbackAnalysis,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchFeedbackAnalysis {
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub successful_tactics: Vec<String>,
    #[serde(default)]
    pub best_placements: Vec<String>,
    #[serde(default)]
    pub overall_feedback: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamSummary {
    #[serde(default)]
    pub avg_insights: Vec<String>,
    #[serde(default)]
    pub priority_actions: Vec<String>,
}

pub fn parse_analysis_result_json(raw: &str) -> serde_json::Result<AnalysisResult> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(AnalysisResult::default());
    }
    serde_json::from_str(trimmed)
}

pub fn parse_live_frame_json(raw: &str) -> serde_json::Result<LiveFrame> {
    serde_json::from_str(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_mode_parses_case_insensitive() {
        assert_eq!("Quality".parse::<PerformanceMode>(), Ok(PerformanceMode::Quality));
        assert_eq!(" fast ".parse::<PerformanceMode>(), Ok(PerformanceMode::Fast));
        assert!("turbo".parse::<PerformanceMode>().is_err());
    }

    #[test]
    fn performance_mode_serializes_lowercase() {
        let json = serde_json::to_string(&PerformanceMode::Balanced).unwrap();
        assert_eq!(json, "\"balanced\"");
    }

    #[test]
    fn frame_stats_accept_null_events() {
        let frame = parse_live_frame_json(
            r#"{"frame":"AAAA","stats":{"frame_count":7,"possession":{"0":61.5,"1":38.5},"events":null}}"#,
        )
        .unwrap();
        assert_eq!(frame.stats.frame_count, 7);
        assert!(frame.stats.events.is_none());
        assert_eq!(frame.stats.possession.get("1"), Some(&38.5));
    }

    #[test]
    fn status_finished_requires_results() {
        let gap = AnalysisStatus {
            is_processing: false,
            has_video: true,
            has_results: false,
        };
        assert!(!gap.finished_with_results());
        let done = AnalysisStatus {
            has_results: true,
            ..gap
        };
        assert!(done.finished_with_results());
    }
}
