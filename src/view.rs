//! View-models for the terminal UI.
//!
//! Everything here is a pure function of session state and received results.
//! Missing optional blocks map to an explicit `Unavailable` view.

use crate::model::{
    AnalysisResult, EventCounts, MatchPrediction, MlScores, PerformanceMode, PlayerRating,
    SentimentSummary, SoccerAnalytics, TeamScore, TimelineEvent,
};
use crate::session::{FrameSnapshot, Session, SessionPhase};

pub const PIPELINE_STEPS: [&str; 6] = [
    "Upload Video",
    "Live Analysis",
    "Video Processing",
    "ML Scoring",
    "Sentiment Analysis",
    "AI Recommendations",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineProgress {
    pub current_step: usize,
    pub percent: f64,
    pub processing: bool,
}

impl Default for PipelineProgress {
    fn default() -> Self {
        Self {
            current_step: 0,
            percent: 0.0,
            processing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Active,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub title: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub title: &'static str,
    pub percent: u16,
    pub steps: Vec<StepView>,
}

pub fn progress_view(progress: &PipelineProgress) -> ProgressView {
    let steps = PIPELINE_STEPS
        .iter()
        .enumerate()
        .map(|(idx, title)| StepView {
            title,
            status: if idx < progress.current_step {
                StepStatus::Done
            } else if idx == progress.current_step {
                StepStatus::Active
            } else {
                StepStatus::Pending
            },
        })
        .collect();
    ProgressView {
        title: if progress.processing {
            "Processing your match footage..."
        } else {
            "Analysis completed successfully"
        },
        percent: progress.percent.round().clamp(0.0, 100.0) as u16,
        steps,
    }
}

/// Pipeline position implied by the live session phase.
pub fn live_progress(phase: SessionPhase) -> PipelineProgress {
    match phase {
        SessionPhase::Completed => PipelineProgress {
            current_step: PIPELINE_STEPS.len() - 1,
            percent: 100.0,
            processing: false,
        },
        SessionPhase::Idle | SessionPhase::Failed => PipelineProgress {
            current_step: 1,
            percent: 0.0,
            processing: false,
        },
        SessionPhase::Starting | SessionPhase::Running | SessionPhase::Stopping => {
            PipelineProgress {
                current_step: 1,
                percent: 0.0,
                processing: true,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PossessionRow {
    pub team: String,
    pub percent: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveView {
    pub status: &'static str,
    pub live: bool,
    pub mode: Option<PerformanceMode>,
    pub clock: String,
    pub frame_count: u64,
    pub feed: &'static str,
    pub frame_bytes: Option<usize>,
    pub processing_time: Option<f64>,
    pub goals: Option<u32>,
    pub possession: Vec<PossessionRow>,
    pub events: Option<EventCounts>,
    pub error: Option<String>,
}

pub fn live_view(session: &Session, frame: Option<&FrameSnapshot>) -> LiveView {
    let live = session.phase == SessionPhase::Running;
    let possession = frame
        .map(|f| {
            f.stats
                .possession
                .iter()
                .map(|(team, pct)| PossessionRow {
                    team: team_label(team),
                    percent: pct.round().clamp(0.0, 100.0) as u16,
                })
                .collect()
        })
        .unwrap_or_default();

    LiveView {
        status: session.phase.label(),
        live,
        mode: session.mode,
        clock: format_clock(session.elapsed_secs),
        frame_count: session.frame_count,
        feed: if frame.is_some() {
            "Live Feed Active"
        } else {
            "Initializing..."
        },
        frame_bytes: frame.and_then(FrameSnapshot::image_len),
        processing_time: frame.map(|f| f.stats.processing_time),
        goals: frame.map(|f| f.stats.goals),
        possession,
        events: frame.and_then(|f| f.stats.events),
        error: session.last_error.as_ref().map(|e| e.to_string()),
    }
}

pub fn team_label(id: &str) -> String {
    match id.trim() {
        "0" => "Team A".to_string(),
        "1" => "Team B".to_string(),
        other => format!("Team {other}"),
    }
}

pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultsTab {
    #[default]
    Overview,
    Video,
    Scoring,
    Sentiment,
    Recommendations,
}

impl ResultsTab {
    pub const ALL: [ResultsTab; 5] = [
        ResultsTab::Overview,
        ResultsTab::Video,
        ResultsTab::Scoring,
        ResultsTab::Sentiment,
        ResultsTab::Recommendations,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ResultsTab::Overview => "Overview",
            ResultsTab::Video => "Video Analysis",
            ResultsTab::Scoring => "ML Scoring",
            ResultsTab::Sentiment => "Fan Sentiment",
            ResultsTab::Recommendations => "AI Insights",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ResultsTab::Overview => "overview",
            ResultsTab::Video => "video",
            ResultsTab::Scoring => "scoring",
            ResultsTab::Sentiment => "sentiment",
            ResultsTab::Recommendations => "recommendations",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.key() == key)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub metric: &'static str,
    pub team_a: Option<f64>,
    pub team_b: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlice {
    pub label: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionView {
    Available {
        outcome: String,
        home_pct: u16,
        draw_pct: u16,
        away_pct: u16,
        confidence_pct: u16,
        model: String,
        features_used: Option<u32>,
        note: Option<String>,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMotionRow {
    pub player: String,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub touches: Option<f64>,
    pub passes: Option<f64>,
    pub team: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsView {
    Available {
        total_distance: f64,
        duration_secs: f64,
        goals_detected: u32,
        players: Vec<PlayerMotionRow>,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamCard {
    pub name: String,
    pub score: f64,
    pub possession: Option<f64>,
    pub accuracy: Option<f64>,
    pub passes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverviewView {
    pub leading_team: String,
    pub duration: String,
    pub event_count: usize,
    pub highlight_count: usize,
    pub comparison: Vec<ComparisonRow>,
    pub prediction: PredictionView,
    pub analytics: AnalyticsView,
}

pub fn overview_view(result: &AnalysisResult) -> OverviewView {
    OverviewView {
        leading_team: leading_team(&result.ml_scores),
        duration: non_empty_or(&result.video_metrics.duration, "--:--"),
        event_count: result.video_metrics.events.len(),
        highlight_count: result.video_metrics.highlights.len(),
        comparison: team_comparison_series(&result.ml_scores),
        prediction: prediction_view(result.match_prediction.as_ref()),
        analytics: analytics_view(result.soccer_analytics.as_ref()),
    }
}

pub fn leading_team(scores: &MlScores) -> String {
    let a = &scores.team_a;
    let b = &scores.team_b;
    if (a.score - b.score).abs() < f64::EPSILON {
        return "Level".to_string();
    }
    let leader = if a.score > b.score { a } else { b };
    team_name(leader, if a.score > b.score { "Team A" } else { "Team B" })
}

pub fn team_comparison_series(scores: &MlScores) -> Vec<ComparisonRow> {
    vec![
        ComparisonRow {
            metric: "Overall Score",
            team_a: Some(scores.team_a.score),
            team_b: Some(scores.team_b.score),
        },
        ComparisonRow {
            metric: "Possession",
            team_a: scores.team_a.metrics.possession,
            team_b: scores.team_b.metrics.possession,
        },
        ComparisonRow {
            metric: "Pass Accuracy",
            team_a: scores.team_a.metrics.accuracy,
            team_b: scores.team_b.metrics.accuracy,
        },
    ]
}

pub fn team_cards(scores: &MlScores) -> (TeamCard, TeamCard) {
    (
        team_card(&scores.team_a, "Team A"),
        team_card(&scores.team_b, "Team B"),
    )
}

fn team_card(team: &TeamScore, fallback: &str) -> TeamCard {
    TeamCard {
        name: team_name(team, fallback),
        score: team.score,
        possession: team.metrics.possession,
        accuracy: team.metrics.accuracy,
        passes: team.metrics.passes,
    }
}

fn team_name(team: &TeamScore, fallback: &str) -> String {
    non_empty_or(&team.name, fallback)
}

pub fn sentiment_series(sentiment: &SentimentSummary) -> Vec<ChartSlice> {
    vec![
        ChartSlice {
            label: "Positive",
            value: sentiment.positive,
        },
        ChartSlice {
            label: "Negative",
            value: sentiment.negative,
        },
        ChartSlice {
            label: "Neutral",
            value: sentiment.neutral,
        },
    ]
}

pub fn prediction_view(prediction: Option<&MatchPrediction>) -> PredictionView {
    let Some(p) = prediction else {
        return PredictionView::Unavailable {
            reason: "No ML predictions available".to_string(),
        };
    };
    if p.predicted_outcome.trim().is_empty() {
        let reason = p
            .error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "Prediction returned no outcome".to_string());
        return PredictionView::Unavailable { reason };
    }
    PredictionView::Available {
        outcome: p.predicted_outcome.clone(),
        home_pct: probability_pct(p.home_win_probability),
        draw_pct: probability_pct(p.draw_probability),
        away_pct: probability_pct(p.away_win_probability),
        confidence_pct: probability_pct(p.confidence),
        model: non_empty_or(&p.model_used, "unknown"),
        features_used: p.features_used,
        note: p.error.clone().filter(|e| !e.trim().is_empty()),
    }
}

pub fn analytics_view(analytics: Option<&SoccerAnalytics>) -> AnalyticsView {
    let Some(a) = analytics else {
        return AnalyticsView::Unavailable {
            reason: "Soccer analytics not available for this run".to_string(),
        };
    };
    let mut ids: Vec<&String> = a
        .average_speeds
        .keys()
        .chain(a.max_speeds.keys())
        .chain(a.ball_touches.keys())
        .chain(a.pass_network.keys())
        .collect();
    ids.sort_by(|x, y| natural_id_cmp(x, y));
    ids.dedup();

    let players = ids
        .into_iter()
        .map(|id| PlayerMotionRow {
            player: format!("Player {id}"),
            avg_speed: a.average_speeds.get(id).copied(),
            max_speed: a.max_speeds.get(id).copied(),
            touches: a.ball_touches.get(id).copied(),
            passes: a.pass_network.get(id).copied(),
            team: a
                .team_classification
                .get(id)
                .map(|team| team_label(&format!("{}", team.round() as i64))),
        })
        .collect();

    AnalyticsView::Available {
        total_distance: a.total_distance_covered,
        duration_secs: a.analysis_duration,
        goals_detected: a.goals_detected,
        players,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    Overview(OverviewView),
    Video {
        duration: String,
        events: Vec<TimelineEvent>,
        highlights: Vec<String>,
    },
    Scoring {
        team_a: TeamCard,
        team_b: TeamCard,
        comparison: Vec<ComparisonRow>,
        players: Vec<PlayerRating>,
    },
    Sentiment {
        slices: Vec<ChartSlice>,
        keywords: Vec<String>,
    },
    Recommendations {
        formation: String,
        tactics: Vec<String>,
        substitutions: Vec<String>,
        key_insights: Vec<String>,
    },
}

pub fn results_view(result: &AnalysisResult, tab: ResultsTab) -> ResultsView {
    match tab {
        ResultsTab::Overview => ResultsView::Overview(overview_view(result)),
        ResultsTab::Video => ResultsView::Video {
            duration: non_empty_or(&result.video_metrics.duration, "--:--"),
            events: result.video_metrics.events.clone(),
            highlights: result.video_metrics.highlights.clone(),
        },
        ResultsTab::Scoring => {
            let (team_a, team_b) = team_cards(&result.ml_scores);
            let mut players = result.ml_scores.player_ratings.clone();
            players.sort_by(|a, b| b.rating.total_cmp(&a.rating));
            ResultsView::Scoring {
                team_a,
                team_b,
                comparison: team_comparison_series(&result.ml_scores),
                players,
            }
        }
        ResultsTab::Sentiment => ResultsView::Sentiment {
            slices: sentiment_series(&result.sentiment),
            keywords: result.sentiment.keywords.clone(),
        },
        ResultsTab::Recommendations => {
            let recs = &result.recommendations;
            ResultsView::Recommendations {
                formation: non_empty_or(&recs.formation, "n/a"),
                tactics: recs.tactics.clone(),
                substitutions: recs.substitutions.clone(),
                key_insights: recs.key_insights.clone(),
            }
        }
    }
}

pub fn natural_id_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn probability_pct(value: f64) -> u16 {
    // Backends send 0..1; tolerate percentages as well.
    let pct = if value <= 1.0 { value * 100.0 } else { value };
    pct.round().clamp(0.0, 100.0) as u16
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(75), "01:15");
        assert_eq!(format_clock(3_600), "60:00");
    }

    #[test]
    fn tabs_cycle_both_ways() {
        assert_eq!(ResultsTab::Recommendations.next(), ResultsTab::Overview);
        assert_eq!(ResultsTab::Overview.prev(), ResultsTab::Recommendations);
        assert_eq!(ResultsTab::from_key("scoring"), Some(ResultsTab::Scoring));
    }

    #[test]
    fn probabilities_accept_fractions_and_percent() {
        assert_eq!(probability_pct(0.65), 65);
        assert_eq!(probability_pct(65.0), 65);
        assert_eq!(probability_pct(-0.2), 0);
    }

    #[test]
    fn numeric_player_ids_sort_naturally() {
        let mut ids = vec!["10", "2", "1"];
        ids.sort_by(|a, b| natural_id_cmp(a, b));
        assert_eq!(ids, vec!["1", "2", "10"]);
    }
}
