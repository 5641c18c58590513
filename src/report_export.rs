use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::model::{AnalysisResult, MatchPrediction};
use crate::view::{natural_id_cmp, team_label};

pub struct ExportReport {
    pub sheets: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

pub struct ReportSheet {
    pub name: &'static str,
    pub rows: Vec<Vec<String>>,
}

/// `matchlens_report_<timestamp>.xlsx` under `dir`, or the working directory.
pub fn default_report_path(dir: Option<&Path>) -> PathBuf {
    let name = format!("matchlens_report_{}.xlsx", Local::now().format("%Y%m%d_%H%M%S"));
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

pub fn export_report_with_progress(
    path: &Path,
    result: &AnalysisResult,
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportReport> {
    let sheets = report_sheets(result);
    let total = sheets.len();
    let mut errors = Vec::new();
    let mut rows = 0usize;

    let mut workbook = Workbook::new();
    for (idx, sheet) in sheets.iter().enumerate() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        // A broken cell loses that sheet, not the whole report.
        if let Err(err) = write_rows(worksheet, &sheet.rows) {
            errors.push(format!("{}: {err:#}", sheet.name));
        } else {
            rows += sheet.rows.len().saturating_sub(1);
        }
        on_progress(ExportProgress {
            current: idx + 1,
            total,
            message: format!("Wrote {}", sheet.name),
        });
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create export dir {}", parent.display()))?;
    }
    // `path` only ever holds a complete workbook.
    let tmp = partial_path(path);
    workbook
        .save(&tmp)
        .with_context(|| format!("failed writing workbook to {}", tmp.display()))?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed moving workbook to {}", path.display()));
    }

    Ok(ExportReport {
        sheets: total,
        rows,
        errors,
    })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

pub fn report_sheets(result: &AnalysisResult) -> Vec<ReportSheet> {
    let mut sheets = vec![
        ReportSheet {
            name: "Summary",
            rows: summary_rows(result),
        },
        ReportSheet {
            name: "Teams",
            rows: team_rows(result),
        },
        ReportSheet {
            name: "Players",
            rows: player_rows(result),
        },
        ReportSheet {
            name: "Events",
            rows: event_rows(result),
        },
        ReportSheet {
            name: "Sentiment",
            rows: sentiment_rows(result),
        },
        ReportSheet {
            name: "Recommendations",
            rows: recommendation_rows(result),
        },
    ];
    if result.soccer_analytics.is_some() {
        sheets.push(ReportSheet {
            name: "Tracking",
            rows: tracking_rows(result),
        });
    }
    sheets
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn summary_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let mut rows = vec![
        header(&["Field", "Value"]),
        vec!["Duration".to_string(), result.video_metrics.duration.clone()],
        vec![
            "Events".to_string(),
            result.video_metrics.events.len().to_string(),
        ],
        vec![
            "Highlights".to_string(),
            result.video_metrics.highlights.join("; "),
        ],
    ];
    match result.match_prediction.as_ref() {
        Some(prediction) => rows.extend(prediction_rows(prediction)),
        None => rows.push(vec![
            "Prediction".to_string(),
            "No ML predictions available".to_string(),
        ]),
    }
    rows
}

fn prediction_rows(prediction: &MatchPrediction) -> Vec<Vec<String>> {
    vec![
        vec![
            "Predicted Outcome".to_string(),
            prediction.predicted_outcome.clone(),
        ],
        vec![
            "Home Win".to_string(),
            pct(prediction.home_win_probability),
        ],
        vec!["Draw".to_string(), pct(prediction.draw_probability)],
        vec![
            "Away Win".to_string(),
            pct(prediction.away_win_probability),
        ],
        vec!["Confidence".to_string(), pct(prediction.confidence)],
        vec!["Model".to_string(), prediction.model_used.clone()],
    ]
}

fn team_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let scores = &result.ml_scores;
    let mut rows = vec![header(&["Team", "Score", "Possession", "Passes", "Accuracy"])];
    for team in [&scores.team_a, &scores.team_b] {
        rows.push(vec![
            team.name.clone(),
            format!("{:.1}", team.score),
            opt_to_string(team.metrics.possession),
            opt_to_string(team.metrics.passes),
            opt_to_string(team.metrics.accuracy),
        ]);
    }
    rows
}

fn player_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let mut rows = vec![header(&["Player", "Position", "Rating"])];
    rows.extend(result.ml_scores.player_ratings.iter().map(|p| {
        vec![
            p.name.clone(),
            p.position.clone(),
            format!("{:.1}", p.rating),
        ]
    }));
    rows
}

fn event_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let mut rows = vec![header(&["Time", "Type", "Description"])];
    rows.extend(
        result
            .video_metrics
            .events
            .iter()
            .map(|e| vec![e.time.clone(), e.kind.clone(), e.description.clone()]),
    );
    rows
}

fn sentiment_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let s = &result.sentiment;
    vec![
        header(&["Metric", "Value"]),
        vec!["Positive".to_string(), format!("{}%", s.positive)],
        vec!["Neutral".to_string(), format!("{}%", s.neutral)],
        vec!["Negative".to_string(), format!("{}%", s.negative)],
        vec!["Keywords".to_string(), s.keywords.join(", ")],
    ]
}

fn recommendation_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let recs = &result.recommendations;
    let mut rows = vec![
        header(&["Section", "Item"]),
        vec!["Formation".to_string(), recs.formation.clone()],
    ];
    for (section, items) in [
        ("Tactics", &recs.tactics),
        ("Substitutions", &recs.substitutions),
        ("Key Insights", &recs.key_insights),
    ] {
        rows.extend(items.iter().map(|item| vec![section.to_string(), item.clone()]));
    }
    rows
}

fn tracking_rows(result: &AnalysisResult) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Player", "Team", "Avg Speed", "Max Speed", "Touches", "Passes",
    ])];
    let Some(analytics) = result.soccer_analytics.as_ref() else {
        return rows;
    };
    let mut ids: Vec<&String> = analytics.average_speeds.keys().collect();
    ids.sort_by(|a, b| natural_id_cmp(a, b));
    for id in ids {
        let team = analytics
            .team_classification
            .get(id)
            .map(|t| team_label(&format!("{}", t.round() as i64)))
            .unwrap_or_default();
        rows.push(vec![
            format!("Player {id}"),
            team,
            opt_to_string(analytics.average_speeds.get(id)),
            opt_to_string(analytics.max_speeds.get(id)),
            opt_to_string(analytics.ball_touches.get(id)),
            opt_to_string(analytics.pass_network.get(id)),
        ]);
    }
    rows
}

fn pct(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
