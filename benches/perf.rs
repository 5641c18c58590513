use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchlens_terminal::model::{parse_analysis_result_json, parse_live_frame_json};
use matchlens_terminal::report_export::report_sheets;
use matchlens_terminal::view::{ResultsTab, analytics_view, results_view};

fn bench_analysis_result_parse(c: &mut Criterion) {
    c.bench_function("analysis_result_parse", |b| {
        b.iter(|| {
            let result = parse_analysis_result_json(black_box(ANALYSIS_JSON)).unwrap();
            black_box(result.ml_scores.player_ratings.len());
        })
    });
}

fn bench_live_frame_parse(c: &mut Criterion) {
    c.bench_function("live_frame_parse", |b| {
        b.iter(|| {
            let frame = parse_live_frame_json(black_box(FRAME_JSON)).unwrap();
            black_box(frame.stats.frame_count);
        })
    });
}

fn bench_results_views(c: &mut Criterion) {
    let result = parse_analysis_result_json(ANALYSIS_JSON).expect("valid fixture json");
    c.bench_function("results_views_all_tabs", |b| {
        b.iter(|| {
            for tab in ResultsTab::ALL {
                black_box(results_view(black_box(&result), tab));
            }
        })
    });
}

fn bench_tracking_rows(c: &mut Criterion) {
    let mut result = parse_analysis_result_json(ANALYSIS_JSON).expect("valid fixture json");
    if let Some(analytics) = result.soccer_analytics.as_mut() {
        for id in 0..500u32 {
            let key = id.to_string();
            analytics.average_speeds.insert(key.clone(), 2.0 + f64::from(id % 7) * 0.1);
            analytics.max_speeds.insert(key.clone(), 7.5);
            analytics.ball_touches.insert(key.clone(), f64::from(id % 40));
            analytics.team_classification.insert(key, f64::from(id % 2));
        }
    }
    c.bench_function("tracking_rows_500_players", |b| {
        b.iter(|| {
            black_box(analytics_view(black_box(result.soccer_analytics.as_ref())));
        })
    });
}

fn bench_report_sheets(c: &mut Criterion) {
    let result = parse_analysis_result_json(ANALYSIS_JSON).expect("valid fixture json");
    c.bench_function("report_sheets", |b| {
        b.iter(|| {
            let sheets = report_sheets(black_box(&result));
            black_box(sheets.len());
        })
    });
}

criterion_group!(
    perf,
    bench_analysis_result_parse,
    bench_live_frame_parse,
    bench_results_views,
    bench_tracking_rows,
    bench_report_sheets
);
criterion_main!(perf);

static ANALYSIS_JSON: &str = include_str!("../tests/fixtures/analysis_result.json");
static FRAME_JSON: &str = include_str!("../tests/fixtures/current_frame.json");
