use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Clear, Gauge, Paragraph, Tabs, Wrap,
};

use matchlens_terminal::analytics_api::{AnalyticsApi, HttpAnalyticsClient};
use matchlens_terminal::config::AppConfig;
use matchlens_terminal::demo_feed::DemoBackend;
use matchlens_terminal::driver::spawn_session_driver;
use matchlens_terminal::http_client::http_client;
use matchlens_terminal::model::PerformanceMode;
use matchlens_terminal::persist;
use matchlens_terminal::report_export::default_report_path;
use matchlens_terminal::session::{Session, SessionPhase};
use matchlens_terminal::state::{
    AnalysisKind, AppState, Delta, Screen, SessionCommand, apply_delta,
};
use matchlens_terminal::view::{
    AnalyticsView, ChartSlice, ComparisonRow, OverviewView, PredictionView, ProgressView,
    ResultsTab, ResultsView, StepStatus, TeamCard, prediction_view, results_view,
};

struct App {
    state: AppState,
    config: AppConfig,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<SessionCommand>>,
}

impl App {
    fn new(config: AppConfig, cmd_tx: Option<mpsc::Sender<SessionCommand>>) -> Self {
        let mut state = AppState::new(config.default_mode);
        persist::load_into_state(&mut state);
        if config.demo {
            state.push_log("[INFO] DEMO mode: offline backend, hardcoded results");
        } else {
            state.push_log(format!("[INFO] Backend: {}", config.api_base));
        }
        Self {
            state,
            config,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }
        if self.state.help_overlay {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.state.help_overlay = false;
            }
            return;
        }
        match self.state.screen {
            Screen::Upload => self.on_upload_key(key),
            Screen::ChooseAnalysis => self.on_choose_key(key),
            Screen::Live => self.on_live_key(key),
            Screen::Processing => self.on_processing_key(key),
            Screen::Results => self.on_results_key(key),
        }
    }

    fn on_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.request_upload(),
            KeyCode::Backspace => {
                self.state.path_input.pop();
            }
            KeyCode::Esc => self.state.path_input.clear(),
            KeyCode::Tab => {
                if self.state.upload.is_some() {
                    self.state.screen = Screen::ChooseAnalysis;
                }
            }
            KeyCode::Char('?') if self.state.path_input.is_empty() => {
                self.state.help_overlay = true;
            }
            KeyCode::Char(c) => self.state.path_input.push(c),
            _ => {}
        }
    }

    fn on_choose_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Char('b') | KeyCode::Esc => self.state.screen = Screen::Upload,
            KeyCode::Char('a') | KeyCode::Up | KeyCode::Down => {
                self.state.analysis_kind = self.state.analysis_kind.toggle();
            }
            KeyCode::Char('m') => self.state.cycle_mode(),
            KeyCode::Enter => match self.state.analysis_kind {
                AnalysisKind::Live => self.request_start(),
                AnalysisKind::Traditional => self.state.begin_traditional(Instant::now()),
            },
            _ => {}
        }
    }

    fn on_live_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            // Esc is the cancellation key; both reach the same stop path.
            KeyCode::Char('s') | KeyCode::Esc => {
                if self.state.session.phase == SessionPhase::Running {
                    self.send(SessionCommand::Stop, "Stop");
                }
            }
            KeyCode::Enter => match self.state.session.phase {
                SessionPhase::Idle => self.request_start(),
                // Retry with the same upload; the driver handles both in order.
                SessionPhase::Failed => {
                    if self.send(SessionCommand::Reset, "Reset") {
                        self.state.session = Session::default();
                        self.state.frame = None;
                        self.request_start();
                    }
                }
                _ => {}
            },
            KeyCode::Char('n') => self.new_analysis(),
            _ => {}
        }
    }

    fn on_processing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            _ => {}
        }
    }

    fn on_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = true,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.state.cycle_tab_next(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => self.state.cycle_tab_prev(),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = (c as usize) - ('1' as usize);
                self.state.results_tab = ResultsTab::ALL[idx];
            }
            KeyCode::Char('n') => self.new_analysis(),
            KeyCode::Char('e') => self.request_export(),
            KeyCode::Char('p') => self.request_prediction(),
            KeyCode::Char('t') => self.request_sentiment(false),
            KeyCode::Char('T') => self.request_sentiment(true),
            KeyCode::Char('f') => self.request_feedback(false),
            KeyCode::Char('F') => self.request_feedback(true),
            _ => {}
        }
    }

    fn send(&mut self, cmd: SessionCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[WARN] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn request_upload(&mut self) {
        if self.state.session_busy() {
            self.state
                .push_log("[WARN] Stop the running analysis before uploading a new video");
            return;
        }
        let path = self.state.path_input.trim().to_string();
        if path.is_empty() {
            self.state.push_log("[INFO] Type a video path first");
            return;
        }
        if self.send(SessionCommand::Upload { path: path.clone() }, "Upload") {
            self.state.uploading = true;
            self.state.push_log(format!("[INFO] Uploading {path}"));
        }
    }

    fn request_start(&mut self) {
        if !self.state.can_start() {
            self.state.push_log("[INFO] Upload a video before starting analysis");
            return;
        }
        let mode = self.state.mode;
        if self.send(SessionCommand::Start { mode }, "Start") {
            self.state.screen = Screen::Live;
            self.state.last_error = None;
        }
    }

    fn new_analysis(&mut self) {
        if self.state.session_busy() {
            self.state.push_log("[INFO] Stop the analysis first (s or Esc)");
            return;
        }
        self.send(SessionCommand::Reset, "Reset");
        self.state.new_analysis();
    }

    fn request_export(&mut self) {
        let Some(result) = self.state.result.clone() else {
            return;
        };
        if self.state.export.active && !self.state.export.done {
            self.state.push_log("[INFO] Export already running");
            return;
        }
        let path = default_report_path(self.config.export_dir.as_deref());
        self.send(
            SessionCommand::Export {
                path,
                result: Box::new(result),
            },
            "Export",
        );
    }

    fn request_prediction(&mut self) {
        if self.state.prediction_loading {
            return;
        }
        let analysis = self.state.result.clone().map(Box::new);
        if self.send(SessionCommand::Predict { analysis }, "Prediction") {
            self.state.prediction_loading = true;
        }
    }

    fn team_name(&self, second: bool) -> Option<String> {
        let result = self.state.result.as_ref()?;
        let team = if second {
            &result.ml_scores.team_b
        } else {
            &result.ml_scores.team_a
        };
        let name = team.name.trim();
        if name.is_empty() {
            Some(if second { "Team B" } else { "Team A" }.to_string())
        } else {
            Some(name.to_string())
        }
    }

    fn request_sentiment(&mut self, second: bool) {
        if self.state.sentiment_loading {
            return;
        }
        let Some(team_name) = self.team_name(second) else {
            return;
        };
        let match_data = self
            .state
            .result
            .as_ref()
            .and_then(|r| serde_json::to_value(r).ok())
            .unwrap_or_default();
        if self.send(
            SessionCommand::Sentiment {
                team_name,
                match_data,
            },
            "Sentiment",
        ) {
            self.state.sentiment_loading = true;
            self.state.results_tab = ResultsTab::Sentiment;
        }
    }

    fn request_feedback(&mut self, second: bool) {
        if self.state.feedback_loading {
            return;
        }
        let Some(team_name) = self.team_name(second) else {
            return;
        };
        if self.send(SessionCommand::TeamFeedback { team_name }, "Team feedback") {
            self.state.feedback_loading = true;
            self.state.results_tab = ResultsTab::Recommendations;
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let config = AppConfig::from_env();
    let api: Arc<dyn AnalyticsApi> = if config.demo {
        Arc::new(DemoBackend::new())
    } else {
        let client = http_client(config.request_timeout)?;
        Arc::new(HttpAnalyticsClient::new(client.clone(), &config.api_base))
    };

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let driver = spawn_session_driver(api, config.timing, tx, cmd_rx);

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    persist::save_from_state(&app.state);
    shutdown_driver(&mut app, driver);

    res
}

fn shutdown_driver(app: &mut App, driver: JoinHandle<()>) {
    if let Some(tx) = app.cmd_tx.take() {
        let _ = tx.send(SessionCommand::Shutdown);
    }
    let _ = driver.join();
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        let now = Instant::now();
        app.state.tick(now);
        app.state.maybe_clear_export(now);

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let state = &app.state;
    match state.screen {
        Screen::Upload => render_upload(frame, chunks[1], state),
        Screen::ChooseAnalysis => render_choose(frame, chunks[1], state),
        Screen::Live => render_live(frame, chunks[1], state),
        Screen::Processing => render_processing(frame, chunks[1], state),
        Screen::Results => render_results(frame, chunks[1], state),
    }

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let state = &app.state;
    let screen = match state.screen {
        Screen::Upload => "UPLOAD",
        Screen::ChooseAnalysis => "CHOOSE ANALYSIS",
        Screen::Live => "LIVE",
        Screen::Processing => "PROCESSING",
        Screen::Results => "RESULTS",
    };
    let demo = if app.config.demo { " | DEMO" } else { "" };
    let export = if state.export.active {
        format!(
            " | Export {}/{} {}",
            state.export.current, state.export.total, state.export.message
        )
    } else {
        String::new()
    };
    let line1 = format!(
        "  (o)  MATCHLENS | {screen} | Mode: {}{demo}{export}",
        state.mode.label()
    );
    let line2 = format!("  /|\\  {}", state.session.phase.label());
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> &'static str {
    match state.screen {
        Screen::Upload => "type path | Enter Upload | Tab Continue | Esc Clear | Ctrl+Q Quit",
        Screen::ChooseAnalysis => {
            "a/↑/↓ Analysis type | m Mode | Enter Start | b Back | ? Help | q Quit"
        }
        Screen::Live => "s/Esc Stop | Enter Start/Retry | n New Analysis | ? Help | q Quit",
        Screen::Processing => "DEMO walk-through running | ? Help | q Quit",
        Screen::Results => {
            "Tab/←/→ Tabs | e Export | p Predict | t/T Sentiment | f/F Feedback | n New | q Quit"
        }
    }
}

fn render_upload(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
        ])
        .split(area);

    let input = Paragraph::new(format!("{}_", state.path_input)).block(
        Block::default()
            .title("Match video path")
            .borders(Borders::ALL),
    );
    frame.render_widget(input, sections[0]);

    let mut lines = Vec::new();
    if state.uploading {
        lines.push("Uploading...".to_string());
    } else if let Some(video) = &state.video {
        lines.push(format!("{} ({})", video.name, video.size_label()));
        lines.push("Uploaded. Press Tab to choose the analysis.".to_string());
    } else {
        lines.push("Supported: MP4, AVI, MOV, MKV, WEBM and other common formats".to_string());
    }
    if let Some(err) = &state.last_error {
        lines.push(format!("Error: {err}"));
    }
    frame.render_widget(
        Paragraph::new(lines.join("\n")).wrap(Wrap { trim: true }),
        sections[1],
    );

    render_steps(frame, sections[2], &state.progress_view());
}

fn render_choose(frame: &mut Frame, area: Rect, state: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let kinds = [AnalysisKind::Live, AnalysisKind::Traditional]
        .iter()
        .map(|kind| {
            let marker = if *kind == state.analysis_kind { ">" } else { " " };
            format!("{marker} {}", kind.label())
        })
        .collect::<Vec<_>>()
        .join("\n");
    let video = state
        .video
        .as_ref()
        .map(|v| format!("\n\nVideo: {} ({})", v.name, v.size_label()))
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(format!("{kinds}{video}"))
            .block(Block::default().title("Analysis").borders(Borders::ALL)),
        cols[0],
    );

    frame.render_widget(
        Paragraph::new(mode_text(state.mode))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Performance mode (m)")
                    .borders(Borders::ALL),
            ),
        cols[1],
    );
}

fn mode_text(selected: PerformanceMode) -> String {
    PerformanceMode::ALL
        .iter()
        .map(|mode| {
            let marker = if *mode == selected { ">" } else { " " };
            format!("{marker} {}\n    {}", mode.label(), mode.description())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_live(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = state.live_view();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);

    let mut lines = vec![
        view.status.to_string(),
        format!(
            "Mode: {}",
            view.mode.map(|m| m.label()).unwrap_or("-")
        ),
        format!("Elapsed: {}", view.clock),
        format!("Frames: {}", view.frame_count),
        format!("Feed: {}", view.feed),
    ];
    if let Some(bytes) = view.frame_bytes {
        lines.push(format!("Frame size: {bytes} bytes"));
    }
    if let Some(secs) = view.processing_time {
        lines.push(format!("Processing: {secs:.1}s"));
    }
    if let Some(err) = &view.error {
        lines.push(String::new());
        lines.push(format!("Error: {err}"));
        lines.push("n New Analysis".to_string());
    }
    let status_style = if view.live {
        Style::default().fg(Color::Green)
    } else if view.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(lines.join("\n"))
            .style(status_style)
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Live Analysis").borders(Borders::ALL)),
        cols[0],
    );

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(6)])
        .split(cols[1]);
    let bars: Vec<Bar> = view
        .possession
        .iter()
        .map(|row| {
            Bar::default()
                .label(row.team.clone().into())
                .value(u64::from(row.percent))
                .text_value(format!("{}%", row.percent))
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Possession").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .max(100);
    frame.render_widget(chart, middle[0]);

    let events = match view.events {
        Some(ev) => format!(
            "Goals: {}\nYellow cards: {}\nRed cards: {}\nFree kicks: {}",
            view.goals.unwrap_or(0),
            ev.yellow_cards,
            ev.red_cards,
            ev.free_kicks
        ),
        None => format!("Goals: {}\nNo event data yet", view.goals.unwrap_or(0)),
    };
    frame.render_widget(
        Paragraph::new(events).block(Block::default().title("Events").borders(Borders::ALL)),
        middle[1],
    );

    render_steps(frame, cols[2], &state.progress_view());
}

fn render_processing(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = state.progress_view();
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!("DEMO | {}", view.title))
                .borders(Borders::ALL),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(view.percent)
        .label(format!("{}%", view.percent));
    frame.render_widget(gauge, sections[0]);
    render_steps(frame, sections[1], &view);
}

fn render_steps(frame: &mut Frame, area: Rect, view: &ProgressView) {
    let text = view
        .steps
        .iter()
        .map(|step| {
            let mark = match step.status {
                StepStatus::Done => "[x]",
                StepStatus::Active => "[>]",
                StepStatus::Pending => "[ ]",
            };
            format!("{mark} {}", step.title)
        })
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(text).block(
            Block::default()
                .title(format!("Pipeline {}%", view.percent))
                .borders(Borders::ALL),
        ),
        area,
    );
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(result) = state.result.as_ref() else {
        frame.render_widget(
            Paragraph::new("No results yet").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let titles: Vec<&str> = ResultsTab::ALL.iter().map(|t| t.label()).collect();
    let selected = ResultsTab::ALL
        .iter()
        .position(|t| *t == state.results_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(tabs, sections[0]);

    let body = sections[1];
    match results_view(result, state.results_tab) {
        ResultsView::Overview(mut overview) => {
            overview.prediction = prediction_view(state.effective_prediction());
            render_overview(frame, body, &overview, state.prediction_loading);
        }
        ResultsView::Video {
            duration,
            events,
            highlights,
        } => {
            let mut lines = vec![format!("Duration: {duration}"), String::new()];
            lines.push("Key Events".to_string());
            if events.is_empty() {
                lines.push("  none".to_string());
            }
            for e in &events {
                lines.push(format!("  {} {:<13} {}", e.time, e.kind, e.description));
            }
            lines.push(String::new());
            lines.push("Highlights".to_string());
            for h in &highlights {
                lines.push(format!("  - {h}"));
            }
            render_text_block(frame, body, "Video Analysis", lines);
        }
        ResultsView::Scoring {
            team_a,
            team_b,
            comparison,
            players,
        } => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(7), Constraint::Min(1)])
                .split(body);
            let cards = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(33),
                    Constraint::Percentage(33),
                    Constraint::Percentage(34),
                ])
                .split(rows[0]);
            render_team_card(frame, cards[0], &team_a);
            render_team_card(frame, cards[1], &team_b);
            render_text_block(frame, cards[2], "Comparison", comparison_lines(&comparison));
            let lines = players
                .iter()
                .map(|p| format!("{:<14} {:<12} {:.1}", p.name, p.position, p.rating))
                .collect();
            render_text_block(frame, rows[1], "Player Ratings", lines);
        }
        ResultsView::Sentiment { slices, keywords } => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(body);
            frame.render_widget(sentiment_chart(&slices), cols[0]);
            let mut lines = vec![format!("Keywords: {}", keywords.join(", ")), String::new()];
            if state.sentiment_loading {
                lines.push("Requesting sentiment analysis...".to_string());
            } else if let Some(resp) = &state.sentiment {
                let s = &resp.sentiment_analysis;
                lines.push(format!(
                    "{}: +{:.0}% / ~{:.0}% / -{:.0}%",
                    resp.team_name, s.positive, s.neutral, s.negative
                ));
                lines.extend(s.insights.iter().map(|i| format!("  * {i}")));
                lines.extend(s.recommendations.iter().map(|r| format!("  > {r}")));
                if !resp.api_key_available {
                    lines.push("(fallback analysis, no API key on server)".to_string());
                }
            } else {
                lines.push("t/T: analyze fan sentiment for team A/B".to_string());
            }
            render_text_block(frame, cols[1], "Fan Sentiment", lines);
        }
        ResultsView::Recommendations {
            formation,
            tactics,
            substitutions,
            key_insights,
        } => {
            let mut lines = vec![format!("Formation: {formation}"), String::new()];
            for (title, items) in [
                ("Tactics", &tactics),
                ("Substitutions", &substitutions),
                ("Key Insights", &key_insights),
            ] {
                lines.push(title.to_string());
                lines.extend(items.iter().map(|i| format!("  - {i}")));
            }
            lines.push(String::new());
            if state.feedback_loading {
                lines.push("Requesting team feedback...".to_string());
            } else if let Some(fb) = &state.team_feedback {
                lines.push(format!("Team feedback: {}", fb.team_name));
                lines.extend(
                    fb.data
                        .team_summary
                        .priority_actions
                        .iter()
                        .map(|a| format!("  ! {a}")),
                );
                lines.extend(
                    fb.data
                        .team_summary
                        .avg_insights
                        .iter()
                        .map(|a| format!("  * {a}")),
                );
            } else {
                lines.push("f/F: fetch team feedback for team A/B".to_string());
            }
            render_text_block(frame, body, "AI Insights", lines);
        }
    }
}

fn render_overview(
    frame: &mut Frame,
    area: Rect,
    overview: &OverviewView,
    prediction_loading: bool,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut left = vec![
        format!("Leading: {}", overview.leading_team),
        format!("Duration: {}", overview.duration),
        format!(
            "Events: {}  Highlights: {}",
            overview.event_count, overview.highlight_count
        ),
        String::new(),
    ];
    left.extend(comparison_lines(&overview.comparison));
    left.push(String::new());
    match &overview.analytics {
        AnalyticsView::Available {
            total_distance,
            duration_secs,
            goals_detected,
            players,
        } => {
            left.push(format!(
                "Tracking: {total_distance:.0} m covered, {goals_detected} goals, {duration_secs:.0}s"
            ));
            for p in players.iter().take(6) {
                left.push(format!(
                    "  {:<10} {:<7} avg {} max {} touches {}",
                    p.player,
                    p.team.clone().unwrap_or_default(),
                    opt_num(p.avg_speed),
                    opt_num(p.max_speed),
                    opt_num(p.touches)
                ));
            }
        }
        AnalyticsView::Unavailable { reason } => left.push(reason.clone()),
    }
    render_text_block(frame, cols[0], "Overview", left);

    let mut right = Vec::new();
    if prediction_loading {
        right.push("Requesting prediction...".to_string());
    }
    match &overview.prediction {
        PredictionView::Available {
            outcome,
            home_pct,
            draw_pct,
            away_pct,
            confidence_pct,
            model,
            features_used,
            note,
        } => {
            right.push(format!("Predicted: {outcome} ({confidence_pct}% confidence)"));
            right.push(format!("Home {home_pct}% | Draw {draw_pct}% | Away {away_pct}%"));
            right.push(format!("Model: {model}"));
            if let Some(n) = features_used {
                right.push(format!("Features: {n}"));
            }
            if let Some(note) = note {
                right.push(format!("Note: {note}"));
            }
        }
        PredictionView::Unavailable { reason } => {
            right.push(reason.clone());
            right.push("p: request a prediction".to_string());
        }
    }
    render_text_block(frame, cols[1], "Match Prediction", right);
}

fn render_team_card(frame: &mut Frame, area: Rect, card: &TeamCard) {
    let lines = vec![
        format!("Score: {:.1}", card.score),
        format!("Possession: {}", opt_pct(card.possession)),
        format!("Pass accuracy: {}", opt_pct(card.accuracy)),
        format!("Passes: {}", opt_num(card.passes)),
    ];
    render_text_block(frame, area, &card.name, lines);
}

fn comparison_lines(rows: &[ComparisonRow]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            format!(
                "{:<14} A {:>6}  B {:>6}",
                row.metric,
                opt_num(row.team_a),
                opt_num(row.team_b)
            )
        })
        .collect()
}

fn sentiment_chart(slices: &[ChartSlice]) -> BarChart<'static> {
    let bars: Vec<Bar> = slices
        .iter()
        .map(|slice| {
            let color = match slice.label {
                "Positive" => Color::Green,
                "Negative" => Color::Red,
                _ => Color::Gray,
            };
            Bar::default()
                .label(slice.label.into())
                .value(slice.value.round().max(0.0) as u64)
                .text_value(format!("{:.0}%", slice.value))
                .style(Style::default().fg(color))
        })
        .collect();
    BarChart::default()
        .block(Block::default().title("Sentiment").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(2)
        .max(100)
}

fn render_text_block(frame: &mut Frame, area: Rect, title: &str, lines: Vec<String>) {
    frame.render_widget(
        Paragraph::new(lines.join("\n"))
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title.to_string()).borders(Borders::ALL)),
        area,
    );
}

fn opt_num(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| "-".to_string())
}

fn opt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.0}%"))
        .unwrap_or_else(|| "-".to_string())
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "MatchLens Terminal - Help",
        "",
        "Upload:",
        "  type path    Video file to analyze",
        "  Enter        Upload",
        "  Tab          Continue to analysis choice",
        "",
        "Analysis:",
        "  a / ↑ / ↓    Live or traditional (demo)",
        "  m            Cycle performance mode",
        "  Enter        Start (retry after a failure)",
        "  s / Esc      Stop live analysis",
        "",
        "Results:",
        "  Tab / ← / →  Switch tab (1-5 jump)",
        "  e            Export report (.xlsx)",
        "  p            Request match prediction",
        "  t / T        Fan sentiment for team A / B",
        "  f / F        Team feedback for team A / B",
        "  n            New analysis",
        "",
        "  ?            Toggle help",
        "  q / Ctrl+Q   Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
