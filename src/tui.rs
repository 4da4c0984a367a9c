use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::{BTreeSet, HashMap};
use std::io::stdout;

use crate::db::Database;
use crate::models::{Job, JobStatus, Preferences, ScoredJob};
use crate::query::filter_and_sort;
use crate::scoring::MatchBadge;
use crate::state::{reduce, Action, DashboardState};
use crate::status::set_status;
use crate::store::{toggle_saved, PreferenceStore, SavedJobStore, StatusStore};

struct AppState {
    jobs: Vec<Job>,
    prefs: Option<Preferences>,
    statuses: HashMap<i64, JobStatus>,
    saved: Vec<i64>,
    dashboard: DashboardState,
    results: Vec<ScoredJob>,
    selected: usize,
    scroll_offset: u16,
    editing_keyword: bool,
    /// One-line feedback shown in the footer until the next key press.
    message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum FilterField {
    Location,
    Mode,
    Experience,
    Source,
    Status,
}

impl AppState {
    fn new(jobs: Vec<Job>, db: &Database) -> Result<Self> {
        let mut state = Self {
            jobs,
            prefs: db.preferences()?,
            statuses: db.statuses()?,
            saved: db.saved_job_ids()?,
            dashboard: DashboardState::default(),
            results: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            editing_keyword: false,
            message: None,
        };
        state.refresh();
        Ok(state)
    }

    fn dispatch(&mut self, action: Action) {
        self.dashboard = reduce(std::mem::take(&mut self.dashboard), action);
        self.refresh();
    }

    /// Re-runs the query and keeps the selected job in view if it survived.
    fn refresh(&mut self) {
        self.results = filter_and_sort(
            &self.jobs,
            self.prefs.as_ref(),
            &self.dashboard.filters,
            self.dashboard.only_matches,
            &self.statuses,
        );
        self.selected = self
            .dashboard
            .selected
            .and_then(|id| self.results.iter().position(|j| j.job.id == id))
            .unwrap_or(0);
        self.sync_selection();
    }

    fn sync_selection(&mut self) {
        let id = self.current_job().map(|j| j.job.id);
        self.dashboard = reduce(std::mem::take(&mut self.dashboard), Action::Select(id));
    }

    fn current_job(&self) -> Option<&ScoredJob> {
        self.results.get(self.selected)
    }

    fn next(&mut self) {
        if !self.results.is_empty() && self.selected < self.results.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
            self.sync_selection();
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
            self.sync_selection();
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn mark(&mut self, store: &dyn StatusStore, status: JobStatus) {
        let Some(scored) = self.current_job() else { return };
        let job = scored.job.clone();
        match set_status(store, &job, status, Utc::now()) {
            Ok(_) => {
                self.statuses.insert(job.id, status);
                self.message = Some(format!("{} marked {}", job.title, status));
                self.refresh();
            }
            Err(e) => self.message = Some(format!("Failed to update status: {e:#}")),
        }
    }

    fn toggle_save(&mut self, store: &dyn SavedJobStore) {
        let Some(scored) = self.current_job() else { return };
        let job_id = scored.job.id;
        match toggle_saved(store, job_id).and_then(|_| store.saved_job_ids()) {
            Ok(saved) => self.saved = saved,
            Err(e) => self.message = Some(format!("Failed to toggle saved job: {e:#}")),
        }
    }

    /// Steps a filter through "all" and then each value present in the data.
    fn cycle_filter(&mut self, field: FilterField) {
        let filters = &self.dashboard.filters;
        let (current, options) = match field {
            FilterField::Location => (&filters.location, distinct(self.jobs.iter().map(|j| j.location.as_str()))),
            FilterField::Mode => (&filters.mode, distinct(self.jobs.iter().map(|j| j.mode.as_str()))),
            FilterField::Experience => (&filters.experience, distinct(self.jobs.iter().map(|j| j.experience.as_str()))),
            FilterField::Source => (&filters.source, distinct(self.jobs.iter().map(|j| j.source.as_str()))),
            FilterField::Status => (
                &filters.status,
                [JobStatus::NotApplied, JobStatus::Applied, JobStatus::Rejected, JobStatus::Selected]
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            ),
        };
        let value = next_option(current, &options);
        let action = match field {
            FilterField::Location => Action::SetLocation(value),
            FilterField::Mode => Action::SetMode(value),
            FilterField::Experience => Action::SetExperience(value),
            FilterField::Source => Action::SetSource(value),
            FilterField::Status => Action::SetStatus(value),
        };
        self.dispatch(action);
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// "" -> first -> ... -> last -> "". An unknown current value resets to "".
fn next_option(current: &str, options: &[String]) -> String {
    match options.iter().position(|o| o.eq_ignore_ascii_case(current)) {
        Some(i) => options.get(i + 1).cloned().unwrap_or_default(),
        None if current.is_empty() => options.first().cloned().unwrap_or_default(),
        None => String::new(),
    }
}

pub fn run_browse(db: &Database, jobs: Vec<Job>) -> Result<()> {
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut state = AppState::new(jobs, db)?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select((!state.results.is_empty()).then_some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        state.message = None;

        if state.editing_keyword {
            let mut keyword = state.dashboard.filters.keyword.clone();
            match key.code {
                KeyCode::Enter | KeyCode::Esc => state.editing_keyword = false,
                KeyCode::Backspace => {
                    keyword.pop();
                    state.dispatch(Action::SetKeyword(keyword));
                }
                KeyCode::Char(c) => {
                    keyword.push(c);
                    state.dispatch(Action::SetKeyword(keyword));
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => state.next(),
            KeyCode::Up | KeyCode::Char('k') => state.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
            KeyCode::Char('/') => state.editing_keyword = true,
            KeyCode::Char('o') => state.dispatch(Action::CycleSort),
            KeyCode::Char('m') => {
                if state.prefs.is_some() {
                    state.dispatch(Action::ToggleOnlyMatches);
                }
            }
            KeyCode::Char('c') => state.dispatch(Action::ClearFilters),
            KeyCode::Char('l') => state.cycle_filter(FilterField::Location),
            KeyCode::Char('w') => state.cycle_filter(FilterField::Mode),
            KeyCode::Char('e') => state.cycle_filter(FilterField::Experience),
            KeyCode::Char('r') => state.cycle_filter(FilterField::Source),
            KeyCode::Char('t') => state.cycle_filter(FilterField::Status),
            KeyCode::Char('s') => state.toggle_save(db),
            KeyCode::Char('n') => state.mark(db, JobStatus::NotApplied),
            KeyCode::Char('a') => state.mark(db, JobStatus::Applied),
            KeyCode::Char('x') => state.mark(db, JobStatus::Rejected),
            KeyCode::Char('y') => state.mark(db, JobStatus::Selected),
            _ => {}
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    frame.render_widget(Paragraph::new(filter_summary(state)), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: job list
    let show_scores = state.prefs.is_some();
    let items: Vec<ListItem> = state
        .results
        .iter()
        .map(|scored| {
            let job = &scored.job;
            let saved = if state.saved.contains(&job.id) { "*" } else { " " };
            let status_icon = match state.statuses.get(&job.id).copied().unwrap_or_default() {
                JobStatus::NotApplied => " ",
                JobStatus::Applied => "+",
                JobStatus::Rejected => "x",
                JobStatus::Selected => "!",
            };
            let title = if job.title.chars().count() > 30 {
                format!("{}...", job.title.chars().take(27).collect::<String>())
            } else {
                job.title.clone()
            };
            let mut spans = vec![Span::raw(format!("{}{} ", saved, status_icon))];
            if show_scores {
                spans.push(Span::styled(
                    format!("{:>3}% ", scored.match_score),
                    badge_style(scored.match_score),
                ));
            }
            spans.push(Span::raw(format!("{} | {}", title, job.company)));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({}/{}) ",
            state.results.len(),
            state.jobs.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    let footer = if let Some(message) = &state.message {
        Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Yellow))
    } else if state.editing_keyword {
        Paragraph::new(" typing keyword... Enter/Esc:done").style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(
            " j/k:navigate  /:search  l/w/e/r/t:loc/mode/exp/source/status  o:sort  m:matches  c:clear  s:save  n/a/x/y:mark  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(footer, rows[2]);
}

fn filter_summary(state: &AppState) -> Line<'static> {
    let filters = &state.dashboard.filters;
    let mut parts = vec![format!("sort: {}", filters.sort)];
    if !filters.keyword.is_empty() || state.editing_keyword {
        parts.push(format!("search: \"{}\"", filters.keyword));
    }
    let attributes = [
        ("location", &filters.location),
        ("mode", &filters.mode),
        ("exp", &filters.experience),
        ("source", &filters.source),
        ("status", &filters.status),
    ];
    for (label, value) in attributes {
        if !value.is_empty() {
            parts.push(format!("{}: {}", label, value));
        }
    }
    match &state.prefs {
        Some(prefs) if state.dashboard.only_matches => {
            parts.push(format!("only >= {}% match", prefs.min_match_score));
        }
        Some(_) => {}
        None => parts.push("no preferences set: run `jobtrack prefs set` to enable matching".to_string()),
    }
    Line::from(format!(" {}", parts.join("  |  ")))
}

fn badge_style(score: u8) -> Style {
    match MatchBadge::for_score(score) {
        MatchBadge::Excellent => Style::default().fg(Color::Green),
        MatchBadge::Good => Style::default().fg(Color::Cyan),
        MatchBadge::Fair => Style::default().fg(Color::Yellow),
        MatchBadge::Low => Style::default().fg(Color::DarkGray),
    }
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(scored) = state.current_job() else {
        return Text::raw("No jobs match the current filters");
    };
    let job = &scored.job;

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));

    if state.prefs.is_some() {
        lines.push(Line::from(Span::styled(
            format!("Match: {}% ({})", scored.match_score, MatchBadge::for_score(scored.match_score).as_str()),
            badge_style(scored.match_score),
        )));
    }

    let status = state.statuses.get(&job.id).copied().unwrap_or_default();
    let status_style = match status {
        JobStatus::NotApplied => Style::default(),
        JobStatus::Applied => Style::default().fg(Color::Cyan),
        JobStatus::Rejected => Style::default().fg(Color::Red),
        JobStatus::Selected => Style::default().fg(Color::Green),
    };
    lines.push(Line::from(Span::styled(format!("Status: {}", status), status_style)));
    if state.saved.contains(&job.id) {
        lines.push(Line::from("Saved"));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(format!("Location: {} ({})", job.location, job.mode)));
    lines.push(Line::from(format!("Experience: {}", job.experience)));
    lines.push(Line::from(format!("Salary: {}", job.salary_range)));
    lines.push(Line::from(format!("Source: {}", job.source)));
    lines.push(Line::from(format!("Posted: {}", crate::format_posted(job.posted_days_ago))));
    lines.push(Line::from(format!("Apply: {}", job.apply_url)));
    lines.push(Line::from(""));

    if !job.skills.is_empty() {
        lines.push(Line::from(Span::styled(
            "Skills",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", job.skills.join(", "))));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "Description",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in textwrap::fill(&job.description, 70).lines() {
        lines.push(Line::from(format!("  {}", line)));
    }

    Text::from(lines)
}
