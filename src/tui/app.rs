//! Main application logic for the terminal dashboard.
//!
//! The dashboard owns one store and one section per entity kind. Store calls run
//! on the tokio runtime; their completions come back over a channel and are applied
//! at the top of every frame, so the UI loop never waits on the network.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Sparkline, Tabs, Wrap},
    Frame, Terminal,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::client::CollectionApi;
use crate::dates::{format_due_relative, today, truncate};
use crate::entity::{Entity, Field, Objective, Project, Task};
use crate::fields::EntityKind;
use crate::stats::{completion_series, dashboard_stats, HISTORY_DAYS};
use crate::store::{run_command, Command, Completion, EntityStore};
use crate::tui::{
    cards::{CardGrid, CardRenderer},
    colors::{priority_color, status_style, DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD, SLATE},
    enums::{AppState, ViewMode},
    overlay::ViewOutcome,
    popover::standard_actions,
    table::{default_columns, Column, EntityTable},
    utils::centered_rect,
};

/// A finished store call, tagged with the collection it belongs to.
#[derive(Debug)]
pub enum AppEvent {
    Tasks(Completion<Task>),
    Projects(Completion<Project>),
    Objectives(Completion<Objective>),
}

/// One entity kind on the dashboard: its store and both of its views.
pub struct Section<E: Entity> {
    pub store: EntityStore<E>,
    pub view: ViewMode,
    pub table: EntityTable<E>,
    pub cards: CardGrid<E>,
    wrap: fn(Completion<E>) -> AppEvent,
}

impl<E: Entity> Section<E> {
    pub fn new(
        api: Arc<dyn CollectionApi<E>>,
        columns: Vec<Column<E>>,
        renderer: CardRenderer<E>,
        wrap: fn(Completion<E>) -> AppEvent,
    ) -> Self {
        Section {
            store: EntityStore::new(api),
            view: ViewMode::Table,
            table: EntityTable::new(columns, standard_actions()).with_template(E::default_values()),
            cards: CardGrid::new(renderer, standard_actions()).with_template(E::default_values()),
            wrap,
        }
    }

    pub fn overlay_active(&self) -> bool {
        match self.view {
            ViewMode::Table => self.table.overlay.is_active(),
            ViewMode::Cards => self.cards.overlay.is_active(),
        }
    }

    pub fn hovered_tooltip(&self) -> Option<&str> {
        match self.view {
            ViewMode::Table => self.table.overlay.popover.hovered_tooltip(),
            ViewMode::Cards => self.cards.overlay.popover.hovered_tooltip(),
        }
    }

    /// Switch layouts, carrying the selection across.
    pub fn toggle_view(&mut self) {
        match self.view {
            ViewMode::Table => self.cards.selected = self.table.state.selected(),
            ViewMode::Cards => self.table.state.select(self.cards.selected),
        }
        self.view = self.view.toggle();
    }

    /// Issue a store call without waiting for it.
    pub fn dispatch(&mut self, cmd: Command, runtime: &Handle, tx: &UnboundedSender<AppEvent>) {
        self.store.begin(&cmd);
        let api = self.store.api();
        let tx = tx.clone();
        let wrap = self.wrap;
        runtime.spawn(async move {
            let completion = run_command(api, cmd).await;
            if tx.send(wrap(completion)).is_err() {
                debug!(kind = E::KIND.noun(), "dashboard closed before completion arrived");
            }
        });
    }

    /// Route a key to the active view and schedule whatever it asks for.
    /// Returns false when the view did not want the key.
    pub fn on_key(
        &mut self,
        key: KeyEvent,
        today: NaiveDate,
        runtime: &Handle,
        tx: &UnboundedSender<AppEvent>,
    ) -> bool {
        let items = self.store.items();
        let outcome = match self.view {
            ViewMode::Table => self.table.handle_key(key, items, today),
            ViewMode::Cards => self.cards.handle_key(key, items, today),
        };
        match outcome {
            ViewOutcome::Ignored => false,
            ViewOutcome::Handled => true,
            ViewOutcome::Mutate(mutation) => {
                if let Some(cmd) = mutation.into_command() {
                    self.dispatch(cmd, runtime, tx);
                }
                true
            }
            ViewOutcome::Create(values) => {
                self.dispatch(Command::Add(values), runtime, tx);
                true
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, today: NaiveDate) {
        let items = self.store.items();
        match self.view {
            ViewMode::Table => self.table.render(f, area, items, focused, today),
            ViewMode::Cards => self.cards.render(f, area, items, focused, today),
        }
    }
}

fn progress_bar(pct: u8, width: usize) -> String {
    let filled = (usize::from(pct) * width + 50) / 100;
    format!("{}{} {pct:>3}%", "█".repeat(filled), "░".repeat(width - filled.min(width)))
}

fn description_line(description: &str) -> Line<'static> {
    if description.is_empty() {
        Line::from(Span::styled("No description", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(truncate(description, 60))
    }
}

fn task_card(task: &Task) -> Vec<Line<'static>> {
    vec![
        description_line(&task.description),
        Line::from(Span::styled(task.status.label(), status_style(task.status))),
    ]
}

/// Status, priority, progress and due date, shared by projects and objectives.
fn planning_lines<E: Entity>(item: &E, description: &str) -> Vec<Line<'static>> {
    let status = item.status();
    let mut badges = vec![Span::styled(status.label(), status_style(status))];
    if let Some(priority) = item.priority() {
        badges.push(Span::raw("  "));
        badges.push(Span::styled(priority.label(), Style::default().fg(priority_color(priority))));
    }
    vec![
        description_line(description),
        Line::from(badges),
        Line::from(progress_bar(item.progress().unwrap_or(0), 12)),
        Line::from(format!("Due {}", format_due_relative(item.due_date(), today()))),
    ]
}

fn project_card(project: &Project) -> Vec<Line<'static>> {
    planning_lines(project, &project.description)
}

fn objective_card(objective: &Objective) -> Vec<Line<'static>> {
    let mut lines = planning_lines(objective, &objective.description);
    let started = match (objective.started, objective.start_on) {
        (Some(d), _) => format!("Started {}", d.format("%d %b")),
        (None, Some(d)) => format!("Starts {}", d.format("%d %b")),
        (None, None) => "Not scheduled".to_string(),
    };
    lines.push(Line::from(Span::styled(started, Style::default().fg(Color::DarkGray))));
    lines
}

/// Show progress columns as percentages.
fn with_percent_progress<E: Entity>(mut columns: Vec<Column<E>>, cell: fn(&E) -> String) -> Vec<Column<E>> {
    for column in columns.iter_mut().filter(|c| c.key == Field::Progress) {
        column.cell = Some(cell);
    }
    columns
}

/// Main application state for the dashboard.
pub struct Dashboard {
    state: AppState,
    focus: EntityKind,
    tasks: Section<Task>,
    projects: Section<Project>,
    objectives: Section<Objective>,
    runtime: Handle,
    events_tx: UnboundedSender<AppEvent>,
    events: UnboundedReceiver<AppEvent>,
    status_message: String,
}

impl Dashboard {
    pub fn new(
        runtime: Handle,
        tasks: Arc<dyn CollectionApi<Task>>,
        projects: Arc<dyn CollectionApi<Project>>,
        objectives: Arc<dyn CollectionApi<Objective>>,
    ) -> Self {
        let (events_tx, events) = unbounded_channel();
        Dashboard {
            state: AppState::Dashboard,
            focus: EntityKind::Task,
            tasks: Section::new(tasks, default_columns(), task_card, AppEvent::Tasks),
            projects: Section::new(
                projects,
                with_percent_progress::<Project>(default_columns(), |p| format!("{}%", p.progress)),
                project_card,
                AppEvent::Projects,
            ),
            objectives: Section::new(
                objectives,
                with_percent_progress::<Objective>(default_columns(), |o| format!("{}%", o.progress)),
                objective_card,
                AppEvent::Objectives,
            ),
            runtime,
            events_tx,
            events,
            status_message: String::new(),
        }
    }

    /// Re-fetch every collection.
    pub fn refresh_all(&mut self) {
        self.tasks.dispatch(Command::FetchAll, &self.runtime, &self.events_tx);
        self.projects.dispatch(Command::FetchAll, &self.runtime, &self.events_tx);
        self.objectives.dispatch(Command::FetchAll, &self.runtime, &self.events_tx);
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tasks(c) => self.tasks.store.finish(c),
            AppEvent::Projects(c) => self.projects.store.finish(c),
            AppEvent::Objectives(c) => self.objectives.store.finish(c),
        }
    }

    /// Apply every completion that has arrived, in arrival order.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.store.is_loading()
            || self.projects.store.is_loading()
            || self.objectives.store.is_loading()
    }

    pub fn errors(&self) -> Vec<&str> {
        [
            self.tasks.store.error(),
            self.projects.store.error(),
            self.objectives.store.error(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn focused_overlay_active(&self) -> bool {
        match self.focus {
            EntityKind::Task => self.tasks.overlay_active(),
            EntityKind::Project => self.projects.overlay_active(),
            EntityKind::Objective => self.objectives.overlay_active(),
        }
    }

    fn route_key(&mut self, key: KeyEvent) -> bool {
        let today = today();
        match self.focus {
            EntityKind::Task => self.tasks.on_key(key, today, &self.runtime, &self.events_tx),
            EntityKind::Project => self.projects.on_key(key, today, &self.runtime, &self.events_tx),
            EntityKind::Objective => self.objectives.on_key(key, today, &self.runtime, &self.events_tx),
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let all = EntityKind::ALL;
        let idx = all.iter().position(|k| *k == self.focus).unwrap_or(0);
        let next = if forward { (idx + 1) % all.len() } else { (idx + all.len() - 1) % all.len() };
        self.focus = all[next];
    }

    fn toggle_focused_view(&mut self) {
        let mode = match self.focus {
            EntityKind::Task => {
                self.tasks.toggle_view();
                self.tasks.view
            }
            EntityKind::Project => {
                self.projects.toggle_view();
                self.projects.view
            }
            EntityKind::Objective => {
                self.objectives.toggle_view();
                self.objectives.view
            }
        };
        self.status_message = format!("{} shown as {}", self.focus.title(), mode.label());
    }

    fn focused_tooltip(&self) -> Option<&str> {
        match self.focus {
            EntityKind::Task => self.tasks.hovered_tooltip(),
            EntityKind::Project => self.projects.hovered_tooltip(),
            EntityKind::Objective => self.objectives.hovered_tooltip(),
        }
    }

    fn focused_view(&self) -> ViewMode {
        match self.focus {
            EntityKind::Task => self.tasks.view,
            EntityKind::Project => self.projects.view,
            EntityKind::Objective => self.objectives.view,
        }
    }

    /// Handle one key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        if self.state == AppState::Help {
            self.state = AppState::Dashboard;
            return false;
        }
        self.status_message.clear();

        if self.focused_overlay_active() {
            self.route_key(key);
            return false;
        }

        // The error card replaces the sections, so only retry and quit remain.
        if !self.errors().is_empty() {
            match key.code {
                KeyCode::Char('r') => self.refresh_all(),
                KeyCode::Char('q') | KeyCode::Esc => return true,
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.cycle_focus(true),
            KeyCode::BackTab => self.cycle_focus(false),
            KeyCode::Char('v') => self.toggle_focused_view(),
            KeyCode::Char('r') => {
                self.refresh_all();
                self.status_message = "Refreshing...".to_string();
            }
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {
                self.route_key(key);
            }
        }
        false
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key));
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header_text = vec![Line::from(vec![
            Span::styled("TASKBOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                today().format("%A %d %B %Y").to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];
        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_stats(&self, f: &mut Frame, area: Rect) {
        let stats = dashboard_stats(
            self.tasks.store.items(),
            self.projects.store.items(),
            self.objectives.store.items(),
            today(),
        );
        let cards = [
            (
                "Tasks",
                vec![
                    format!("{} total", stats.tasks.total),
                    format!("{} active, {} done", stats.tasks.active, stats.tasks.completed),
                ],
            ),
            (
                "Projects",
                vec![
                    format!("{} total, {} done", stats.projects.total, stats.projects.completed),
                    format!("{} high priority", stats.high_priority_projects),
                ],
            ),
            (
                "Objectives",
                vec![
                    format!("{}% average progress", stats.objective_progress),
                    format!("{} of {} achieved", stats.objectives.completed, stats.objectives.total),
                ],
            ),
            (
                "Due Soon",
                vec![format!("{} in the next week", stats.due_soon), String::new()],
            ),
        ];

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);
        for ((title, lines), chunk) in cards.into_iter().zip(chunks.iter()) {
            let body: Vec<Line> = lines.into_iter().map(Line::from).collect();
            let card = Paragraph::new(body).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(title, Style::default().fg(GOLD).add_modifier(Modifier::BOLD))),
            );
            f.render_widget(card, *chunk);
        }
    }

    fn render_history(&self, f: &mut Frame, area: Rect) {
        let utc_today = Utc::now().date_naive();
        let series = [
            ("Tasks", completion_series(self.tasks.store.items(), utc_today), DARK_GREEN),
            ("Projects", completion_series(self.projects.store.items(), utc_today), GOLD),
            ("Objectives", completion_series(self.objectives.store.items(), utc_today), DARK_PURPLE),
        ];
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(area);
        for ((label, data, color), chunk) in series.iter().zip(chunks.iter()) {
            let done: u64 = data.iter().sum();
            let spark = Sparkline::default()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!("{label} completed, {HISTORY_DAYS}d: {done}")),
                )
                .data(data)
                .style(Style::default().fg(*color));
            f.render_widget(spark, *chunk);
        }
    }

    fn render_tabs(&self, f: &mut Frame, area: Rect) {
        let titles: Vec<Line> = [
            (EntityKind::Task, self.tasks.store.items().len(), self.tasks.view),
            (EntityKind::Project, self.projects.store.items().len(), self.projects.view),
            (EntityKind::Objective, self.objectives.store.items().len(), self.objectives.view),
        ]
        .into_iter()
        .map(|(kind, count, view)| Line::from(format!("{} ({count}) [{}]", kind.title(), view.label())))
        .collect();
        let selected = EntityKind::ALL.iter().position(|k| *k == self.focus).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(Style::default().fg(GOLD).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, area);
    }

    fn render_error_card(&self, f: &mut Frame, area: Rect) {
        let mut text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Something went wrong",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        text.extend(self.errors().into_iter().map(|e| Line::from(e.to_string())));
        text.push(Line::from(""));
        text.push(Line::from("Press 'r' to retry, 'q' to quit"));

        let area = centered_rect(60, 50, area);
        f.render_widget(Clear, area);
        let card = Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Error")
                    .style(Style::default().bg(DARK_RED)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(card, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(Span::styled("Taskboard Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Dashboard:", bold)),
            Line::from("  Tab/Shift+Tab  Switch section"),
            Line::from("  ↑/↓, k/j       Select item (←/→ move between cards)"),
            Line::from("  Enter/Space    Open actions for the selected item"),
            Line::from("  a              Add new item"),
            Line::from("  v              Toggle table/card view"),
            Line::from("  r              Refresh all lists"),
            Line::from("  h/F1           Show this help"),
            Line::from("  q/Esc/Ctrl+C   Quit"),
            Line::from(""),
            Line::from(Span::styled("Actions Menu:", bold)),
            Line::from("  ↑/↓            Choose action"),
            Line::from("  Enter          Run action"),
            Line::from("  Esc            Close"),
            Line::from(""),
            Line::from(Span::styled("Forms:", bold)),
            Line::from("  Tab/↑/↓        Move between fields"),
            Line::from("  ←/→            Change status/priority"),
            Line::from("  Ctrl+T         Toggle the focused date"),
            Line::from("  Enter          Save"),
            Line::from("  Esc            Cancel"),
            Line::from(""),
            Line::from(Span::styled("Date Formats:", bold)),
            Line::from("  YYYY-MM-DD     Specific date (e.g., 2025-12-25)"),
            Line::from("  today, tomorrow, eow, eom, weekend"),
            Line::from("  in 3d, in 2w   Relative to today"),
            Line::from("  fri, next mon  Weekdays"),
        ];
        let paragraph = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Press any key to return"),
        );
        f.render_widget(paragraph, area);
    }

    fn status_text(&self) -> String {
        if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if let Some(tooltip) = self.focused_tooltip() {
            tooltip.to_string()
        } else if self.is_loading() {
            "Loading...".to_string()
        } else {
            format!(
                "{} | {} view | Press 'h' for help",
                self.focus.title(),
                self.focused_view().label()
            )
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status = Paragraph::new(self.status_text())
            .style(Style::default().bg(SLATE).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    pub fn render(&mut self, f: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        if self.state == AppState::Help {
            self.render_help(f, outer[0]);
            self.render_status_bar(f, outer[1]);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Length(4), // stat cards
                Constraint::Length(4), // completion sparklines
                Constraint::Length(1), // section tabs
                Constraint::Min(0),    // focused section
            ])
            .split(outer[0]);

        self.render_header(f, chunks[0]);
        self.render_stats(f, chunks[1]);
        self.render_history(f, chunks[2]);
        self.render_tabs(f, chunks[3]);

        if self.errors().is_empty() {
            let today = today();
            match self.focus {
                EntityKind::Task => self.tasks.render(f, chunks[4], true, today),
                EntityKind::Project => self.projects.render(f, chunks[4], true, today),
                EntityKind::Objective => self.objectives.render(f, chunks[4], true, today),
            }
        } else {
            self.render_error_card(f, chunks[4]);
        }

        self.render_status_bar(f, outer[1]);
    }

    /// Main event loop. Handles rendering and input until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.drain_events();
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}
