//! Main TUI application logic.

use super::events::{self, Event, EventHandler};
use super::logs::{self, LogsView};
use super::replay::{self, ReplayView};
use super::results::{self, FilterInput, ResultsContext};
use super::state::LogBuffer;
use super::{Route, Theme};
use crate::services::{PageSource, ResultTable, RunAggregate, RunMonitor, SimulationService};
use crate::types::{Identifier, Notice, SimulationRun};
use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Tabs},
    Frame, Terminal,
};
use std::{
    io::{self, Stdout},
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the TUI needs to start.
pub struct TuiContext {
    pub service: SimulationService<dyn PageSource>,
    pub run_id: Identifier,
    /// Bot configuration to open in the Replay tab on start.
    pub bot_config_id: Option<Identifier>,
    pub poll_interval: Duration,
    pub log_buffer: Arc<LogBuffer>,
}

/// Filter text being edited, with the value to restore on cancel.
struct Editor {
    field: FilterInput,
    text: String,
    original: String,
}

/// Main TUI application.
pub struct App {
    route: Route,
    theme: Theme,
    should_quit: bool,

    run_id: Identifier,
    service: SimulationService<dyn PageSource>,
    monitor: RunMonitor,
    events: mpsc::UnboundedSender<Event>,
    log_buffer: Arc<LogBuffer>,

    run: Option<SimulationRun>,
    notices: Vec<Notice>,
    fetched_at: Option<DateTime<Utc>>,
    /// Monitor generation last copied into the view.
    generation: u64,
    table: ResultTable,
    aggregate: RunAggregate,
    selected: usize,
    editor: Option<Editor>,

    replay: ReplayView,
    logs: LogsView,
}

impl App {
    /// Create the app and start monitoring the run. Must be called inside a
    /// tokio runtime.
    pub fn new(context: TuiContext, events: mpsc::UnboundedSender<Event>) -> Self {
        let monitor = RunMonitor::spawn(
            context.service.clone(),
            context.run_id.clone(),
            context.poll_interval,
        );

        let mut app = Self {
            route: Route::Results,
            theme: Theme::default(),
            should_quit: false,
            run_id: context.run_id,
            service: context.service,
            monitor,
            events,
            log_buffer: context.log_buffer,
            run: None,
            notices: Vec::new(),
            fetched_at: None,
            generation: 0,
            table: ResultTable::default(),
            aggregate: RunAggregate::default(),
            selected: 0,
            editor: None,
            replay: ReplayView::default(),
            logs: LogsView::default(),
        };

        if let Some(bot_config_id) = context.bot_config_id {
            app.open_replay(bot_config_id);
        }
        app
    }

    /// Handle an event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(&key),
            Event::Tick => self.sync_snapshot(),
            Event::Resize(_, _) => {}
            Event::ReplayLoaded {
                seq,
                bot_config_id,
                load,
            } => {
                if !self.replay.finish(seq, bot_config_id, load) {
                    info!("Discarded superseded replay load #{}", seq);
                }
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Copy the monitor's latest snapshot into the view if it is newer.
    fn sync_snapshot(&mut self) {
        let state = self.monitor.latest();
        if state.generation <= self.generation {
            return;
        }
        self.generation = state.generation;

        let Some(snapshot) = state.snapshot else {
            return;
        };
        self.run = snapshot.run.clone();
        self.notices = snapshot.notices.clone();
        self.fetched_at = Some(snapshot.fetched_at);
        self.table.set_rows(snapshot.results.items.clone());
        self.aggregate = RunAggregate::from_rows(self.table.rows());
        self.clamp_selection();

        // Days and ticks move with the run, so the open replay follows each
        // new snapshot, up to and including the terminal one.
        if let Some((seq, bot_config_id)) = self.replay.refresh() {
            debug!("Reloading replay of bot config {} (#{})", bot_config_id, seq);
            self.spawn_replay_load(seq, bot_config_id);
        }
    }

    fn clamp_selection(&mut self) {
        let (visible, _) = self.table.counts();
        self.selected = self.selected.min(visible.saturating_sub(1));
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        // The filter editor swallows every key while open.
        if self.editor.is_some() {
            self.handle_editor_key(key);
            return;
        }

        if events::is_quit(key) {
            self.should_quit = true;
            return;
        }

        for route in Route::all() {
            if events::is_key(key, KeyCode::Char(route.key())) {
                self.route = route;
                return;
            }
        }
        if events::is_key(key, KeyCode::Tab) {
            self.route = self.route.next();
            return;
        }
        if events::is_key(key, KeyCode::Char('R')) || events::is_key(key, KeyCode::F(5)) {
            info!("Refreshing run {}", self.run_id);
            self.monitor.refresh_now();
            return;
        }

        match self.route {
            Route::Results => self.handle_results_key(key),
            Route::Replay => {
                if events::is_key(key, KeyCode::Esc) {
                    self.route = Route::Results;
                } else {
                    self.replay.handle_key(key);
                }
            }
            Route::Logs => self.logs.handle_key(key, &self.log_buffer),
        }
    }

    fn handle_results_key(&mut self, key: &KeyEvent) {
        let (visible, _) = self.table.counts();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(visible.saturating_sub(1))
            }
            KeyCode::PageUp => self.selected = self.selected.saturating_sub(20),
            KeyCode::PageDown => self.selected = (self.selected + 20).min(visible.saturating_sub(1)),
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = visible.saturating_sub(1),
            KeyCode::Char('s') => {
                let next = self.table.sort().field.next();
                self.table.toggle_sort(next);
            }
            KeyCode::Char('r') => {
                let current = self.table.sort().field;
                self.table.toggle_sort(current);
            }
            KeyCode::Char('/') => self.start_editing(FilterInput::Query),
            KeyCode::Char('p') => self.start_editing(FilterInput::MinProfit),
            KeyCode::Char('w') => self.start_editing(FilterInput::MinWinRate),
            KeyCode::Char('t') => self.start_editing(FilterInput::MinTrades),
            KeyCode::Char('P') => self.start_editing(FilterInput::MaxProfit),
            KeyCode::Char('W') => self.start_editing(FilterInput::MaxWinRate),
            KeyCode::Char('T') => self.start_editing(FilterInput::MaxTrades),
            KeyCode::Char('x') => {
                self.table.clear_filters();
                self.clamp_selection();
            }
            KeyCode::Enter => self.open_selected(),
            _ => {}
        }
    }

    fn start_editing(&mut self, field: FilterInput) {
        let original = field.current(self.table.filters());
        self.editor = Some(Editor {
            field,
            text: original.clone(),
            original,
        });
    }

    fn handle_editor_key(&mut self, key: &KeyEvent) {
        let Some(mut editor) = self.editor.take() else {
            return;
        };

        match key.code {
            KeyCode::Enter => {}
            KeyCode::Esc => {
                let field = editor.field;
                let original = editor.original;
                self.table.update_filters(|f| field.apply(&original, f));
                self.clamp_selection();
            }
            KeyCode::Backspace => {
                editor.text.pop();
                self.apply_editor(&editor);
                self.editor = Some(editor);
            }
            KeyCode::Char(c) => {
                editor.text.push(c);
                self.apply_editor(&editor);
                self.editor = Some(editor);
            }
            _ => self.editor = Some(editor),
        }
    }

    /// Filters follow the editor text as it is typed.
    fn apply_editor(&mut self, editor: &Editor) {
        let field = editor.field;
        self.table.update_filters(|f| field.apply(&editor.text, f));
        self.clamp_selection();
    }

    fn open_selected(&mut self) {
        let Some(row) = self.table.get(self.selected) else {
            return;
        };
        match row.bot_config_id().cloned() {
            Some(bot_config_id) => self.open_replay(bot_config_id),
            None => {
                warn!("Result row has no bot configuration id");
                self.notices = vec![Notice::warning("Selected row has no bot configuration to replay")];
            }
        }
    }

    /// Switch the Replay tab to one bot configuration and load it.
    fn open_replay(&mut self, bot_config_id: Identifier) {
        let seq = self.replay.begin(bot_config_id.clone());
        self.route = Route::Replay;
        self.spawn_replay_load(seq, bot_config_id);
    }

    /// Load a replay in the background; the result comes back as
    /// [`Event::ReplayLoaded`] tagged with `seq`.
    fn spawn_replay_load(&self, seq: u64, bot_config_id: Identifier) {
        let service = self.service.clone();
        let run_id = self.run_id.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let load = service.replay(&run_id, &bot_config_id).await;
            // The UI may have exited; nothing to do then.
            let _ = tx.send(Event::ReplayLoaded {
                seq,
                bot_config_id,
                load,
            });
        });
    }

    /// Render the TUI.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_tabs(frame, chunks[0]);

        match self.route {
            Route::Results => {
                let last_refresh = self
                    .fetched_at
                    .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string());
                let ctx = ResultsContext {
                    run: self.run.as_ref(),
                    table: &self.table,
                    aggregate: &self.aggregate,
                    notices: &self.notices,
                    selected: self.selected,
                    editing: self.editor.as_ref().map(|e| (e.field, e.text.as_str())),
                    last_refresh,
                };
                results::render(frame, chunks[1], &ctx, &self.theme);
            }
            Route::Replay => replay::render(frame, chunks[1], &self.replay, &self.theme),
            Route::Logs => logs::render(frame, chunks[1], &self.logs, &self.log_buffer, &self.theme),
        }

        self.render_status_bar(frame, chunks[2]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let routes = Route::all();
        let titles: Vec<Line> = routes
            .iter()
            .map(|r| {
                Line::from(vec![
                    Span::styled(format!("[{}] ", r.key()), self.theme.muted()),
                    Span::raw(r.name()),
                ])
            })
            .collect();

        let selected = routes.iter().position(|r| *r == self.route).unwrap_or(0);

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("simview"))
            .select(selected)
            .style(self.theme.tab_inactive())
            .highlight_style(self.theme.tab_active());

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let monitor = if self.monitor.is_stopped() {
            Span::styled("polling stopped", self.theme.muted())
        } else {
            Span::styled("polling", self.theme.success())
        };

        let text = Line::from(vec![
            Span::styled(format!("Run {}", self.run_id), self.theme.title()),
            Span::raw(" | "),
            monitor,
            Span::raw(" | "),
            Span::styled("q", self.theme.muted()),
            Span::raw(" quit | "),
            Span::styled("1-3", self.theme.muted()),
            Span::raw(" views | "),
            Span::styled("R", self.theme.muted()),
            Span::raw(" refresh | "),
            Span::styled("Enter", self.theme.muted()),
            Span::raw(" replay bot"),
        ]);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border());
        frame.render_widget(block, area);

        let inner = Rect {
            x: area.x + 2,
            y: area.y + 1,
            width: area.width.saturating_sub(4),
            height: 1,
        };
        frame.render_widget(text, inner);
    }
}

/// Run the TUI until the user quits.
pub async fn run_tui(context: TuiContext) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, context).await;

    // Restore the terminal even if the loop failed.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, context: TuiContext) -> io::Result<()> {
    let mut event_handler = EventHandler::new(Duration::from_millis(250));
    let mut app = App::new(context, event_handler.sender());

    loop {
        terminal.draw(|f| app.render(f))?;

        match event_handler.next().await {
            Some(event) => app.handle_event(event),
            None => break,
        }

        if app.should_quit() {
            break;
        }
    }
    Ok(())
}
