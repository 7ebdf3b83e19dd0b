//! Replay view: days of one bot configuration with expandable ticks.

use crate::services::{ExpansionState, Replay, ReplayDay, ReplayLoad};
use crate::types::{Identifier, TickRecord};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::Theme;

/// One line group in the flattened replay hierarchy.
#[derive(Debug, Clone, Copy)]
pub enum ReplayRow<'a> {
    Day { day: ReplayDay<'a>, open: bool },
    /// `position` is the tick's index within its day.
    Tick {
        tick: &'a TickRecord,
        position: usize,
        open: bool,
    },
}

/// Flatten the hierarchy into display rows: every day, followed by its ticks
/// when the day is open.
pub fn visible_rows<'a>(replay: &'a Replay, expansion: &ExpansionState) -> Vec<ReplayRow<'a>> {
    let mut rows = Vec::new();
    for day in replay.days() {
        let open = expansion.is_day_open(day.date());
        rows.push(ReplayRow::Day { day, open });
        if open {
            rows.extend(day.ticks.iter().enumerate().map(|(position, tick)| ReplayRow::Tick {
                tick,
                position,
                open: expansion.is_tick_open(&tick.key(position)),
            }));
        }
    }
    rows
}

/// State of the Replay tab.
#[derive(Debug, Default)]
pub struct ReplayView {
    bot_config_id: Option<Identifier>,
    load: Option<ReplayLoad>,
    loading: bool,
    expansion: ExpansionState,
    cursor: usize,
    seq: u64,
}

impl ReplayView {
    /// Start loading a new bot configuration; returns the request number the
    /// result must carry to be accepted.
    pub fn begin(&mut self, bot_config_id: Identifier) -> u64 {
        self.seq += 1;
        self.bot_config_id = Some(bot_config_id);
        self.load = None;
        self.loading = true;
        self.expansion.collapse_all();
        self.cursor = 0;
        self.seq
    }

    /// Reload the current bot configuration, keeping the open days and ticks
    /// and the rows on screen until the new load lands. Returns the request
    /// number and the bot to load, or `None` when no bot is selected.
    pub fn refresh(&mut self) -> Option<(u64, Identifier)> {
        let bot_config_id = self.bot_config_id.clone()?;
        self.seq += 1;
        if self.load.is_none() {
            self.loading = true;
        }
        Some((self.seq, bot_config_id))
    }

    /// Accept a finished load unless a newer request superseded it.
    pub fn finish(&mut self, seq: u64, bot_config_id: Identifier, load: ReplayLoad) -> bool {
        if seq != self.seq || self.bot_config_id.as_ref() != Some(&bot_config_id) {
            return false;
        }
        self.load = Some(load);
        self.loading = false;
        self.cursor = self.cursor.min(self.rows().len().saturating_sub(1));
        true
    }

    pub fn bot_config_id(&self) -> Option<&Identifier> {
        self.bot_config_id.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load(&self) -> Option<&ReplayLoad> {
        self.load.as_ref()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn rows(&self) -> Vec<ReplayRow<'_>> {
        match &self.load {
            Some(load) => visible_rows(&load.replay, &self.expansion),
            None => Vec::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    /// Open or close the row under the cursor.
    pub fn toggle_selected(&mut self) {
        let target = match self.rows().get(self.cursor) {
            Some(ReplayRow::Day { day, .. }) => Toggle::Day(day.date()),
            Some(ReplayRow::Tick { tick, position, .. }) => Toggle::Tick(tick.key(*position)),
            None => return,
        };
        match target {
            Toggle::Day(date) => {
                self.expansion.toggle_day(date);
            }
            Toggle::Tick(key) => {
                self.expansion.toggle_tick(&key);
            }
        }
        let len = self.rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
        self.cursor = self.cursor.min(self.rows().len().saturating_sub(1));
    }

    /// Keys handled by the Replay tab.
    pub fn handle_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::PageUp => self.move_cursor(-10),
            KeyCode::PageDown => self.move_cursor(10),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Char('c') => self.collapse_all(),
            _ => {}
        }
    }
}

enum Toggle {
    Day(chrono::NaiveDate),
    Tick(crate::types::TickKey),
}

/// Render the replay view.
pub fn render(frame: &mut Frame, area: Rect, view: &ReplayView, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    render_summary(frame, chunks[0], view, theme);

    let Some(load) = view.load() else {
        let message = if view.is_loading() {
            "Loading replay..."
        } else {
            "Select a bot on the Results tab and press Enter."
        };
        let block = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(message, theme.muted()))])
            .block(Block::default().borders(Borders::ALL).title("Days").border_style(theme.border()))
            .centered();
        frame.render_widget(block, chunks[1]);
        return;
    };

    if load.replay.day_count() == 0 {
        let block = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No daily results for this bot.", theme.muted())),
        ])
        .block(Block::default().borders(Borders::ALL).title("Days").border_style(theme.border()))
        .centered();
        frame.render_widget(block, chunks[1]);
        return;
    }

    let items: Vec<ListItem> = view
        .rows()
        .iter()
        .map(|row| match row {
            ReplayRow::Day { day, open } => day_item(day, *open, theme),
            ReplayRow::Tick { tick, open, .. } => tick_item(tick, *open, theme),
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Days (Enter: expand, c: collapse all)")
                .border_style(theme.border()),
        )
        .highlight_style(theme.selected());

    let mut state = ListState::default().with_selected(Some(view.cursor()));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_summary(frame: &mut Frame, area: Rect, view: &ReplayView, theme: &Theme) {
    let bot = view
        .bot_config_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![Line::from(vec![
        Span::styled("Bot config: ", theme.muted()),
        Span::styled(bot, theme.title()),
    ])];

    if let Some(load) = view.load() {
        let index = load.replay.index();
        let orphans = load.replay.orphan_dates().len();
        let mut stats = vec![
            Span::styled("Days: ", theme.muted()),
            Span::raw(load.replay.day_count().to_string()),
            Span::styled("  Ticks: ", theme.muted()),
            Span::raw(index.total_ticks().to_string()),
        ];
        if orphans > 0 {
            stats.push(Span::styled(
                format!("  {} tick dates without a day result", orphans),
                theme.warning(),
            ));
        }
        lines.push(Line::from(stats));

        if let Some(notice) = load.notices.first() {
            lines.push(Line::from(Span::styled(notice.message.clone(), theme.notice(notice.level))));
        }
    }

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::TOP)
            .title("Replay")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn marker(open: bool) -> &'static str {
    if open {
        "▾"
    } else {
        "▸"
    }
}

fn day_item<'a>(day: &ReplayDay<'_>, open: bool, theme: &Theme) -> ListItem<'a> {
    let metrics = &day.day.performance_metrics;
    let profit = metrics.daily_profit.value();

    let mut spans = vec![
        Span::raw(format!("{} {}  ", marker(open), day.date())),
        Span::styled("P/L ", theme.muted()),
        Span::styled(format!("{:>10.2}", metrics.daily_profit), theme.profit(profit)),
        Span::styled("  value ", theme.muted()),
        Span::raw(format!("{:.2}", metrics.total_value)),
        Span::styled("  ticks ", theme.muted()),
        Span::raw(day.tick_count().to_string()),
        Span::styled("  trades ", theme.muted()),
        Span::raw(day.trades_executed().to_string()),
    ];
    if let Some(ref phase) = metrics.phase {
        spans.push(Span::styled(format!("  [{}]", phase), theme.info()));
    }

    let mut lines = vec![Line::from(spans)];
    if open && !day.day.decisions.is_empty() {
        let decisions: Vec<Span> = day
            .day
            .decisions
            .iter()
            .flat_map(|(symbol, decision)| {
                let action = decision.action_label();
                vec![
                    Span::styled(format!("{} ", symbol), theme.muted()),
                    Span::styled(format!("{}  ", action), theme.action(&action)),
                ]
            })
            .collect();
        let mut line = vec![Span::raw("    ")];
        line.extend(decisions);
        lines.push(Line::from(line));
    }
    ListItem::new(lines)
}

fn tick_item<'a>(tick: &TickRecord, open: bool, theme: &Theme) -> ListItem<'a> {
    let action = tick.decision.action_label();
    let time = tick
        .parsed_timestamp()
        .map(|t| t.format("%H:%M:%S").to_string())
        .or_else(|| tick.timestamp.clone())
        .unwrap_or_else(|| "--:--:--".to_string());

    let mut header = vec![
        Span::raw(format!("    {} {}  ", marker(open), time)),
        Span::raw(format!("{:<6}", tick.symbol.as_deref().unwrap_or("?"))),
        Span::raw(format!(" {:>10.2}  ", tick.price)),
        Span::styled(format!("{:<4}", action), theme.action(&action)),
        Span::styled("  cum ", theme.muted()),
        Span::styled(
            format!("{:.2}", tick.cumulative_profit),
            theme.profit(tick.cumulative_profit.value()),
        ),
    ];
    if tick.executed() {
        header.push(Span::styled("  ● filled", theme.success()));
    }

    let mut lines = vec![Line::from(header)];
    if open {
        lines.extend(tick_detail_lines(tick, theme));
    }
    ListItem::new(lines)
}

fn tick_detail_lines<'a>(tick: &TickRecord, theme: &Theme) -> Vec<Line<'a>> {
    let indent = "        ";
    let decision = &tick.decision;
    let signals = &tick.signal_contributions;
    let portfolio = &tick.portfolio_state;

    let mut lines = vec![Line::from(vec![
        Span::raw(indent),
        Span::styled("confidence ", theme.muted()),
        Span::raw(format!("{:.2}", decision.confidence)),
        Span::styled("  risk ", theme.muted()),
        Span::raw(
            decision
                .risk_score
                .as_ref()
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| "-".to_string()),
        ),
        Span::styled("  reason ", theme.muted()),
        Span::raw(decision.reason.clone().unwrap_or_default()),
    ])];

    let mut signal_line = vec![
        Span::raw(indent),
        Span::styled("signals ", theme.muted()),
        Span::raw(format!(
            "{} indicator / {} pattern / {} ml",
            signals.indicator_signals.len(),
            signals.pattern_signals.len(),
            signals.ml_signals.len()
        )),
        Span::styled("  aggregated ", theme.muted()),
        Span::raw(format!("{:.2}", signals.aggregated_confidence)),
    ];
    if let Some((action, score)) = signals.strongest_action() {
        signal_line.push(Span::styled("  strongest ", theme.muted()));
        signal_line.push(Span::raw(format!("{} {:.2}", action.to_uppercase(), score)));
    }
    lines.push(Line::from(signal_line));

    lines.push(Line::from(vec![
        Span::raw(indent),
        Span::styled("cash ", theme.muted()),
        Span::raw(format!("{:.2}", portfolio.cash)),
        Span::styled("  positions ", theme.muted()),
        Span::raw(format!("{:.2}", portfolio.portfolio_value)),
        Span::styled("  total ", theme.muted()),
        Span::raw(format!("{:.2}", portfolio.total_value)),
    ]));

    if let Some(ref trade) = tick.trade_details {
        lines.push(Line::from(vec![
            Span::raw(indent),
            Span::styled("trade ", theme.muted()),
            Span::raw(format!(
                "{} {} @ {:.2} (cost {:.2})",
                trade.action.as_deref().unwrap_or("?").to_uppercase(),
                trade.quantity,
                trade.price,
                trade.cost
            )),
        ]));
    }
    lines
}
