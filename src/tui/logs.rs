//! Logs view: tracing output captured while the TUI owns the terminal.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::state::{LogBuffer, LogLevel};
use super::Theme;

/// Filter and pause state of the Logs tab.
#[derive(Debug, Clone)]
pub struct LogsView {
    pub min_level: LogLevel,
    /// Lines frozen when output was paused.
    paused: Option<Vec<String>>,
}

impl Default for LogsView {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Trace,
            paused: None,
        }
    }
}

impl LogsView {
    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// Lines to show, newest last.
    pub fn lines(&self, buffer: &LogBuffer, limit: usize) -> Vec<String> {
        match &self.paused {
            Some(frozen) => frozen
                .iter()
                .filter(|l| LogLevel::from_line(l) >= self.min_level)
                .cloned()
                .collect(),
            None => buffer.recent(limit, self.min_level),
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent, buffer: &LogBuffer) {
        match key.code {
            KeyCode::Char('a') | KeyCode::Char('A') => self.min_level = LogLevel::Trace,
            KeyCode::Char('e') | KeyCode::Char('E') => self.min_level = LogLevel::Error,
            KeyCode::Char('w') | KeyCode::Char('W') => self.min_level = LogLevel::Warn,
            KeyCode::Char('i') | KeyCode::Char('I') => self.min_level = LogLevel::Info,
            KeyCode::Char('d') | KeyCode::Char('D') => self.min_level = LogLevel::Debug,
            KeyCode::Char('c') | KeyCode::Char('C') => {
                buffer.clear();
                if self.paused.is_some() {
                    self.paused = Some(Vec::new());
                }
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.paused = match self.paused {
                    Some(_) => None,
                    None => Some(buffer.recent(LOG_LINES, LogLevel::Trace)),
                };
            }
            _ => {}
        }
    }
}

const LOG_LINES: usize = 200;

/// Render the logs view.
pub fn render(frame: &mut Frame, area: Rect, view: &LogsView, buffer: &LogBuffer, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Controls
            Constraint::Min(0),    // Output
        ])
        .split(area);

    render_controls(frame, chunks[0], view, theme);
    render_output(frame, chunks[1], view, buffer, theme);
}

fn render_controls(frame: &mut Frame, area: Rect, view: &LogsView, theme: &Theme) {
    let text = vec![
        Line::from(vec![
            Span::styled("Level: ", theme.muted()),
            Span::styled("[A]", theme.info()),
            Span::raw(" All  "),
            Span::styled("[E]", theme.error()),
            Span::raw(" Error  "),
            Span::styled("[W]", theme.warning()),
            Span::raw(" Warn  "),
            Span::styled("[I]", theme.info()),
            Span::raw(" Info  "),
            Span::styled("[D]", theme.muted()),
            Span::raw(" Debug   "),
            Span::styled(format!("showing ≥ {}", view.min_level.label()), theme.header()),
        ]),
        Line::from(vec![
            Span::styled("Actions: ", theme.muted()),
            Span::styled("[C]", theme.info()),
            Span::raw(" Clear  "),
            Span::styled("[P]", theme.info()),
            Span::raw(if view.is_paused() { " Resume" } else { " Pause" }),
        ]),
    ];

    let block = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Log Controls")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn render_output(frame: &mut Frame, area: Rect, view: &LogsView, buffer: &LogBuffer, theme: &Theme) {
    let title = if view.is_paused() { "Logs (paused)" } else { "Logs (live)" };
    let lines = view.lines(buffer, LOG_LINES);

    if lines.is_empty() {
        let block = Paragraph::new(vec![Line::from(""), Line::from(Span::styled("No logs yet.", theme.muted()))])
            .block(Block::default().borders(Borders::ALL).title(title).border_style(theme.border()))
            .centered();
        frame.render_widget(block, area);
        return;
    }

    let items: Vec<ListItem> = lines
        .into_iter()
        .rev()
        .map(|line| {
            let style = match LogLevel::from_line(&line) {
                LogLevel::Error => theme.error(),
                LogLevel::Warn => theme.warning(),
                LogLevel::Info => theme.success(),
                LogLevel::Debug | LogLevel::Trace => theme.muted(),
            };
            ListItem::new(Line::from(Span::styled(line, style)))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(theme.border()),
    );
    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_level_keys() {
        let buffer = LogBuffer::new(10);
        buffer.push_line(" INFO hello".to_string());
        buffer.push_line("ERROR bad".to_string());

        let mut view = LogsView::default();
        assert_eq!(view.lines(&buffer, 10).len(), 2);

        view.handle_key(&press('e'), &buffer);
        assert_eq!(view.lines(&buffer, 10), vec!["ERROR bad"]);
    }

    #[test]
    fn test_pause_freezes_output() {
        let buffer = LogBuffer::new(10);
        buffer.push_line(" INFO one".to_string());

        let mut view = LogsView::default();
        view.handle_key(&press('p'), &buffer);
        buffer.push_line(" INFO two".to_string());
        assert_eq!(view.lines(&buffer, 10), vec![" INFO one"]);

        view.handle_key(&press('p'), &buffer);
        assert_eq!(view.lines(&buffer, 10).len(), 2);
    }
}
