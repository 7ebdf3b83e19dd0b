//! Colors and styles for the TUI.

use crate::types::NoticeLevel;
use ratatui::style::{Color, Modifier, Style};

/// Shared color scheme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub gain: Color,
    pub loss: Color,
    pub warning: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Magenta,
            gain: Color::Green,
            loss: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            muted: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.gain)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.loss)
    }

    pub fn info(&self) -> Style {
        Style::default().fg(self.info)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Green for gains, red for losses, muted for zero or missing.
    pub fn profit(&self, value: Option<f64>) -> Style {
        match value {
            Some(v) if v > 0.0 => self.success(),
            Some(v) if v < 0.0 => self.error(),
            _ => self.muted(),
        }
    }

    /// Style for a BUY/SELL/HOLD decision label.
    pub fn action(&self, action: &str) -> Style {
        match action {
            "BUY" => self.success(),
            "SELL" => self.error(),
            _ => self.muted(),
        }
    }

    pub fn notice(&self, level: NoticeLevel) -> Style {
        match level {
            NoticeLevel::Info => self.info(),
            NoticeLevel::Warning => self.warning(),
            NoticeLevel::Error => self.error(),
        }
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn tab_active(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn tab_inactive(&self) -> Style {
        Style::default().fg(self.muted)
    }
}
