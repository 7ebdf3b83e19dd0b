//! Terminal UI for browsing a simulation run.

mod app;
mod events;
mod logs;
mod replay;
mod results;
mod state;
mod theme;

pub use app::{run_tui, App, TuiContext};
pub use replay::{visible_rows, ReplayRow, ReplayView};
pub use state::{LogBuffer, LogLevel, LogMakeWriter};
pub use theme::Theme;

/// Route/View enum for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Results,
    Replay,
    Logs,
}

impl Route {
    pub fn all() -> Vec<Self> {
        vec![Self::Results, Self::Replay, Self::Logs]
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Results => "Results",
            Self::Replay => "Replay",
            Self::Logs => "Logs",
        }
    }

    /// Number key that selects the route.
    pub fn key(&self) -> char {
        match self {
            Self::Results => '1',
            Self::Replay => '2',
            Self::Logs => '3',
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Results => Self::Replay,
            Self::Replay => Self::Logs,
            Self::Logs => Self::Results,
        }
    }
}
