//! simview - result aggregation and replay client for multi-bot trading
//! simulations.
//!
//! Fetches a run's per-bot results and each bot's day and tick trail from the
//! simulation backend, correlates them into a day → tick replay, and serves a
//! filterable, sortable view over the result rows.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod tui;
pub mod types;

pub use config::{Config, Endpoints};
pub use error::{AppError, FetchError, Result};
pub use services::{
    correlate, Collection, ExpansionState, Halt, PageSource, Paginator, Replay, ResultFilters, ResultTable,
    RunMonitor, SimulationService, SortDirection, SortField, SortSpec, TickIndex,
};
pub use sources::BackendClient;
pub use types::*;
