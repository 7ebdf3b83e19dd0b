//! Loading runs, result rows and replays from the backend.
//!
//! Nothing here fails the caller for a recoverable backend problem: partial
//! collections come back with a [`Notice`] describing what went wrong.

use crate::config::{Config, Endpoints};
use crate::error::Result;
use crate::services::correlator::Replay;
use crate::services::paginator::{Collection, PageSource, Paginator};
use crate::types::{BotResultSummary, DayResult, Identifier, Notice, SimulationRun, TickRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the results view needs from one refresh.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    /// `None` when the run resource itself could not be loaded.
    pub run: Option<SimulationRun>,
    pub results: Collection<BotResultSummary>,
    pub notices: Vec<Notice>,
    pub fetched_at: DateTime<Utc>,
}

impl RunSnapshot {
    /// Whether the run has finished and no further refresh will change it.
    pub fn is_terminal(&self) -> bool {
        self.run.as_ref().map(SimulationRun::is_terminal).unwrap_or(false)
    }
}

/// A correlated replay for one bot configuration.
#[derive(Debug, Clone, Default)]
pub struct ReplayLoad {
    pub replay: Replay,
    pub notices: Vec<Notice>,
}

/// Backend-facing operations on simulation runs.
pub struct SimulationService<S: ?Sized> {
    source: Arc<S>,
    endpoints: Endpoints,
    max_pages: usize,
}

impl<S: ?Sized> Clone for SimulationService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            endpoints: self.endpoints.clone(),
            max_pages: self.max_pages,
        }
    }
}

impl<S: PageSource + ?Sized> SimulationService<S> {
    pub fn new(source: Arc<S>, config: &Config) -> Self {
        Self {
            source,
            endpoints: config.endpoints.clone(),
            max_pages: config.max_pages,
        }
    }

    pub fn with_endpoints(source: Arc<S>, endpoints: Endpoints, max_pages: usize) -> Self {
        Self {
            source,
            endpoints,
            max_pages,
        }
    }

    fn paginator(&self) -> Paginator<'_, S> {
        Paginator::new(self.source.as_ref(), self.max_pages)
    }

    /// Load the run resource.
    pub async fn run(&self, run_id: &Identifier) -> Result<SimulationRun> {
        let path = self.endpoints.run_path(run_id);
        let value = self.source.fetch_page(&path).await?;
        let run: SimulationRun = serde_json::from_value(value)?;
        debug!("Run {} is {} ({:.0}%)", run.id, run.status, run.progress_pct());
        Ok(run)
    }

    /// Load every bot result row of a run.
    pub async fn results(&self, run_id: &Identifier) -> Collection<BotResultSummary> {
        self.paginator()
            .fetch_all(&self.endpoints.results_path(run_id))
            .await
    }

    /// Load the per-day results of one bot configuration.
    pub async fn daily_results(&self, run_id: &Identifier, bot_config_id: &Identifier) -> Collection<DayResult> {
        self.paginator()
            .fetch_all(&self.endpoints.daily_results_path(run_id, bot_config_id))
            .await
    }

    /// Load the tick records of one bot configuration.
    pub async fn ticks(&self, run_id: &Identifier, bot_config_id: &Identifier) -> Collection<TickRecord> {
        self.paginator()
            .fetch_all(&self.endpoints.ticks_path(run_id, bot_config_id))
            .await
    }

    /// Load days and ticks for one bot configuration and correlate them.
    pub async fn replay(&self, run_id: &Identifier, bot_config_id: &Identifier) -> ReplayLoad {
        let days = self.daily_results(run_id, bot_config_id).await;
        let ticks = self.ticks(run_id, bot_config_id).await;

        let notices: Vec<Notice> = [days.notice("daily results"), ticks.notice("ticks")]
            .into_iter()
            .flatten()
            .collect();
        for notice in &notices {
            warn!("Replay of bot config {}: {}", bot_config_id, notice);
        }

        let replay = Replay::build(days.items, ticks.items);
        info!(
            "Replay for bot config {}: {} days, {} ticks",
            bot_config_id,
            replay.day_count(),
            replay.index().total_ticks()
        );

        ReplayLoad { replay, notices }
    }

    /// Load the run and its result rows.
    pub async fn snapshot(&self, run_id: &Identifier) -> RunSnapshot {
        let mut notices = Vec::new();

        let run = match self.run(run_id).await {
            Ok(run) => Some(run),
            Err(e) => {
                warn!("Failed to load run {}: {}", run_id, e);
                notices.push(Notice::error(format!("Failed to load run {}: {}", run_id, e)));
                None
            }
        };

        let results = self.results(run_id).await;
        notices.extend(results.notice("bot results"));

        RunSnapshot {
            run,
            results,
            notices,
            fetched_at: Utc::now(),
        }
    }
}
