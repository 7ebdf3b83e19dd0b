//! Simulation run and per-bot result summary types.

use super::scalar::{Identifier, Metric};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Simulation Run
// =============================================================================

/// Lifecycle status of a simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    /// A status this client does not know about; treated as still active.
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run will not change any more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One backtest submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub id: Identifier,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub progress: Metric,
    #[serde(default)]
    pub total_bots: Metric,
    #[serde(default)]
    pub completed_bots: Metric,
    /// Grid-search axes, keyed by parameter name.
    #[serde(default)]
    pub config_ranges: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub execution_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub execution_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SimulationRun {
    /// Progress clamped to `0..=100`.
    pub fn progress_pct(&self) -> f64 {
        self.progress.coerce().clamp(0.0, 100.0)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `completed/total` bot counts for display.
    pub fn bot_counts(&self) -> (u64, u64) {
        let completed = self.completed_bots.coerce().max(0.0) as u64;
        let total = self.total_bots.coerce().max(0.0) as u64;
        (completed, total)
    }
}

// =============================================================================
// Bot Result Summary
// =============================================================================

/// Nested bot configuration attached to a result row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotConfigRef {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub bot_index: Metric,
    /// Remaining parameters of the grid point.
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// How a result row links to its bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BotConfigLink {
    Nested(BotConfigRef),
    Id(Identifier),
}

/// Aggregate metrics for one bot configuration within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotResultSummary {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(default)]
    pub bot_config: Option<BotConfigLink>,
    #[serde(default)]
    pub total_profit: Metric,
    #[serde(default)]
    pub win_rate: Metric,
    #[serde(default)]
    pub total_trades: Metric,
    #[serde(default)]
    pub winning_trades: Metric,
    #[serde(default)]
    pub losing_trades: Metric,
    #[serde(default)]
    pub average_profit: Metric,
    #[serde(default)]
    pub average_loss: Metric,
    #[serde(default)]
    pub sharpe_ratio: Metric,
    #[serde(default)]
    pub max_drawdown: Metric,
    #[serde(default)]
    pub final_cash: Metric,
    #[serde(default)]
    pub final_portfolio_value: Metric,
}

static MISSING: Metric = Metric::Missing;

impl BotResultSummary {
    /// Bot index taken from the nested configuration.
    pub fn bot_index(&self) -> &Metric {
        match &self.bot_config {
            Some(BotConfigLink::Nested(cfg)) => &cfg.bot_index,
            _ => &MISSING,
        }
    }

    /// Identifier of the bot configuration, used to request its replay.
    pub fn bot_config_id(&self) -> Option<&Identifier> {
        match &self.bot_config {
            Some(BotConfigLink::Nested(cfg)) => cfg.id.as_ref(),
            Some(BotConfigLink::Id(id)) => Some(id),
            None => None,
        }
    }

    /// Grid parameters of the configuration, if nested.
    pub fn params(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        match &self.bot_config {
            Some(BotConfigLink::Nested(cfg)) => Some(&cfg.params),
            _ => None,
        }
    }
}
