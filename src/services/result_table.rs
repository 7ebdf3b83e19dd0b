//! Filter/sort engine over bot result rows.
//!
//! [`ResultTable`] owns the fetched rows and the current controls and keeps a
//! derived view (row positions in display order) in sync with them: every
//! setter recomputes the view before returning. The source rows are never
//! reordered or modified.
//!
//! All numeric comparisons go through [`Metric::coerce`], so missing, `null`
//! and unparseable values count as `0.0` for both filtering and sorting.

use crate::types::{BotResultSummary, Metric};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// =============================================================================
// Sort spec
// =============================================================================

/// Sortable column of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Synthetic field taken from the nested bot configuration.
    BotIndex,
    Id,
    TotalProfit,
    WinRate,
    TotalTrades,
    WinningTrades,
    LosingTrades,
    AverageProfit,
    AverageLoss,
    SharpeRatio,
    MaxDrawdown,
    FinalCash,
    FinalPortfolioValue,
}

impl SortField {
    pub const ALL: [SortField; 13] = [
        SortField::BotIndex,
        SortField::Id,
        SortField::TotalProfit,
        SortField::WinRate,
        SortField::TotalTrades,
        SortField::WinningTrades,
        SortField::LosingTrades,
        SortField::AverageProfit,
        SortField::AverageLoss,
        SortField::SharpeRatio,
        SortField::MaxDrawdown,
        SortField::FinalCash,
        SortField::FinalPortfolioValue,
    ];

    /// Column heading.
    pub fn label(&self) -> &'static str {
        match self {
            SortField::BotIndex => "Bot",
            SortField::Id => "ID",
            SortField::TotalProfit => "Profit",
            SortField::WinRate => "Win %",
            SortField::TotalTrades => "Trades",
            SortField::WinningTrades => "Wins",
            SortField::LosingTrades => "Losses",
            SortField::AverageProfit => "Avg Win",
            SortField::AverageLoss => "Avg Loss",
            SortField::SharpeRatio => "Sharpe",
            SortField::MaxDrawdown => "Max DD",
            SortField::FinalCash => "Cash",
            SortField::FinalPortfolioValue => "Final Value",
        }
    }

    /// The field after this one, wrapping around.
    pub fn next(&self) -> SortField {
        let pos = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Coerced sort key of `row` for this field.
    pub fn key(&self, row: &BotResultSummary) -> f64 {
        match self {
            SortField::Id => row.id.as_ref().map(|id| id.coerce()).unwrap_or(0.0),
            other => other.metric(row).map(Metric::coerce).unwrap_or(0.0),
        }
    }

    /// Raw metric behind this field, for display.
    pub fn metric<'a>(&self, row: &'a BotResultSummary) -> Option<&'a Metric> {
        Some(match self {
            SortField::BotIndex => row.bot_index(),
            SortField::Id => return None,
            SortField::TotalProfit => &row.total_profit,
            SortField::WinRate => &row.win_rate,
            SortField::TotalTrades => &row.total_trades,
            SortField::WinningTrades => &row.winning_trades,
            SortField::LosingTrades => &row.losing_trades,
            SortField::AverageProfit => &row.average_profit,
            SortField::AverageLoss => &row.average_loss,
            SortField::SharpeRatio => &row.sharpe_ratio,
            SortField::MaxDrawdown => &row.max_drawdown,
            SortField::FinalCash => &row.final_cash,
            SortField::FinalPortfolioValue => &row.final_portfolio_value,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Asc => "▲",
            SortDirection::Desc => "▼",
        }
    }
}

/// The single active sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::TotalProfit,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    fn compare(&self, a: &BotResultSummary, b: &BotResultSummary) -> Ordering {
        let (ka, kb) = (self.field.key(a), self.field.key(b));
        match self.direction {
            SortDirection::Asc => ka.total_cmp(&kb),
            SortDirection::Desc => kb.total_cmp(&ka),
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Inclusive numeric range; an unset bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min.unwrap_or(f64::NEG_INFINITY) && value <= self.max.unwrap_or(f64::INFINITY)
    }
}

/// Conjunction of row predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultFilters {
    pub profit: NumericRange,
    pub win_rate: NumericRange,
    pub trade_count: NumericRange,
    /// Case-insensitive substring of the bot index.
    pub query: String,
}

impl ResultFilters {
    pub fn is_active(&self) -> bool {
        self.profit.is_active()
            || self.win_rate.is_active()
            || self.trade_count.is_active()
            || !self.query.trim().is_empty()
    }

    pub fn matches(&self, row: &BotResultSummary) -> bool {
        self.profit.contains(row.total_profit.coerce())
            && self.win_rate.contains(row.win_rate.coerce())
            && self.trade_count.contains(row.total_trades.coerce())
            && self.matches_query(row)
    }

    fn matches_query(&self, row: &BotResultSummary) -> bool {
        let query = self.query.trim();
        if query.is_empty() {
            return true;
        }
        row.bot_index()
            .to_plain_string()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

/// Positions of the rows that pass `filters`, ordered by `sort`.
///
/// The sort is stable, so rows with equal keys keep their source order in
/// either direction.
pub fn derive_view(rows: &[BotResultSummary], filters: &ResultFilters, sort: &SortSpec) -> Vec<usize> {
    let mut view: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| filters.matches(row))
        .map(|(pos, _)| pos)
        .collect();
    view.sort_by(|&a, &b| sort.compare(&rows[a], &rows[b]));
    view
}

// =============================================================================
// Result table
// =============================================================================

/// Bot result rows plus the controls that derive their visible order.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: Vec<BotResultSummary>,
    filters: ResultFilters,
    sort: SortSpec,
    view: Vec<usize>,
}

impl ResultTable {
    pub fn new(rows: Vec<BotResultSummary>) -> Self {
        let mut table = Self {
            rows,
            ..Self::default()
        };
        table.recompute();
        table
    }

    /// Replace the source rows, e.g. after a refresh.
    pub fn set_rows(&mut self, rows: Vec<BotResultSummary>) {
        self.rows = rows;
        self.recompute();
    }

    pub fn set_filters(&mut self, filters: ResultFilters) {
        self.filters = filters;
        self.recompute();
    }

    /// Edit the filters in place.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut ResultFilters)) {
        edit(&mut self.filters);
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.set_filters(ResultFilters::default());
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.recompute();
    }

    /// Column-header behaviour: flip the direction of the active field, or
    /// switch to a new field sorted descending.
    pub fn toggle_sort(&mut self, field: SortField) {
        let sort = if self.sort.field == field {
            SortSpec::new(field, self.sort.direction.flipped())
        } else {
            SortSpec::new(field, SortDirection::Desc)
        };
        self.set_sort(sort);
    }

    pub fn rows(&self) -> &[BotResultSummary] {
        &self.rows
    }

    pub fn filters(&self) -> &ResultFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    /// Rows passing the filters, in display order.
    pub fn visible(&self) -> impl Iterator<Item = &BotResultSummary> + '_ {
        self.view.iter().map(move |&pos| &self.rows[pos])
    }

    /// Visible row at display position `pos`.
    pub fn get(&self, pos: usize) -> Option<&BotResultSummary> {
        self.view.get(pos).map(|&i| &self.rows[i])
    }

    /// `(matching, total)` row counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.view.len(), self.rows.len())
    }

    /// "N of M" for display.
    pub fn count_label(&self) -> String {
        let (matching, total) = self.counts();
        format!("{} of {}", matching, total)
    }

    fn recompute(&mut self) {
        self.view = derive_view(&self.rows, &self.filters, &self.sort);
    }
}
