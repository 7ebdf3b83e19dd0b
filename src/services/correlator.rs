//! Day/tick correlation.
//!
//! Day results and tick records arrive as two flat collections that share
//! only the calendar date. [`correlate`] groups the ticks by date once per
//! refresh; [`Replay`] pairs each day with its group for display.

use crate::types::{DayResult, TickRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ticks grouped by calendar date.
///
/// Every distinct tick date has an entry, including dates without a matching
/// day result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickIndex {
    by_date: BTreeMap<NaiveDate, Vec<TickRecord>>,
}

impl TickIndex {
    /// Ticks on `date`; empty when none were recorded.
    pub fn ticks_for(&self, date: NaiveDate) -> &[TickRecord] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// All dates that have at least one tick, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.by_date.keys().copied()
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    pub fn total_ticks(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    /// Ticks on `date` that executed a trade.
    pub fn trades_executed(&self, date: NaiveDate) -> usize {
        self.ticks_for(date).iter().filter(|t| t.executed()).count()
    }

    /// Tick dates that no day result covers.
    pub fn orphan_dates(&self, days: &[DayResult]) -> Vec<NaiveDate> {
        let known: BTreeSet<NaiveDate> = days.iter().map(|d| d.date).collect();
        self.dates().filter(|d| !known.contains(d)).collect()
    }
}

/// Group `ticks` by date.
///
/// Within a date ticks keep arrival order, unless every tick on that date has
/// a parseable timestamp, in which case they are stably sorted by it.
pub fn correlate(ticks: Vec<TickRecord>, days: &[DayResult]) -> TickIndex {
    let mut by_date: BTreeMap<NaiveDate, Vec<TickRecord>> = BTreeMap::new();
    for tick in ticks {
        by_date.entry(tick.date).or_default().push(tick);
    }

    for group in by_date.values_mut() {
        order_chronologically(group);
    }

    let index = TickIndex { by_date };
    let orphans = index.orphan_dates(days);
    if !orphans.is_empty() {
        debug!(
            "{} tick dates have no day result: {:?}",
            orphans.len(),
            orphans
        );
    }
    index
}

fn order_chronologically(group: &mut [TickRecord]) {
    let stamps: Option<Vec<_>> = group.iter().map(|t| t.parsed_timestamp()).collect();
    let Some(stamps) = stamps else {
        return;
    };
    if stamps.windows(2).all(|w| w[0] <= w[1]) {
        return;
    }

    let mut keyed: Vec<_> = stamps.into_iter().zip(group.iter().cloned()).collect();
    keyed.sort_by_key(|(stamp, _)| *stamp);
    for (slot, (_, tick)) in group.iter_mut().zip(keyed) {
        *slot = tick;
    }
}

/// One day of a replay together with its ticks.
#[derive(Debug, Clone, Copy)]
pub struct ReplayDay<'a> {
    pub day: &'a DayResult,
    pub ticks: &'a [TickRecord],
}

impl<'a> ReplayDay<'a> {
    pub fn date(&self) -> NaiveDate {
        self.day.date
    }

    pub fn tick_count(&self) -> usize {
        self.ticks.len()
    }

    pub fn trades_executed(&self) -> usize {
        self.ticks.iter().filter(|t| t.executed()).count()
    }

    /// Running profit after the last tick of the day.
    pub fn closing_cumulative_profit(&self) -> Option<f64> {
        self.ticks.last().and_then(|t| t.cumulative_profit.value())
    }
}

/// Navigable day → tick hierarchy for one bot configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    days: Vec<DayResult>,
    index: TickIndex,
}

impl Replay {
    /// Correlate freshly fetched collections. Days keep the order they were
    /// fetched in.
    pub fn build(days: Vec<DayResult>, ticks: Vec<TickRecord>) -> Self {
        let index = correlate(ticks, &days);
        Self { days, index }
    }

    pub fn days(&self) -> impl Iterator<Item = ReplayDay<'_>> {
        self.days.iter().map(|day| ReplayDay {
            day,
            ticks: self.index.ticks_for(day.date),
        })
    }

    pub fn day(&self, date: NaiveDate) -> Option<ReplayDay<'_>> {
        self.days().find(|d| d.date() == date)
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn index(&self) -> &TickIndex {
        &self.index
    }

    /// Tick dates with no day row to surface them.
    pub fn orphan_dates(&self) -> Vec<NaiveDate> {
        self.index.orphan_dates(&self.days)
    }
}
