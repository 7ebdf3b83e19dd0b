//! Open/closed state of the replay hierarchy.

use crate::types::TickKey;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Which days and which ticks are expanded in the replay view.
///
/// The two sets are independent: collapsing a day hides its ticks without
/// forgetting which of them were open, so reopening the day restores them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    open_days: HashSet<NaiveDate>,
    open_ticks: HashSet<TickKey>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a day and return whether it is now open.
    pub fn toggle_day(&mut self, date: NaiveDate) -> bool {
        if self.open_days.remove(&date) {
            false
        } else {
            self.open_days.insert(date);
            true
        }
    }

    /// Flip a tick and return whether it is now open.
    pub fn toggle_tick(&mut self, key: &TickKey) -> bool {
        if self.open_ticks.remove(key) {
            false
        } else {
            self.open_ticks.insert(key.clone());
            true
        }
    }

    pub fn is_day_open(&self, date: NaiveDate) -> bool {
        self.open_days.contains(&date)
    }

    pub fn is_tick_open(&self, key: &TickKey) -> bool {
        self.open_ticks.contains(key)
    }

    pub fn open_day_count(&self) -> usize {
        self.open_days.len()
    }

    pub fn open_tick_count(&self) -> usize {
        self.open_ticks.len()
    }

    pub fn collapse_all(&mut self) {
        self.open_days.clear();
        self.open_ticks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn t1() -> TickKey {
        TickKey("id:1".to_string())
    }

    #[test]
    fn test_toggle_day() {
        let mut state = ExpansionState::new();
        assert!(state.toggle_day(d1()));
        assert!(state.is_day_open(d1()));
        assert!(!state.toggle_day(d1()));
        assert!(!state.is_day_open(d1()));
    }

    #[test]
    fn test_tick_survives_day_collapse() {
        let mut state = ExpansionState::new();
        state.toggle_day(d1());
        state.toggle_tick(&t1());

        state.toggle_day(d1());
        assert!(!state.is_day_open(d1()));
        assert!(state.is_tick_open(&t1()));

        state.toggle_day(d1());
        assert!(state.is_day_open(d1()));
        assert!(state.is_tick_open(&t1()));
    }

    #[test]
    fn test_collapse_all() {
        let mut state = ExpansionState::new();
        state.toggle_day(d1());
        state.toggle_tick(&t1());
        assert_eq!((state.open_day_count(), state.open_tick_count()), (1, 1));

        state.collapse_all();
        assert_eq!(state, ExpansionState::default());
    }
}
