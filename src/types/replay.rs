//! Day-by-day and tick-by-tick execution trail of one bot configuration.

use super::scalar::{deserialize_date_key, Identifier, Metric};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Day Results
// =============================================================================

/// A bot's decision for one symbol, either per day or per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub confidence: Metric,
    #[serde(default)]
    pub risk_score: Option<Metric>,
}

impl Decision {
    /// Upper-cased action, `HOLD` when absent.
    pub fn action_label(&self) -> String {
        self.action
            .as_deref()
            .map(|a| a.to_uppercase())
            .unwrap_or_else(|| "HOLD".to_string())
    }
}

/// End-of-day performance figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayMetrics {
    #[serde(default)]
    pub daily_profit: Metric,
    #[serde(default)]
    pub cash: Metric,
    #[serde(default)]
    pub portfolio_value: Metric,
    #[serde(default)]
    pub total_value: Metric,
    #[serde(default)]
    pub trade_count: Metric,
    /// Simulation phase for the day, e.g. `training` or `trading`.
    #[serde(default)]
    pub phase: Option<String>,
}

/// One simulated trading day for a bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayResult {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(deserialize_with = "deserialize_date_key")]
    pub date: NaiveDate,
    /// Decision per stock symbol.
    #[serde(default)]
    pub decisions: BTreeMap<String, Decision>,
    #[serde(default)]
    pub performance_metrics: DayMetrics,
}

// =============================================================================
// Tick Records
// =============================================================================

/// Breakdown of the signals feeding a tick decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalContributions {
    #[serde(default, alias = "indicators")]
    pub indicator_signals: BTreeMap<String, serde_json::Value>,
    #[serde(default, alias = "patterns")]
    pub pattern_signals: BTreeMap<String, serde_json::Value>,
    #[serde(default, alias = "ml")]
    pub ml_signals: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub aggregated_confidence: Metric,
    /// Score per candidate action (`buy`, `sell`, `hold`).
    #[serde(default, alias = "scores")]
    pub action_scores: BTreeMap<String, Metric>,
}

impl SignalContributions {
    /// Action with the highest score, if any were reported.
    pub fn strongest_action(&self) -> Option<(&str, f64)> {
        self.action_scores
            .iter()
            .map(|(action, score)| (action.as_str(), score.coerce()))
            .fold(None, |best, (action, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((action, score)),
            })
    }

    pub fn source_count(&self) -> usize {
        self.indicator_signals.len() + self.pattern_signals.len() + self.ml_signals.len()
    }
}

/// Portfolio state right after a tick was processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    #[serde(default)]
    pub cash: Metric,
    #[serde(default)]
    pub portfolio_value: Metric,
    #[serde(default)]
    pub total_value: Metric,
    #[serde(default)]
    pub positions: Option<BTreeMap<String, serde_json::Value>>,
}

/// Fill details of an executed trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeDetails {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub quantity: Metric,
    #[serde(default)]
    pub price: Metric,
    #[serde(default)]
    pub cost: Metric,
}

/// One price update processed by a bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    #[serde(default)]
    pub id: Option<Identifier>,
    #[serde(deserialize_with = "deserialize_date_key")]
    pub date: NaiveDate,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "stock_symbol")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub price: Metric,
    #[serde(default)]
    pub decision: Decision,
    #[serde(default)]
    pub signal_contributions: SignalContributions,
    #[serde(default)]
    pub portfolio_state: PortfolioSnapshot,
    #[serde(default)]
    pub trade_executed: Option<bool>,
    #[serde(default)]
    pub trade_details: Option<TradeDetails>,
    #[serde(default)]
    pub cumulative_profit: Metric,
}

impl TickRecord {
    /// Whether this tick resulted in a fill; `null` counts as no.
    pub fn executed(&self) -> bool {
        self.trade_executed.unwrap_or(false)
    }

    /// Timestamp as a naive UTC instant, accepting RFC 3339 or offset-less forms.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    /// Key identifying this tick in expansion state. `position` is the
    /// tick's index within its day and only matters for ticks without an id.
    pub fn key(&self, position: usize) -> TickKey {
        match &self.id {
            Some(id) => TickKey(format!("id:{}", id)),
            None => TickKey(format!(
                "{}/{}@{}#{}",
                self.date,
                position,
                self.timestamp.as_deref().unwrap_or(""),
                self.symbol.as_deref().unwrap_or("")
            )),
        }
    }
}

/// Stable identity of a tick record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickKey(pub String);

impl fmt::Display for TickKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tick_json() -> serde_json::Value {
        json!({
            "id": 901,
            "date": "2024-01-02",
            "timestamp": "2024-01-02T14:31:05Z",
            "stock_symbol": "AAPL",
            "price": "185.64",
            "decision": {"action": "buy", "reason": "rsi oversold", "confidence": 0.72, "risk_score": 0.3},
            "signal_contributions": {
                "indicators": {"rsi": {"signal": "buy", "confidence": 0.8}},
                "patterns": {},
                "ml_signals": {"lstm": 0.61},
                "aggregated_confidence": 0.7,
                "action_scores": {"buy": 0.7, "sell": 0.1, "hold": 0.2}
            },
            "portfolio_state": {"cash": 9000, "portfolio_value": 1000, "total_value": 10000},
            "trade_executed": true,
            "trade_details": {"action": "buy", "quantity": 5, "price": 185.64, "cost": 928.2},
            "cumulative_profit": -1.25
        })
    }

    #[test]
    fn test_day_result_deserialization() {
        let day: DayResult = serde_json::from_value(json!({
            "id": 1,
            "date": "2024-01-02",
            "decisions": {"AAPL": {"action": "buy", "confidence": "0.8"}},
            "performance_metrics": {"daily_profit": 12.5, "trade_count": 3, "phase": "trading"}
        }))
        .unwrap();

        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(day.decisions["AAPL"].action_label(), "BUY");
        assert_eq!(day.performance_metrics.trade_count.coerce(), 3.0);
        assert_eq!(day.performance_metrics.phase.as_deref(), Some("trading"));
    }

    #[test]
    fn test_day_result_accepts_timestamp_date() {
        let day: DayResult =
            serde_json::from_value(json!({"date": "2024-01-03T00:00:00Z"})).unwrap();
        assert_eq!(day.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!(day.decisions.is_empty());
    }

    #[test]
    fn test_day_result_rejects_bad_date() {
        let result: Result<DayResult, _> = serde_json::from_value(json!({"date": "soon"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_tick_record_deserialization() {
        let tick: TickRecord = serde_json::from_value(tick_json()).unwrap();

        assert_eq!(tick.symbol.as_deref(), Some("AAPL"));
        assert_eq!(tick.price.coerce(), 185.64);
        assert!(tick.executed());
        assert_eq!(tick.decision.risk_score.as_ref().unwrap().coerce(), 0.3);
        assert_eq!(tick.signal_contributions.source_count(), 2);
        assert_eq!(tick.signal_contributions.strongest_action(), Some(("buy", 0.7)));
        assert_eq!(tick.trade_details.as_ref().unwrap().quantity.coerce(), 5.0);
        assert_eq!(tick.cumulative_profit.coerce(), -1.25);
    }

    #[test]
    fn test_tick_minimal_fields() {
        let tick: TickRecord = serde_json::from_value(json!({
            "date": "2024-01-02",
            "trade_executed": null
        }))
        .unwrap();
        assert!(!tick.executed());
        assert!(tick.parsed_timestamp().is_none());
        assert_eq!(tick.decision.action_label(), "HOLD");
        assert!(tick.signal_contributions.strongest_action().is_none());
    }

    #[test]
    fn test_parsed_timestamp_forms() {
        let mut tick: TickRecord = serde_json::from_value(tick_json()).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(14, 31, 5)
            .unwrap();
        assert_eq!(tick.parsed_timestamp(), Some(expected));

        tick.timestamp = Some("2024-01-02T09:31:05-05:00".into());
        assert_eq!(tick.parsed_timestamp(), Some(expected));

        tick.timestamp = Some("2024-01-02 14:31:05".into());
        assert_eq!(tick.parsed_timestamp(), Some(expected));
    }

    #[test]
    fn test_tick_key() {
        let mut tick: TickRecord = serde_json::from_value(tick_json()).unwrap();
        assert_eq!(tick.key(0), TickKey("id:901".into()));
        assert_eq!(tick.key(3), TickKey("id:901".into()));

        tick.id = None;
        assert_eq!(
            tick.key(2).to_string(),
            "2024-01-02/2/2024-01-02T14:31:05Z#AAPL"
        );
    }

    #[test]
    fn test_tick_key_without_id_is_positional() {
        let mut tick: TickRecord = serde_json::from_value(tick_json()).unwrap();
        tick.id = None;
        let twin = tick.clone();

        assert_ne!(tick.key(0), twin.key(1));
        assert_eq!(tick.key(1), twin.key(1));
    }
}
