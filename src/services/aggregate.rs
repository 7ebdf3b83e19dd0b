//! Run-level statistics over bot result rows.

use crate::types::BotResultSummary;
use serde::Serialize;

/// Headline figures for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunAggregate {
    pub bots: usize,
    /// Bots with a total profit above zero.
    pub profitable: usize,
    pub mean_profit: f64,
    pub mean_win_rate: f64,
    /// Position of the most profitable row in the input.
    pub best: Option<usize>,
    /// Position of the least profitable row in the input.
    pub worst: Option<usize>,
}

impl RunAggregate {
    /// Summarize `rows`, coercing missing metrics to zero like the table does.
    pub fn from_rows(rows: &[BotResultSummary]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }

        let mut agg = Self {
            bots: rows.len(),
            ..Self::default()
        };
        let mut profit_sum = 0.0;
        let mut win_rate_sum = 0.0;
        let mut best: Option<(usize, f64)> = None;
        let mut worst: Option<(usize, f64)> = None;

        for (pos, row) in rows.iter().enumerate() {
            let profit = row.total_profit.coerce();
            profit_sum += profit;
            win_rate_sum += row.win_rate.coerce();
            if profit > 0.0 {
                agg.profitable += 1;
            }
            // First row wins ties.
            if best.map_or(true, |(_, p)| profit > p) {
                best = Some((pos, profit));
            }
            if worst.map_or(true, |(_, p)| profit < p) {
                worst = Some((pos, profit));
            }
        }

        let n = rows.len() as f64;
        agg.mean_profit = profit_sum / n;
        agg.mean_win_rate = win_rate_sum / n;
        agg.best = best.map(|(pos, _)| pos);
        agg.worst = worst.map(|(pos, _)| pos);
        agg
    }

    /// Share of profitable bots, in percent.
    pub fn profitable_pct(&self) -> f64 {
        if self.bots == 0 {
            0.0
        } else {
            self.profitable as f64 / self.bots as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<BotResultSummary> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_empty() {
        let agg = RunAggregate::from_rows(&[]);
        assert_eq!(agg, RunAggregate::default());
        assert_eq!(agg.profitable_pct(), 0.0);
    }

    #[test]
    fn test_aggregate() {
        let rows = rows(json!([
            {"total_profit": 100, "win_rate": 60},
            {"total_profit": "-50", "win_rate": 40},
            {"total_profit": null, "win_rate": null},
            {"total_profit": 250, "win_rate": 80}
        ]));
        let agg = RunAggregate::from_rows(&rows);

        assert_eq!(agg.bots, 4);
        assert_eq!(agg.profitable, 2);
        assert_eq!(agg.mean_profit, 75.0);
        assert_eq!(agg.mean_win_rate, 45.0);
        assert_eq!(agg.best, Some(3));
        assert_eq!(agg.worst, Some(1));
        assert_eq!(agg.profitable_pct(), 50.0);
    }
}
