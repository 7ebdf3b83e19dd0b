//! Loosely typed scalar values as they arrive from the backend.
//!
//! Metrics may be numbers, numeric strings, `null`, or absent. They are kept
//! as received for display and coerced to `f64` only when compared.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A numeric field that may be missing or string-typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl Metric {
    /// Numeric value used for filtering and sorting.
    ///
    /// Missing, `null`, and unparseable values coerce to `0.0`. This is the
    /// single sentinel policy shared by every comparison path.
    pub fn coerce(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    /// Numeric value, or `None` when the field carries no usable number.
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            Metric::Number(n) => *n,
            Metric::Text(s) => s.trim().parse::<f64>().ok()?,
            Metric::Missing | Metric::Other(_) => return None,
        };
        v.is_finite().then_some(v)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Metric::Missing)
    }

    /// Plain text form used for free-text matching (`12.0` renders as `12`).
    pub fn to_plain_string(&self) -> String {
        match self {
            Metric::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Metric::Number(n) => n.to_string(),
            Metric::Text(s) => s.trim().to_string(),
            Metric::Missing => String::new(),
            Metric::Other(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            None => write!(f, "-"),
        }
    }
}

impl From<f64> for Metric {
    fn from(v: f64) -> Self {
        Metric::Number(v)
    }
}

impl From<i64> for Metric {
    fn from(v: i64) -> Self {
        Metric::Number(v as f64)
    }
}

impl From<&str> for Metric {
    fn from(v: &str) -> Self {
        Metric::Text(v.to_string())
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        v.map(Metric::Number).unwrap_or_default()
    }
}

/// Record identifier; backends use integer keys or opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl Identifier {
    /// Parse a command-line or config value, preferring integers.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        s.parse::<i64>()
            .map(Identifier::Int)
            .unwrap_or_else(|_| Identifier::Text(s.to_string()))
    }

    /// Numeric sort key; non-numeric identifiers coerce to `0.0`.
    pub fn coerce(&self) -> f64 {
        match self {
            Identifier::Int(n) => *n as f64,
            Identifier::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(n) => write!(f, "{}", n),
            Identifier::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(v: i64) -> Self {
        Identifier::Int(v)
    }
}

/// Parse a calendar date key, accepting either `YYYY-MM-DD` or a full
/// timestamp whose first ten characters are the date.
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Serde adapter for [`parse_date_key`].
pub(crate) fn deserialize_date_key<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_key(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date key: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Metric Tests
    // =========================================================================

    #[test]
    fn test_metric_deserialize_shapes() {
        let values: Vec<Metric> = serde_json::from_str(r#"[1.5, "2.25", null, "abc", true]"#).unwrap();
        assert_eq!(values[0], Metric::Number(1.5));
        assert_eq!(values[1], Metric::Text("2.25".into()));
        assert_eq!(values[2], Metric::Missing);
        assert_eq!(values[3], Metric::Text("abc".into()));
        assert_eq!(values[4], Metric::Other(serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_metric_coerce() {
        assert_eq!(Metric::Number(150.0).coerce(), 150.0);
        assert_eq!(Metric::Text(" -12.5 ".into()).coerce(), -12.5);
        assert_eq!(Metric::Text("n/a".into()).coerce(), 0.0);
        assert_eq!(Metric::Text("NaN".into()).coerce(), 0.0);
        assert_eq!(Metric::Missing.coerce(), 0.0);
        assert_eq!(Metric::Other(serde_json::json!({"x": 1})).coerce(), 0.0);
    }

    #[test]
    fn test_metric_value_distinguishes_missing() {
        assert_eq!(Metric::Number(0.0).value(), Some(0.0));
        assert_eq!(Metric::Missing.value(), None);
        assert!(Metric::Missing.is_missing());
    }

    #[test]
    fn test_metric_plain_string() {
        assert_eq!(Metric::Number(12.0).to_plain_string(), "12");
        assert_eq!(Metric::Number(1.5).to_plain_string(), "1.5");
        assert_eq!(Metric::Text("B-07".into()).to_plain_string(), "B-07");
        assert_eq!(Metric::Missing.to_plain_string(), "");
    }

    #[test]
    fn test_metric_display() {
        assert_eq!(format!("{:.2}", Metric::Number(3.14159)), "3.14");
        assert_eq!(format!("{}", Metric::Text("7".into())), "7");
        assert_eq!(format!("{:.2}", Metric::Missing), "-");
    }

    #[test]
    fn test_metric_missing_field_defaults() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default)]
            profit: Metric,
        }
        let row: Row = serde_json::from_str("{}").unwrap();
        assert!(row.profit.is_missing());
    }

    // =========================================================================
    // Identifier Tests
    // =========================================================================

    #[test]
    fn test_identifier_parse() {
        assert_eq!(Identifier::parse("42"), Identifier::Int(42));
        assert_eq!(Identifier::parse(" run-a "), Identifier::Text("run-a".into()));
    }

    #[test]
    fn test_identifier_deserialize() {
        let ids: Vec<Identifier> = serde_json::from_str(r#"[3, "abc"]"#).unwrap();
        assert_eq!(ids, vec![Identifier::Int(3), Identifier::Text("abc".into())]);
    }

    #[test]
    fn test_identifier_coerce() {
        assert_eq!(Identifier::Int(9).coerce(), 9.0);
        assert_eq!(Identifier::Text("11".into()).coerce(), 11.0);
        assert_eq!(Identifier::Text("uuid-ish".into()).coerce(), 0.0);
    }

    // =========================================================================
    // Date key Tests
    // =========================================================================

    #[test]
    fn test_parse_date_key() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_date_key("2024-01-02"), Some(expected));
        assert_eq!(parse_date_key("2024-01-02T09:30:00Z"), Some(expected));
        assert_eq!(parse_date_key("yesterday"), None);
    }
}
