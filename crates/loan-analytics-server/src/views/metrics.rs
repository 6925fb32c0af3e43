//! Headline metric formatting.

use serde::Serialize;
use serde_json::Value;

use loan_analytics::QueryResult;

/// Shown for a metric whose value is missing or not numeric.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    /// `12,345`
    Count,
    /// `$1,234.56`
    Currency,
    /// `$12.3M`
    Millions,
    /// The value as returned.
    Plain,
}

/// Which column of a one-row result feeds a metric card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSpec {
    pub label: &'static str,
    pub column: &'static str,
    pub format: MetricFormat,
}

impl MetricSpec {
    pub const fn new(label: &'static str, column: &'static str, format: MetricFormat) -> Self {
        Self {
            label,
            column,
            format,
        }
    }
}

/// A formatted metric card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// Format the first-row value of each metric column.
pub fn metrics(result: &QueryResult, specs: &[MetricSpec]) -> Vec<Metric> {
    specs
        .iter()
        .map(|m| Metric {
            label: m.label.to_string(),
            value: format_value(result.value(0, m.column), m.format),
        })
        .collect()
}

pub fn format_value(value: Option<&Value>, format: MetricFormat) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return NOT_AVAILABLE.to_string();
    };

    let formatted = match format {
        MetricFormat::Plain => match value {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        },
        MetricFormat::Count => as_f64(value).map(format_count),
        MetricFormat::Currency => as_f64(value).map(format_currency),
        MetricFormat::Millions => as_f64(value).map(format_millions),
    };
    formatted.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

/// Whole number with thousands separators.
pub fn format_count(n: f64) -> String {
    let rounded = n.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{}", group_thousands(rounded.abs() as u64))
}

/// Dollar amount with thousands separators and two decimals.
pub fn format_currency(n: f64) -> String {
    let cents = (n.abs() * 100.0).round() as u64;
    let sign = if n < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Dollar amount in millions with one decimal.
pub fn format_millions(n: f64) -> String {
    format!("${:.1}M", n / 1e6)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_currency() {
        assert_eq!(format_currency(15234.567), "$15,234.57");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(-12.5), "-$12.50");
    }

    #[test]
    fn test_millions() {
        assert_eq!(format_millions(152_345_678.0), "$152.3M");
        assert_eq!(format_millions(1_240_000.0), "$1.2M");
    }

    #[test]
    fn test_count() {
        assert_eq!(format_count(1234567.0), "1,234,567");
        assert_eq!(format_count(12.0), "12");
        assert_eq!(format_count(1000.0), "1,000");
    }

    #[test]
    fn test_missing_is_not_available() {
        assert_eq!(format_value(None, MetricFormat::Currency), "N/A");
        assert_eq!(format_value(Some(&Value::Null), MetricFormat::Millions), "N/A");
        assert_eq!(format_value(Some(&json!("abc")), MetricFormat::Count), "N/A");
    }

    #[test]
    fn test_decimal_strings_are_numeric() {
        assert_eq!(format_value(Some(&json!("2500.5")), MetricFormat::Currency), "$2,500.50");
        assert_eq!(format_value(Some(&json!(7)), MetricFormat::Plain), "7");
    }
}
