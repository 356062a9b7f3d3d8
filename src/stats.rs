use serde::{Deserialize, Serialize};

use crate::data::Value;

/// Summary statistics kept for numeric columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Default)]
pub struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
    sum_squares: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values without a numeric reading are ignored.
    pub fn add_value(&mut self, value: &Value) {
        if let Some(numeric) = value.as_f64().filter(|v| v.is_finite()) {
            self.add_metric(numeric);
        }
    }

    fn add_metric(&mut self, numeric: f64) {
        self.sum += numeric;
        self.sum_squares += numeric * numeric;
        self.min = Some(match self.min {
            Some(current) => current.min(numeric),
            None => numeric,
        });
        self.max = Some(match self.max {
            Some(current) => current.max(numeric),
            None => numeric,
        });
        self.values.push(numeric);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum / self.count() as f64)
        }
    }

    fn median(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len().is_multiple_of(2) {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    fn std_dev(&self) -> Option<f64> {
        if self.count() < 2 {
            return None;
        }
        let count = self.count() as f64;
        let mean = self.mean()?;
        let variance = (self.sum_squares - count * mean * mean) / (count - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    pub fn finish(&self) -> Option<NumericSummary> {
        Some(NumericSummary {
            count: self.count(),
            mean: self.mean()?,
            minimum: self.min?,
            maximum: self.max?,
            median: self.median()?,
            std_dev: self.std_dev(),
        })
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarize(values: &[Value]) -> Option<NumericSummary> {
        let mut stats = ColumnStats::new();
        for value in values {
            stats.add_value(value);
        }
        stats.finish()
    }

    #[test]
    fn summary_reports_mean_bounds_and_median() {
        let summary = summarize(&[
            Value::Integer(4),
            Value::Float(1.0),
            Value::Integer(7),
            Value::Integer(2),
        ])
        .expect("numeric summary");
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 3.5);
        assert_eq!(summary.minimum, 1.0);
        assert_eq!(summary.maximum, 7.0);
        assert_eq!(summary.median, 3.0);
        let std_dev = summary.std_dev.expect("std dev");
        assert!((std_dev - 2.6458).abs() < 1e-4);
    }

    #[test]
    fn non_numeric_values_are_skipped() {
        let summary = summarize(&[Value::String("n/a".into()), Value::Integer(5)])
            .expect("numeric summary");
        assert_eq!(summary.count, 1);
        assert_eq!(summary.std_dev, None);
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn format_number_trims_integral_values() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(1.23456), "1.2346");
    }
}
