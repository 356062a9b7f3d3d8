//! Comparison methods scoring how alike two columns are.
//!
//! Every method returns a confidence in `[0, 1]`. Name methods look only at the
//! column names; data methods look only at values or summary statistics. A
//! method that cannot judge a pair (wrong column kind, nothing to compare)
//! returns a [`MethodError`] and the engine leaves it out for that pair.

use std::{collections::HashSet, fmt, str::FromStr};

use crate::{
    data::{Value, normalize_column_name},
    error::{MatchError, MethodError},
    metadata::{ColumnKind, ColumnMetadata},
    stats::NumericSummary,
};

/// A column as seen by a comparison method.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    pub name: &'a str,
    pub values: &'a [Option<Value>],
    pub metadata: &'a ColumnMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFamily {
    Name,
    Data,
}

impl MethodFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            MethodFamily::Name => "name",
            MethodFamily::Data => "data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComparisonMethod {
    ExactValueMatch,
    ValueOverlap,
    PearsonCorrelation,
    SummaryStatistics,
    TimeSeriesAlignment,
    NameExact,
    NameLevenshtein,
    NameJaroWinkler,
}

impl ComparisonMethod {
    pub const ALL: [ComparisonMethod; 8] = [
        ComparisonMethod::ExactValueMatch,
        ComparisonMethod::ValueOverlap,
        ComparisonMethod::PearsonCorrelation,
        ComparisonMethod::SummaryStatistics,
        ComparisonMethod::TimeSeriesAlignment,
        ComparisonMethod::NameExact,
        ComparisonMethod::NameLevenshtein,
        ComparisonMethod::NameJaroWinkler,
    ];

    /// Stable identifier used on the command line and in selections.
    pub fn id(self) -> &'static str {
        match self {
            ComparisonMethod::ExactValueMatch => "exact-value-match",
            ComparisonMethod::ValueOverlap => "value-overlap",
            ComparisonMethod::PearsonCorrelation => "pearson-correlation",
            ComparisonMethod::SummaryStatistics => "summary-statistics",
            ComparisonMethod::TimeSeriesAlignment => "time-series-alignment",
            ComparisonMethod::NameExact => "name-exact",
            ComparisonMethod::NameLevenshtein => "name-levenshtein",
            ComparisonMethod::NameJaroWinkler => "name-jaro-winkler",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ComparisonMethod::ExactValueMatch => "Share of rows holding equal values",
            ComparisonMethod::ValueOverlap => "Jaccard overlap of distinct values",
            ComparisonMethod::PearsonCorrelation => "Absolute Pearson correlation (numeric)",
            ComparisonMethod::SummaryStatistics => {
                "Closeness of mean, minimum and maximum (numeric)"
            }
            ComparisonMethod::TimeSeriesAlignment => {
                "Share of timestamps inside the other column's range (datetime)"
            }
            ComparisonMethod::NameExact => "Normalized column names are identical",
            ComparisonMethod::NameLevenshtein => "Levenshtein similarity of column names",
            ComparisonMethod::NameJaroWinkler => "Jaro-Winkler similarity of column names",
        }
    }

    pub fn family(self) -> MethodFamily {
        match self {
            ComparisonMethod::NameExact
            | ComparisonMethod::NameLevenshtein
            | ComparisonMethod::NameJaroWinkler => MethodFamily::Name,
            _ => MethodFamily::Data,
        }
    }

    pub fn evaluate(
        self,
        left: &ColumnView<'_>,
        right: &ColumnView<'_>,
    ) -> Result<f64, MethodError> {
        let confidence = match self {
            ComparisonMethod::ExactValueMatch => exact_value_match(left, right)?,
            ComparisonMethod::ValueOverlap => value_overlap(left, right)?,
            ComparisonMethod::PearsonCorrelation => pearson_correlation(left, right)?,
            ComparisonMethod::SummaryStatistics => summary_statistics(left, right)?,
            ComparisonMethod::TimeSeriesAlignment => time_series_alignment(left, right)?,
            ComparisonMethod::NameExact => {
                if normalize_column_name(left.name) == normalize_column_name(right.name) {
                    1.0
                } else {
                    0.0
                }
            }
            ComparisonMethod::NameLevenshtein => strsim::normalized_levenshtein(
                &normalize_column_name(left.name),
                &normalize_column_name(right.name),
            ),
            ComparisonMethod::NameJaroWinkler => strsim::jaro_winkler(
                &normalize_column_name(left.name),
                &normalize_column_name(right.name),
            ),
        };
        if !confidence.is_finite() {
            return Err(MethodError::NonFinite { method: self.id() });
        }
        Ok(confidence.clamp(0.0, 1.0))
    }
}

impl fmt::Display for ComparisonMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ComparisonMethod {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        ComparisonMethod::ALL
            .into_iter()
            .find(|method| method.id() == wanted)
            .ok_or_else(|| MatchError::UnknownMethod(value.trim().to_string()))
    }
}

fn require_kind(
    method: ComparisonMethod,
    kind: ColumnKind,
    views: [&ColumnView<'_>; 2],
) -> Result<(), MethodError> {
    match views.iter().find(|view| view.metadata.kind != kind) {
        Some(view) => Err(MethodError::UnsupportedKind {
            method: method.id(),
            expected: kind.as_str(),
            found: view.metadata.kind.to_string(),
        }),
        None => Ok(()),
    }
}

/// Row-aligned pairs up to the longer column; missing rows read as `None`.
fn aligned<'a>(
    left: &ColumnView<'a>,
    right: &ColumnView<'a>,
) -> impl Iterator<Item = (Option<&'a Value>, Option<&'a Value>)> {
    let (left_values, right_values) = (left.values, right.values);
    (0..left_values.len().max(right_values.len())).map(move |idx| {
        (
            left_values.get(idx).and_then(Option::as_ref),
            right_values.get(idx).and_then(Option::as_ref),
        )
    })
}

fn exact_value_match(left: &ColumnView<'_>, right: &ColumnView<'_>) -> Result<f64, MethodError> {
    let mut compared = 0usize;
    let mut matched = 0usize;
    for pair in aligned(left, right) {
        match pair {
            (None, None) => continue,
            (Some(l), Some(r)) => {
                compared += 1;
                if l == r {
                    matched += 1;
                }
            }
            _ => compared += 1,
        }
    }
    if compared == 0 {
        return Err(MethodError::NoData {
            method: ComparisonMethod::ExactValueMatch.id(),
        });
    }
    Ok(matched as f64 / compared as f64)
}

fn value_overlap(left: &ColumnView<'_>, right: &ColumnView<'_>) -> Result<f64, MethodError> {
    let distinct = |view: &ColumnView<'_>| {
        view.values
            .iter()
            .flatten()
            .map(Value::as_display)
            .collect::<HashSet<_>>()
    };
    let (left_set, right_set) = (distinct(left), distinct(right));
    let union = left_set.union(&right_set).count();
    if union == 0 {
        return Err(MethodError::NoData {
            method: ComparisonMethod::ValueOverlap.id(),
        });
    }
    let shared = left_set.intersection(&right_set).count();
    Ok(shared as f64 / union as f64)
}

fn pearson_correlation(left: &ColumnView<'_>, right: &ColumnView<'_>) -> Result<f64, MethodError> {
    let method = ComparisonMethod::PearsonCorrelation;
    require_kind(method, ColumnKind::Numeric, [left, right])?;
    let pairs = aligned(left, right)
        .filter_map(|pair| match pair {
            (Some(l), Some(r)) => Some((l.as_f64()?, r.as_f64()?)),
            _ => None,
        })
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect::<Vec<_>>();
    if pairs.len() < 2 {
        return Err(MethodError::NoData {
            method: method.id(),
        });
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Err(MethodError::ZeroVariance {
            method: method.id(),
        });
    }
    // squared deviations of values near f64::MAX overflow
    if !(covariance.is_finite() && var_x.is_finite() && var_y.is_finite()) {
        return Err(MethodError::NonFinite {
            method: method.id(),
        });
    }
    Ok((covariance / (var_x.sqrt() * var_y.sqrt())).abs())
}

fn closeness(a: f64, b: f64) -> f64 {
    if a == b {
        1.0
    } else {
        1.0 - (a - b).abs() / (a.abs() + b.abs())
    }
}

fn summary_statistics(left: &ColumnView<'_>, right: &ColumnView<'_>) -> Result<f64, MethodError> {
    let method = ComparisonMethod::SummaryStatistics;
    require_kind(method, ColumnKind::Numeric, [left, right])?;
    let (Some(a), Some(b)) = (left.metadata.numeric, right.metadata.numeric) else {
        return Err(MethodError::NoData {
            method: method.id(),
        });
    };
    let finite = |s: &NumericSummary| {
        s.mean.is_finite() && s.minimum.is_finite() && s.maximum.is_finite()
    };
    if !(finite(&a) && finite(&b)) {
        return Err(MethodError::NonFinite {
            method: method.id(),
        });
    }
    let total = closeness(a.mean, b.mean)
        + closeness(a.minimum, b.minimum)
        + closeness(a.maximum, b.maximum);
    Ok(total / 3.0)
}

fn time_series_alignment(
    left: &ColumnView<'_>,
    right: &ColumnView<'_>,
) -> Result<f64, MethodError> {
    let method = ComparisonMethod::TimeSeriesAlignment;
    require_kind(method, ColumnKind::Datetime, [left, right])?;
    let timestamps = |view: &ColumnView<'_>| {
        view.values
            .iter()
            .flatten()
            .filter_map(Value::as_timestamp)
            .collect::<Vec<_>>()
    };
    let (left_ts, right_ts) = (timestamps(left), timestamps(right));
    let (Some(left_range), Some(right_range)) = (range(&left_ts), range(&right_ts)) else {
        return Err(MethodError::NoData {
            method: method.id(),
        });
    };
    let inside = |values: &[f64], (low, high): (f64, f64)| {
        values.iter().filter(|ts| **ts >= low && **ts <= high).count() as f64 / values.len() as f64
    };
    Ok((inside(&left_ts, right_range) + inside(&right_ts, left_range)) / 2.0)
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    let low = values.iter().copied().reduce(f64::min)?;
    let high = values.iter().copied().reduce(f64::max)?;
    Some((low, high))
}
