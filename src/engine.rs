//! Similarity engine: scores every (origin column, target column) pair of two
//! datasets with a weighted blend of comparison methods.
//!
//! Weights act as multiplicities. A method weighted 3 counts three times in
//! both the numerator and the denominator of the mean, so equal weights give a
//! plain average and a single method passes its own confidence through.
//! Scores are percentages rounded to two decimals; a pair no selected method
//! could judge has no score at all rather than a zero.

use std::collections::HashSet;

use itertools::Itertools;
use log::{debug, info};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    catalogue::FileCatalogueEntry,
    dataset::Dataset,
    error::{MatchError, MatchResult},
    metadata::ColumnMetadata,
    methods::{ColumnView, ComparisonMethod},
};

/// Methods chosen for one matrix computation, each with a weight of at least 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSelection {
    entries: Vec<(ComparisonMethod, u32)>,
}

impl ComparisonSelection {
    pub fn new(entries: Vec<(ComparisonMethod, u32)>) -> MatchResult<Self> {
        let mut seen = HashSet::new();
        for (method, weight) in &entries {
            if *weight == 0 {
                return Err(MatchError::ZeroWeight {
                    method: method.id().to_string(),
                });
            }
            if !seen.insert(*method) {
                return Err(MatchError::DuplicateMethod(method.id().to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// Pairs method ids with weights by position.
    pub fn from_parts<S: AsRef<str>>(methods: &[S], weights: &[u32]) -> MatchResult<Self> {
        if methods.len() != weights.len() {
            return Err(MatchError::WeightCountMismatch {
                methods: methods.len(),
                weights: weights.len(),
            });
        }
        let entries = methods
            .iter()
            .zip(weights)
            .map(|(id, weight)| Ok((id.as_ref().parse::<ComparisonMethod>()?, *weight)))
            .collect::<MatchResult<Vec<_>>>()?;
        Self::new(entries)
    }

    /// Parses `id` or `id=weight` specifications; a bare id has weight 1.
    pub fn parse_specs<S: AsRef<str>>(specs: &[S]) -> MatchResult<Self> {
        let entries = specs
            .iter()
            .map(|spec| parse_method_spec(spec.as_ref()))
            .collect::<MatchResult<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[(ComparisonMethod, u32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_method_spec(spec: &str) -> MatchResult<(ComparisonMethod, u32)> {
    let (id, weight) = match spec.split_once('=') {
        Some((id, raw_weight)) => {
            let weight = raw_weight
                .trim()
                .parse::<u32>()
                .map_err(|err| MatchError::InvalidMethodSpec {
                    spec: spec.to_string(),
                    reason: err.to_string(),
                })?;
            (id, weight)
        }
        None => (spec, 1),
    };
    Ok((id.parse()?, weight))
}

/// One side of a comparison: a dataset and the metadata of its columns.
#[derive(Debug, Clone, Copy)]
pub struct TableRef<'a> {
    pub dataset: &'a Dataset,
    pub columns: &'a [ColumnMetadata],
}

impl<'a> From<&'a FileCatalogueEntry> for TableRef<'a> {
    fn from(entry: &'a FileCatalogueEntry) -> Self {
        TableRef {
            dataset: entry.dataset(),
            columns: entry.columns(),
        }
    }
}

/// Columns of `all` that are not hidden, in their original order.
pub fn active_columns(all: &[String], hidden: &[String]) -> Vec<String> {
    all.iter()
        .filter(|name| !hidden.contains(name))
        .cloned()
        .collect()
}

/// Weighted mean of `(confidence, weight)` pairs as a percentage rounded to
/// two decimals, or `None` when there is nothing to blend.
pub fn blend(contributions: &[(f64, u32)]) -> Option<f64> {
    let total_weight: u64 = contributions.iter().map(|(_, w)| u64::from(*w)).sum();
    if total_weight == 0 {
        return None;
    }
    let weighted: f64 = contributions
        .iter()
        .map(|(confidence, weight)| confidence * f64::from(*weight))
        .sum();
    Some(round_percentage(weighted / total_weight as f64 * 100.0))
}

fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scores every pair of `origin_columns` × `target_columns`.
pub fn compare(
    selection: &ComparisonSelection,
    origin: TableRef<'_>,
    target: TableRef<'_>,
    origin_columns: &[String],
    target_columns: &[String],
) -> MatchResult<SimilarityMatrix> {
    let origin_views = resolve_views(origin, origin_columns, "origin")?;
    let target_views = resolve_views(target, target_columns, "target")?;

    let scores = if selection.is_empty() {
        debug!("No comparison methods selected; returning an unscored matrix");
        vec![None; origin_views.len() * target_views.len()]
    } else {
        origin_views
            .iter()
            .cartesian_product(&target_views)
            .map(|(left, right)| score_pair(selection, left, right))
            .collect()
    };

    info!(
        "Compared {} origin column(s) against {} target column(s) with {} method(s)",
        origin_columns.len(),
        target_columns.len(),
        selection.entries().len()
    );
    Ok(SimilarityMatrix {
        origin_columns: origin_columns.to_vec(),
        target_columns: target_columns.to_vec(),
        scores,
    })
}

fn resolve_views<'a>(
    table: TableRef<'a>,
    names: &[String],
    side: &'static str,
) -> MatchResult<Vec<ColumnView<'a>>> {
    if names.is_empty() {
        return Err(MatchError::EmptyColumns { side });
    }
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| {
            if !seen.insert(name.as_str()) {
                return Err(MatchError::DuplicateColumn {
                    side,
                    column: name.clone(),
                });
            }
            let unknown = || MatchError::UnknownColumn {
                side,
                column: name.clone(),
            };
            let column = table.dataset.column(name).ok_or_else(unknown)?;
            let metadata = table
                .columns
                .iter()
                .find(|meta| meta.name == *name)
                .ok_or_else(unknown)?;
            Ok(ColumnView {
                name: column.name.as_str(),
                values: &column.values,
                metadata,
            })
        })
        .collect()
}

fn score_pair(
    selection: &ComparisonSelection,
    left: &ColumnView<'_>,
    right: &ColumnView<'_>,
) -> Option<f64> {
    let contributions = selection
        .entries()
        .iter()
        .filter_map(|(method, weight)| match method.evaluate(left, right) {
            Ok(confidence) => Some((confidence, *weight)),
            Err(err) => {
                debug!("Skipping ({}, {}): {err}", left.name, right.name);
                None
            }
        })
        .collect::<Vec<_>>();
    blend(&contributions)
}

/// Pairwise scores keyed by origin column, then target column, preserving the
/// order both column lists were given in.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    origin_columns: Vec<String>,
    target_columns: Vec<String>,
    scores: Vec<Option<f64>>,
}

impl SimilarityMatrix {
    pub fn origin_columns(&self) -> &[String] {
        &self.origin_columns
    }

    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    /// Score of one cell; `Ok(None)` when the pair could not be scored.
    pub fn cell(&self, origin: &str, target: &str) -> MatchResult<Option<f64>> {
        let out_of_range = || MatchError::CellOutOfRange {
            origin: origin.to_string(),
            target: target.to_string(),
        };
        let row = self
            .origin_columns
            .iter()
            .position(|c| c == origin)
            .ok_or_else(out_of_range)?;
        let col = self
            .target_columns
            .iter()
            .position(|c| c == target)
            .ok_or_else(out_of_range)?;
        Ok(self.scores[row * self.target_columns.len() + col])
    }

    /// Every cell as `(origin, target, score)`, origin-major.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Option<f64>)> {
        self.origin_columns
            .iter()
            .cartesian_product(&self.target_columns)
            .zip(&self.scores)
            .map(|((origin, target), score)| (origin.as_str(), target.as_str(), *score))
    }

    pub fn is_unscored(&self) -> bool {
        self.scores.iter().all(Option::is_none)
    }

    /// Header row for the grid view: a blank corner then the origin columns.
    pub fn grid_headers(&self) -> Vec<String> {
        std::iter::once(String::new())
            .chain(self.origin_columns.iter().cloned())
            .collect()
    }

    /// Grid rows: one per target column, one cell per origin column, blank
    /// where a pair has no score.
    pub fn grid_rows(&self) -> Vec<Vec<String>> {
        let width = self.target_columns.len();
        self.target_columns
            .iter()
            .enumerate()
            .map(|(col, target)| {
                std::iter::once(target.clone())
                    .chain((0..self.origin_columns.len()).map(|row| {
                        self.scores[row * width + col]
                            .map(|score| format!("{score:.2}"))
                            .unwrap_or_default()
                    }))
                    .collect()
            })
            .collect()
    }
}

impl Serialize for SimilarityMatrix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct Row<'a> {
            targets: &'a [String],
            scores: &'a [Option<f64>],
        }

        impl Serialize for Row<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut map = serializer.serialize_map(Some(self.targets.len()))?;
                for (target, score) in self.targets.iter().zip(self.scores) {
                    map.serialize_entry(target, score)?;
                }
                map.end()
            }
        }

        let width = self.target_columns.len();
        let mut map = serializer.serialize_map(Some(self.origin_columns.len()))?;
        for (row, origin) in self.origin_columns.iter().enumerate() {
            map.serialize_entry(
                origin,
                &Row {
                    targets: &self.target_columns,
                    scores: &self.scores[row * width..(row + 1) * width],
                },
            )?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_matches_weighted_mean_example() {
        assert_eq!(blend(&[(0.8, 1), (0.4, 3)]), Some(50.0));
    }

    #[test]
    fn blend_single_method_passes_confidence_through() {
        assert_eq!(blend(&[(0.737, 2)]), Some(73.7));
        assert_eq!(blend(&[(0.737, 1)]), Some(73.7));
        assert_eq!(blend(&[]), None);
    }

    #[test]
    fn blend_rounds_to_two_decimals() {
        assert_eq!(blend(&[(1.0 / 3.0, 1)]), Some(33.33));
        assert_eq!(blend(&[(2.0 / 3.0, 1)]), Some(66.67));
    }

    #[test]
    fn selection_rejects_inconsistent_inputs() {
        assert_eq!(
            ComparisonSelection::from_parts(&["name-exact"], &[1, 2]),
            Err(MatchError::WeightCountMismatch {
                methods: 1,
                weights: 2
            })
        );
        assert_eq!(
            ComparisonSelection::from_parts(&["name-exact"], &[0]),
            Err(MatchError::ZeroWeight {
                method: "name-exact".to_string()
            })
        );
        assert_eq!(
            ComparisonSelection::from_parts(&["name-exact", "name-exact"], &[1, 1]),
            Err(MatchError::DuplicateMethod("name-exact".to_string()))
        );
    }

    #[test]
    fn method_specs_default_to_weight_one() {
        let selection =
            ComparisonSelection::parse_specs(&["exact-value-match", "name-levenshtein=3"])
                .expect("parse specs");
        assert_eq!(
            selection.entries(),
            &[
                (ComparisonMethod::ExactValueMatch, 1),
                (ComparisonMethod::NameLevenshtein, 3)
            ]
        );
        assert!(matches!(
            ComparisonSelection::parse_specs(&["name-exact=heavy"]),
            Err(MatchError::InvalidMethodSpec { .. })
        ));
    }

    #[test]
    fn active_columns_drop_hidden_and_keep_order() {
        let all = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(
            active_columns(&all, &["a".to_string()]),
            vec!["c".to_string(), "b".to_string()]
        );
    }
}
