//! Selection of candidate relationships from a similarity matrix before they
//! are committed to the catalogue.

use std::{collections::BTreeMap, path::Path};

use log::{debug, info};
use serde::Serialize;

use crate::{
    catalogue::{CatalogueIndex, RelationshipUpdate},
    engine::SimilarityMatrix,
    error::{MatchError, MatchResult},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CandidateKey {
    pub origin_column: String,
    pub target_column: String,
}

impl CandidateKey {
    pub fn new(origin_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            origin_column: origin_column.into(),
            target_column: target_column.into(),
        }
    }

    /// Parses `origin:target`, splitting at the last `:` so origin column
    /// names may contain colons.
    pub fn parse(spec: &str) -> Option<Self> {
        let (origin, target) = spec.rsplit_once(':')?;
        let (origin, target) = (origin.trim(), target.trim());
        if origin.is_empty() || target.is_empty() {
            return None;
        }
        Some(Self::new(origin, target))
    }
}

/// Selected candidates with the certainty each had when it was selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApprovalState {
    selected: BTreeMap<CandidateKey, f64>,
}

impl ApprovalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips `key`; returns whether it is selected afterwards. The certainty
    /// is only recorded on selection.
    pub fn toggle(&mut self, key: CandidateKey, certainty: f64) -> bool {
        if self.selected.remove(&key).is_some() {
            debug!("Deselected {} -> {}", key.origin_column, key.target_column);
            false
        } else {
            debug!(
                "Selected {} -> {} at {certainty:.2}",
                key.origin_column, key.target_column
            );
            self.selected.insert(key, certainty);
            true
        }
    }

    /// Toggles the candidate behind a matrix cell. Selecting requires a
    /// scored cell; deselecting works regardless of the current score.
    pub fn toggle_cell(
        &mut self,
        matrix: &SimilarityMatrix,
        origin_column: &str,
        target_column: &str,
    ) -> MatchResult<bool> {
        let key = CandidateKey::new(origin_column, target_column);
        if self.selected.contains_key(&key) {
            return Ok(self.toggle(key, 0.0));
        }
        let certainty = matrix
            .cell(origin_column, target_column)?
            .ok_or_else(|| MatchError::UnscoredCell {
                origin: origin_column.to_string(),
                target: target_column.to_string(),
            })?;
        Ok(self.toggle(key, certainty))
    }

    pub fn is_selected(&self, key: &CandidateKey) -> bool {
        self.selected.contains_key(key)
    }

    pub fn certainty(&self, key: &CandidateKey) -> Option<f64> {
        self.selected.get(key).copied()
    }

    pub fn selected(&self) -> impl Iterator<Item = (&CandidateKey, f64)> {
        self.selected.iter().map(|(key, certainty)| (key, *certainty))
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Writes every selected candidate as a relationship from `origin_path`
    /// to `target_path`. Selections are left in place.
    pub fn commit(
        &self,
        index: &mut CatalogueIndex,
        origin_path: &Path,
        target_path: &Path,
    ) -> Vec<(CandidateKey, RelationshipUpdate)> {
        let outcomes = self
            .selected
            .iter()
            .map(|(key, certainty)| {
                let update = index.add_relationship(
                    origin_path,
                    target_path,
                    &key.origin_column,
                    &key.target_column,
                    *certainty,
                );
                (key.clone(), update)
            })
            .collect::<Vec<_>>();
        let recorded = outcomes
            .iter()
            .filter(|(_, update)| !matches!(update, RelationshipUpdate::Skipped(_)))
            .count();
        info!(
            "Committed {recorded} of {} selected relationship(s) from {origin_path:?} to {target_path:?}",
            outcomes.len()
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_keys_parse_origin_and_target() {
        assert_eq!(
            CandidateKey::parse("id : uid"),
            Some(CandidateKey::new("id", "uid"))
        );
        assert_eq!(CandidateKey::parse("id"), None);
        assert_eq!(CandidateKey::parse(":uid"), None);
    }

    #[test]
    fn origin_columns_with_colons_parse_at_the_last_separator() {
        assert_eq!(
            CandidateKey::parse("time:utc:uid"),
            Some(CandidateKey::new("time:utc", "uid"))
        );
        assert_eq!(CandidateKey::parse("time:utc:"), None);
    }

    #[test]
    fn toggle_twice_restores_unselected() {
        let mut state = ApprovalState::new();
        let key = CandidateKey::new("id", "uid");
        assert!(state.toggle(key.clone(), 80.0));
        assert_eq!(state.certainty(&key), Some(80.0));
        assert!(!state.toggle(key.clone(), 12.0));
        assert!(!state.is_selected(&key));
        assert!(state.is_empty());
    }

    #[test]
    fn reselection_snapshots_new_certainty() {
        let mut state = ApprovalState::new();
        let key = CandidateKey::new("a", "b");
        state.toggle(key.clone(), 40.0);
        state.toggle(key.clone(), 40.0);
        state.toggle(key.clone(), 65.5);
        assert_eq!(state.certainty(&key), Some(65.5));
    }
}
