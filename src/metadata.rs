//! Column metadata: low-level type inference, kind classification, numeric
//! summaries, and the relationships a column holds towards other files.
//!
//! Type inference samples the decoded rows of a file and keeps a
//! [`TypeCandidate`] per column. A type is only chosen when every non-empty,
//! non-placeholder sample parses as that type; anything else falls back to
//! [`ColumnType::String`].

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    data::{Value, parse_naive_date, parse_naive_datetime},
    stats::{ColumnStats, NumericSummary},
};

pub const DEFAULT_CATEGORICAL_MAX_DISTINCT: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Guid,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::String => "String",
            ColumnType::Integer => "Integer",
            ColumnType::Float => "Float",
            ColumnType::Boolean => "Boolean",
            ColumnType::Date => "Date",
            ColumnType::DateTime => "DateTime",
            ColumnType::Guid => "Guid",
        };
        f.write_str(label)
    }
}

/// Coarse classification used by the comparison methods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Datetime,
    Other,
}

impl ColumnKind {
    pub fn classify(
        datatype: ColumnType,
        non_empty: usize,
        distinct: usize,
        categorical_max_distinct: usize,
    ) -> Self {
        if non_empty == 0 {
            return ColumnKind::Other;
        }
        match datatype {
            ColumnType::Integer | ColumnType::Float => ColumnKind::Numeric,
            ColumnType::Date | ColumnType::DateTime => ColumnKind::Datetime,
            ColumnType::Boolean => ColumnKind::Categorical,
            ColumnType::String
                if distinct <= categorical_max_distinct || distinct * 2 <= non_empty =>
            {
                ColumnKind::Categorical
            }
            ColumnType::String | ColumnType::Guid => ColumnKind::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Datetime => "datetime",
            ColumnKind::Other => "other",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional link from a column to a column of another catalogued file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub target_checksum: String,
    pub target_column_name: String,
    pub certainty: f64,
}

/// Display grouping for relationship certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertaintyBand {
    Strong,
    Moderate,
    Weak,
}

impl CertaintyBand {
    pub fn from_certainty(certainty: f64) -> Self {
        if certainty >= 75.0 {
            CertaintyBand::Strong
        } else if certainty >= 50.0 {
            CertaintyBand::Moderate
        } else {
            CertaintyBand::Weak
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertaintyBand::Strong => "strong",
            CertaintyBand::Moderate => "moderate",
            CertaintyBand::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub datatype: ColumnType,
    pub kind: ColumnKind,
    pub non_empty: usize,
    pub distinct: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    relationships: Vec<Relationship>,
}

impl ColumnMetadata {
    /// Profiles an already typed column.
    pub fn profile(
        name: &str,
        datatype: ColumnType,
        values: &[Option<Value>],
        categorical_max_distinct: usize,
    ) -> Self {
        let mut stats = ColumnStats::new();
        let mut seen = HashSet::new();
        let mut non_empty = 0usize;
        for value in values.iter().flatten() {
            non_empty += 1;
            seen.insert(value.as_display());
            if matches!(datatype, ColumnType::Integer | ColumnType::Float) {
                stats.add_value(value);
            }
        }
        let distinct = seen.len();
        let kind = ColumnKind::classify(datatype, non_empty, distinct, categorical_max_distinct);
        let numeric = match kind {
            ColumnKind::Numeric => stats.finish(),
            _ => None,
        };
        ColumnMetadata {
            name: name.to_string(),
            datatype,
            kind,
            non_empty,
            distinct,
            numeric,
            relationships: Vec::new(),
        }
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Inserts the relationship, or replaces the certainty of an existing one
    /// to the same target column. Returns `true` when an entry was replaced.
    pub fn upsert_relationship(&mut self, relationship: Relationship) -> bool {
        if let Some(existing) = self.relationships.iter_mut().find(|rel| {
            rel.target_checksum == relationship.target_checksum
                && rel.target_column_name == relationship.target_column_name
        }) {
            existing.certainty = relationship.certainty;
            true
        } else {
            self.relationships.push(relationship);
            false
        }
    }

    pub fn remove_relationships_to(&mut self, target_checksum: &str) -> usize {
        let before = self.relationships.len();
        self.relationships
            .retain(|rel| rel.target_checksum != target_checksum);
        before - self.relationships.len()
    }
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    non_empty: usize,
    boolean_matches: usize,
    integer_matches: usize,
    float_matches: usize,
    date_matches: usize,
    datetime_matches: usize,
    guid_matches: usize,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_empty: 0,
            boolean_matches: 0,
            integer_matches: 0,
            float_matches: 0,
            date_matches: 0,
            datetime_matches: 0,
            guid_matches: 0,
        }
    }

    fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        let lowered = trimmed.to_ascii_lowercase();
        if is_placeholder_token(&lowered) {
            return;
        }
        self.non_empty += 1;

        if matches!(
            lowered.as_str(),
            "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
        ) {
            self.boolean_matches += 1;
        }
        if trimmed.parse::<i64>().is_ok() {
            self.integer_matches += 1;
        }
        if trimmed.parse::<f64>().is_ok() {
            self.float_matches += 1;
        }
        if parse_naive_date(trimmed).is_ok() {
            self.date_matches += 1;
        }
        if parse_naive_datetime(trimmed).is_ok() {
            self.datetime_matches += 1;
        }
        let trimmed_guid = trimmed.trim_matches(|c| matches!(c, '{' | '}'));
        if Uuid::parse_str(trimmed_guid).is_ok() {
            self.guid_matches += 1;
        }
    }

    fn unanimous(&self, count: usize) -> bool {
        self.non_empty > 0 && count == self.non_empty
    }

    fn decide(&self) -> ColumnType {
        if self.unanimous(self.boolean_matches) {
            ColumnType::Boolean
        } else if self.unanimous(self.integer_matches) {
            ColumnType::Integer
        } else if self.unanimous(self.float_matches) {
            ColumnType::Float
        } else if self.unanimous(self.date_matches) {
            ColumnType::Date
        } else if self.unanimous(self.datetime_matches) {
            ColumnType::DateTime
        } else if self.unanimous(self.guid_matches) {
            ColumnType::Guid
        } else {
            ColumnType::String
        }
    }
}

pub fn is_placeholder_token(lowered: &str) -> bool {
    let stripped = lowered.trim_start_matches('#');
    matches!(
        stripped,
        "na" | "n/a" | "n.a." | "null" | "none" | "nan" | "missing"
    )
}

/// Infers one [`ColumnType`] per column from up to `sample_rows` decoded
/// rows (0 samples every row).
pub fn infer_column_types(
    column_count: usize,
    rows: &[Vec<String>],
    sample_rows: usize,
) -> Vec<ColumnType> {
    let mut candidates = vec![TypeCandidate::new(); column_count];
    let limit = if sample_rows == 0 {
        rows.len()
    } else {
        sample_rows.min(rows.len())
    };
    for row in &rows[..limit] {
        for (candidate, field) in candidates.iter_mut().zip(row) {
            candidate.update(field);
        }
    }
    candidates.iter().map(TypeCandidate::decide).collect()
}
