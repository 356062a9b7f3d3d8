use anyhow::{Result, anyhow};
use log::debug;

use crate::{
    data::{Value, parse_typed_value},
    metadata::{ColumnType, is_placeholder_token},
};

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
    pub values: Vec<Option<Value>>,
}

/// In-memory table stored column-major; column names are unique.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from decoded rows, parsing each field with the type
    /// inferred for its column. Fields that do not parse (possible beyond the
    /// inference sample) are kept as strings.
    pub fn from_rows(headers: &[String], types: &[ColumnType], rows: &[Vec<String>]) -> Self {
        let mut columns = headers
            .iter()
            .zip(types)
            .map(|(name, datatype)| Column {
                name: name.clone(),
                datatype: *datatype,
                values: Vec::with_capacity(rows.len()),
            })
            .collect::<Vec<_>>();
        for row in rows {
            for (idx, column) in columns.iter_mut().enumerate() {
                let raw = row.get(idx).map(|s| s.as_str()).unwrap_or("");
                column.values.push(parse_field(raw, column));
            }
        }
        Dataset {
            columns,
            row_count: rows.len(),
        }
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, |c| c.values.len());
        if let Some(ragged) = columns.iter().find(|c| c.values.len() != row_count) {
            return Err(anyhow!(
                "Column '{}' has {} value(s) but the dataset has {} row(s)",
                ragged.name,
                ragged.values.len(),
                row_count
            ));
        }
        Ok(Dataset { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// One row as `(column name, value)` pairs in column order.
    pub fn row(&self, index: usize) -> Option<Vec<(&str, Option<&Value>)>> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), c.values[index].as_ref()))
                .collect(),
        )
    }

    /// First `rows` rows rendered for display; missing values are blank.
    pub fn head(&self, rows: usize) -> Vec<Vec<String>> {
        (0..self.row_count.min(rows))
            .map(|idx| {
                self.columns
                    .iter()
                    .map(|c| {
                        c.values[idx]
                            .as_ref()
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }

    /// Restricts the dataset to `names`, in the order given.
    pub fn project(&self, names: &[String]) -> Result<Dataset> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| anyhow!("Column '{name}' not found"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset {
            columns,
            row_count: self.row_count,
        })
    }
}

fn parse_field(raw: &str, column: &Column) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder_token(&trimmed.to_ascii_lowercase()) {
        return None;
    }
    match parse_typed_value(trimmed, &column.datatype) {
        Ok(value) => value,
        Err(err) => {
            debug!("Column '{}': keeping raw text ({err})", column.name);
            Some(Value::String(trimmed.to_string()))
        }
    }
}
