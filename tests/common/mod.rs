#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_catalogue::{
    data::Value,
    dataset::{Column, Dataset},
    engine::TableRef,
    metadata::{ColumnMetadata, ColumnType, DEFAULT_CATEGORICAL_MAX_DISTINCT},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` under the workspace, creating parent directories.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// In-memory table with profiled metadata, for engine tests that do not need
/// files on disk.
pub struct MemoryTable {
    pub dataset: Dataset,
    pub metadata: Vec<ColumnMetadata>,
}

impl MemoryTable {
    pub fn new(columns: Vec<(&str, ColumnType, Vec<Option<Value>>)>) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, datatype, values)| Column {
                name: name.to_string(),
                datatype,
                values,
            })
            .collect::<Vec<_>>();
        let metadata = columns
            .iter()
            .map(|column| {
                ColumnMetadata::profile(
                    &column.name,
                    column.datatype,
                    &column.values,
                    DEFAULT_CATEGORICAL_MAX_DISTINCT,
                )
            })
            .collect();
        Self {
            dataset: Dataset::from_columns(columns).expect("even columns"),
            metadata,
        }
    }

    pub fn table_ref(&self) -> TableRef<'_> {
        TableRef {
            dataset: &self.dataset,
            columns: &self.metadata,
        }
    }
}

pub fn ints(values: &[i64]) -> Vec<Option<Value>> {
    values.iter().map(|v| Some(Value::Integer(*v))).collect()
}

pub fn floats(values: &[f64]) -> Vec<Option<Value>> {
    values.iter().map(|v| Some(Value::Float(*v))).collect()
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
