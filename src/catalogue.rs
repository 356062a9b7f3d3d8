//! The catalogue index: every loaded file, its parsed dataset, inferred column
//! metadata, and the relationships recorded between columns of different
//! files.
//!
//! Entries are keyed by the SHA-256 checksum of the file contents and reachable
//! through any path that was loaded with those contents. Reloading a path whose
//! contents changed replaces the entry and drops every relationship that
//! pointed at the old checksum.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::{CatalogueConfig, DEFAULT_SAMPLE_ROWS},
    dataset::Dataset,
    error::CatalogueError,
    io_utils,
    metadata::{
        ColumnMetadata, DEFAULT_CATEGORICAL_MAX_DISTINCT, Relationship, infer_column_types,
    },
};

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub sample_rows: usize,
    pub categorical_max_distinct: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            categorical_max_distinct: DEFAULT_CATEGORICAL_MAX_DISTINCT,
        }
    }
}

impl LoadOptions {
    pub fn from_config(config: &CatalogueConfig) -> Result<Self> {
        Ok(Self {
            delimiter: config.delimiter_byte()?,
            encoding: config.encoding()?,
            sample_rows: config.sample_rows,
            categorical_max_distinct: config.categorical_max_distinct,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataManifest {
    pub path: PathBuf,
    pub byte_size: u64,
    pub row_count: usize,
    pub column_count: usize,
}

#[derive(Debug, Clone)]
pub struct FileCatalogueEntry {
    checksum: String,
    manifest: DataManifest,
    dataset: Dataset,
    columns: Vec<ColumnMetadata>,
    tags: BTreeMap<String, String>,
}

impl FileCatalogueEntry {
    pub fn build(path: &Path, options: &LoadOptions) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let raw = io_utils::read_raw_table(path, delimiter, options.encoding)?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = raw.headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(CatalogueError::DuplicateColumn {
                path: path.to_path_buf(),
                column: duplicate.clone(),
            }
            .into());
        }
        if let Some((idx, row)) = raw
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != raw.headers.len())
        {
            return Err(CatalogueError::RaggedRow {
                path: path.to_path_buf(),
                row: idx + 2,
                expected: raw.headers.len(),
                found: row.len(),
            }
            .into());
        }

        let types = infer_column_types(raw.headers.len(), &raw.rows, options.sample_rows);
        let dataset = Dataset::from_rows(&raw.headers, &types, &raw.rows);
        let columns = dataset
            .columns()
            .iter()
            .map(|column| {
                ColumnMetadata::profile(
                    &column.name,
                    column.datatype,
                    &column.values,
                    options.categorical_max_distinct,
                )
            })
            .collect();

        Ok(FileCatalogueEntry {
            checksum: raw.checksum,
            manifest: DataManifest {
                path: path.to_path_buf(),
                byte_size: raw.byte_size,
                row_count: dataset.row_count(),
                column_count: dataset.column_count(),
            },
            dataset,
            columns,
            tags: BTreeMap::from([
                ("delimiter".to_string(), io_utils::printable_delimiter(delimiter)),
                ("encoding".to_string(), options.encoding.name().to_string()),
                ("loaded_at".to_string(), Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            ]),
        })
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Path the entry was loaded from. Other loaded paths with identical
    /// contents share the entry; [`CatalogueIndex::paths_for`] lists them.
    pub fn path(&self) -> &Path {
        &self.manifest.path
    }

    pub fn manifest(&self) -> &DataManifest {
        &self.manifest
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Outcome of [`CatalogueIndex::add_relationship`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipUpdate {
    Inserted,
    Replaced,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnknownOriginFile(PathBuf),
    UnknownTargetFile(PathBuf),
    UnknownOriginColumn(String),
    UnknownTargetColumn(String),
    InvalidCertainty,
}

impl fmt::Display for RelationshipUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipUpdate::Inserted => f.write_str("recorded"),
            RelationshipUpdate::Replaced => f.write_str("updated"),
            RelationshipUpdate::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownOriginFile(path) => write!(f, "origin file {path:?} is not loaded"),
            SkipReason::UnknownTargetFile(path) => write!(f, "target file {path:?} is not loaded"),
            SkipReason::UnknownOriginColumn(name) => write!(f, "origin column '{name}' not found"),
            SkipReason::UnknownTargetColumn(name) => write!(f, "target column '{name}' not found"),
            SkipReason::InvalidCertainty => f.write_str("certainty is not a number"),
        }
    }
}

#[derive(Debug, Default)]
pub struct CatalogueIndex {
    options: LoadOptions,
    entries: HashMap<String, FileCatalogueEntry>,
    paths: BTreeMap<PathBuf, String>,
}

impl CatalogueIndex {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
            paths: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `path`, profiles its columns and stores it under both the path
    /// and the checksum index.
    pub fn load(&mut self, path: &Path) -> Result<&FileCatalogueEntry> {
        let entry = FileCatalogueEntry::build(path, &self.options)
            .with_context(|| format!("Loading {path:?} into the catalogue"))?;
        let checksum = entry.checksum.clone();

        match self.paths.get(path).cloned() {
            Some(previous) if previous == checksum => {
                debug!("{path:?} unchanged ({checksum}); keeping existing entry");
            }
            Some(previous) => {
                self.paths.remove(path);
                self.release_checksum(&previous);
            }
            None => {}
        }

        self.paths.insert(path.to_path_buf(), checksum.clone());
        let stored = self.entries.entry(checksum).or_insert_with(|| {
            info!(
                "Catalogued {:?}: {} row(s), {} column(s)",
                entry.manifest.path, entry.manifest.row_count, entry.manifest.column_count
            );
            entry
        });
        Ok(&*stored)
    }

    /// Loads every tabular file under `dir`, skipping hidden entries (names
    /// starting with `.` or `_`). Files that fail to load are logged and
    /// skipped. Returns the checksums loaded.
    pub fn load_directory(&mut self, dir: &Path) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Err(anyhow::anyhow!("Data directory {dir:?} does not exist"));
        }
        let mut checksums = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = entry.with_context(|| format!("Scanning {dir:?}"))?;
            let path = entry.path();
            if !entry.file_type().is_file() || !io_utils::is_tabular_file(path) {
                continue;
            }
            match self.load(path) {
                Ok(loaded) => checksums.push(loaded.checksum.clone()),
                Err(err) => warn!("Skipping {path:?}: {err:#}"),
            }
        }
        info!("Loaded {} file(s) from {dir:?}", checksums.len());
        Ok(checksums)
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&FileCatalogueEntry> {
        self.paths
            .get(path)
            .and_then(|checksum| self.entries.get(checksum))
    }

    pub fn get_by_checksum(&self, checksum: &str) -> Option<&FileCatalogueEntry> {
        self.entries.get(checksum)
    }

    /// Every loaded path whose contents hash to `checksum`, sorted.
    pub fn paths_for(&self, checksum: &str) -> Vec<&Path> {
        self.paths
            .iter()
            .filter(|(_, c)| c.as_str() == checksum)
            .map(|(path, _)| path.as_path())
            .collect()
    }

    /// Looks `path` up, loading it first when it is not catalogued yet.
    pub fn get_or_load(&mut self, path: &Path) -> Result<&FileCatalogueEntry> {
        if self.paths.contains_key(path) {
            return self
                .get_by_path(path)
                .ok_or_else(|| CatalogueError::UnknownPath(path.to_path_buf()).into());
        }
        self.load(path)
    }

    /// Sorted loaded paths, leaving out `excluding` (the file being viewed).
    pub fn list_loaded_paths(&self, excluding: Option<&Path>) -> Vec<PathBuf> {
        self.paths
            .keys()
            .filter(|path| Some(path.as_path()) != excluding)
            .cloned()
            .collect()
    }

    /// Records that `origin_column` of `origin_path` relates to
    /// `target_column` of `target_path`. Unresolvable files or columns leave
    /// the index untouched; the returned value says why.
    pub fn add_relationship(
        &mut self,
        origin_path: &Path,
        target_path: &Path,
        origin_column: &str,
        target_column: &str,
        certainty: f64,
    ) -> RelationshipUpdate {
        let outcome = self.try_add_relationship(
            origin_path,
            target_path,
            origin_column,
            target_column,
            certainty,
        );
        match &outcome {
            RelationshipUpdate::Skipped(reason) => warn!(
                "Relationship {origin_path:?}:{origin_column} -> {target_path:?}:{target_column} not recorded: {reason}"
            ),
            _ => debug!(
                "Relationship {origin_path:?}:{origin_column} -> {target_path:?}:{target_column} at {certainty}"
            ),
        }
        outcome
    }

    fn try_add_relationship(
        &mut self,
        origin_path: &Path,
        target_path: &Path,
        origin_column: &str,
        target_column: &str,
        certainty: f64,
    ) -> RelationshipUpdate {
        if certainty.is_nan() {
            return RelationshipUpdate::Skipped(SkipReason::InvalidCertainty);
        }
        let Some(target) = self.get_by_path(target_path) else {
            return RelationshipUpdate::Skipped(SkipReason::UnknownTargetFile(
                target_path.to_path_buf(),
            ));
        };
        if target.column(target_column).is_none() {
            return RelationshipUpdate::Skipped(SkipReason::UnknownTargetColumn(
                target_column.to_string(),
            ));
        }
        let target_checksum = target.checksum.clone();

        let Some(origin) = self
            .paths
            .get(origin_path)
            .and_then(|checksum| self.entries.get_mut(checksum))
        else {
            return RelationshipUpdate::Skipped(SkipReason::UnknownOriginFile(
                origin_path.to_path_buf(),
            ));
        };
        let Some(column) = origin.column_mut(origin_column) else {
            return RelationshipUpdate::Skipped(SkipReason::UnknownOriginColumn(
                origin_column.to_string(),
            ));
        };
        let replaced = column.upsert_relationship(Relationship {
            target_checksum,
            target_column_name: target_column.to_string(),
            certainty: certainty.clamp(0.0, 100.0),
        });
        if replaced {
            RelationshipUpdate::Replaced
        } else {
            RelationshipUpdate::Inserted
        }
    }

    /// Attaches a free-form tag to the entry loaded from `path`, replacing
    /// any earlier value under `key`.
    pub fn set_tag(&mut self, path: &Path, key: &str, value: &str) -> Result<(), CatalogueError> {
        self.entry_mut(path)?
            .tags
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Deletes the tag `key`; returns its value, or `None` when it was absent.
    pub fn remove_tag(
        &mut self,
        path: &Path,
        key: &str,
    ) -> Result<Option<String>, CatalogueError> {
        Ok(self.entry_mut(path)?.tags.remove(key))
    }

    fn entry_mut(&mut self, path: &Path) -> Result<&mut FileCatalogueEntry, CatalogueError> {
        self.paths
            .get(path)
            .and_then(|checksum| self.entries.get_mut(checksum))
            .ok_or_else(|| CatalogueError::UnknownPath(path.to_path_buf()))
    }

    /// Removes `path` from the index. The entry itself goes away once no other
    /// path shares its checksum, together with every relationship targeting it.
    pub fn remove(&mut self, path: &Path) -> Option<FileCatalogueEntry> {
        let checksum = self.paths.remove(path)?;
        self.release_checksum(&checksum)
    }

    /// Resolves a relationship's target file for display.
    pub fn target_path(&self, relationship: &Relationship) -> Option<&Path> {
        self.entries
            .get(&relationship.target_checksum)
            .map(FileCatalogueEntry::path)
    }

    fn release_checksum(&mut self, checksum: &str) -> Option<FileCatalogueEntry> {
        let remaining = self.paths_for(checksum).first().map(|p| p.to_path_buf());
        if let Some(remaining) = remaining {
            if let Some(entry) = self.entries.get_mut(checksum)
                && entry.manifest.path != remaining
            {
                debug!("{:?} released; entry now reported as {remaining:?}", entry.manifest.path);
                entry.manifest.path = remaining;
            }
            return None;
        }
        let removed = self.entries.remove(checksum)?;
        let dropped: usize = self
            .entries
            .values_mut()
            .flat_map(|entry| entry.columns.iter_mut())
            .map(|column| column.remove_relationships_to(checksum))
            .sum();
        if dropped > 0 {
            warn!(
                "Dropped {dropped} relationship(s) pointing at {:?} ({checksum})",
                removed.manifest.path
            );
        }
        Some(removed)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}
