//! `generate` command: synthetic CSV files written into the data directory.
//!
//! Every file starts with an `index` column of the requested kind. The value
//! columns (`continuous_N` floats, then `categoric_N` labels) are dealt
//! round-robin across `spread` files, so files generated together share their
//! index values and can be compared against each other.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use chrono::DateTime;
use log::{info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    cli::{GenerateArgs, IndexKind},
    config::CatalogueConfig,
    io_utils, table,
};

pub const INDEX_COLUMN: &str = "index";
/// 2020-01-01T00:00:00Z
const DATETIME_INDEX_START: i64 = 1_577_836_800;
const DATETIME_INDEX_STEP: i64 = 3_600;
const LABELS: &[&str] = &["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];

#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub name: String,
    pub rows: usize,
    pub index: IndexKind,
    pub continuous: usize,
    pub categoric: usize,
    pub spread: usize,
}

impl From<&GenerateArgs> for GenerationPlan {
    fn from(args: &GenerateArgs) -> Self {
        Self {
            name: args.name.clone(),
            rows: args.rows,
            index: args.index,
            continuous: args.continuous,
            categoric: args.categoric,
            spread: args.spread,
        }
    }
}

impl GenerationPlan {
    fn validate(&self) -> Result<()> {
        ensure!(self.spread >= 1, "File spread must be at least 1");
        let value_columns = self.continuous + self.categoric;
        ensure!(
            self.spread <= value_columns.max(1),
            "Cannot spread {value_columns} value column(s) across {} files",
            self.spread
        );
        Ok(())
    }

    /// Output paths under `dir`: `<name>.csv`, or `<name>_1.csv` ... when the
    /// columns are spread over several files. A `.csv`/`.tsv` extension on
    /// the name is kept.
    pub fn file_paths(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let name = Path::new(self.name.trim());
        ensure!(
            matches!(
                name.components().collect::<Vec<_>>().as_slice(),
                [Component::Normal(_)]
            ),
            "File name '{}' must be a plain name inside the data directory",
            self.name
        );
        let (base, extension) = if io_utils::is_tabular_file(name) {
            let stem = name.file_stem().and_then(|s| s.to_str());
            let ext = name.extension().and_then(|e| e.to_str());
            match (stem, ext) {
                (Some(stem), Some(ext)) => (stem, ext),
                _ => return Err(anyhow!("File name '{}' is not valid UTF-8", self.name)),
            }
        } else {
            (self.name.trim(), "csv")
        };
        if self.spread == 1 {
            return Ok(vec![dir.join(format!("{base}.{extension}"))]);
        }
        Ok((1..=self.spread)
            .map(|n| dir.join(format!("{base}_{n}.{extension}")))
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueColumn {
    Continuous { centre: f64, scale: f64 },
    Categoric { labels: usize },
}

impl ValueColumn {
    fn sample<R: Rng>(&self, rng: &mut R) -> String {
        match *self {
            ValueColumn::Continuous { centre, scale } => {
                format!("{:.3}", centre + rng.gen_range(-scale..scale))
            }
            ValueColumn::Categoric { labels } => LABELS[rng.gen_range(0..labels)].to_string(),
        }
    }
}

/// One written file and its header.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub columns: Vec<String>,
}

fn index_value<R: Rng>(kind: IndexKind, row: usize, rng: &mut R) -> Result<String> {
    match kind {
        IndexKind::Counter => Ok(row.to_string()),
        IndexKind::Categoric => Ok(LABELS[rng.gen_range(0..LABELS.len())].to_string()),
        IndexKind::Datetime => {
            let seconds = i64::try_from(row)
                .ok()
                .and_then(|row| row.checked_mul(DATETIME_INDEX_STEP))
                .and_then(|offset| offset.checked_add(DATETIME_INDEX_START));
            seconds
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .map(|stamp| stamp.format("%Y-%m-%d %H:%M:%S").to_string())
                .ok_or_else(|| anyhow!("Row {row} is beyond the datetime index range"))
        }
    }
}

/// Writes the files of `plan` into `dir`, creating it when missing.
pub fn generate<R: Rng>(
    plan: &GenerationPlan,
    dir: &Path,
    delimiter: Option<u8>,
    rng: &mut R,
) -> Result<Vec<GeneratedFile>> {
    plan.validate()?;
    let paths = plan.file_paths(dir)?;
    fs::create_dir_all(dir).with_context(|| format!("Creating data directory {dir:?}"))?;

    let mut columns = Vec::with_capacity(plan.continuous + plan.categoric);
    for n in 1..=plan.continuous {
        let column = ValueColumn::Continuous {
            centre: rng.gen_range(-100.0..100.0),
            scale: rng.gen_range(1.0..50.0),
        };
        columns.push((format!("continuous_{n}"), column));
    }
    for n in 1..=plan.categoric {
        let column = ValueColumn::Categoric {
            labels: rng.gen_range(2..=LABELS.len()),
        };
        columns.push((format!("categoric_{n}"), column));
    }
    let index = (0..plan.rows)
        .map(|row| index_value(plan.index, row, rng))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(paths.len());
    for (file_no, path) in paths.into_iter().enumerate() {
        let owned = columns
            .iter()
            .enumerate()
            .filter(|(n, _)| n % plan.spread == file_no)
            .map(|(_, column)| column)
            .collect::<Vec<_>>();
        let header = std::iter::once(INDEX_COLUMN.to_string())
            .chain(owned.iter().map(|(name, _)| name.clone()))
            .collect::<Vec<_>>();

        if path.exists() {
            warn!("Overwriting {path:?}");
        }
        let delimiter = io_utils::resolve_input_delimiter(&path, delimiter);
        let mut writer = io_utils::open_csv_writer(&path, delimiter)?;
        writer
            .write_record(&header)
            .with_context(|| format!("Writing header to {path:?}"))?;
        for index_value in &index {
            let mut record = Vec::with_capacity(header.len());
            record.push(index_value.clone());
            record.extend(owned.iter().map(|(_, column)| column.sample(rng)));
            writer
                .write_record(&record)
                .with_context(|| format!("Writing row to {path:?}"))?;
        }
        writer
            .flush()
            .with_context(|| format!("Flushing {path:?}"))?;
        written.push(GeneratedFile {
            path,
            columns: header,
        });
    }
    Ok(written)
}

pub fn execute(args: &GenerateArgs, config: &CatalogueConfig) -> Result<()> {
    let plan = GenerationPlan::from(args);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let written = generate(&plan, &config.data_dir, config.delimiter_byte()?, &mut rng)
        .with_context(|| format!("Generating '{}' in {:?}", plan.name, config.data_dir))?;
    let rows = written
        .iter()
        .map(|file| {
            vec![
                file.path.display().to_string(),
                plan.rows.to_string(),
                file.columns.join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&["path", "rows", "columns"].map(String::from), &rows);
    info!(
        "Generated {} file(s) with {} row(s) in {:?}",
        written.len(),
        plan.rows,
        config.data_dir
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalogue::CatalogueIndex,
        metadata::{ColumnKind, ColumnType},
    };
    use tempfile::tempdir;

    fn plan(
        name: &str,
        index: IndexKind,
        continuous: usize,
        categoric: usize,
        spread: usize,
    ) -> GenerationPlan {
        GenerationPlan {
            name: name.to_string(),
            rows: 4,
            index,
            continuous,
            categoric,
            spread,
        }
    }

    #[test]
    fn seeded_runs_write_identical_files() {
        let (first, second) = (tempdir().expect("temp dir"), tempdir().expect("temp dir"));
        let plan = plan("spam", IndexKind::Categoric, 2, 2, 1);
        let run = |dir: &Path| {
            generate(&plan, dir, None, &mut StdRng::seed_from_u64(7)).expect("generate")
        };
        let (a, b) = (run(first.path()), run(second.path()));
        assert_eq!(
            fs::read_to_string(&a[0].path).expect("read first"),
            fs::read_to_string(&b[0].path).expect("read second")
        );
    }

    #[test]
    fn value_columns_are_spread_round_robin_over_a_shared_index() {
        let dir = tempdir().expect("temp dir");
        let written = generate(
            &plan("spam", IndexKind::Counter, 2, 1, 2),
            dir.path(),
            None,
            &mut StdRng::seed_from_u64(1),
        )
        .expect("generate");

        assert_eq!(
            written.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
            vec![dir.path().join("spam_1.csv"), dir.path().join("spam_2.csv")]
        );
        assert_eq!(written[0].columns, vec!["index", "continuous_1", "categoric_1"]);
        assert_eq!(written[1].columns, vec!["index", "continuous_2"]);

        let mut index = CatalogueIndex::default();
        for file in &written {
            let entry = index.load(&file.path).expect("load generated file");
            assert_eq!(entry.manifest().row_count, 4);
            let ids = &entry.dataset().column(INDEX_COLUMN).expect("index").values;
            let ids = ids
                .iter()
                .map(|v| v.as_ref().map(|v| v.as_display()))
                .collect::<Vec<_>>();
            assert_eq!(ids, ["0", "1", "2", "3"].map(|v| Some(v.to_string())));
        }
        let first = index.get_by_path(&written[0].path).expect("first file");
        assert_eq!(
            first.column("continuous_1").expect("float").datatype,
            ColumnType::Float
        );
        assert_eq!(
            first.column("categoric_1").expect("labels").kind,
            ColumnKind::Categorical
        );
    }

    #[test]
    fn datetime_index_counts_hours_from_2020() {
        let dir = tempdir().expect("temp dir");
        let written = generate(
            &plan("hourly.tsv", IndexKind::Datetime, 1, 0, 1),
            dir.path(),
            None,
            &mut StdRng::seed_from_u64(3),
        )
        .expect("generate");
        assert_eq!(written[0].path, dir.path().join("hourly.tsv"));

        let text = fs::read_to_string(&written[0].path).expect("read");
        let index = text
            .lines()
            .skip(1)
            .filter_map(|line| line.split('\t').next())
            .collect::<Vec<_>>();
        assert_eq!(
            index,
            vec![
                "2020-01-01 00:00:00",
                "2020-01-01 01:00:00",
                "2020-01-01 02:00:00",
                "2020-01-01 03:00:00",
            ]
        );
        let mut catalogue = CatalogueIndex::default();
        let entry = catalogue.load(&written[0].path).expect("load");
        assert_eq!(
            entry.column(INDEX_COLUMN).expect("index").datatype,
            ColumnType::DateTime
        );
    }

    #[test]
    fn invalid_plans_are_rejected_before_writing() {
        let dir = tempdir().expect("temp dir");
        let mut rng = StdRng::seed_from_u64(0);
        for bad in [
            plan("spam", IndexKind::Counter, 1, 1, 0),
            plan("spam", IndexKind::Counter, 1, 1, 3),
            plan("../spam", IndexKind::Counter, 1, 1, 1),
            plan("nested/spam", IndexKind::Counter, 1, 1, 1),
        ] {
            assert!(generate(&bad, dir.path(), None, &mut rng).is_err(), "{bad:?}");
        }
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn names_without_a_tabular_extension_get_csv() {
        let dir = Path::new("data");
        assert_eq!(
            plan("report.v2", IndexKind::Counter, 1, 0, 1)
                .file_paths(dir)
                .expect("paths"),
            vec![dir.join("report.v2.csv")]
        );
        assert_eq!(
            plan("report.csv", IndexKind::Counter, 1, 1, 2)
                .file_paths(dir)
                .expect("paths"),
            vec![dir.join("report_1.csv"), dir.join("report_2.csv")]
        );
    }
}
