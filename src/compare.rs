//! `compare` command: the similarity matrix between two catalogued files and
//! the relationships approved from it.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    approval::{ApprovalState, CandidateKey},
    catalogue::{CatalogueIndex, FileCatalogueEntry},
    cli::CompareArgs,
    columns,
    engine::{self, ComparisonSelection, SimilarityMatrix},
    error::CatalogueError,
    table,
};

#[derive(Debug, Serialize)]
struct MethodWeight {
    id: &'static str,
    weight: u32,
}

#[derive(Debug, Serialize)]
struct ApprovalOutcome {
    origin_column: String,
    target_column: String,
    certainty: Option<f64>,
    outcome: String,
}

#[derive(Debug, Serialize)]
struct CompareReport<'a> {
    origin: &'a Path,
    target: &'a Path,
    methods: Vec<MethodWeight>,
    origin_columns: &'a [String],
    target_columns: &'a [String],
    scores: &'a SimilarityMatrix,
    approvals: Vec<ApprovalOutcome>,
}

pub fn execute(args: &CompareArgs, index: &mut CatalogueIndex) -> Result<()> {
    let selection = ComparisonSelection::parse_specs(&args.methods)?;
    if selection.is_empty() {
        warn!("No comparison methods selected; every cell will be blank");
    }
    index.get_or_load(&args.origin)?;
    index.get_or_load(&args.target)?;

    let matrix = {
        let origin = lookup(index, &args.origin)?;
        let target = lookup(index, &args.target)?;
        let origin_columns =
            engine::active_columns(&origin.dataset().column_names(), &args.hide_origin);
        let target_columns =
            engine::active_columns(&target.dataset().column_names(), &args.hide_target);
        engine::compare(
            &selection,
            origin.into(),
            target.into(),
            &origin_columns,
            &target_columns,
        )
        .with_context(|| format!("Comparing {:?} with {:?}", args.origin, args.target))?
    };

    let mut approvals = ApprovalState::new();
    for spec in &args.approve {
        let key = CandidateKey::parse(spec).ok_or_else(|| {
            anyhow!("Approval '{spec}' must look like origin_column:target_column")
        })?;
        let selected = approvals
            .toggle_cell(&matrix, &key.origin_column, &key.target_column)
            .with_context(|| format!("Approving '{spec}'"))?;
        debug!("Approval '{spec}' is now {}", if selected { "on" } else { "off" });
    }
    let outcomes = approvals.commit(index, &args.origin, &args.target);

    if args.json {
        let report = CompareReport {
            origin: &args.origin,
            target: &args.target,
            methods: selection
                .entries()
                .iter()
                .map(|(method, weight)| MethodWeight {
                    id: method.id(),
                    weight: *weight,
                })
                .collect(),
            origin_columns: matrix.origin_columns(),
            target_columns: matrix.target_columns(),
            scores: &matrix,
            approvals: outcomes
                .iter()
                .map(|(key, update)| ApprovalOutcome {
                    origin_column: key.origin_column.clone(),
                    target_column: key.target_column.clone(),
                    certainty: approvals.certainty(key),
                    outcome: update.to_string(),
                })
                .collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Serializing comparison JSON")?
        );
    } else {
        table::print_table(&matrix.grid_headers(), &matrix.grid_rows());
        if !outcomes.is_empty() {
            println!();
            for (key, update) in &outcomes {
                println!("{} -> {}: {update}", key.origin_column, key.target_column);
            }
            println!();
            print!("{}", columns::render(index, &args.origin)?);
        }
    }
    info!(
        "Compared {:?} ({} column(s)) with {:?} ({} column(s)); {} approval(s)",
        args.origin,
        matrix.origin_columns().len(),
        args.target,
        matrix.target_columns().len(),
        outcomes.len()
    );
    Ok(())
}

fn lookup<'a>(index: &'a CatalogueIndex, path: &Path) -> Result<&'a FileCatalogueEntry> {
    index
        .get_by_path(path)
        .ok_or_else(|| CatalogueError::UnknownPath(path.to_path_buf()).into())
}
