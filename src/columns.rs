//! Column listing for a catalogued file.
//!
//! Renders each column's inferred datatype and kind, then every relationship
//! recorded from the file's columns with its certainty band.

use std::{fmt::Write as _, path::Path};

use anyhow::Result;
use log::info;

use crate::{
    catalogue::{CatalogueIndex, FileCatalogueEntry},
    cli::ColumnsArgs,
    error::CatalogueError,
    metadata::CertaintyBand,
    table,
};

pub fn execute(args: &ColumnsArgs, index: &mut CatalogueIndex) -> Result<()> {
    let column_count = index.get_or_load(&args.file)?.columns().len();
    print!("{}", render(index, &args.file)?);
    info!("Listed {column_count} column(s) from {:?}", args.file);
    Ok(())
}

pub fn render(index: &CatalogueIndex, path: &Path) -> Result<String> {
    let entry = index
        .get_by_path(path)
        .ok_or_else(|| CatalogueError::UnknownPath(path.to_path_buf()))?;
    let mut output = String::new();
    output.push_str(&table::render_table(
        &["#", "name", "type", "kind", "non-empty", "distinct"].map(String::from),
        &column_rows(entry),
    ));

    let relationship_rows = entry
        .columns()
        .iter()
        .flat_map(|column| {
            column.relationships().iter().map(|rel| {
                let target = index
                    .target_path(rel)
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| rel.target_checksum.clone());
                vec![
                    column.name.clone(),
                    target,
                    rel.target_column_name.clone(),
                    format!("{:.2}", rel.certainty),
                    CertaintyBand::from_certainty(rel.certainty)
                        .as_str()
                        .to_string(),
                ]
            })
        })
        .collect::<Vec<_>>();
    let _ = writeln!(output);
    if relationship_rows.is_empty() {
        let _ = writeln!(output, "No relationships recorded.");
    } else {
        output.push_str(&table::render_table(
            &["column", "target file", "target column", "certainty", "band"].map(String::from),
            &relationship_rows,
        ));
    }
    Ok(output)
}

fn column_rows(entry: &FileCatalogueEntry) -> Vec<Vec<String>> {
    entry
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.datatype.to_string(),
                column.kind.to_string(),
                column.non_empty.to_string(),
                column.distinct.to_string(),
            ]
        })
        .collect()
}
