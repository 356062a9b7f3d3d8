//! File overview: manifest, numeric summaries, tags and a head preview.

use std::{fmt::Write as _, path::Path};

use anyhow::Result;
use itertools::Itertools;
use log::info;

use crate::{
    catalogue::CatalogueIndex,
    cli::OverviewArgs,
    error::CatalogueError,
    stats::format_number,
    table,
};

pub fn execute(args: &OverviewArgs, index: &mut CatalogueIndex) -> Result<()> {
    let row_count = index.get_or_load(&args.file)?.manifest().row_count;
    print!("{}", render(index, &args.file, args.rows)?);
    info!(
        "Described {:?} with {} preview row(s)",
        args.file,
        args.rows.min(row_count)
    );
    Ok(())
}

/// Renders the file loaded as `path`. Paths sharing its contents are listed
/// after the requested one.
pub fn render(index: &CatalogueIndex, path: &Path, preview_rows: usize) -> Result<String> {
    let entry = index
        .get_by_path(path)
        .ok_or_else(|| CatalogueError::UnknownPath(path.to_path_buf()))?;
    let manifest = entry.manifest();
    let mut output = String::new();
    let _ = writeln!(output, "File: {}", path.display());
    let duplicates = index
        .paths_for(entry.checksum())
        .into_iter()
        .filter(|other| *other != path)
        .map(|other| other.display().to_string())
        .join(", ");
    if !duplicates.is_empty() {
        let _ = writeln!(output, "Same contents as: {duplicates}");
    }
    let _ = writeln!(output, "Checksum: {}", entry.checksum());
    let _ = writeln!(
        output,
        "Size: {} byte(s)  Rows: {}  Columns: {}",
        manifest.byte_size, manifest.row_count, manifest.column_count
    );

    let numeric_rows = entry
        .columns()
        .iter()
        .filter_map(|column| {
            column.numeric.map(|summary| {
                vec![
                    column.name.clone(),
                    format_number(summary.mean),
                    format_number(summary.maximum),
                    format_number(summary.minimum),
                ]
            })
        })
        .collect::<Vec<_>>();
    let _ = writeln!(output);
    if numeric_rows.is_empty() {
        let _ = writeln!(output, "No numeric columns.");
    } else {
        let headers = ["name", "mean", "maximum", "minimum"].map(String::from);
        output.push_str(&table::render_table(&headers, &numeric_rows));
    }

    let _ = writeln!(output);
    let tag_rows = entry
        .tags()
        .iter()
        .map(|(key, value)| vec![key.clone(), value.clone()])
        .collect::<Vec<_>>();
    if tag_rows.is_empty() {
        let _ = writeln!(output, "No tags.");
    } else {
        output.push_str(&table::render_table(&["tag", "value"].map(String::from), &tag_rows));
    }

    let _ = writeln!(output);
    let head = entry.dataset().head(preview_rows);
    if head.is_empty() {
        let _ = writeln!(output, "No rows to preview.");
    } else {
        output.push_str(&table::render_table(&entry.dataset().column_names(), &head));
    }
    Ok(output)
}
