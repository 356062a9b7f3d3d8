pub mod approval;
pub mod catalogue;
pub mod cli;
pub mod columns;
pub mod compare;
pub mod config;
pub mod data;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod generate;
pub mod io_utils;
pub mod metadata;
pub mod methods;
pub mod overview;
pub mod stats;
pub mod table;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    catalogue::{CatalogueIndex, LoadOptions},
    cli::{Cli, Commands, GlobalArgs},
    config::CatalogueConfig,
    methods::ComparisonMethod,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_catalogue", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = resolve_config(&cli.global)?;
    match cli.command {
        Commands::List => handle_list(&config),
        Commands::Overview(mut args) => {
            args.file = resolve_input(&config, &args.file);
            overview::execute(&args, &mut open_index(&config)?)
        }
        Commands::Columns(mut args) => {
            args.file = resolve_input(&config, &args.file);
            columns::execute(&args, &mut open_index(&config)?)
        }
        Commands::Methods => {
            handle_methods();
            Ok(())
        }
        Commands::Compare(mut args) => {
            args.origin = resolve_input(&config, &args.origin);
            args.target = resolve_input(&config, &args.target);
            compare::execute(&args, &mut open_index(&config)?)
        }
        Commands::Generate(args) => generate::execute(&args, &config),
    }
}

/// Loads the config file and applies command-line overrides on top of it.
pub fn resolve_config(global: &GlobalArgs) -> Result<CatalogueConfig> {
    let mut config = CatalogueConfig::resolve(global.config.as_deref())
        .context("Resolving catalogue configuration")?;
    if let Some(dir) = &global.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(delimiter) = global.delimiter {
        config.delimiter = Some(char::from(delimiter));
    }
    if let Some(encoding) = &global.input_encoding {
        config.input_encoding = Some(encoding.clone());
    }
    if let Some(sample_rows) = global.sample_rows {
        config.sample_rows = sample_rows;
    }
    debug!("Effective configuration: {config:?}");
    Ok(config)
}

fn open_index(config: &CatalogueConfig) -> Result<CatalogueIndex> {
    Ok(CatalogueIndex::new(LoadOptions::from_config(config)?))
}

/// Paths that do not exist as given are tried relative to the data directory.
fn resolve_input(config: &CatalogueConfig, path: &Path) -> PathBuf {
    if path.exists() || path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = config.data_dir.join(path);
    if candidate.exists() {
        debug!("Resolved {path:?} to {candidate:?}");
        candidate
    } else {
        path.to_path_buf()
    }
}

fn handle_list(config: &CatalogueConfig) -> Result<()> {
    let mut index = open_index(config)?;
    index
        .load_directory(&config.data_dir)
        .with_context(|| format!("Loading data directory {:?}", config.data_dir))?;
    let rows = index
        .list_loaded_paths(None)
        .into_iter()
        .filter_map(|path| {
            let entry = index.get_by_path(&path)?;
            let manifest = entry.manifest();
            Some(vec![
                path.display().to_string(),
                manifest.row_count.to_string(),
                manifest.column_count.to_string(),
                entry.checksum().chars().take(12).collect(),
            ])
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        info!("No tabular files found in {:?}", config.data_dir);
        return Ok(());
    }
    table::print_table(
        &["path", "rows", "columns", "checksum"].map(String::from),
        &rows,
    );
    info!("Listed {} file(s) from {:?}", rows.len(), config.data_dir);
    Ok(())
}

fn handle_methods() {
    let rows = ComparisonMethod::ALL
        .iter()
        .map(|method| {
            vec![
                method.id().to_string(),
                method.family().as_str().to_string(),
                method.description().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&["id", "family", "description"].map(String::from), &rows);
}
