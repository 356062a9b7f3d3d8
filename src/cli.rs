use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Catalogue CSV files and discover related columns",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command; each overrides the config file.
#[derive(Debug, Args, Default)]
pub struct GlobalArgs {
    /// YAML configuration file (defaults to catalogue.yml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory scanned for CSV/TSV files
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, global = true, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding", global = true)]
    pub input_encoding: Option<String>,
    /// Number of rows to sample when inferring types (0 means full scan)
    #[arg(long, global = true)]
    pub sample_rows: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the data directory and list every catalogued file
    List,
    /// Show the manifest, numeric summaries, tags and first rows of a file
    Overview(OverviewArgs),
    /// Show inferred column types, kinds and recorded relationships
    Columns(ColumnsArgs),
    /// List the available comparison methods
    Methods,
    /// Score column similarity between two files and approve relationships
    Compare(CompareArgs),
    /// Write synthetic CSV files into the data directory
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    /// File to describe (relative paths also resolve against the data directory)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
    /// Number of rows to preview
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// File whose columns to describe
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// File whose columns form the matrix columns
    #[arg(long)]
    pub origin: PathBuf,
    /// File whose columns form the matrix rows
    #[arg(long)]
    pub target: PathBuf,
    /// Comparison method as `id` or `id=weight`; repeatable
    #[arg(short = 'm', long = "method", action = ArgAction::Append)]
    pub methods: Vec<String>,
    /// Origin columns left out of the comparison
    #[arg(long = "hide-origin", value_delimiter = ',')]
    pub hide_origin: Vec<String>,
    /// Target columns left out of the comparison
    #[arg(long = "hide-target", value_delimiter = ',')]
    pub hide_target: Vec<String>,
    /// Toggle approval of `origin:target`; repeatable, applied in order
    #[arg(long = "approve", action = ArgAction::Append)]
    pub approve: Vec<String>,
    /// Emit the matrix and approvals as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

/// Values written to the leading column of generated files.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum IndexKind {
    /// Hourly timestamps starting 2020-01-01 00:00:00
    Datetime,
    /// 0, 1, 2, ...
    Counter,
    /// Labels drawn from a small pool
    Categoric,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// File name inside the data directory (".csv" is appended when missing)
    #[arg(long)]
    pub name: String,
    /// Rows written to every file
    #[arg(long, default_value_t = 100)]
    pub rows: usize,
    /// Leading index column shared by every file
    #[arg(long, value_enum, default_value_t = IndexKind::Counter)]
    pub index: IndexKind,
    /// Number of continuous (float) columns
    #[arg(long, default_value_t = 1)]
    pub continuous: usize,
    /// Number of categoric (label) columns
    #[arg(long, default_value_t = 1)]
    pub categoric: usize,
    /// Number of files the value columns are spread across
    #[arg(long, default_value_t = 1)]
    pub spread: usize,
    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases_resolve() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn compare_accepts_repeated_methods_and_hidden_lists() {
        let cli = Cli::try_parse_from([
            "csv-catalogue",
            "compare",
            "--origin",
            "a.csv",
            "--target",
            "b.csv",
            "-m",
            "name-exact",
            "--method",
            "value-overlap=2",
            "--hide-origin",
            "x,y",
            "--approve",
            "id:uid",
        ])
        .expect("parse compare");
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.methods, vec!["name-exact", "value-overlap=2"]);
        assert_eq!(args.hide_origin, vec!["x", "y"]);
        assert_eq!(args.approve, vec!["id:uid"]);
        assert!(!args.json);
    }

    #[test]
    fn generate_defaults_to_one_counter_indexed_file() {
        let cli = Cli::try_parse_from(["csv-catalogue", "generate", "--name", "spam"])
            .expect("parse generate");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.index, IndexKind::Counter);
        assert_eq!((args.rows, args.continuous, args.categoric, args.spread), (100, 1, 1, 1));
        assert!(args.seed.is_none());

        let cli = Cli::try_parse_from([
            "csv-catalogue",
            "generate",
            "--name",
            "spam",
            "--index",
            "datetime",
        ])
        .expect("parse datetime index");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.index, IndexKind::Datetime);
        assert!(
            Cli::try_parse_from(["csv-catalogue", "generate", "--name", "x", "--index", "uuid"])
                .is_err()
        );
    }
}
