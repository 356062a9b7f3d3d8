//! Launch configuration.
//!
//! Settings come from an optional YAML file; command-line flags override the
//! file. Every field has a default so an empty or missing file is valid.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{io_utils, metadata::DEFAULT_CATEGORICAL_MAX_DISTINCT};

pub const DEFAULT_CONFIG_FILE: &str = "catalogue.yml";
pub const DEFAULT_DATA_DIR: &str = "local_data";
pub const DEFAULT_SAMPLE_ROWS: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogueConfig {
    pub data_dir: PathBuf,
    /// Single-character delimiter; inferred from the file extension when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_encoding: Option<String>,
    /// Rows sampled for type inference (0 means every row).
    pub sample_rows: usize,
    pub categorical_max_distinct: usize,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            delimiter: None,
            input_encoding: None,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            categorical_max_distinct: DEFAULT_CATEGORICAL_MAX_DISTINCT,
        }
    }
}

impl CatalogueConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut contents = String::new();
        BufReader::new(file)
            .read_to_string(&mut contents)
            .with_context(|| format!("Reading config file {path:?}"))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).context("Parsing config YAML")
    }

    /// Loads `path` when given, else the default file when it exists, else
    /// the built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        self.delimiter
            .map(|c| {
                u8::try_from(c)
                    .ok()
                    .filter(u8::is_ascii)
                    .with_context(|| format!("Delimiter '{c}' must be a single ASCII character"))
            })
            .transpose()
    }

    pub fn encoding(&self) -> Result<&'static Encoding> {
        io_utils::resolve_encoding(self.input_encoding.as_deref())
    }
}
