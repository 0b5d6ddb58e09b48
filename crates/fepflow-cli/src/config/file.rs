use crate::error::{CliError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileEngineConfig {
    pub binary: Option<String>,
    #[serde(rename = "path-prepend")]
    pub path_prepend: Option<Vec<PathBuf>>,
    #[serde(rename = "mpi-ranks")]
    pub mpi_ranks: Option<u32>,
    #[serde(rename = "production-threads")]
    pub production_threads: Option<u32>,
    pub env: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSystemConfig {
    pub solute: Option<String>,
    pub topology: Option<String>,
    #[serde(rename = "box-shape")]
    pub box_shape: Option<String>,
    pub padding: Option<f64>,
    pub solvent: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileLambdaConfig {
    pub windows: Option<usize>,
    pub schedule: Option<Vec<f64>>,
    #[serde(rename = "couple-moltype")]
    pub couple_moltype: Option<String>,
    pub parallel: Option<usize>,
}

/// Extra parameter-file entries per stage, applied on top of the presets.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileParametersConfig {
    pub minimization: Option<BTreeMap<String, toml::Value>>,
    pub equilibration: Option<BTreeMap<String, toml::Value>>,
    pub production: Option<BTreeMap<String, toml::Value>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub engine: Option<FileEngineConfig>,
    pub system: Option<FileSystemConfig>,
    pub lambda: Option<FileLambdaConfig>,
    pub parameters: Option<FileParametersConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Renders a TOML value the way the engine's parameter files spell it.
pub fn mdp_value(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(format!("{:?}", f)),
        toml::Value::Boolean(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(mdp_value)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(" ")),
        toml::Value::Datetime(_) | toml::Value::Table(_) => None,
    }
}
