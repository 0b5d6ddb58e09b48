pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

use directories::ProjectDirs;
use std::path::PathBuf;

/// `config.toml` in the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "fepflow", "fepflow").map(|dirs| dirs.config_dir().join("config.toml"))
}
