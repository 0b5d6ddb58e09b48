use super::MdpBlock;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigWriteError {
    #[error("Target directory does not exist: {}", path.display())]
    MissingDirectory { path: PathBuf },

    #[error("Failed to write parameter file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `block` verbatim to `directory/file_name`, replacing any existing file.
pub fn write_mdp(
    block: &MdpBlock,
    file_name: &str,
    directory: &Path,
) -> Result<PathBuf, ConfigWriteError> {
    if !directory.is_dir() {
        return Err(ConfigWriteError::MissingDirectory {
            path: directory.to_path_buf(),
        });
    }

    let path = directory.join(file_name);
    fs::write(&path, block.render()).map_err(|source| ConfigWriteError::Io {
        path: path.clone(),
        source,
    })?;
    debug!("Wrote {} parameter(s) to {:?}", block.len(), &path);
    Ok(path)
}
