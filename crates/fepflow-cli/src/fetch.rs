use flate2::read::GzDecoder;
use futures_util::StreamExt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const TUTORIAL_NAME: &str = "gromacs-free-energy-tutorial";
pub const DEFAULT_URL: &str =
    "http://www.gromacs.org/@api/deki/files/261/=gromacs-free-energy-tutorial.tgz";

#[derive(Debug, Clone, Copy)]
pub enum FetchProgress {
    DownloadStarted { total_size: Option<u64> },
    Downloading { downloaded: u64 },
    Unpacking,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Download failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not unpack archive '{}': {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' already exists. Use --force to overwrite.", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Archive '{}' contained no usable files", path.display())]
    EmptyArchive { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    Remote(String),
    Local(PathBuf),
}

impl ArchiveSource {
    pub fn from_args(url: Option<&str>, archive: Option<&Path>) -> Self {
        match (archive, url) {
            (Some(path), _) => ArchiveSource::Local(path.to_path_buf()),
            (None, Some(url)) => ArchiveSource::Remote(url.to_string()),
            (None, None) => ArchiveSource::Remote(DEFAULT_URL.to_string()),
        }
    }
}

/// Directory the tutorial archive unpacks to under `dest`.
pub fn tutorial_dir(dest: &Path) -> PathBuf {
    dest.join(TUTORIAL_NAME)
}

#[derive(Debug)]
pub struct ArchiveFetcher {
    dest: PathBuf,
}

impl ArchiveFetcher {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        let dest = dest.into();
        debug!("ArchiveFetcher initialized with destination: {:?}", &dest);
        Self { dest }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dest.join(format!("{}.tgz", TUTORIAL_NAME))
    }

    pub fn tutorial_dir(&self) -> PathBuf {
        tutorial_dir(&self.dest)
    }

    /// Obtains the archive and unpacks it, returning the tutorial directory.
    pub async fn fetch(
        &self,
        source: &ArchiveSource,
        force: bool,
        mut progress_callback: impl FnMut(FetchProgress),
    ) -> Result<PathBuf, FetchError> {
        let target = self.tutorial_dir();
        if target.exists() {
            if force {
                info!("--force specified, removing existing directory {:?}.", &target);
                fs::remove_dir_all(&target).map_err(|source| FetchError::Io {
                    path: target.clone(),
                    source,
                })?;
            } else {
                return Err(FetchError::AlreadyExists { path: target });
            }
        }
        fs::create_dir_all(&self.dest).map_err(|source| FetchError::Io {
            path: self.dest.clone(),
            source,
        })?;

        let archive = match source {
            ArchiveSource::Remote(url) => self.download(url, &mut progress_callback).await?,
            ArchiveSource::Local(path) => {
                info!("Using local archive {:?}", path);
                path.clone()
            }
        };

        progress_callback(FetchProgress::Unpacking);
        info!("Unpacking {:?} into {:?}", &archive, &self.dest);
        let file = File::open(&archive).map_err(|source| FetchError::Io {
            path: archive.clone(),
            source,
        })?;
        let unpacked = extract_archive(file, &self.dest).map_err(|source| FetchError::Extract {
            path: archive.clone(),
            source,
        })?;
        if unpacked == 0 {
            return Err(FetchError::EmptyArchive { path: archive });
        }

        info!("Unpacked {} file(s).", unpacked);
        if !target.is_dir() {
            warn!(
                "Archive did not contain the expected '{}' directory.",
                TUTORIAL_NAME
            );
        }
        Ok(target)
    }

    async fn download(
        &self,
        url: &str,
        progress_callback: &mut impl FnMut(FetchProgress),
    ) -> Result<PathBuf, FetchError> {
        let path = self.archive_path();
        info!("Sending request to {}", url);
        let client = reqwest::Client::new();
        let response = client.get(url).send().await?.error_for_status()?;

        let total_size = response.content_length();
        progress_callback(FetchProgress::DownloadStarted { total_size });

        let io_error = |source| FetchError::Io {
            path: path.clone(),
            source,
        };
        let mut file = File::create(&path).map_err(io_error)?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(item) = stream.next().await {
            let chunk = item?;
            file.write_all(&chunk).map_err(io_error)?;
            downloaded += chunk.len() as u64;
            progress_callback(FetchProgress::Downloading { downloaded });
        }
        file.flush().map_err(io_error)?;

        info!("Downloaded {} bytes to {:?}", downloaded, &path);
        Ok(path)
    }
}

/// Unpacks a gzip-compressed tarball into `dest` and returns the number of
/// entries written.
///
/// Entries whose path contains an underscore are skipped; the tutorial tarball
/// carries resource-fork files (`._name`) next to the real ones. Entries that
/// would land outside `dest` are refused.
pub fn extract_archive<R: Read>(reader: R, dest: &Path) -> io::Result<usize> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut unpacked = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if path.to_string_lossy().contains('_') {
            debug!("Skipping archive entry {:?}", &path);
            continue;
        }
        if entry.unpack_in(dest)? {
            unpacked += 1;
        } else {
            warn!("Refusing archive entry outside destination: {:?}", &path);
        }
    }

    Ok(unpacked)
}
