use crate::cli::{FetchArgs, SourceArgs};
use crate::error::Result;
use crate::fetch::{ArchiveFetcher, ArchiveSource, FetchProgress};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let tutorial = fetch_tutorial(&args.source, args.force).await?;
    println!("Tutorial files are in: {}", tutorial.display());
    Ok(())
}

/// Fetches and unpacks the tutorial archive, returning the tutorial directory.
pub async fn fetch_tutorial(source_args: &SourceArgs, force: bool) -> Result<PathBuf> {
    let fetcher = ArchiveFetcher::new(&source_args.dest);
    let source = ArchiveSource::from_args(source_args.url.as_deref(), source_args.archive.as_deref());
    info!("Fetching tutorial archive from {:?}", &source);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .expect("Failed to create download style template")
        .progress_chars("#>-"),
    );
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr_with_hz(2));

    let progress_callback = |progress: FetchProgress| match progress {
        FetchProgress::DownloadStarted { total_size } => {
            if let Some(size) = total_size {
                pb.set_length(size);
            }
            pb.set_message("Downloading...");
        }
        FetchProgress::Downloading { downloaded } => {
            pb.set_position(downloaded);
        }
        FetchProgress::Unpacking => {
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg}")
                    .expect("Failed to create spinner style template"),
            );
            pb.set_message("Unpacking archive...");
        }
    };

    match fetcher.fetch(&source, force, progress_callback).await {
        Ok(tutorial) => {
            pb.finish_with_message("✓ Tutorial archive unpacked.");
            Ok(tutorial)
        }
        Err(e) => {
            pb.finish_with_message("✗ Fetch failed.");
            Err(e.into())
        }
    }
}
