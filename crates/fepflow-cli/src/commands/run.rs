use crate::cli::RunArgs;
use crate::config::builder::build_config;
use crate::config::models::AppConfig;
use crate::error::Result;
use crate::fetch;
use crate::utils::progress::CliProgressHandler;
use fepflow::engine::progress::ProgressReporter;
use fepflow::engine::report::PipelineReport;
use fepflow::engine::runner::{ProcessRunner, SystemRunner};
use fepflow::workflows::fep;
use tracing::{info, warn};

pub async fn run(args: RunArgs) -> Result<()> {
    if args.fetch {
        let existing = fetch::tutorial_dir(&args.source.dest);
        if existing.is_dir() {
            info!("{:?} already present, skipping fetch.", &existing);
            println!("Using existing tutorial files in: {}", existing.display());
        } else {
            super::fetch::fetch_tutorial(&args.source, false).await?;
        }
    }

    info!("Merging configuration from defaults, file and CLI arguments...");
    let app = build_config(&args.pipeline, &args.source.dest)?;
    let runner = SystemRunner::new(app.core_config.engine.environment.clone());

    tokio::task::block_in_place(|| run_pipeline(&app, &runner))
}

/// Runs the workflow and writes the run manifest, also after a failed stage.
fn run_pipeline(app: &AppConfig, runner: &dyn ProcessRunner) -> Result<()> {
    let config = &app.core_config;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Running the free-energy protocol in {} with {} lambda window(s)...",
        app.workdir.display(),
        config.lambda.windows
    );
    info!("Invoking the core free-energy workflow...");

    let mut report = PipelineReport::new(&app.workdir);
    let result = fep::run_with_report(&app.workdir, config, runner, &reporter, &mut report);

    match result {
        Ok(()) => {
            let manifest = report.write_manifest()?;
            info!("Run manifest written to {:?}", &manifest);
            println!(
                "✓ {} stage(s) completed. Window directories:",
                report.stages.len()
            );
            for dir in report.window_directories() {
                println!("  {}", dir.display());
            }
            println!("Run manifest: {}", manifest.display());
            Ok(())
        }
        Err(e) => {
            if !report.stages.is_empty() {
                match report.write_manifest() {
                    Ok(manifest) => {
                        eprintln!("Partial run manifest: {}", manifest.display())
                    }
                    Err(manifest_error) => {
                        warn!("Could not write run manifest: {}", manifest_error)
                    }
                }
            }
            if let Some(output) = e.engine_output() {
                eprintln!("--- last engine output ---\n{}", output);
            }
            Err(e.into())
        }
    }
}
