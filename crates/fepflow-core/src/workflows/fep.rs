use crate::core::artifacts::Artifact;
use crate::engine::config::PipelineConfig;
use crate::engine::error::PipelineError;
use crate::engine::executor;
use crate::engine::invocation::Gmx;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::{PipelineReport, StageRecord};
use crate::engine::runner::ProcessRunner;
use crate::engine::stage::{self, Stage};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

/// The ordered stage list for a run in `workdir`, without executing anything.
pub fn plan(workdir: &Path, config: &PipelineConfig) -> Vec<Stage> {
    stage::plan(workdir, config)
}

#[instrument(skip_all, name = "fep_workflow")]
pub fn run(
    workdir: &Path,
    config: &PipelineConfig,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
) -> Result<PipelineReport, PipelineError> {
    let mut report = PipelineReport::new(workdir);
    run_with_report(workdir, config, runner, reporter, &mut report)?;
    Ok(report)
}

/// Runs the pipeline, recording every stage into `report` as it goes.
///
/// On error `report` holds everything executed up to and including the failed
/// stage, so the caller can still persist it.
pub fn run_with_report(
    workdir: &Path,
    config: &PipelineConfig,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    report: &mut PipelineReport,
) -> Result<(), PipelineError> {
    config.validate()?;
    preflight(workdir, config, runner)?;

    let stages = plan(workdir, config);
    info!(
        "Planned {} stage(s) with {} lambda window(s).",
        stages.len(),
        config.lambda.windows
    );

    let (windows, setup): (Vec<Stage>, Vec<Stage>) =
        stages.into_iter().partition(|s| s.id.window.is_some());

    for stage in &setup {
        run_stage(stage, runner, reporter, report)?;
    }

    run_windows(&windows, config.lambda.parallel, runner, reporter, report)?;

    report.completed = true;
    info!("All {} stage(s) completed.", report.stages.len());
    Ok(())
}

fn preflight(
    workdir: &Path,
    config: &PipelineConfig,
    runner: &dyn ProcessRunner,
) -> Result<(), PipelineError> {
    if !workdir.is_dir() {
        return Err(PipelineError::MissingWorkdir {
            path: workdir.to_path_buf(),
        });
    }

    let version_check = Gmx::new(&config.engine.binary).version(workdir);
    let output = runner
        .run(&version_check)
        .map_err(|source| PipelineError::EngineUnavailable {
            program: config.engine.binary.clone(),
            source,
        })?;
    if output.success {
        debug!(
            "Engine responded: {}",
            output.output.lines().find(|l| !l.trim().is_empty()).unwrap_or("")
        );
    } else {
        warn!(
            "`{}` exited with {:?}; continuing anyway.",
            version_check.command_line(),
            output.exit_code
        );
    }

    let files = config.system.files();
    for artifact in Artifact::ALL.into_iter().filter(|a| a.producer().is_none()) {
        let path = workdir.join(artifact.file_name(&files));
        if !path.is_file() {
            let first_consumer = artifact.consumers().first().copied().ok_or_else(|| {
                PipelineError::Internal(format!("{} has no consuming stage", artifact))
            })?;
            return Err(PipelineError::MissingInput {
                stage: stage::StageId::new(first_consumer),
                artifact,
                path,
            });
        }
    }
    Ok(())
}

fn run_stage(
    stage: &Stage,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    report: &mut PipelineReport,
) -> Result<(), PipelineError> {
    let mut record = StageRecord::new(stage);
    let result = executor::execute(stage, runner, reporter, &mut record);
    report.stages.push(record);
    result
}

fn run_windows(
    windows: &[Stage],
    parallel: usize,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    report: &mut PipelineReport,
) -> Result<(), PipelineError> {
    if windows.is_empty() {
        info!("No lambda windows requested; skipping production.");
        return Ok(());
    }
    reporter.report(Progress::WindowsStart {
        total: windows.len() as u64,
    });

    let result = if parallel <= 1 || windows.len() == 1 {
        run_windows_sequentially(windows, runner, reporter, report)
    } else {
        run_windows_in_parallel(windows, parallel, runner, reporter, report)
    };

    reporter.report(Progress::WindowsFinish);
    result
}

fn run_windows_sequentially(
    windows: &[Stage],
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    report: &mut PipelineReport,
) -> Result<(), PipelineError> {
    for stage in windows {
        run_stage(stage, runner, reporter, report)?;
        if let Some(window) = stage.id.window {
            reporter.report(Progress::WindowFinish { window });
        }
    }
    Ok(())
}

fn run_windows_in_parallel(
    windows: &[Stage],
    parallel: usize,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    report: &mut PipelineReport,
) -> Result<(), PipelineError> {
    let threads = window_workers(parallel, windows.len());
    info!(
        "Running {} lambda window(s) with up to {} at a time.",
        windows.len(),
        threads
    );
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| PipelineError::Internal(format!("Failed to build window pool: {}", e)))?;

    let cancelled = AtomicBool::new(false);
    let outcomes: Vec<(StageRecord, Result<(), PipelineError>)> = pool.install(|| {
        windows
            .par_iter()
            .filter_map(|stage| {
                if cancelled.load(Ordering::SeqCst) {
                    debug!("Skipping {} after an earlier window failed.", stage.id);
                    return None;
                }
                let mut record = StageRecord::new(stage);
                let result = executor::execute(stage, runner, reporter, &mut record);
                match (&result, stage.id.window) {
                    (Err(_), _) => cancelled.store(true, Ordering::SeqCst),
                    (Ok(()), Some(window)) => reporter.report(Progress::WindowFinish { window }),
                    (Ok(()), None) => {}
                }
                Some((record, result))
            })
            .collect()
    });

    let skipped = windows.len() - outcomes.len();
    if skipped > 0 {
        warn!("{} lambda window(s) were not started after a failure.", skipped);
    }

    let mut first_error = None;
    for (record, result) in outcomes {
        report.stages.push(record);
        if let Err(e) = result {
            if first_error.is_none() {
                first_error = Some(e);
            } else {
                warn!("Additional window failure: {}", e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Concurrent windows: the requested width, bounded by the window count and by
/// the size of the rayon pool the caller runs on (`-j` on the command line).
fn window_workers(parallel: usize, windows: usize) -> usize {
    parallel.min(windows).min(rayon::current_num_threads()).max(1)
}
