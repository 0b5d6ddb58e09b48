use crate::core::mdp::writer::write_mdp;
use crate::engine::error::{PipelineError, StageFailure};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::{InvocationRecord, StageRecord};
use crate::engine::runner::ProcessRunner;
use crate::engine::stage::Stage;
use std::fs;
use tracing::{debug, info};

const OUTPUT_TAIL_LINES: usize = 20;

/// Executes one planned stage.
///
/// Order within a stage is fixed: inputs are checked, the stage directory is
/// created, seed files are copied in, the parameter file is written, and only then
/// are the engine calls issued one after another. Each call must exit successfully
/// and leave its declared artifacts behind before the next one starts. Progress is
/// appended to `record` as it happens so that a failed stage is still reported.
pub fn execute(
    stage: &Stage,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
    record: &mut StageRecord,
) -> Result<(), PipelineError> {
    reporter.report(Progress::StageStart { stage: stage.id });
    info!("Starting stage '{}' in {:?}", stage.id, &stage.directory);

    for input in &stage.inputs {
        if !input.path.is_file() {
            return Err(PipelineError::MissingInput {
                stage: stage.id,
                artifact: input.artifact,
                path: input.path.clone(),
            });
        }
    }

    fs::create_dir_all(&stage.directory).map_err(|source| PipelineError::Workspace {
        stage: stage.id,
        path: stage.directory.clone(),
        source,
    })?;

    for seed in &stage.seeds {
        debug!("Copying {:?} to {:?}", &seed.source.path, &seed.destination);
        fs::copy(&seed.source.path, &seed.destination).map_err(|source| {
            PipelineError::Workspace {
                stage: stage.id,
                path: seed.destination.clone(),
                source,
            }
        })?;
    }

    if let Some(parameters) = &stage.parameters {
        let path = write_mdp(&parameters.block, &parameters.file_name, &stage.directory)
            .map_err(|source| PipelineError::ConfigWrite {
                stage: stage.id,
                source,
            })?;
        record.parameters = Some(path);
    }

    for step in &stage.steps {
        let command = step.invocation.command_line();
        debug!("Running `{}`", &command);
        reporter.report(Progress::CommandStart {
            command: command.clone(),
        });

        let output = runner.run(&step.invocation).map_err(|e| PipelineError::StageExecution {
            stage: stage.id,
            command: command.clone(),
            failure: StageFailure::Launch(e),
        })?;
        debug!(target: "fepflow::engine_output", "{}", output.output);

        record.invocations.push(InvocationRecord {
            command: command.clone(),
            exit_code: output.exit_code,
            success: output.success,
        });

        if !output.success {
            return Err(PipelineError::StageExecution {
                stage: stage.id,
                command,
                failure: StageFailure::NonZeroExit {
                    code: output.exit_code,
                    output_tail: tail(&output.output, OUTPUT_TAIL_LINES),
                },
            });
        }

        if let Some(missing) = step.produces.iter().find(|p| !p.path.is_file()) {
            return Err(PipelineError::StageExecution {
                stage: stage.id,
                command,
                failure: StageFailure::MissingOutput {
                    artifact: missing.artifact,
                    path: missing.path.clone(),
                },
            });
        }
    }

    record.completed = true;
    info!("Stage '{}' finished.", stage.id);
    reporter.report(Progress::StageFinish { stage: stage.id });
    Ok(())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
