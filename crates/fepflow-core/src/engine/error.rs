use thiserror::Error;

use super::config::ConfigError;
use super::runner::RunnerError;
use super::stage::StageId;
use crate::core::artifacts::Artifact;
use crate::core::mdp::writer::ConfigWriteError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum StageFailure {
    #[error("engine could not be launched: {0}")]
    Launch(#[source] RunnerError),

    #[error("{}", describe_exit(*code))]
    NonZeroExit {
        code: Option<i32>,
        output_tail: String,
    },

    #[error("expected {artifact} was not produced at {}", path.display())]
    MissingOutput { artifact: Artifact, path: PathBuf },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by a signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Working directory does not exist: {}", path.display())]
    MissingWorkdir { path: PathBuf },

    #[error("Engine '{program}' is not available: {source}")]
    EngineUnavailable {
        program: String,
        #[source]
        source: RunnerError,
    },

    #[error("Stage '{stage}' cannot start: {artifact} not found at {}", path.display())]
    MissingInput {
        stage: StageId,
        artifact: Artifact,
        path: PathBuf,
    },

    #[error("Stage '{stage}' failed running `{command}`: {failure}")]
    StageExecution {
        stage: StageId,
        command: String,
        failure: StageFailure,
    },

    #[error("Stage '{stage}' could not write its parameter file: {source}")]
    ConfigWrite {
        stage: StageId,
        #[source]
        source: ConfigWriteError,
    },

    #[error("Stage '{stage}' could not prepare {}: {source}", path.display())]
    Workspace {
        stage: StageId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// The stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            PipelineError::MissingInput { stage, .. }
            | PipelineError::StageExecution { stage, .. }
            | PipelineError::ConfigWrite { stage, .. }
            | PipelineError::Workspace { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The last lines of engine output for a failed command.
    pub fn engine_output(&self) -> Option<&str> {
        match self {
            PipelineError::StageExecution {
                failure: StageFailure::NonZeroExit { output_tail, .. },
                ..
            } => Some(output_tail),
            _ => None,
        }
    }
}
