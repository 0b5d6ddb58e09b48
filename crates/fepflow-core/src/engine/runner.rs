use crate::engine::environment::EngineEnvironment;
use crate::engine::invocation::Invocation;
use std::env::JoinPathsError;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Standard output followed by standard error.
    pub output: String,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine search path contains an invalid entry: {0}")]
    SearchPath(#[from] JoinPathsError),
}

/// Executes engine invocations.
///
/// Implementations run the invocation to completion and report its exit status and
/// output. Interpreting a failed exit status is left to the caller.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError>;
}

/// Runs invocations as child processes of the current process.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    environment: EngineEnvironment,
}

impl SystemRunner {
    pub fn new(environment: EngineEnvironment) -> Self {
        Self { environment }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .envs(self.environment.variables());

        if let Some(path) = self
            .environment
            .search_path(std::env::var_os("PATH").as_deref())?
        {
            command.env("PATH", path);
        }

        trace!("Spawning {:?}", &command);
        let output = command.output().map_err(|source| RunnerError::Launch {
            program: invocation.program.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            output: combined,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn shell(script: &str, dir: &Path) -> Invocation {
        Invocation::new("sh", dir).args(["-c", script])
    }

    #[test]
    fn captures_stdout_and_stderr_together() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::default();

        let output = runner
            .run(&shell("echo to-stdout; echo to-stderr >&2", dir.path()))
            .unwrap();

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.output, "to-stdout\nto-stderr\n");
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::default();

        let output = runner.run(&shell("exit 3", dir.path())).unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
    }

    #[test]
    fn runs_in_the_invocation_working_directory() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::default();

        runner
            .run(&shell("echo marker > created.txt", dir.path()))
            .unwrap();

        assert!(dir.path().join("created.txt").exists());
    }

    #[test]
    fn applies_environment_variables() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::new(
            EngineEnvironment::new().with_variable("FEPFLOW_TEST_VALUE", "lambda"),
        );

        let output = runner
            .run(&shell("printf %s \"$FEPFLOW_TEST_VALUE\"", dir.path()))
            .unwrap();

        assert_eq!(output.output, "lambda");
    }

    #[test]
    fn path_prefix_is_searched_first() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::new(EngineEnvironment::new().with_path_prefix("/opt/fepflow-test"));

        let output = runner
            .run(&shell("printf %s \"$PATH\"", dir.path()))
            .unwrap();

        assert!(output.output.starts_with("/opt/fepflow-test"));
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let dir = tempdir().unwrap();
        let runner = SystemRunner::default();

        let result = runner.run(&Invocation::new("fepflow-no-such-engine", dir.path()));

        assert!(matches!(
            result,
            Err(RunnerError::Launch { program, .. }) if program == "fepflow-no-such-engine"
        ));
    }
}
