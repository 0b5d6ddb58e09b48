use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "fepflow contributors",
    version,
    about = "fepflow - Drives the GROMACS free-energy tutorial: box, solvation, minimization, equilibration and lambda-window production runs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel work, which also caps how many
    /// lambda windows run at once. Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download (or unpack a local copy of) the tutorial archive.
    Fetch(FetchArgs),
    /// Print the stages and engine commands a run would issue, without running anything.
    Plan(PlanArgs),
    /// Run the full free-energy protocol in a working directory.
    Run(RunArgs),
}

/// Where the tutorial archive comes from and where it is unpacked.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Download the archive from this URL instead of the default location.
    #[arg(long, value_name = "URL", conflicts_with = "archive")]
    pub url: Option<String>,

    /// Unpack a local copy of the archive instead of downloading it.
    #[arg(long, value_name = "PATH")]
    pub archive: Option<PathBuf>,

    /// Directory the archive is saved to and unpacked into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Remove an existing tutorial directory before unpacking.
    #[arg(long)]
    pub force: bool,
}

/// Arguments shared by every command that builds a pipeline configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Working directory holding the tutorial files.
    /// Defaults to `<dest>/gromacs-free-energy-tutorial`.
    #[arg(short, long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    /// Defaults to `config.toml` in the platform configuration directory, if present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Engine Overrides ---
    /// Override the engine executable.
    #[arg(long = "gmx", value_name = "PATH")]
    pub gmx: Option<String>,

    // --- Lambda Overrides ---
    /// Override the number of lambda windows to run.
    #[arg(short = 'n', long, value_name = "INT")]
    pub windows: Option<usize>,

    /// Run up to this many lambda windows at the same time.
    #[arg(long = "parallel-windows", value_name = "INT")]
    pub parallel_windows: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S parameters.production.nsteps=5000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Directory the tutorial was unpacked into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Fetch the tutorial archive before running.
    #[arg(long)]
    pub fetch: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_overrides_and_global_flags() {
        let cli = Cli::try_parse_from([
            "fepflow",
            "run",
            "-w",
            "tutorial",
            "--gmx",
            "gmx_mpi",
            "-n",
            "4",
            "--parallel-windows",
            "2",
            "-S",
            "parameters.production.nsteps=5000",
            "-vv",
            "-j",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(8));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.pipeline.workdir, Some(PathBuf::from("tutorial")));
                assert_eq!(args.pipeline.gmx.as_deref(), Some("gmx_mpi"));
                assert_eq!(args.pipeline.windows, Some(4));
                assert_eq!(args.pipeline.parallel_windows, Some(2));
                assert_eq!(
                    args.pipeline.set_values,
                    vec!["parameters.production.nsteps=5000"]
                );
                assert!(!args.fetch);
                assert_eq!(args.source.dest, PathBuf::from("."));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn fetch_rejects_url_and_archive_together() {
        let result = Cli::try_parse_from([
            "fepflow",
            "fetch",
            "--url",
            "http://example.org/t.tgz",
            "--archive",
            "t.tgz",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["fepflow", "plan", "-q", "-v"]).is_err());
    }
}
