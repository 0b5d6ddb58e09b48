use super::defaults::DefaultsConfig;
use super::file::{self, FileConfig, FileParametersConfig};
use super::models::AppConfig;
use crate::cli::PipelineArgs;
use crate::error::{CliError, Result};
use crate::fetch;
use crate::utils::parser;
use fepflow::core::artifacts::StageKind;
use fepflow::engine::config as core_config;
use fepflow::engine::environment::EngineEnvironment;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub fn build_config(args: &PipelineArgs, dest: &Path) -> Result<AppConfig> {
    let file_config = load_file_config(args.config.as_deref(), super::default_config_path())?;
    merge(args, dest, file_config)
}

fn load_file_config(explicit: Option<&Path>, fallback: Option<PathBuf>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return FileConfig::from_file(path);
    }
    match fallback {
        Some(path) if path.is_file() => {
            info!("Using configuration file {:?}", &path);
            FileConfig::from_file(&path)
        }
        _ => {
            debug!("No configuration file found, using built-in defaults.");
            Ok(FileConfig::default())
        }
    }
}

fn merge(args: &PipelineArgs, dest: &Path, file_config: FileConfig) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let engine_file = file_config.engine.take().unwrap_or_default();
    let system_file = file_config.system.take().unwrap_or_default();
    let lambda_file = file_config.lambda.take().unwrap_or_default();
    let parameters_file = file_config.parameters.take().unwrap_or_default();

    let binary = args
        .gmx
        .clone()
        .or(engine_file.binary)
        .unwrap_or(defaults.binary);

    let mut environment = EngineEnvironment::new();
    for dir in engine_file.path_prepend.unwrap_or_default() {
        environment = environment.with_path_prefix(dir);
    }
    for (key, value) in engine_file.env.unwrap_or_default() {
        environment = environment.with_variable(key, value);
    }

    let box_shape = match system_file.box_shape {
        Some(shape) => core_config::BoxShape::from_str(&shape)
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => defaults.box_shape,
    };

    let core_config = core_config::PipelineConfigBuilder::new()
        .binary(binary)
        .environment(environment)
        .mpi_ranks(engine_file.mpi_ranks.unwrap_or(defaults.mpi_ranks))
        .production_threads(
            engine_file
                .production_threads
                .unwrap_or(defaults.production_threads),
        )
        .solute(system_file.solute.unwrap_or(defaults.solute))
        .topology(system_file.topology.unwrap_or(defaults.topology))
        .box_shape(box_shape)
        .padding_nm(system_file.padding.unwrap_or(defaults.padding_nm))
        .solvent(system_file.solvent.unwrap_or(defaults.solvent))
        .windows(args.windows.or(lambda_file.windows).unwrap_or(defaults.windows))
        .schedule(lambda_file.schedule.unwrap_or(defaults.schedule))
        .couple_moltype(
            lambda_file
                .couple_moltype
                .unwrap_or(defaults.couple_moltype),
        )
        .parallel(
            args.parallel_windows
                .or(lambda_file.parallel)
                .unwrap_or(defaults.parallel),
        )
        .parameters(merge_parameters(parameters_file)?)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let workdir = args
        .workdir
        .clone()
        .unwrap_or_else(|| fetch::tutorial_dir(dest));

    Ok(AppConfig {
        workdir,
        core_config,
    })
}

fn merge_parameters(file_val: FileParametersConfig) -> Result<core_config::ParameterOverrides> {
    let mut overrides = core_config::ParameterOverrides::default();
    let stages = [
        (StageKind::Minimization, file_val.minimization),
        (StageKind::Equilibration, file_val.equilibration),
        (StageKind::Production, file_val.production),
    ];
    for (kind, entries) in stages {
        for (key, value) in entries.unwrap_or_default() {
            let rendered = file::mdp_value(&value).ok_or_else(|| {
                CliError::Config(format!(
                    "Unsupported value for parameters.{}.{}: {}",
                    kind, key, value
                ))
            })?;
            overrides
                .insert(kind, key, rendered)
                .map_err(|e| CliError::Config(e.to_string()))?;
        }
    }
    Ok(overrides)
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let (key, value_str) =
            parser::parse_key_value(kv_pair).map_err(|e| CliError::Argument(e.to_string()))?;

        let invalid = |kind: &str| {
            CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
        };

        match key {
            "engine.binary" => {
                config.engine.get_or_insert_with(Default::default).binary =
                    Some(value_str.to_string());
            }
            "engine.mpi-ranks" => {
                config.engine.get_or_insert_with(Default::default).mpi_ranks =
                    Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            "engine.production-threads" => {
                config
                    .engine
                    .get_or_insert_with(Default::default)
                    .production_threads = Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            "system.solute" => {
                config.system.get_or_insert_with(Default::default).solute =
                    Some(value_str.to_string());
            }
            "system.topology" => {
                config.system.get_or_insert_with(Default::default).topology =
                    Some(value_str.to_string());
            }
            "system.box-shape" => {
                config.system.get_or_insert_with(Default::default).box_shape =
                    Some(value_str.to_string());
            }
            "system.padding" => {
                config.system.get_or_insert_with(Default::default).padding =
                    Some(value_str.parse().map_err(|_| invalid("float"))?);
            }
            "system.solvent" => {
                config.system.get_or_insert_with(Default::default).solvent =
                    Some(value_str.to_string());
            }
            "lambda.windows" => {
                config.lambda.get_or_insert_with(Default::default).windows =
                    Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            "lambda.couple-moltype" => {
                config
                    .lambda
                    .get_or_insert_with(Default::default)
                    .couple_moltype = Some(value_str.to_string());
            }
            "lambda.parallel" => {
                config.lambda.get_or_insert_with(Default::default).parallel =
                    Some(value_str.parse().map_err(|_| invalid("integer"))?);
            }
            _ => {
                let Some((stage, mdp_key)) = key
                    .strip_prefix("parameters.")
                    .and_then(|rest| rest.split_once('.'))
                    .filter(|(_, mdp_key)| !mdp_key.is_empty())
                else {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                };
                let parameters = config.parameters.get_or_insert_with(Default::default);
                let stage_entries = match stage {
                    "minimization" => &mut parameters.minimization,
                    "equilibration" => &mut parameters.equilibration,
                    "production" => &mut parameters.production,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unknown stage '{}' in --set key '{}'. Expected minimization, equilibration or production.",
                            stage, key
                        )));
                    }
                };
                stage_entries.get_or_insert_with(BTreeMap::new).insert(
                    mdp_key.to_string(),
                    toml::Value::String(value_str.to_string()),
                );
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fepflow::core::mdp::MdpBlock;
    use std::fs;
    use tempfile::tempdir;

    fn base_args() -> PipelineArgs {
        PipelineArgs::default()
    }

    fn build(args: &PipelineArgs, toml: &str) -> Result<AppConfig> {
        let file_config = FileConfig::from_toml(toml).unwrap();
        merge(args, Path::new("/data"), file_config)
    }

    fn production_value(config: &core_config::PipelineConfig, key: &str) -> Option<String> {
        let block: MdpBlock = config.production_block(0);
        block.get(key).map(str::to_string)
    }

    #[test]
    fn defaults_reproduce_the_tutorial() {
        let app = build(&base_args(), "").unwrap();
        let cfg = app.core_config;

        assert_eq!(app.workdir, PathBuf::from("/data/gromacs-free-energy-tutorial"));
        assert_eq!(cfg.engine.binary, "gmx");
        assert!(cfg.engine.environment.is_empty());
        assert_eq!(cfg.engine.mpi_ranks, 1);
        assert_eq!(cfg.engine.production_threads, 1);
        assert_eq!(cfg.system.solute, "ethanol.gro");
        assert_eq!(cfg.system.box_shape, core_config::BoxShape::Dodecahedron);
        assert_eq!(cfg.system.solvent, "spc216.gro");
        assert_eq!(cfg.lambda.windows, 2);
        assert_eq!(cfg.lambda.schedule, vec![0.0, 0.2, 0.4, 0.6, 0.8, 0.9, 1.0]);
        assert_eq!(cfg.lambda.parallel, 1);
        assert_eq!(cfg.parameters, core_config::ParameterOverrides::default());
    }

    #[test]
    fn file_values_are_merged() {
        let app = build(
            &base_args(),
            r#"
            [engine]
            binary = "gmx_mpi"
            path-prepend = ["/opt/gromacs-2019/bin"]
            production-threads = 2
            [engine.env]
            GMX_MAXBACKUP = "-1"

            [system]
            box-shape = "cubic"
            padding = 1.5

            [lambda]
            windows = 5

            [parameters.production]
            nsteps = 5000
            gen-vel = true
            "#,
        )
        .unwrap();
        let cfg = app.core_config;

        assert_eq!(cfg.engine.binary, "gmx_mpi");
        assert_eq!(
            cfg.engine.environment.path_prefix(),
            &[PathBuf::from("/opt/gromacs-2019/bin")]
        );
        assert_eq!(cfg.engine.environment.variables()["GMX_MAXBACKUP"], "-1");
        assert_eq!(cfg.engine.production_threads, 2);
        assert_eq!(cfg.system.box_shape, core_config::BoxShape::Cubic);
        assert_eq!(cfg.system.padding_nm, 1.5);
        assert_eq!(cfg.lambda.windows, 5);
        assert_eq!(production_value(&cfg, "nsteps").as_deref(), Some("5000"));
        assert_eq!(production_value(&cfg, "gen-vel").as_deref(), Some("yes"));
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut args = base_args();
        args.gmx = Some("/usr/local/gromacs/bin/gmx".to_string());
        args.windows = Some(3);
        args.parallel_windows = Some(3);
        args.workdir = Some(PathBuf::from("/scratch/run1"));

        let app = build(
            &args,
            "[engine]\nbinary = \"gmx_mpi\"\n[lambda]\nwindows = 6\nparallel = 2\n",
        )
        .unwrap();

        assert_eq!(app.workdir, PathBuf::from("/scratch/run1"));
        assert_eq!(app.core_config.engine.binary, "/usr/local/gromacs/bin/gmx");
        assert_eq!(app.core_config.lambda.windows, 3);
        assert_eq!(app.core_config.lambda.parallel, 3);
    }

    #[test]
    fn set_values_override_file_values() {
        let mut args = base_args();
        args.set_values = vec![
            "engine.mpi-ranks=4".to_string(),
            "system.box-shape=octahedron".to_string(),
            "lambda.windows=7".to_string(),
            "parameters.minimization.nsteps=1000".to_string(),
            "parameters.production.nstlog=100".to_string(),
        ];

        let app = build(&args, "[lambda]\nwindows = 1\n").unwrap();
        let cfg = app.core_config;

        assert_eq!(cfg.engine.mpi_ranks, 4);
        assert_eq!(cfg.system.box_shape, core_config::BoxShape::Octahedron);
        assert_eq!(cfg.lambda.windows, 7);
        assert_eq!(cfg.minimization_block().get("nsteps"), Some("1000"));
        assert_eq!(production_value(&cfg, "nstlog").as_deref(), Some("100"));
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        for bad in [
            "lambda.windows=many",
            "lambda.window=2",
            "parameters.solvation.nsteps=5",
            "parameters.production.=5",
        ] {
            let mut args = base_args();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build(&args, ""), Err(CliError::Config(_))),
                "accepted {}",
                bad
            );
        }

        let mut args = base_args();
        args.set_values = vec!["novalue".to_string()];
        assert!(matches!(build(&args, ""), Err(CliError::Argument(_))));
    }

    #[test]
    fn core_validation_errors_surface_as_config_errors() {
        let mut args = base_args();
        args.windows = Some(8);
        assert!(matches!(build(&args, ""), Err(CliError::Config(_))));

        assert!(matches!(
            build(&base_args(), "[system]\nbox-shape = \"sphere\"\n"),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            build(
                &base_args(),
                "[parameters.production]\ninit-lambda-state = 3\n"
            ),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn explicit_config_file_wins_over_fallback() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("explicit.toml");
        let fallback = dir.path().join("fallback.toml");
        fs::write(&explicit, "[lambda]\nwindows = 4\n").unwrap();
        fs::write(&fallback, "[lambda]\nwindows = 6\n").unwrap();

        let from_explicit = load_file_config(Some(&explicit), Some(fallback.clone())).unwrap();
        let from_fallback = load_file_config(None, Some(fallback)).unwrap();
        let from_nothing =
            load_file_config(None, Some(dir.path().join("missing.toml"))).unwrap();

        assert_eq!(from_explicit.lambda.unwrap().windows, Some(4));
        assert_eq!(from_fallback.lambda.unwrap().windows, Some(6));
        assert!(from_nothing.lambda.is_none());
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load_file_config(Some(&dir.path().join("nope.toml")), None);
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
