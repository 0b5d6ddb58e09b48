//! The fully resolved stage plan.
//!
//! [`plan`] turns a configuration and a working directory into the ordered list of
//! stages the orchestrator will execute: every path, every parameter block and every
//! engine invocation is decided here, before anything runs. The plan is a pure
//! function of its inputs, which makes the command sequence reproducible and lets
//! `fepflow plan` print it without touching the filesystem.

use crate::core::artifacts::{Artifact, StageKind, SystemFiles};
use crate::core::mdp::MdpBlock;
use crate::engine::config::PipelineConfig;
use crate::engine::invocation::{Gmx, Invocation, MdrunThreads};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StageId {
    pub kind: StageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

impl StageId {
    pub fn new(kind: StageKind) -> Self {
        Self { kind, window: None }
    }

    pub fn production(window: usize) -> Self {
        Self {
            kind: StageKind::Production,
            window: Some(window),
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window {
            Some(window) => write!(f, "{}[{}]", self.kind, window_directory_name(window)),
            None => write!(f, "{}", self.kind),
        }
    }
}

pub fn window_directory_name(window: usize) -> String {
    format!("lambda_{}", window)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath {
    pub artifact: Artifact,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFile {
    pub source: ArtifactPath,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageParameters {
    pub artifact: Artifact,
    pub file_name: String,
    pub block: MdpBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub invocation: Invocation,
    pub produces: Vec<ArtifactPath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    pub directory: PathBuf,
    /// Artifacts that must exist before the stage starts.
    pub inputs: Vec<ArtifactPath>,
    /// Files copied into `directory` before the parameter block is written.
    pub seeds: Vec<SeedFile>,
    pub parameters: Option<StageParameters>,
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.steps.iter().map(|s| &s.invocation)
    }

    /// Every artifact this stage leaves in its directory.
    pub fn outputs(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.parameters
            .iter()
            .map(|p| p.artifact)
            .chain(self.steps.iter().flat_map(|s| s.produces.iter().map(|p| p.artifact)))
    }
}

struct Planner<'a> {
    workdir: &'a Path,
    config: &'a PipelineConfig,
    files: SystemFiles<'a>,
    gmx: Gmx<'a>,
}

impl<'a> Planner<'a> {
    fn at(&self, dir: &Path, artifact: Artifact) -> ArtifactPath {
        ArtifactPath {
            artifact,
            path: dir.join(artifact.file_name(&self.files)),
        }
    }

    fn name(&self, artifact: Artifact) -> &'a str {
        artifact.file_name(&self.files)
    }

    fn inputs(&self, kind: StageKind) -> Vec<ArtifactPath> {
        Artifact::inputs_of(kind)
            .into_iter()
            .map(|a| self.at(self.workdir, a))
            .collect()
    }

    fn geometry(&self) -> Stage {
        let dir = self.workdir;
        let system = &self.config.system;
        Stage {
            id: StageId::new(StageKind::Geometry),
            directory: dir.to_path_buf(),
            inputs: self.inputs(StageKind::Geometry),
            seeds: Vec::new(),
            parameters: None,
            steps: vec![Step {
                invocation: self.gmx.editconf(
                    dir,
                    self.name(Artifact::SoluteStructure),
                    self.name(Artifact::BoxGeometry),
                    system.box_shape,
                    system.padding_nm,
                ),
                produces: vec![self.at(dir, Artifact::BoxGeometry)],
            }],
        }
    }

    fn solvation(&self) -> Stage {
        let dir = self.workdir;
        Stage {
            id: StageId::new(StageKind::Solvation),
            directory: dir.to_path_buf(),
            inputs: self.inputs(StageKind::Solvation),
            seeds: Vec::new(),
            parameters: None,
            steps: vec![Step {
                invocation: self.gmx.solvate(
                    dir,
                    self.name(Artifact::BoxGeometry),
                    &self.config.system.solvent,
                    self.name(Artifact::SolvatedGeometry),
                    self.name(Artifact::Topology),
                ),
                produces: vec![self.at(dir, Artifact::SolvatedGeometry)],
            }],
        }
    }

    /// Parameter file, `grompp`, then `mdrun` in `dir`.
    #[allow(clippy::too_many_arguments)]
    fn two_phase(
        &self,
        id: StageId,
        dir: &Path,
        inputs: Vec<ArtifactPath>,
        seeds: Vec<SeedFile>,
        block: MdpBlock,
        artifacts: [Artifact; 4],
        threads: MdrunThreads,
        verbose: bool,
    ) -> Stage {
        let [parameters, structure, run_input, result] = artifacts;
        let deffnm = self
            .name(run_input)
            .trim_end_matches(".tpr")
            .to_string();
        Stage {
            id,
            directory: dir.to_path_buf(),
            inputs,
            seeds,
            parameters: Some(StageParameters {
                artifact: parameters,
                file_name: self.name(parameters).to_string(),
                block,
            }),
            steps: vec![
                Step {
                    invocation: self.gmx.grompp(
                        dir,
                        self.name(parameters),
                        self.name(structure),
                        self.name(Artifact::Topology),
                        self.name(run_input),
                    ),
                    produces: vec![self.at(dir, run_input)],
                },
                Step {
                    invocation: self.gmx.mdrun(dir, &deffnm, threads, verbose),
                    produces: vec![self.at(dir, result)],
                },
            ],
        }
    }

    fn minimization(&self) -> Stage {
        self.two_phase(
            StageId::new(StageKind::Minimization),
            self.workdir,
            self.inputs(StageKind::Minimization),
            Vec::new(),
            self.config.minimization_block(),
            [
                Artifact::MinimizationParameters,
                Artifact::SolvatedGeometry,
                Artifact::MinimizationRunInput,
                Artifact::MinimizedGeometry,
            ],
            MdrunThreads::MpiRanks(self.config.engine.mpi_ranks),
            true,
        )
    }

    fn equilibration(&self) -> Stage {
        self.two_phase(
            StageId::new(StageKind::Equilibration),
            self.workdir,
            self.inputs(StageKind::Equilibration),
            Vec::new(),
            self.config.equilibration_block(),
            [
                Artifact::EquilibrationParameters,
                Artifact::MinimizedGeometry,
                Artifact::EquilibrationRunInput,
                Artifact::EquilibratedGeometry,
            ],
            MdrunThreads::MpiRanks(self.config.engine.mpi_ranks),
            true,
        )
    }

    fn production(&self, window: usize) -> Stage {
        let window_dir = self.workdir.join(window_directory_name(window));
        let inputs = self.inputs(StageKind::Production);
        let seeds = inputs
            .iter()
            .map(|source| SeedFile {
                destination: window_dir.join(self.name(source.artifact)),
                source: source.clone(),
            })
            .collect();
        self.two_phase(
            StageId::production(window),
            &window_dir,
            inputs,
            seeds,
            self.config.production_block(window),
            [
                Artifact::ProductionParameters,
                Artifact::EquilibratedGeometry,
                Artifact::ProductionRunInput,
                Artifact::ProductionGeometry,
            ],
            MdrunThreads::Total(self.config.engine.production_threads),
            false,
        )
    }
}

/// Builds the ordered stage list for one run in `workdir`.
pub fn plan(workdir: &Path, config: &PipelineConfig) -> Vec<Stage> {
    let planner = Planner {
        workdir,
        config,
        files: config.system.files(),
        gmx: Gmx::new(&config.engine.binary),
    };

    let mut stages = vec![
        planner.geometry(),
        planner.solvation(),
        planner.minimization(),
        planner.equilibration(),
    ];
    stages.extend((0..config.lambda.windows).map(|w| planner.production(w)));
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::tests::{tutorial_builder, tutorial_config};
    use std::collections::BTreeSet;

    fn workdir() -> PathBuf {
        PathBuf::from("/work/gromacs-free-energy-tutorial")
    }

    fn command_lines(stages: &[Stage]) -> Vec<String> {
        stages
            .iter()
            .flat_map(|s| s.invocations().map(|i| i.command_line()))
            .collect()
    }

    #[test]
    fn tutorial_plan_issues_the_expected_commands_in_order() {
        let stages = plan(&workdir(), &tutorial_config());

        assert_eq!(
            command_lines(&stages),
            vec![
                "gmx editconf -f ethanol.gro -o box.gro -bt dodecahedron -d 1",
                "gmx solvate -cp box.gro -cs spc216.gro -o solvated.gro -p topol.top",
                "gmx grompp -f em.mdp -c solvated.gro -p topol.top -o em.tpr",
                "gmx mdrun -v -deffnm em -ntmpi 1",
                "gmx grompp -f equil.mdp -c em.gro -p topol.top -o equil.tpr",
                "gmx mdrun -v -deffnm equil -ntmpi 1",
                "gmx grompp -f run.mdp -c equil.gro -p topol.top -o run.tpr",
                "gmx mdrun -deffnm run -nt 1",
                "gmx grompp -f run.mdp -c equil.gro -p topol.top -o run.tpr",
                "gmx mdrun -deffnm run -nt 1",
            ]
        );
    }

    #[test]
    fn plan_is_deterministic() {
        let config = tutorial_builder().windows(5).build().unwrap();
        assert_eq!(plan(&workdir(), &config), plan(&workdir(), &config));
    }

    #[test]
    fn production_stages_target_their_own_window_directory() {
        let stages = plan(&workdir(), &tutorial_config());

        for (window, stage) in stages
            .iter()
            .filter(|s| s.id.kind == StageKind::Production)
            .enumerate()
        {
            let window_dir = workdir().join(format!("lambda_{}", window));
            assert_eq!(stage.id, StageId::production(window));
            assert_eq!(stage.directory, window_dir);
            assert!(stage.invocations().all(|i| i.working_dir == window_dir));
            assert_eq!(
                stage.parameters.as_ref().unwrap().block.get("init-lambda-state"),
                Some(window.to_string().as_str())
            );
        }
    }

    #[test]
    fn production_seeds_copy_shared_equilibration_outputs() {
        let stages = plan(&workdir(), &tutorial_config());
        let production = stages.last().unwrap();

        let seeded: Vec<(PathBuf, PathBuf)> = production
            .seeds
            .iter()
            .map(|s| (s.source.path.clone(), s.destination.clone()))
            .collect();
        assert_eq!(
            seeded,
            vec![
                (workdir().join("topol.top"), workdir().join("lambda_1/topol.top")),
                (workdir().join("equil.gro"), workdir().join("lambda_1/equil.gro")),
            ]
        );
    }

    #[test]
    fn number_of_production_stages_matches_window_count() {
        for windows in 0..=7 {
            let config = tutorial_builder().windows(windows).build().unwrap();
            let stages = plan(&workdir(), &config);
            let production: Vec<_> = stages
                .iter()
                .filter_map(|s| s.id.window)
                .collect();
            assert_eq!(production, (0..windows).collect::<Vec<_>>());
            assert_eq!(stages.len(), 4 + windows);
        }
    }

    #[test]
    fn stage_outputs_match_artifact_contract() {
        let stages = plan(&workdir(), &tutorial_config());
        for stage in &stages {
            let declared: BTreeSet<Artifact> = Artifact::outputs_of(stage.id.kind).into_iter().collect();
            let planned: BTreeSet<Artifact> = stage.outputs().collect();
            assert_eq!(planned, declared, "stage {}", stage.id);
        }
    }

    #[test]
    fn stage_inputs_are_produced_by_earlier_stages() {
        let stages = plan(&workdir(), &tutorial_config());
        let mut available: BTreeSet<PathBuf> = Artifact::ALL
            .iter()
            .filter(|a| a.producer().is_none())
            .map(|a| workdir().join(a.file_name(&tutorial_config().system.files())))
            .collect();

        for stage in &stages {
            for input in &stage.inputs {
                assert!(
                    available.contains(&input.path),
                    "stage {} needs {:?} before it exists",
                    stage.id,
                    input.path
                );
            }
            for output in stage.steps.iter().flat_map(|s| &s.produces) {
                available.insert(output.path.clone());
            }
        }
    }

    #[test]
    fn custom_engine_binary_and_threads_are_used() {
        let config = tutorial_builder()
            .binary("gmx_mpi")
            .mpi_ranks(2)
            .production_threads(8)
            .windows(1)
            .build()
            .unwrap();
        let lines = command_lines(&plan(&workdir(), &config));

        assert!(lines.iter().all(|l| l.starts_with("gmx_mpi ")));
        assert!(lines.contains(&"gmx_mpi mdrun -v -deffnm em -ntmpi 2".to_string()));
        assert!(lines.contains(&"gmx_mpi mdrun -deffnm run -nt 8".to_string()));
    }

    #[test]
    fn stage_ids_display_window_directory() {
        assert_eq!(StageId::new(StageKind::Minimization).to_string(), "minimization");
        assert_eq!(StageId::production(3).to_string(), "production[lambda_3]");
    }
}
