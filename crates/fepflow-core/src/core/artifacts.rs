//! The artifact contract between stages.
//!
//! Every file that one stage hands to another is named here together with the
//! stage kind that produces it and the stage kinds that consume it. The executor
//! checks inputs against this table before a stage starts and outputs after each
//! engine call, instead of relying on naming conventions alone.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Geometry,
    Solvation,
    Minimization,
    Equilibration,
    Production,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Geometry => "Geometry",
            StageKind::Solvation => "Solvation",
            StageKind::Minimization => "Minimization",
            StageKind::Equilibration => "Equilibration",
            StageKind::Production => "Production",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_lowercase())
    }
}

/// File names that depend on the tutorial input rather than on the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemFiles<'a> {
    pub solute: &'a str,
    pub topology: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Artifact {
    SoluteStructure,
    Topology,
    BoxGeometry,
    SolvatedGeometry,
    MinimizationParameters,
    MinimizationRunInput,
    MinimizedGeometry,
    EquilibrationParameters,
    EquilibrationRunInput,
    EquilibratedGeometry,
    ProductionParameters,
    ProductionRunInput,
    ProductionGeometry,
}

impl Artifact {
    pub const ALL: [Artifact; 13] = [
        Artifact::SoluteStructure,
        Artifact::Topology,
        Artifact::BoxGeometry,
        Artifact::SolvatedGeometry,
        Artifact::MinimizationParameters,
        Artifact::MinimizationRunInput,
        Artifact::MinimizedGeometry,
        Artifact::EquilibrationParameters,
        Artifact::EquilibrationRunInput,
        Artifact::EquilibratedGeometry,
        Artifact::ProductionParameters,
        Artifact::ProductionRunInput,
        Artifact::ProductionGeometry,
    ];

    pub fn file_name<'a>(self, files: &SystemFiles<'a>) -> &'a str {
        match self {
            Artifact::SoluteStructure => files.solute,
            Artifact::Topology => files.topology,
            Artifact::BoxGeometry => "box.gro",
            Artifact::SolvatedGeometry => "solvated.gro",
            Artifact::MinimizationParameters => "em.mdp",
            Artifact::MinimizationRunInput => "em.tpr",
            Artifact::MinimizedGeometry => "em.gro",
            Artifact::EquilibrationParameters => "equil.mdp",
            Artifact::EquilibrationRunInput => "equil.tpr",
            Artifact::EquilibratedGeometry => "equil.gro",
            Artifact::ProductionParameters => "run.mdp",
            Artifact::ProductionRunInput => "run.tpr",
            Artifact::ProductionGeometry => "run.gro",
        }
    }

    /// The stage kind that creates this artifact, or `None` when it ships with the
    /// tutorial archive.
    ///
    /// The topology is shipped with the archive and later rewritten in place by the
    /// solvation stage; it is treated as archive-supplied.
    pub fn producer(self) -> Option<StageKind> {
        match self {
            Artifact::SoluteStructure | Artifact::Topology => None,
            Artifact::BoxGeometry => Some(StageKind::Geometry),
            Artifact::SolvatedGeometry => Some(StageKind::Solvation),
            Artifact::MinimizationParameters
            | Artifact::MinimizationRunInput
            | Artifact::MinimizedGeometry => Some(StageKind::Minimization),
            Artifact::EquilibrationParameters
            | Artifact::EquilibrationRunInput
            | Artifact::EquilibratedGeometry => Some(StageKind::Equilibration),
            Artifact::ProductionParameters
            | Artifact::ProductionRunInput
            | Artifact::ProductionGeometry => Some(StageKind::Production),
        }
    }

    pub fn consumers(self) -> &'static [StageKind] {
        match self {
            Artifact::SoluteStructure => &[StageKind::Geometry],
            Artifact::Topology => &[
                StageKind::Solvation,
                StageKind::Minimization,
                StageKind::Equilibration,
                StageKind::Production,
            ],
            Artifact::BoxGeometry => &[StageKind::Solvation],
            Artifact::SolvatedGeometry => &[StageKind::Minimization],
            Artifact::MinimizedGeometry => &[StageKind::Equilibration],
            Artifact::EquilibratedGeometry => &[StageKind::Production],
            Artifact::MinimizationParameters
            | Artifact::MinimizationRunInput
            | Artifact::EquilibrationParameters
            | Artifact::EquilibrationRunInput
            | Artifact::ProductionParameters
            | Artifact::ProductionRunInput
            | Artifact::ProductionGeometry => &[],
        }
    }

    /// Artifacts a stage kind needs before it may start.
    pub fn inputs_of(stage: StageKind) -> Vec<Artifact> {
        Self::ALL
            .into_iter()
            .filter(|a| a.consumers().contains(&stage))
            .collect()
    }

    /// Artifacts a stage kind is expected to leave behind.
    pub fn outputs_of(stage: StageKind) -> Vec<Artifact> {
        Self::ALL
            .into_iter()
            .filter(|a| a.producer() == Some(stage))
            .collect()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Artifact::SoluteStructure => "solute structure",
            Artifact::Topology => "topology",
            Artifact::BoxGeometry => "box geometry",
            Artifact::SolvatedGeometry => "solvated geometry",
            Artifact::MinimizationParameters => "minimization parameters",
            Artifact::MinimizationRunInput => "minimization run input",
            Artifact::MinimizedGeometry => "minimized geometry",
            Artifact::EquilibrationParameters => "equilibration parameters",
            Artifact::EquilibrationRunInput => "equilibration run input",
            Artifact::EquilibratedGeometry => "equilibrated geometry",
            Artifact::ProductionParameters => "production parameters",
            Artifact::ProductionRunInput => "production run input",
            Artifact::ProductionGeometry => "production geometry",
        };
        f.write_str(label)
    }
}
