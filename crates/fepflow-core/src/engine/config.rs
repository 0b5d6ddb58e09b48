use crate::core::artifacts::{StageKind, SystemFiles};
use crate::core::mdp::{MdpBlock, presets};
use crate::engine::environment::EngineEnvironment;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

/// Unit-cell shape handed to `editconf -bt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxShape {
    Triclinic,
    Cubic,
    Dodecahedron,
    Octahedron,
}

impl BoxShape {
    pub fn as_str(self) -> &'static str {
        match self {
            BoxShape::Triclinic => "triclinic",
            BoxShape::Cubic => "cubic",
            BoxShape::Dodecahedron => "dodecahedron",
            BoxShape::Octahedron => "octahedron",
        }
    }
}

impl fmt::Display for BoxShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxShape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triclinic" => Ok(BoxShape::Triclinic),
            "cubic" => Ok(BoxShape::Cubic),
            "dodecahedron" => Ok(BoxShape::Dodecahedron),
            "octahedron" => Ok(BoxShape::Octahedron),
            other => Err(invalid(
                "box-shape",
                format!(
                    "unknown shape '{}', expected triclinic, cubic, dodecahedron or octahedron",
                    other
                ),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub binary: String,
    pub environment: EngineEnvironment,
    /// Thread-MPI ranks for the minimization and equilibration runs (`-ntmpi`).
    pub mpi_ranks: u32,
    /// Total threads for each production run (`-nt`).
    pub production_threads: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub solute: String,
    pub topology: String,
    pub box_shape: BoxShape,
    pub padding_nm: f64,
    pub solvent: String,
}

impl SystemConfig {
    pub fn files(&self) -> SystemFiles<'_> {
        SystemFiles {
            solute: &self.solute,
            topology: &self.topology,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaConfig {
    pub windows: usize,
    pub schedule: Vec<f64>,
    pub couple_moltype: String,
    /// Upper bound on production windows running at the same time.
    pub parallel: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterOverrides {
    pub minimization: Vec<(String, String)>,
    pub equilibration: Vec<(String, String)>,
    pub production: Vec<(String, String)>,
}

impl ParameterOverrides {
    pub fn for_stage(&self, kind: StageKind) -> &[(String, String)] {
        match kind {
            StageKind::Minimization => &self.minimization,
            StageKind::Equilibration => &self.equilibration,
            StageKind::Production => &self.production,
            StageKind::Geometry | StageKind::Solvation => &[],
        }
    }

    pub fn insert(
        &mut self,
        kind: StageKind,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let list = match kind {
            StageKind::Minimization => &mut self.minimization,
            StageKind::Equilibration => &mut self.equilibration,
            StageKind::Production => &mut self.production,
            StageKind::Geometry | StageKind::Solvation => {
                return Err(invalid(
                    "parameters",
                    format!("the {} stage takes no parameter file", kind),
                ));
            }
        };
        list.push((key.into(), value.into()));
        Ok(())
    }

    pub fn apply(&self, kind: StageKind, block: &mut MdpBlock) {
        for (key, value) in self.for_stage(kind) {
            block.set(key, value);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    pub system: SystemConfig,
    pub lambda: LambdaConfig,
    pub parameters: ParameterOverrides,
}

impl PipelineConfig {
    pub fn minimization_block(&self) -> MdpBlock {
        let mut block = presets::minimization();
        self.parameters.apply(StageKind::Minimization, &mut block);
        block
    }

    pub fn equilibration_block(&self) -> MdpBlock {
        let mut block = presets::equilibration();
        self.parameters.apply(StageKind::Equilibration, &mut block);
        block
    }

    pub fn production_block(&self, window: usize) -> MdpBlock {
        let mut block = presets::production(
            window,
            &self.lambda.schedule,
            &self.lambda.couple_moltype,
        );
        self.parameters.apply(StageKind::Production, &mut block);
        block
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.binary.trim().is_empty() {
            return Err(invalid("engine.binary", "must not be empty"));
        }
        if self.engine.mpi_ranks == 0 {
            return Err(invalid("engine.mpi-ranks", "must be at least 1"));
        }
        if self.engine.production_threads == 0 {
            return Err(invalid("engine.production-threads", "must be at least 1"));
        }

        for (name, value) in [
            ("system.solute", &self.system.solute),
            ("system.topology", &self.system.topology),
            ("system.solvent", &self.system.solvent),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(name, "must not be empty"));
            }
        }
        if !(self.system.padding_nm.is_finite() && self.system.padding_nm > 0.0) {
            return Err(invalid(
                "system.padding",
                format!("must be a positive distance, got {}", self.system.padding_nm),
            ));
        }

        if let Some(value) = self
            .lambda
            .schedule
            .iter()
            .find(|v| !(0.0..=1.0).contains(*v))
        {
            return Err(invalid(
                "lambda.schedule",
                format!("values must lie in [0, 1], got {}", value),
            ));
        }
        if self.lambda.windows > self.lambda.schedule.len() {
            return Err(invalid(
                "lambda.windows",
                format!(
                    "{} window(s) requested but the schedule only has {} state(s)",
                    self.lambda.windows,
                    self.lambda.schedule.len()
                ),
            ));
        }
        if self.lambda.couple_moltype.trim().is_empty() {
            return Err(invalid("lambda.couple-moltype", "must not be empty"));
        }
        if self.lambda.parallel == 0 {
            return Err(invalid("lambda.parallel", "must be at least 1"));
        }

        if self
            .parameters
            .production
            .iter()
            .any(|(key, _)| key.replace('_', "-").eq_ignore_ascii_case("init-lambda-state"))
        {
            return Err(invalid(
                "parameters.production",
                "init-lambda-state is set per window and cannot be overridden",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    binary: Option<String>,
    environment: Option<EngineEnvironment>,
    mpi_ranks: Option<u32>,
    production_threads: Option<u32>,
    solute: Option<String>,
    topology: Option<String>,
    box_shape: Option<BoxShape>,
    padding_nm: Option<f64>,
    solvent: Option<String>,
    windows: Option<usize>,
    schedule: Option<Vec<f64>>,
    couple_moltype: Option<String>,
    parallel: Option<usize>,
    parameters: ParameterOverrides,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }
    pub fn environment(mut self, environment: EngineEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }
    pub fn mpi_ranks(mut self, ranks: u32) -> Self {
        self.mpi_ranks = Some(ranks);
        self
    }
    pub fn production_threads(mut self, threads: u32) -> Self {
        self.production_threads = Some(threads);
        self
    }
    pub fn solute(mut self, file_name: impl Into<String>) -> Self {
        self.solute = Some(file_name.into());
        self
    }
    pub fn topology(mut self, file_name: impl Into<String>) -> Self {
        self.topology = Some(file_name.into());
        self
    }
    pub fn box_shape(mut self, shape: BoxShape) -> Self {
        self.box_shape = Some(shape);
        self
    }
    pub fn padding_nm(mut self, padding: f64) -> Self {
        self.padding_nm = Some(padding);
        self
    }
    pub fn solvent(mut self, file_name: impl Into<String>) -> Self {
        self.solvent = Some(file_name.into());
        self
    }
    pub fn windows(mut self, n: usize) -> Self {
        self.windows = Some(n);
        self
    }
    pub fn schedule(mut self, schedule: Vec<f64>) -> Self {
        self.schedule = Some(schedule);
        self
    }
    pub fn couple_moltype(mut self, name: impl Into<String>) -> Self {
        self.couple_moltype = Some(name.into());
        self
    }
    pub fn parallel(mut self, n: usize) -> Self {
        self.parallel = Some(n);
        self
    }
    pub fn parameters(mut self, overrides: ParameterOverrides) -> Self {
        self.parameters = overrides;
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let engine = EngineConfig {
            binary: self.binary.ok_or(ConfigError::MissingParameter("binary"))?,
            environment: self.environment.unwrap_or_default(),
            mpi_ranks: self
                .mpi_ranks
                .ok_or(ConfigError::MissingParameter("mpi_ranks"))?,
            production_threads: self
                .production_threads
                .ok_or(ConfigError::MissingParameter("production_threads"))?,
        };
        let system = SystemConfig {
            solute: self.solute.ok_or(ConfigError::MissingParameter("solute"))?,
            topology: self
                .topology
                .ok_or(ConfigError::MissingParameter("topology"))?,
            box_shape: self
                .box_shape
                .ok_or(ConfigError::MissingParameter("box_shape"))?,
            padding_nm: self
                .padding_nm
                .ok_or(ConfigError::MissingParameter("padding_nm"))?,
            solvent: self.solvent.ok_or(ConfigError::MissingParameter("solvent"))?,
        };
        let lambda = LambdaConfig {
            windows: self.windows.ok_or(ConfigError::MissingParameter("windows"))?,
            schedule: self
                .schedule
                .ok_or(ConfigError::MissingParameter("schedule"))?,
            couple_moltype: self
                .couple_moltype
                .ok_or(ConfigError::MissingParameter("couple_moltype"))?,
            parallel: self.parallel.unwrap_or(1),
        };
        let config = PipelineConfig {
            engine,
            system,
            lambda,
            parameters: self.parameters,
        };
        config.validate()?;
        Ok(config)
    }
}
