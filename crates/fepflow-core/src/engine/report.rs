use crate::engine::stage::{Stage, StageId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "fepflow-run.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationRecord {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: StageId,
    pub directory: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PathBuf>,
    pub completed: bool,
    pub invocations: Vec<InvocationRecord>,
}

impl StageRecord {
    pub fn new(stage: &Stage) -> Self {
        Self {
            stage: stage.id,
            directory: stage.directory.clone(),
            parameters: None,
            completed: false,
            invocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub workdir: PathBuf,
    pub completed: bool,
    pub stages: Vec<StageRecord>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to serialize run manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write run manifest '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineReport {
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            completed: false,
            stages: Vec::new(),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.stages
            .iter()
            .flat_map(|s| s.invocations.iter().map(|i| i.command.as_str()))
    }

    pub fn window_directories(&self) -> Vec<&Path> {
        self.stages
            .iter()
            .filter(|s| s.stage.window.is_some())
            .map(|s| s.directory.as_path())
            .collect()
    }

    pub fn to_manifest(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string(self)?)
    }

    /// Writes the manifest into the working directory and returns its path.
    pub fn write_manifest(&self) -> Result<PathBuf, ManifestError> {
        let path = self.workdir.join(MANIFEST_FILE);
        std::fs::write(&path, self.to_manifest()?).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifacts::StageKind;
    use tempfile::tempdir;

    fn sample_report(workdir: &Path) -> PipelineReport {
        PipelineReport {
            workdir: workdir.to_path_buf(),
            completed: false,
            stages: vec![
                StageRecord {
                    stage: StageId::new(StageKind::Geometry),
                    directory: workdir.to_path_buf(),
                    parameters: None,
                    completed: true,
                    invocations: vec![InvocationRecord {
                        command: "gmx editconf -f ethanol.gro -o box.gro -bt dodecahedron -d 1"
                            .to_string(),
                        exit_code: Some(0),
                        success: true,
                    }],
                },
                StageRecord {
                    stage: StageId::production(0),
                    directory: workdir.join("lambda_0"),
                    parameters: Some(workdir.join("lambda_0/run.mdp")),
                    completed: false,
                    invocations: vec![InvocationRecord {
                        command: "gmx grompp -f run.mdp -c equil.gro -p topol.top -o run.tpr"
                            .to_string(),
                        exit_code: Some(1),
                        success: false,
                    }],
                },
            ],
        }
    }

    #[test]
    fn commands_are_listed_in_stage_order() {
        let report = sample_report(Path::new("/work"));
        let commands: Vec<&str> = report.commands().collect();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("editconf"));
        assert!(commands[1].contains("grompp"));
    }

    #[test]
    fn window_directories_only_include_production_stages() {
        let report = sample_report(Path::new("/work"));
        assert_eq!(
            report.window_directories(),
            vec![Path::new("/work/lambda_0")]
        );
    }

    #[test]
    fn manifest_lists_stages_and_exit_codes() {
        let report = sample_report(Path::new("/work"));
        let manifest = report.to_manifest().unwrap();

        assert!(manifest.contains("completed = false"));
        assert!(manifest.contains("kind = \"geometry\""));
        assert!(manifest.contains("kind = \"production\""));
        assert!(manifest.contains("window = 0"));
        assert!(manifest.contains("exit_code = 1"));
    }

    #[test]
    fn manifest_is_written_into_workdir() {
        let dir = tempdir().unwrap();
        let report = sample_report(dir.path());

        let path = report.write_manifest().unwrap();

        assert_eq!(path, dir.path().join(MANIFEST_FILE));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("editconf"));
    }

    #[test]
    fn manifest_write_fails_for_missing_workdir() {
        let dir = tempdir().unwrap();
        let report = PipelineReport::new(&dir.path().join("gone"));

        assert!(matches!(
            report.write_manifest(),
            Err(ManifestError::Io { .. })
        ));
    }
}
