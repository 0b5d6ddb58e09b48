use std::collections::BTreeMap;
use std::env::{self, JoinPathsError};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// The environment every engine process is started with.
///
/// Nothing is loaded into the current process. The caller states which directories
/// go in front of `PATH` and which variables are set, and the runner applies exactly
/// that to each child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineEnvironment {
    path_prefix: Vec<PathBuf>,
    variables: BTreeMap<String, String>,
}

impl EngineEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_prefix(mut self, dir: impl Into<PathBuf>) -> Self {
        self.path_prefix.push(dir.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn path_prefix(&self) -> &[PathBuf] {
        &self.path_prefix
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn is_empty(&self) -> bool {
        self.path_prefix.is_empty() && self.variables.is_empty()
    }

    /// The `PATH` value for a child process, or `None` to inherit it unchanged.
    pub fn search_path(&self, inherited: Option<&OsStr>) -> Result<Option<OsString>, JoinPathsError> {
        if self.path_prefix.is_empty() {
            return Ok(None);
        }
        let inherited: Vec<PathBuf> = inherited
            .map(|p| env::split_paths(p).collect())
            .unwrap_or_default();
        let joined = env::join_paths(
            self.path_prefix
                .iter()
                .map(PathBuf::as_path)
                .chain(inherited.iter().map(PathBuf::as_path)),
        )?;
        Ok(Some(joined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_inherits_search_path() {
        let environment = EngineEnvironment::new();
        assert!(environment.is_empty());
        assert_eq!(
            environment.search_path(Some(OsStr::new("/usr/bin"))).unwrap(),
            None
        );
    }

    #[cfg(unix)]
    #[test]
    fn prefix_directories_come_before_inherited_path() {
        let environment = EngineEnvironment::new()
            .with_path_prefix("/opt/gromacs/bin")
            .with_path_prefix("/opt/tools");

        let path = environment
            .search_path(Some(OsStr::new("/usr/bin:/bin")))
            .unwrap()
            .unwrap();

        assert_eq!(path, OsString::from("/opt/gromacs/bin:/opt/tools:/usr/bin:/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn prefix_without_inherited_path_stands_alone() {
        let environment = EngineEnvironment::new().with_path_prefix("/opt/gromacs/bin");

        let path = environment.search_path(None).unwrap().unwrap();

        assert_eq!(path, OsString::from("/opt/gromacs/bin"));
    }

    #[test]
    fn variables_are_kept_sorted_and_overwritten() {
        let environment = EngineEnvironment::new()
            .with_variable("OMP_NUM_THREADS", "4")
            .with_variable("GMX_MAXBACKUP", "-1")
            .with_variable("OMP_NUM_THREADS", "1");

        let pairs: Vec<_> = environment
            .variables()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(pairs, vec![("GMX_MAXBACKUP", "-1"), ("OMP_NUM_THREADS", "1")]);
    }
}
