use crate::engine::config::BoxShape;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One engine process: program, argument list, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Human-readable command line, quoting arguments that contain whitespace.
    /// Only used for display; processes are never started from this string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdrunThreads {
    /// `-ntmpi <n>`
    MpiRanks(u32),
    /// `-nt <n>`
    Total(u32),
}

/// Builds invocations of the `gmx` tool suite.
#[derive(Debug, Clone, Copy)]
pub struct Gmx<'a> {
    binary: &'a str,
}

impl<'a> Gmx<'a> {
    pub fn new(binary: &'a str) -> Self {
        Self { binary }
    }

    fn tool(&self, name: &str, dir: &Path) -> Invocation {
        Invocation::new(self.binary, dir).arg(name)
    }

    pub fn version(&self, dir: &Path) -> Invocation {
        Invocation::new(self.binary, dir).arg("--version")
    }

    pub fn editconf(
        &self,
        dir: &Path,
        input: &str,
        output: &str,
        shape: BoxShape,
        padding_nm: f64,
    ) -> Invocation {
        let padding = padding_nm.to_string();
        self.tool("editconf", dir).args([
            "-f",
            input,
            "-o",
            output,
            "-bt",
            shape.as_str(),
            "-d",
            padding.as_str(),
        ])
    }

    pub fn solvate(
        &self,
        dir: &Path,
        solute_box: &str,
        solvent: &str,
        output: &str,
        topology: &str,
    ) -> Invocation {
        self.tool("solvate", dir)
            .args(["-cp", solute_box, "-cs", solvent, "-o", output, "-p", topology])
    }

    pub fn grompp(
        &self,
        dir: &Path,
        parameters: &str,
        structure: &str,
        topology: &str,
        output: &str,
    ) -> Invocation {
        self.tool("grompp", dir).args([
            "-f", parameters, "-c", structure, "-p", topology, "-o", output,
        ])
    }

    pub fn mdrun(&self, dir: &Path, deffnm: &str, threads: MdrunThreads, verbose: bool) -> Invocation {
        let mut invocation = self.tool("mdrun", dir);
        if verbose {
            invocation = invocation.arg("-v");
        }
        invocation = invocation.args(["-deffnm", deffnm]);
        match threads {
            MdrunThreads::MpiRanks(n) => invocation.args(["-ntmpi".to_string(), n.to_string()]),
            MdrunThreads::Total(n) => invocation.args(["-nt".to_string(), n.to_string()]),
        }
    }
}
