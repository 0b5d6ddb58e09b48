//! # fepflow Core Library
//!
//! Orchestration of the GROMACS free-energy tutorial protocol: box construction,
//! solvation, energy minimization, equilibration, and a fan-out of independent
//! lambda-window production runs. Every numerically meaningful step happens inside
//! the external engine; this library decides what to run, in which directory, with
//! which parameter files, and verifies that each step left behind what the next one
//! needs.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split used across the project:
//!
//! - **[`core`]: The Foundation.** Stateless data: the `.mdp` parameter block model,
//!   its presets and writer, and the artifact contract that names every file passed
//!   between stages.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the explicit engine environment,
//!   structured engine invocations, the process runner seam, the deterministic stage
//!   plan and the executor that carries out a single stage.
//!
//! - **[`workflows`]: The Public API.** The pipeline orchestrator tying everything
//!   together into a complete run.

pub mod core;
pub mod engine;
pub mod workflows;
