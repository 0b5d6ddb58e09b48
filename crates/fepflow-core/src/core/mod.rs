//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Parameter Blocks** ([`mdp`]) - The flat `key = value` format consumed by the
//!   engine's preprocessor, the fixed protocol presets, and the writer that puts a
//!   rendered block on disk.
//! - **Artifact Contract** ([`artifacts`]) - Every file exchanged between stages,
//!   together with the stage that produces it and the stages that consume it.

pub mod artifacts;
pub mod mdp;
