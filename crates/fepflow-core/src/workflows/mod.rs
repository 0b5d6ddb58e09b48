//! # Workflows Module
//!
//! High-level entry points that run a complete protocol.
//!
//! - **Free-Energy Workflow** ([`fep`]) - Box construction, solvation, minimization,
//!   equilibration, and the lambda-window production fan-out of the free-energy
//!   tutorial.

pub mod fep;
