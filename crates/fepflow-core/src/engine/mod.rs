//! # Engine Module
//!
//! This module turns a validated configuration into engine processes and checks
//! what those processes leave behind.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed pipeline settings, validation, and the
//!   parameter overrides applied to the protocol presets
//! - **Environment** ([`environment`]) - The search path and variables handed to every
//!   engine process
//! - **Invocations** ([`invocation`]) - Structured engine commands; nothing is ever
//!   passed through a shell
//! - **Process Runner** ([`runner`]) - The seam between the pipeline and the operating
//!   system
//! - **Stage Plan** ([`stage`]) - The deterministic, fully resolved list of stages
//! - **Executor** ([`executor`]) - Runs a single planned stage and verifies its
//!   artifacts
//! - **Reporting** ([`report`], [`progress`]) - Run records, the on-disk manifest, and
//!   progress callbacks
//! - **Error Handling** ([`error`]) - Stage-aware failures that abort the pipeline

pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stage;
