//! gco-core library.
//!
//! The task board (`tasks.md`), the activity journal (`.gco-logs/`) and the
//! consistency validator that several coding agents share while working on
//! one repository.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per subsystem, each mapped to an
//!   [`error::ErrorCode`]; `anyhow::Result` for configuration plumbing.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod git;
pub mod import;
pub mod journal;
pub mod model;
pub mod project;
pub mod report;
pub mod review;
pub mod validate;
