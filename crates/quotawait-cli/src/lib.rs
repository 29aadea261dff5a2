//! quotawait CLI - Command-line interface
//!
//! This crate provides the `quotawait` binary:
//! - `run`: drive the assistant and schedule a resume on quota exhaustion
//! - `classify` / `when`: offline inspection of captured output and notices
//! - `resume`: list, inspect, cancel and re-run scheduled resume tasks

pub mod commands;
pub mod context;
pub mod display;

pub use commands::{Cli, Commands};
pub use context::AppContext;
