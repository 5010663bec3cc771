//! Infrastructure layer for ADWS.
//!
//! Everything that touches the outside world lives here: subprocess
//! spawning, the `bd` issue-tracker client, the Claude CLI agent runner,
//! lint/test tool invocation, story files, run logs, and configuration
//! loading. The `steps` module packages all of it as step functions for
//! the `adws-core` registry.

pub mod agent;
pub mod beads;
pub mod config;
pub mod process;
pub mod runlog;
pub mod steps;
pub mod story;
pub mod tools;
