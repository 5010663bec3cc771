//! Shared domain types for ADWS.
//!
//! This crate contains the core domain types used across the ADWS pipeline:
//! Step, Workflow, PipelineError, and the audit/issue/story records.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod issue;
pub mod run;
pub mod story;
pub mod workflow;
