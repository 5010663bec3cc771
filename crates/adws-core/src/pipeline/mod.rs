//! Sequential pipeline engine: definition parsing, combinators, and execution.
//!
//! This module contains the "brain" of the workflow system:
//! - `definition` -- YAML parsing, validation, filesystem load/save
//! - `context` -- Immutable execution context threaded through steps
//! - `expression` -- JEXL evaluator for step skip conditions
//! - `dataflow` -- Published-output registry and `input_from` resolution
//! - `registry` -- Step function and workflow registries
//! - `combinator` -- `sequence` and `with_verification` workflow builders
//! - `executor` -- Single-step runner, retry wrapper, and the run loop
//! - `builtin` -- The stock plan/implement/review/sdlc workflows

pub mod builtin;
pub mod combinator;
pub mod context;
pub mod dataflow;
pub mod definition;
pub mod executor;
pub mod expression;
pub mod registry;
