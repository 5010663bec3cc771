//! Pipeline engine for ADWS.
//!
//! This crate holds the pure execution machinery: contexts, registries,
//! combinators, and the sequential executor. It depends only on `adws-types`
//! -- never on process spawning, filesystem layout, or any other IO concern.
//! The infrastructure layer registers concrete step functions into the
//! registries defined here.

pub mod pipeline;
