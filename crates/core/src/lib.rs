//! Core library for the scuba CLI
//!
//! This crate contains the configuration resolution engine (`.scuba.yml`
//! loading, discovery, alias resolution), Docker integration, container
//! staging, logging, and error handling.

pub mod config;
pub mod context;
pub mod dive;
pub mod docker;
pub mod errors;
pub mod logging;
pub mod path;
pub mod script;
pub mod shell;
pub mod user_mapping;
pub mod variable;
pub mod volume;
pub mod yaml;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Name of the project configuration file
pub const SCUBA_YML: &str = ".scuba.yml";

/// Shell used to run scripts when none is configured
pub const DEFAULT_SHELL: &str = "/bin/sh";
