//! Command implementations
//!
//! `run` stages and launches the container; `list` renders the listing
//! options used by shell completion.

pub mod list;
pub mod run;
