//! CLI command implementations

pub mod completions;
pub mod export;
pub mod extract;
