//! CLI subcommands

pub mod agent;
pub mod analyze;
pub mod config;
