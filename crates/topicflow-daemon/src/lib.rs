//! Topicflow daemon library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations
//! - `settings`: Core settings plus the visualizer section

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands};
pub use commands::{
    ingest, prepare, print_config, render, reset, serve, show, update, GlobalArgs, Pipeline,
};
pub use settings::DaemonSettings;
