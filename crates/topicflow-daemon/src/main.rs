//! Topicflow Daemon
//!
//! Builds a topic hierarchy from conversation messages and serves it as a
//! graph.
//!
//! # Usage
//!
//! ```bash
//! topicflow-daemon serve [--port PORT] [--db-path PATH]
//! topicflow-daemon ingest --owner alice --text "..."
//! topicflow-daemon update --owner alice [--mode full]
//! topicflow-daemon show --owner alice
//! topicflow-daemon render --owner alice --output graph.svg
//! topicflow-daemon reset --owner alice
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/topicflow/config.toml)
//! 3. Environment variables (TOPICFLOW_*)
//! 4. CLI flags

use anyhow::Result;

use topicflow_daemon::{
    ingest, prepare, print_config, render, reset, serve, show, update, Cli, Commands,
    GlobalArgs,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let settings = prepare(&GlobalArgs {
        config: cli.config,
        log_level: cli.log_level,
        db_path: cli.db_path,
    })?;

    match cli.command {
        Commands::Serve { host, port } => {
            serve(settings, host, port).await?;
        }
        Commands::Update { owner, mode, json } => {
            update(&settings, &owner, &mode, json).await?;
        }
        Commands::Show { owner, stats_only } => {
            show(&settings, &owner, stats_only).await?;
        }
        Commands::Reset { owner } => {
            reset(&settings, &owner).await?;
        }
        Commands::Ingest {
            owner,
            role,
            text,
            file,
        } => {
            ingest(&settings, &owner, &role, text, file)?;
        }
        Commands::Render {
            owner,
            output,
            colors,
            ticks,
        } => {
            render(&settings, &owner, &output, colors, ticks).await?;
        }
        Commands::Config => {
            print_config(&settings)?;
        }
    }

    Ok(())
}
