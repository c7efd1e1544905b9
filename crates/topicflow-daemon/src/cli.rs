//! CLI argument parsing for the topicflow daemon.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Topic-flow daemon
///
/// Extracts a topic hierarchy from conversation messages and serves it as a
/// graph.
#[derive(Parser, Debug)]
#[command(name = "topicflow-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/topicflow/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override HTTP host
        #[arg(long)]
        host: Option<String>,

        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one update for an owner
    Update {
        #[arg(short, long)]
        owner: String,

        /// incremental or full
        #[arg(short, long, default_value = "incremental")]
        mode: String,

        /// Print the whole outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the current graph of an owner as JSON
    Show {
        #[arg(short, long)]
        owner: String,

        /// Print only the stats block
        #[arg(long)]
        stats_only: bool,
    },

    /// Delete every topic record and the cursor of an owner
    Reset {
        #[arg(short, long)]
        owner: String,
    },

    /// Append messages to an owner's message log
    Ingest {
        #[arg(short, long)]
        owner: String,

        /// Author role (user, assistant, system, tool)
        #[arg(short, long, default_value = "user")]
        role: String,

        /// Message text; reads one message per line from --file or stdin when absent
        #[arg(short, long)]
        text: Option<String>,

        /// File with one message per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Lay out the current graph and write it as SVG
    Render {
        #[arg(short, long)]
        owner: String,

        /// Output SVG path
        #[arg(long, default_value = "topicflow.svg")]
        output: PathBuf,

        /// Color map file, read before and written after rendering
        #[arg(long)]
        colors: Option<PathBuf>,

        /// Simulation tick budget
        #[arg(long, default_value = "300")]
        ticks: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve_with_port() {
        let cli = Cli::parse_from(["topicflow-daemon", "serve", "-p", "9999"]);
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, Some(9999));
                assert_eq!(host, None);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "topicflow-daemon",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
            "show",
            "--owner",
            "alice",
            "--db-path",
            "/tmp/db",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert_eq!(cli.db_path, Some("/tmp/db".to_string()));
    }

    #[test]
    fn test_cli_update_defaults_to_incremental() {
        let cli = Cli::parse_from(["topicflow-daemon", "update", "-o", "alice"]);
        match cli.command {
            Commands::Update { owner, mode, json } => {
                assert_eq!(owner, "alice");
                assert_eq!(mode, "incremental");
                assert!(!json);
            }
            _ => panic!("Expected Update command"),
        }
    }

    #[test]
    fn test_cli_ingest_text() {
        let cli = Cli::parse_from([
            "topicflow-daemon",
            "ingest",
            "-o",
            "alice",
            "-r",
            "assistant",
            "-t",
            "hello",
        ]);
        match cli.command {
            Commands::Ingest {
                role, text, file, ..
            } => {
                assert_eq!(role, "assistant");
                assert_eq!(text, Some("hello".to_string()));
                assert!(file.is_none());
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_render_defaults() {
        let cli = Cli::parse_from(["topicflow-daemon", "render", "-o", "alice"]);
        match cli.command {
            Commands::Render {
                output,
                colors,
                ticks,
                ..
            } => {
                assert_eq!(output, PathBuf::from("topicflow.svg"));
                assert!(colors.is_none());
                assert_eq!(ticks, 300);
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_cli_config() {
        let cli = Cli::parse_from(["topicflow-daemon", "config"]);
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_cli_reset_requires_owner() {
        assert!(Cli::try_parse_from(["topicflow-daemon", "reset"]).is_err());
    }
}
