//! Command implementations for the topicflow daemon.
//!
//! Handles:
//! - serve: open storage, build the pipeline, serve HTTP until a signal
//! - update / show / reset: one-shot pipeline operations for an owner
//! - ingest: append messages to the stored message log
//! - render: lay out the current graph and write SVG plus the color map

use std::fs;
use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use topicflow_extract::{build_client, ExtractorConfig, TopicExtractor};
use topicflow_service::{
    run_server_with_shutdown, AppState, FlowOrchestrator, StoredMessageSource, UpdateMode,
};
use topicflow_storage::{MessageLog, Storage, TopicStore};
use topicflow_types::{MessageRole, OwnerId};
use topicflow_viz::{render_svg, ColorMap, RunStatus, Scene};

use crate::settings::DaemonSettings;

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<String>,
    pub log_level: Option<String>,
    pub db_path: Option<String>,
}

/// Storage, message log and orchestrator over one database.
pub struct Pipeline {
    pub messages: Arc<MessageLog>,
    pub orchestrator: Arc<FlowOrchestrator>,
}

impl Pipeline {
    pub fn open(settings: &DaemonSettings) -> Result<Self> {
        let core = &settings.core;
        let db_path = core.expanded_db_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        info!("Opening storage at {:?}", db_path);
        let storage = Arc::new(Storage::open(&db_path).context("Failed to open storage")?);

        let store = Arc::new(TopicStore::new(storage.clone()).with_max_keywords(core.store.max_keywords));
        let messages = Arc::new(MessageLog::new(storage));
        let client = build_client(&core.completion).context("Failed to build completion client")?;
        let extractor = TopicExtractor::new(client, ExtractorConfig::from_settings(core));
        let source = Arc::new(StoredMessageSource::new(messages.clone()));

        let orchestrator = Arc::new(FlowOrchestrator::new(store, source, extractor, core.flow.clone()));
        Ok(Self {
            messages,
            orchestrator,
        })
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Load settings, apply CLI overrides and start logging.
pub fn prepare(args: &GlobalArgs) -> Result<DaemonSettings> {
    let mut settings =
        DaemonSettings::load(args.config.as_deref()).context("Failed to load configuration")?;
    settings.apply_overrides(args.db_path.as_deref(), args.log_level.as_deref());
    init_logging(&settings.core.log_level)?;
    Ok(settings)
}

fn parse_owner(raw: &str) -> Result<OwnerId> {
    OwnerId::parse(raw).with_context(|| format!("Invalid owner id: {:?}", raw))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

/// Serve the HTTP API until Ctrl+C or SIGTERM.
pub async fn serve(mut settings: DaemonSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        settings.core.http_host = host;
    }
    if let Some(port) = port {
        settings.core.http_port = port;
    }

    info!("Topicflow daemon starting...");
    info!("  Database path: {}", settings.core.db_path);
    info!("  HTTP address: {}", settings.core.http_addr());
    info!("  Completion provider: {}", settings.core.completion.provider);

    let pipeline = Pipeline::open(&settings)?;
    let addr: SocketAddr = settings
        .core
        .http_addr()
        .parse()
        .context("Invalid HTTP address")?;

    run_server_with_shutdown(addr, AppState::new(pipeline.orchestrator), shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

/// Run one update and print a summary (or the whole outcome as JSON).
pub async fn update(settings: &DaemonSettings, owner: &str, mode: &str, json: bool) -> Result<()> {
    let owner = parse_owner(owner)?;
    let mode: UpdateMode = mode.parse()?;
    let pipeline = Pipeline::open(settings)?;

    let outcome = pipeline.orchestrator.update(&owner, mode).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} update for {}: processed {} messages, cursor {}",
        outcome.mode, owner, outcome.processed_count, outcome.cursor
    );
    println!(
        "  graph: {} nodes, {} links, {} triples",
        outcome.graph.nodes.len(),
        outcome.graph.links.len(),
        outcome.stats.total_triples
    );
    if outcome.failed_batches > 0 {
        println!("  failed batches: {}", outcome.failed_batches);
        for failed in &outcome.batch_errors {
            println!(
                "    messages {}-{}: {}",
                failed.first_message_id, failed.last_message_id, failed.error
            );
        }
    }
    Ok(())
}

/// Print the current graph (or just its stats) as JSON.
pub async fn show(settings: &DaemonSettings, owner: &str, stats_only: bool) -> Result<()> {
    let owner = parse_owner(owner)?;
    let pipeline = Pipeline::open(settings)?;
    let snapshot = pipeline.orchestrator.get_current(&owner).await?;
    let text = if stats_only {
        serde_json::to_string_pretty(&snapshot.stats)?
    } else {
        serde_json::to_string_pretty(&snapshot)?
    };
    println!("{}", text);
    Ok(())
}

pub async fn reset(settings: &DaemonSettings, owner: &str) -> Result<()> {
    let owner = parse_owner(owner)?;
    let pipeline = Pipeline::open(settings)?;
    pipeline.orchestrator.reset(&owner).await?;
    println!("Reset topic flow for {}", owner);
    Ok(())
}

/// Message texts from `--text`, `--file` or stdin, one per non-empty line.
fn collect_texts(text: Option<String>, file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(text) = text {
        return Ok(vec![text]);
    }
    let lines: Vec<String> = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => io::stdin().lock().lines().collect::<io::Result<_>>()?,
    };
    Ok(lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

pub fn ingest(
    settings: &DaemonSettings,
    owner: &str,
    role: &str,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let owner = parse_owner(owner)?;
    let role: MessageRole = role.parse().map_err(anyhow::Error::msg)?;
    let texts = collect_texts(text, file.as_deref())?;
    let pipeline = Pipeline::open(settings)?;

    let mut last = None;
    for text in &texts {
        last = Some(pipeline.messages.append(&owner, role, text)?.id);
    }
    match last {
        Some(id) => println!("Appended {} messages for {} (last id {})", texts.len(), owner, id),
        None => println!("Nothing to append"),
    }
    Ok(())
}

fn load_color_map(path: &Path) -> Result<ColorMap> {
    if !path.exists() {
        return Ok(ColorMap::new());
    }
    let bytes = fs::read(path).with_context(|| format!("Failed to read color map {:?}", path))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid color map {:?}", path))
}

fn save_color_map(path: &Path, map: &ColorMap) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(map)?)
        .with_context(|| format!("Failed to write color map {:?}", path))
}

/// Default color map location next to the database.
fn default_color_map_path(settings: &DaemonSettings, owner: &OwnerId) -> PathBuf {
    settings
        .core
        .expanded_db_path()
        .with_file_name(format!("colors-{}.json", owner))
}

pub async fn render(
    settings: &DaemonSettings,
    owner: &str,
    output: &Path,
    colors: Option<PathBuf>,
    ticks: usize,
) -> Result<()> {
    let owner = parse_owner(owner)?;
    let pipeline = Pipeline::open(settings)?;
    let snapshot = pipeline.orchestrator.get_current(&owner).await?;

    let colors_path = colors.unwrap_or_else(|| default_color_map_path(settings, &owner));
    let previous = load_color_map(&colors_path)?;

    let mut scene = Scene::build(&snapshot.graph, &previous, &settings.viz);
    if !scene.dropped().is_clean() {
        warn!(dropped = ?scene.dropped(), "Some graph elements were skipped");
    }
    if scene.run_layout(ticks) == RunStatus::Exhausted {
        info!(ticks, "Layout did not settle within the tick budget");
    }

    fs::write(output, render_svg(&scene)).with_context(|| format!("Failed to write {:?}", output))?;
    save_color_map(&colors_path, scene.color_map())?;

    println!(
        "Rendered {} nodes to {:?} (colors in {:?})",
        scene.nodes().len(),
        output,
        colors_path
    );
    Ok(())
}

/// Effective configuration as TOML, with the API key masked.
fn effective_config_toml(settings: &DaemonSettings) -> Result<String> {
    let mut core = settings.core.clone();
    if core.completion.api_key.is_some() {
        core.completion.api_key = Some("********".to_string());
    }
    let mut table = toml::Table::try_from(&core).context("Failed to encode settings")?;
    table.insert(
        "viz".to_string(),
        toml::Value::try_from(&settings.viz).context("Failed to encode viz settings")?,
    );
    Ok(toml::to_string_pretty(&table)?)
}

pub fn print_config(settings: &DaemonSettings) -> Result<()> {
    print!("{}", effective_config_toml(settings)?);
    Ok(())
}
