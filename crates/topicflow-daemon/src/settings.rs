//! Daemon-level settings: the core [`Settings`] plus the `[viz]` section.

use serde::Deserialize;
use topicflow_types::{load_layered, Settings, TopicFlowError};
use topicflow_viz::VizConfig;

#[derive(Debug, Default, Deserialize)]
struct VizSection {
    #[serde(default)]
    viz: VizConfig,
}

#[derive(Debug, Clone, Default)]
pub struct DaemonSettings {
    pub core: Settings,
    pub viz: VizConfig,
}

impl DaemonSettings {
    /// Load both layers from the same sources and validate them.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TopicFlowError> {
        let core = Settings::load(cli_config_path)?;
        let section: VizSection = load_layered(cli_config_path)?;
        section.viz.validate().map_err(TopicFlowError::Config)?;
        Ok(Self {
            core,
            viz: section.viz,
        })
    }

    /// Apply CLI overrides (highest precedence).
    pub fn apply_overrides(&mut self, db_path: Option<&str>, log_level: Option<&str>) {
        if let Some(db_path) = db_path {
            self.core.db_path = db_path.to_string();
        }
        if let Some(log_level) = log_level {
            self.core.log_level = log_level.to_string();
        }
    }
}
