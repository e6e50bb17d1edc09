//! Configuration loading for CallQA services
//!
//! Resolution priority, highest first:
//! 1. Command-line argument (config file path)
//! 2. `CALLQA_CONFIG` environment variable
//! 3. `callqa.toml` in the working directory
//! 4. Compiled defaults
//!
//! A missing config file is not an error (the compiled defaults apply);
//! an unreadable or malformed file is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file path
pub const CONFIG_ENV_VAR: &str = "CALLQA_CONFIG";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "callqa.toml";

/// Tuning parameters for the analysis engine
///
/// Every empirically-tuned constant lives here so reviewers can adjust
/// behavior without a rebuild. The defaults are the shipped values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Timeline markers earlier than this are dropped unless they carry
    /// an explicit (non-estimated) timestamp
    pub min_marker_seconds: f64,
    /// Maximum gap (position units, 0-100) between a cluster's anchor and
    /// a member
    pub cluster_threshold: f64,
    /// Minimum visual separation (position units) enforced between
    /// adjacent markers
    pub anti_overlap_threshold: f64,
    /// Semantic score at or above which an unlabeled line is attributed
    /// to the agent
    pub agent_threshold: i32,
    /// Semantic score at or below which an unlabeled line is attributed
    /// to the prospect
    pub prospect_threshold: i32,
    /// Synthetic duration of the final transcript turn
    pub last_turn_padding_seconds: f64,
    /// Delay before a recomputed score is written to the sync collaborator
    pub sync_debounce_ms: u64,
    /// Score difference (points) within which stored and recomputed
    /// scores are considered equal
    pub sync_tolerance: u32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            min_marker_seconds: 5.0,
            cluster_threshold: 2.0,
            anti_overlap_threshold: 1.2,
            agent_threshold: 3,
            prospect_threshold: -3,
            last_turn_padding_seconds: 5.0,
            sync_debounce_ms: 1000,
            sync_tolerance: 1,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Base URL of the score-sync collaborator, if configured
    pub score_sync_base_url: Option<String>,
    /// Base URL of the override-write collaborator, if configured
    pub override_api_base_url: Option<String>,
    /// Engine tuning parameters
    pub params: EngineParams,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5731,
            score_sync_base_url: None,
            override_api_base_url: None,
            params: EngineParams::default(),
        }
    }
}

/// Resolve service configuration following the priority order above.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<ServiceConfig> {
    // Priority 1: command-line argument
    if let Some(path) = cli_path {
        return load_config_file(path);
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config_file(Path::new(&path));
    }

    // Priority 3: working-directory config file
    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return load_config_file(&default_path);
    }

    // Priority 4: compiled defaults
    tracing::info!("no config file found, using compiled defaults");
    Ok(ServiceConfig::default())
}

fn load_config_file(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    let config: ServiceConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}
