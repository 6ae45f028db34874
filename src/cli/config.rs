use std::path::Path;

use anyhow::{Context as _, Result};
use serde::Deserialize;

/// Configuration loaded from `taskstate.yaml`.
/// All fields are optional; missing fields fall back to CLI/env/defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TaskStateConfig {
    /// Base URL of the remote store, prefixed to every resource path.
    pub api_url: Option<String>,
    /// Per-request timeout for the HTTP client, in seconds.
    pub timeout_s: Option<f64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Directory for the JSON store used by `serve`; in-memory when unset.
    pub store_dir: Option<String>,
}

impl TaskStateConfig {
    /// Load configuration from a YAML file.
    ///
    /// - If `path` is `Some`, load that specific file (error if missing).
    /// - If `path` is `None`, auto-detect `taskstate.yaml` in cwd; return defaults if absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let default_path = Path::new("taskstate.yaml");
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path.to_path_buf()
            }
        };

        let contents = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read config file: {}", file_path.display()))?;

        let config: TaskStateConfig = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", file_path.display()))?;

        if let Some(t) = config.timeout_s
            && (!t.is_finite() || t <= 0.0)
        {
            anyhow::bail!("timeout_s must be a positive number, got {}", t);
        }

        Ok(config)
    }
}
