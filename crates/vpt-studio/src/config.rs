use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use vpt_engine::context::ContextConfig;

/// Optional JSON settings file; command line flags override it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudioConfig {
    pub volume: Option<PathBuf>,
    /// LDR image used as the environment map.
    pub environment: Option<PathBuf>,
    pub log: Option<String>,
    #[serde(flatten)]
    pub context: ContextConfig,
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("invalid config {}", path.display()))
    }
}
