use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Viewer settings ───────────────────────────────────────────────────────────

/// Persisted viewer preferences, stored as JSON in the user config dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Characters delivered per replay chunk.
    pub replay_chunk_chars: usize,
    /// Delay between replay chunks.
    pub replay_interval_ms: u64,
    /// Start with every container expanded.
    pub expand_all: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            replay_chunk_chars: 24,
            replay_interval_ms: 40,
            expand_all: false,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stepview").join("config.json"))
}

impl Settings {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings at {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        settings.replay_chunk_chars = settings.replay_chunk_chars.max(1);
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}
