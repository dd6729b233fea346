//! Configuration handling for the TUI

use crate::form::ValidationMode;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for the simulated directory latency
const LATENCY_ENV: &str = "FORMKIT_LOOKUP_LATENCY_MS";

/// Default simulated latency of the email directory
const DEFAULT_LATENCY_MS: u64 = 400;

/// User configuration for the TUI
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TuiConfig {
    /// When fields validate before the first submit
    pub validation_mode: Option<ValidationMode>,
    /// When fields validate after the first submit
    pub revalidate_mode: Option<ValidationMode>,
    /// Simulated email directory latency in milliseconds
    pub lookup_latency_ms: Option<u64>,
    /// Make every directory lookup fail
    pub directory_offline: Option<bool>,
    /// Reset the form once a submit succeeds
    pub reset_after_submit: Option<bool>,
}

impl TuiConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "formkit", "formkit-tui")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(std::env::var(LATENCY_ENV).ok().as_deref());
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    fn apply_env(&mut self, latency: Option<&str>) {
        if let Some(raw) = latency {
            match raw.trim().parse() {
                Ok(ms) => self.lookup_latency_ms = Some(ms),
                Err(_) => tracing::warn!("Ignoring {LATENCY_ENV}={raw}: not a number"),
            }
        }
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode.unwrap_or_default()
    }

    pub fn revalidate_mode(&self) -> ValidationMode {
        self.revalidate_mode.unwrap_or(ValidationMode::OnChange)
    }

    pub fn lookup_latency(&self) -> Duration {
        Duration::from_millis(self.lookup_latency_ms.unwrap_or(DEFAULT_LATENCY_MS))
    }

    pub fn directory_offline(&self) -> bool {
        self.directory_offline.unwrap_or(false)
    }

    pub fn reset_after_submit(&self) -> bool {
        self.reset_after_submit.unwrap_or(true)
    }
}
