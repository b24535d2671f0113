// src/config/mod.rs
pub mod providers;
pub mod refresh;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use providers::ProviderKeys;
pub use refresh::RefreshConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/cinetrack.toml";
pub const ENV_CONFIG_PATH: &str = "CINETRACK_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub providers: ProviderKeys,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: Settings = toml::from_str(s).context("parse settings toml")?;
        cfg.refresh.sanitize();
        cfg.providers.resolve_env();
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load using env var + fallback:
    /// 1) $CINETRACK_CONFIG_PATH (must exist)
    /// 2) config/cinetrack.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        let mut cfg = Settings::default();
        cfg.providers.resolve_env();
        Ok(cfg)
    }
}
