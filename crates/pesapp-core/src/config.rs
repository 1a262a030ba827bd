//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend project URL, its anon key, and optional
//! cache TTL overrides.
//!
//! Configuration is stored at `~/.config/pesapp/config.json`. The
//! `SUPABASE_URL` and `SUPABASE_ANON_KEY` environment variables take
//! precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::BackendSettings;
use crate::cache::CacheTtls;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "pesapp";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Per-class TTL overrides in minutes. Unset fields keep the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcements_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_reports_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_profile_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_minutes: Option<u64>,
}

impl CacheTtlConfig {
    pub fn resolve(&self) -> CacheTtls {
        fn pick(minutes: Option<u64>, default: Duration) -> Duration {
            minutes.map_or(default, |m| Duration::from_secs(m.saturating_mul(60)))
        }

        let defaults = CacheTtls::default();
        CacheTtls {
            users: pick(self.users_minutes, defaults.users),
            announcements: pick(self.announcements_minutes, defaults.announcements),
            financial_reports: pick(self.financial_reports_minutes, defaults.financial_reports),
            events: pick(self.events_minutes, defaults.events),
            user_profile: pick(self.user_profile_minutes, defaults.user_profile),
            details: pick(self.details_minutes, defaults.details),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub cache: CacheTtlConfig,
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Non-empty environment values replace the file's backend settings.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_ANON_KEY) {
            self.supabase_anon_key = Some(key);
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        self.cache.resolve()
    }

    pub fn backend_settings(&self) -> Result<BackendSettings> {
        let url = self
            .supabase_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Backend URL not set (config file or {})", ENV_URL))?;
        let anon_key = self
            .supabase_anon_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Anon key not set (config file or {})", ENV_ANON_KEY))?;
        Ok(BackendSettings { url, anon_key })
    }
}
