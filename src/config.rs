//! Application and bot configuration.
//!
//! [`AppConfig`] is the operator-supplied TOML file (data directory, owner
//! guild, house account). [`BotSettings`] is the admin-mutable economy tuning
//! persisted as JSON next to the guild data; it is loaded once at startup and
//! written back through the store's atomic write path whenever an admin
//! command changes it.

use crate::errors::{Error, Result};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};
use tokio::sync::RwLock;
use tracing::{info, warn};

const CONFIG_PATH_VAR: &str = "MEDALKEEPER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "medalkeeper.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root directory for guild documents, config JSON, and response packs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Guild that always passes permission checks.
    pub owner_guild_id: u64,
    /// Account credited when the house wins the balance challenge.
    pub house_user_id: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Load the application configuration from the path in `MEDALKEEPER_CONFIG`
/// (falling back to `medalkeeper.toml` in the working directory).
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    tracing::debug!("Attempting to load configuration from: {path}");
    let contents = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read config file {path}: {e}")))?;
    let app_config: AppConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse TOML from config file {path}: {e}")))?;
    Ok(app_config)
}

/// Economy tuning knobs, persisted at `config/bot_settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub starting_balance: i64,
    /// Percent chance that a successful work/crime rolls a critical payout.
    pub critical_success_chance: u32,
    pub critical_multiplier_min: u32,
    pub critical_multiplier_max: u32,
}

impl Default for BotSettings {
    fn default() -> Self {
        BotSettings {
            starting_balance: 50,
            critical_success_chance: 2,
            critical_multiplier_min: 3,
            critical_multiplier_max: 5,
        }
    }
}

/// Process-wide settings handle: one load at startup, admin mutations write
/// back through the atomic JSON path.
pub struct Settings {
    path: PathBuf,
    current: RwLock<BotSettings>,
}

impl Settings {
    /// Load settings from `path`, seeding the file with defaults when absent.
    pub fn load(path: &Path) -> Self {
        let settings: BotSettings = store::read_json_or_default(path);
        if !path.exists() {
            info!("No bot settings file found, writing defaults");
            if !store::write_json_atomic(path, &settings) {
                warn!("Could not seed default bot settings at {}", path.display());
            }
        }
        Settings {
            path: path.to_path_buf(),
            current: RwLock::new(settings),
        }
    }

    pub async fn get(&self) -> BotSettings {
        self.current.read().await.clone()
    }

    pub async fn starting_balance(&self) -> i64 {
        self.current.read().await.starting_balance
    }

    /// Apply a mutation and persist it. Returns `false` when the write failed;
    /// the in-memory copy keeps the new value either way so behavior stays
    /// consistent until the next restart.
    pub async fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut BotSettings),
    {
        let mut current = self.current.write().await;
        mutate(&mut current);
        store::write_json_atomic(&self.path, &*current)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_match_documented_values() {
        let settings = BotSettings::default();
        assert_eq!(settings.starting_balance, 50);
        assert_eq!(settings.critical_success_chance, 2);
        assert_eq!(settings.critical_multiplier_min, 3);
        assert_eq!(settings.critical_multiplier_max, 5);
    }

    #[test]
    fn app_config_parses_with_default_data_dir() {
        let parsed: AppConfig =
            toml::from_str("owner_guild_id = 1\nhouse_user_id = 2\n").unwrap();
        assert_eq!(parsed.data_dir, PathBuf::from("data"));
        assert_eq!(parsed.owner_guild_id, 1);
        assert_eq!(parsed.house_user_id, 2);
    }

    #[tokio::test]
    async fn load_seeds_defaults_and_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bot_settings.json");

        let settings = Settings::load(&path);
        assert!(path.exists());
        assert_eq!(settings.get().await, BotSettings::default());

        assert!(settings.update(|s| s.starting_balance = 100).await);
        assert_eq!(settings.starting_balance().await, 100);

        // A second handle over the same file sees the persisted change.
        let reloaded = Settings::load(&path);
        assert_eq!(reloaded.starting_balance().await, 100);
    }

    #[tokio::test]
    async fn partial_settings_file_is_filled_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bot_settings.json");
        std::fs::write(&path, b"{\"starting_balance\": 75}").unwrap();

        let settings = Settings::load(&path);
        let current = settings.get().await;
        assert_eq!(current.starting_balance, 75);
        assert_eq!(current.critical_success_chance, 2);
    }
}
