//! Guild-scoped permission registry.
//!
//! Command categories are gated per guild by an allow-list persisted at
//! `config/guild_permissions.json`; the owner guild always passes. Consulted
//! by the presentation layer before any economy command executes.

use crate::store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    General,
    Economy,
    Admin,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::General, Category::Economy, Category::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Economy => "economy",
            Category::Admin => "admin",
        }
    }
}

/// One guild's allow-list entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildPermissions {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub general: bool,
    #[serde(default)]
    pub economy: bool,
    #[serde(default)]
    pub admin: bool,
}

impl GuildPermissions {
    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::General => self.general,
            Category::Economy => self.economy,
            Category::Admin => self.admin,
        }
    }

    fn set(&mut self, category: Category, enabled: bool) {
        match category {
            Category::General => self.general = enabled,
            Category::Economy => self.economy = enabled,
            Category::Admin => self.admin = enabled,
        }
    }

    fn all_enabled(name: &str) -> Self {
        GuildPermissions {
            server_name: name.to_string(),
            general: true,
            economy: true,
            admin: true,
        }
    }
}

type PermissionMap = BTreeMap<String, GuildPermissions>;

pub struct PermissionRegistry {
    path: PathBuf,
    owner_guild_id: u64,
    cache: RwLock<PermissionMap>,
}

impl PermissionRegistry {
    /// Load the registry, making sure the owner guild carries every category.
    pub fn load(path: &Path, owner_guild_id: u64) -> Self {
        let mut map: PermissionMap = store::read_json_or_default(path);
        map.entry(owner_guild_id.to_string())
            .and_modify(|entry| {
                for category in Category::ALL {
                    entry.set(category, true);
                }
            })
            .or_insert_with(|| GuildPermissions::all_enabled("Owner Guild"));
        info!("Loaded permissions for {} guilds", map.len());
        PermissionRegistry {
            path: path.to_path_buf(),
            owner_guild_id,
            cache: RwLock::new(map),
        }
    }

    /// Whether a guild may use a command category.
    pub async fn is_enabled(&self, guild_id: u64, category: Category) -> bool {
        if guild_id == self.owner_guild_id {
            return true;
        }
        let map = self.cache.read().await;
        map.get(&guild_id.to_string())
            .is_some_and(|entry| entry.get(category))
    }

    /// Grant or revoke a category, creating the guild entry if needed.
    /// Returns `false` when the updated map could not be persisted.
    pub async fn set(
        &self,
        guild_id: u64,
        category: Category,
        enabled: bool,
        guild_name: Option<&str>,
    ) -> bool {
        let mut map = self.cache.write().await;
        let entry = map.entry(guild_id.to_string()).or_default();
        entry.set(category, enabled);
        if let Some(name) = guild_name {
            if entry.server_name != name {
                entry.server_name = name.to_string();
            }
        }
        debug!(
            "Set {} = {enabled} for guild {guild_id}",
            category.as_str()
        );
        store::write_json_atomic(&self.path, &*map)
    }

    /// All categories for one guild (all false for unknown guilds).
    pub async fn guild_permissions(&self, guild_id: u64) -> GuildPermissions {
        let map = self.cache.read().await;
        map.get(&guild_id.to_string()).cloned().unwrap_or_default()
    }

    /// Guilds allowed to use a category.
    pub async fn guilds_with(&self, category: Category) -> Vec<u64> {
        let map = self.cache.read().await;
        map.iter()
            .filter(|(_, entry)| entry.get(category))
            .filter_map(|(id, _)| id.parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    const OWNER: u64 = 10;
    const GUILD: u64 = 20;

    fn registry_in(dir: &TempDir) -> PermissionRegistry {
        PermissionRegistry::load(&dir.path().join("guild_permissions.json"), OWNER)
    }

    #[tokio::test]
    async fn owner_guild_always_passes() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        for category in Category::ALL {
            assert!(registry.is_enabled(OWNER, category).await);
        }
    }

    #[tokio::test]
    async fn unknown_guilds_are_denied_by_default() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        assert!(!registry.is_enabled(GUILD, Category::Economy).await);
        let perms = registry.guild_permissions(GUILD).await;
        assert_eq!(perms, GuildPermissions::default());
    }

    #[tokio::test]
    async fn grants_persist_across_reloads() {
        let dir = TempDir::new().unwrap();
        {
            let registry = registry_in(&dir);
            assert!(
                registry
                    .set(GUILD, Category::Economy, true, Some("Test Server"))
                    .await
            );
            assert!(registry.is_enabled(GUILD, Category::Economy).await);
            assert!(!registry.is_enabled(GUILD, Category::Admin).await);
        }

        let reloaded = registry_in(&dir);
        assert!(reloaded.is_enabled(GUILD, Category::Economy).await);
        assert_eq!(
            reloaded.guild_permissions(GUILD).await.server_name,
            "Test Server"
        );
    }

    #[tokio::test]
    async fn revoking_a_category_takes_effect() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.set(GUILD, Category::Economy, true, None).await;
        registry.set(GUILD, Category::Economy, false, None).await;
        assert!(!registry.is_enabled(GUILD, Category::Economy).await);
    }

    #[tokio::test]
    async fn guilds_with_lists_only_enabled_guilds() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.set(GUILD, Category::Economy, true, None).await;
        registry.set(30, Category::General, true, None).await;

        let mut economy_guilds = registry.guilds_with(Category::Economy).await;
        economy_guilds.sort_unstable();
        // The owner guild entry is materialized with every category on.
        assert_eq!(economy_guilds, vec![OWNER, GUILD]);
    }
}
