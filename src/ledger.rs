//! Ledger service: account CRUD and every balance/cooldown/prison mutation.
//!
//! All mutations follow the same discipline: take the guild lock, reload the
//! document fresh from disk, apply the change, save. Read-modify-write is
//! never split across an unlocked gap, so two concurrent commands for the
//! same guild cannot lose updates. Read-only paths may serve from the TTL
//! cache.

use crate::config::Settings;
use crate::models::{Activity, GuildLedger, PrisonStatus, PrisonTier, UserAccount};
use crate::store::DataStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Current unix time in whole seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<DataStore>,
    settings: Arc<Settings>,
}

impl Ledger {
    pub fn new(store: Arc<DataStore>, settings: Arc<Settings>) -> Self {
        Ledger { store, settings }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Run `mutate` over the guild document under the guild lock, persisting
    /// the result. The closure's return value is passed through.
    pub async fn with_guild<F, T>(&self, guild_id: u64, mutate: F) -> T
    where
        F: FnOnce(&mut GuildLedger) -> T,
    {
        let lock = self.store.guild_lock(guild_id).await;
        let _guard = lock.lock().await;
        let mut document = self.store.load_guild_fresh(guild_id).await;
        let out = mutate(&mut document);
        if !self.store.save_guild(guild_id, &document).await {
            warn!("Guild {guild_id}: state not guaranteed persisted");
        }
        out
    }

    /// Run `mutate` over one account (created with defaults if absent) under
    /// the guild lock.
    pub async fn with_account<F, T>(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        mutate: F,
    ) -> T
    where
        F: FnOnce(&mut UserAccount) -> T,
    {
        let starting_balance = self.settings.starting_balance().await;
        self.with_guild(guild_id, |document| {
            mutate(document.entry(user_id, username, starting_balance))
        })
        .await
    }

    /// Fetch an account, creating (and persisting) it with default values on
    /// first reference.
    pub async fn account(&self, guild_id: u64, user_id: u64, username: &str) -> UserAccount {
        let document = self.store.load_guild(guild_id).await;
        if let Some(account) = document.account(user_id) {
            return account.clone();
        }
        debug!("Creating new account for {user_id} in guild {guild_id}");
        self.with_account(guild_id, user_id, username, |account| account.clone())
            .await
    }

    pub async fn pockets(&self, guild_id: u64, user_id: u64, username: &str) -> i64 {
        self.account(guild_id, user_id, username).await.pockets
    }

    pub async fn savings(&self, guild_id: u64, user_id: u64, username: &str) -> i64 {
        self.account(guild_id, user_id, username).await.savings
    }

    /// Adjust a pocket balance by `delta` and return the new balance.
    /// Negative results are allowed; debt is part of the economy.
    pub async fn update_pockets(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        delta: i64,
    ) -> i64 {
        self.with_account(guild_id, user_id, username, |account| {
            account.pockets += delta;
            account.pockets
        })
        .await
    }

    /// Adjust a savings balance by `delta` and return the new balance.
    pub async fn update_savings(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        delta: i64,
    ) -> i64 {
        self.with_account(guild_id, user_id, username, |account| {
            account.savings += delta;
            account.savings
        })
        .await
    }

    /// Stamp `activity` as used now.
    pub async fn set_cooldown(&self, guild_id: u64, user_id: u64, username: &str, activity: Activity) {
        let now = unix_now();
        self.with_account(guild_id, user_id, username, |account| {
            account.cooldowns.insert(activity, now);
        })
        .await;
    }

    /// Whether `activity` is off cooldown. Returns `(ready, remaining_secs)`;
    /// the boundary case `elapsed == window` counts as ready.
    pub async fn check_cooldown(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        activity: Activity,
        window: i64,
    ) -> (bool, i64) {
        let account = self.account(guild_id, user_id, username).await;
        let last_used = account.cooldowns.get(&activity).copied().unwrap_or(0);
        let elapsed = unix_now() - last_used;
        if elapsed >= window {
            (true, 0)
        } else {
            (false, window - elapsed)
        }
    }

    /// Mark a user as freshly robbed, starting their protection window.
    pub async fn set_last_robbed(&self, guild_id: u64, user_id: u64, username: &str) {
        let now = unix_now();
        self.with_account(guild_id, user_id, username, |account| {
            account.last_robbed = now;
        })
        .await;
    }

    /// Whether a user can be robbed again. Returns `(robbable, remaining_secs)`.
    pub async fn check_last_robbed(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        window: i64,
    ) -> (bool, i64) {
        let account = self.account(guild_id, user_id, username).await;
        let elapsed = unix_now() - account.last_robbed;
        if elapsed >= window {
            (true, 0)
        } else {
            (false, window - elapsed)
        }
    }

    /// Current prison status with lazy auto-release: an expired sentence is
    /// cleared (and persisted) the moment it is observed.
    pub async fn prison_status(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
    ) -> Option<PrisonStatus> {
        let account = self.account(guild_id, user_id, username).await;
        let status = account.prison?;
        if status.is_expired(unix_now()) {
            debug!("Auto-releasing {user_id} from {}", status.tier.name());
            self.with_account(guild_id, user_id, username, |account| {
                account.prison = None;
            })
            .await;
            return None;
        }
        Some(status)
    }

    pub async fn is_in_prison(&self, guild_id: u64, user_id: u64, username: &str) -> bool {
        self.prison_status(guild_id, user_id, username).await.is_some()
    }

    pub async fn send_to_prison(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        tier: PrisonTier,
        duration_secs: i64,
    ) {
        let release_time = unix_now() + duration_secs;
        self.with_account(guild_id, user_id, username, |account| {
            account.prison = Some(PrisonStatus { tier, release_time });
        })
        .await;
    }

    /// Release a user. Returns `false` when they were not imprisoned.
    pub async fn release_from_prison(&self, guild_id: u64, user_id: u64, username: &str) -> bool {
        self.with_account(guild_id, user_id, username, |account| {
            account.prison.take().is_some()
        })
        .await
    }

    /// Extend a sentence. Returns `false` when the user was not imprisoned.
    pub async fn extend_sentence(
        &self,
        guild_id: u64,
        user_id: u64,
        username: &str,
        extra_secs: i64,
    ) -> bool {
        self.with_account(guild_id, user_id, username, |account| {
            match account.prison.as_mut() {
                Some(status) => {
                    status.release_time += extra_secs;
                    true
                }
                None => false,
            }
        })
        .await
    }

    /// Sweep a guild document for expired sentences, releasing each. Returns
    /// the number of prisoners released. Run at startup per connected guild.
    pub async fn release_expired(&self, guild_id: u64) -> usize {
        let now = unix_now();
        self.with_guild(guild_id, |document| {
            let mut released = 0;
            for account in document.accounts.values_mut() {
                if let Some(status) = account.prison {
                    if status.is_expired(now) {
                        account.prison = None;
                        released += 1;
                    }
                }
            }
            released
        })
        .await
    }

    /// Flip the guild's headpats toggle and return the new state.
    pub async fn toggle_headpats(&self, guild_id: u64) -> bool {
        self.with_guild(guild_id, |document| {
            let enabled = !document.headpats_enabled.unwrap_or(false);
            document.headpats_enabled = Some(enabled);
            enabled
        })
        .await
    }

    /// Top accounts by combined pockets+savings, richest first.
    pub async fn richest(&self, guild_id: u64, limit: usize) -> Vec<UserAccount> {
        let document = self.store.load_guild(guild_id).await;
        let mut accounts: Vec<UserAccount> = document.accounts.into_values().collect();
        accounts.sort_by_key(|account| std::cmp::Reverse(account.total_balance()));
        accounts.truncate(limit);
        accounts
    }
}
