//! Multi-turn game coordinators and the session registry that serializes
//! participation.
//!
//! Game sessions are in-memory only and die with the process; a restart
//! forfeits in-flight games. Every coordinator removes its participants from
//! the registry on each terminal transition (completion, cancellation, or
//! timeout).

pub mod blackjack;
pub mod breakout;
pub mod challenge;
pub mod deck;

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Blackjack,
    Challenge,
    Breakout,
}

/// Process-wide registry of active game participants, keyed by
/// `(guild, user)`. A participant already inside a session is rejected from
/// starting a second one.
#[derive(Default)]
pub struct SessionRegistry {
    active: Mutex<HashMap<(u64, u64), SessionKind>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim every participant for a new session. Claims nothing
    /// if any participant is already busy.
    pub async fn try_claim(&self, guild_id: u64, participants: &[u64], kind: SessionKind) -> bool {
        let mut active = self.active.lock().await;
        if participants
            .iter()
            .any(|user| active.contains_key(&(guild_id, *user)))
        {
            return false;
        }
        for user in participants {
            active.insert((guild_id, *user), kind);
        }
        debug!("Claimed {kind:?} session for {participants:?} in guild {guild_id}");
        true
    }

    /// Drop participants from the registry on a terminal transition.
    pub async fn release(&self, guild_id: u64, participants: &[u64]) {
        let mut active = self.active.lock().await;
        for user in participants {
            active.remove(&(guild_id, *user));
        }
    }

    pub async fn kind_of(&self, guild_id: u64, user_id: u64) -> Option<SessionKind> {
        let active = self.active.lock().await;
        active.get(&(guild_id, user_id)).copied()
    }

    pub async fn is_active(&self, guild_id: u64, user_id: u64) -> bool {
        self.kind_of(guild_id, user_id).await.is_some()
    }

    /// Whether the user is mid-way through the balance challenge; most
    /// economy commands are refused while this holds.
    pub async fn in_challenge(&self, guild_id: u64, user_id: u64) -> bool {
        self.kind_of(guild_id, user_id).await == Some(SessionKind::Challenge)
    }
}
