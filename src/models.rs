//! Data model for per-guild economy documents.
//!
//! One JSON document per guild maps user-id strings to [`UserAccount`]s; the
//! handful of non-numeric keys (guild flags such as the headpats toggle) live
//! beside them in the same document, so the struct keeps the account map
//! flattened to preserve that layout on disk.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default prison sentence in seconds (1 hour).
pub const DEFAULT_SENTENCE_SECS: i64 = 3600;

/// Actions gated by a per-user cooldown timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Work,
    Crime,
    Rob,
    Roulette,
    Escape,
    Breakout,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Work => "work",
            Activity::Crime => "crime",
            Activity::Rob => "rob",
            Activity::Roulette => "roulette",
            Activity::Escape => "escape",
            Activity::Breakout => "breakout",
        }
    }
}

/// Named incarceration severities. Each tier carries its own selection weight
/// and base escape chance; the breakout mini-game per tier lives in
/// `games::breakout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrisonTier {
    #[serde(rename = "Officer Group")]
    OfficerGroup,
    #[serde(rename = "Old Guards")]
    OldGuards,
    #[serde(rename = "Soldat Brigade")]
    SoldatBrigade,
    #[serde(rename = "Lancer Legion")]
    LancerLegion,
    #[serde(rename = "Rook Division")]
    RookDivision,
    #[serde(rename = "Mortician Wing")]
    MorticianWing,
    #[serde(rename = "Jaeger Camp")]
    JaegerCamp,
}

impl PrisonTier {
    pub const ALL: [PrisonTier; 7] = [
        PrisonTier::OfficerGroup,
        PrisonTier::OldGuards,
        PrisonTier::SoldatBrigade,
        PrisonTier::LancerLegion,
        PrisonTier::RookDivision,
        PrisonTier::MorticianWing,
        PrisonTier::JaegerCamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrisonTier::OfficerGroup => "Officer Group",
            PrisonTier::OldGuards => "Old Guards",
            PrisonTier::SoldatBrigade => "Soldat Brigade",
            PrisonTier::LancerLegion => "Lancer Legion",
            PrisonTier::RookDivision => "Rook Division",
            PrisonTier::MorticianWing => "Mortician Wing",
            PrisonTier::JaegerCamp => "Jaeger Camp",
        }
    }

    /// Selection weight when a random tier is rolled.
    pub fn weight(self) -> u32 {
        match self {
            PrisonTier::OfficerGroup => 35,
            PrisonTier::OldGuards => 20,
            PrisonTier::SoldatBrigade => 15,
            PrisonTier::LancerLegion => 10,
            PrisonTier::RookDivision => 10,
            PrisonTier::MorticianWing => 5,
            PrisonTier::JaegerCamp => 5,
        }
    }

    /// Base chance (out of 100) that an escape attempt succeeds, before the
    /// escapee's injury modifier is applied.
    pub fn base_escape_chance(self) -> i32 {
        match self {
            PrisonTier::OfficerGroup => 75,
            PrisonTier::OldGuards => 65,
            PrisonTier::SoldatBrigade => 50,
            PrisonTier::LancerLegion => 40,
            PrisonTier::RookDivision => 40,
            PrisonTier::MorticianWing => 25,
            PrisonTier::JaegerCamp => 10,
        }
    }

    /// Weighted random tier selection.
    pub fn random(rng: &mut impl Rng) -> PrisonTier {
        let total: u32 = Self::ALL.iter().map(|t| t.weight()).sum();
        let roll = rng.gen_range(1..=total);
        let mut running = 0;
        for tier in Self::ALL {
            running += tier.weight();
            if roll <= running {
                return tier;
            }
        }
        // Unreachable: the running total covers the whole roll range.
        PrisonTier::JaegerCamp
    }
}

/// Incarceration state stored on an account. Absent entirely when the user is
/// free; expiry is evaluated lazily on read, never by a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrisonStatus {
    pub tier: PrisonTier,
    pub release_time: i64,
}

impl PrisonStatus {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.release_time
    }
}

/// Per-user economic state. Balances are deliberately signed: debt is a
/// first-class mechanic and nothing clamps at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: u64,
    pub username: String,
    #[serde(default)]
    pub pockets: i64,
    #[serde(default)]
    pub savings: i64,
    #[serde(default)]
    pub cooldowns: BTreeMap<Activity, i64>,
    #[serde(default)]
    pub injured: bool,
    #[serde(default)]
    pub injuries: u32,
    #[serde(default)]
    pub prison: Option<PrisonStatus>,
    #[serde(default)]
    pub last_robbed: i64,
    #[serde(default)]
    pub beat_balance_challenge: bool,
}

impl UserAccount {
    /// Fresh account with the configured starting balance parked in savings.
    pub fn new(user_id: u64, username: &str, starting_balance: i64) -> Self {
        UserAccount {
            user_id,
            username: username.to_string(),
            pockets: 0,
            savings: starting_balance,
            cooldowns: BTreeMap::new(),
            injured: false,
            injuries: 0,
            prison: None,
            last_robbed: 0,
            beat_balance_challenge: false,
        }
    }

    pub fn total_balance(&self) -> i64 {
        self.pockets + self.savings
    }
}

/// One guild's persisted economy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildLedger {
    /// Reserved non-numeric key: per-guild headpats toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headpats_enabled: Option<bool>,
    #[serde(flatten)]
    pub accounts: BTreeMap<String, UserAccount>,
}

impl GuildLedger {
    pub fn account(&self, user_id: u64) -> Option<&UserAccount> {
        self.accounts.get(&user_id.to_string())
    }

    pub fn account_mut(&mut self, user_id: u64) -> Option<&mut UserAccount> {
        self.accounts.get_mut(&user_id.to_string())
    }

    /// Fetch-or-create with default values, mirroring creates-on-read.
    pub fn entry(
        &mut self,
        user_id: u64,
        username: &str,
        starting_balance: i64,
    ) -> &mut UserAccount {
        self.accounts
            .entry(user_id.to_string())
            .or_insert_with(|| UserAccount::new(user_id, username, starting_balance))
    }
}
