//! Status engine: injury tiers and the modifiers they impose.
//!
//! Tier derivation and every modifier are pure functions over an account's
//! injury count; the async half applies injury mutations and paid healing
//! through the ledger. Invariant maintained everywhere: `injured` is true
//! exactly when `injuries > 0`.

use crate::ledger::Ledger;
use crate::models::{Activity, PrisonTier};

/// Hard ceiling on any fail rate; there is always a slim chance of success.
pub const MAX_FAIL_RATE: u32 = 95;

/// Base chance (out of 100) that a failed action turns fatal.
pub const BASE_DEATH_CHANCE: u32 = 15;
/// Base chance (out of 100) that a failed action ends in prison.
pub const BASE_PRISON_CHANCE: u32 = 20;

/// Minimum escape chance for single-roll escapes and breakouts.
pub const ESCAPE_CHANCE_FLOOR: i32 = 5;
/// Minimum per-path chance in the Jaeger path game.
pub const PATH_CHANCE_FLOOR: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierEffects {
    pub cooldown_multiplier: f64,
    pub fail_rate_mod: u32,
    pub earning_penalty: f64,
    pub death_chance_mod: u32,
    pub prison_chance_mod: u32,
}

const NEUTRAL_EFFECTS: TierEffects = TierEffects {
    cooldown_multiplier: 1.0,
    fail_rate_mod: 0,
    earning_penalty: 0.0,
    death_chance_mod: 0,
    prison_chance_mod: 0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjuryTier {
    pub name: &'static str,
    pub heal_cost: i64,
    pub threshold: u32,
    pub effects: TierEffects,
    /// Additive penalty on escape chances while at this tier.
    pub escape_modifier: i32,
}

pub const HEALTHY: InjuryTier = InjuryTier {
    name: "Healthy",
    heal_cost: 0,
    threshold: 0,
    effects: NEUTRAL_EFFECTS,
    escape_modifier: 0,
};

/// Severity tiers in ascending threshold order; effects are cumulative steps,
/// not deltas.
pub const INJURY_TIERS: [InjuryTier; 4] = [
    InjuryTier {
        name: "Light Injury",
        heal_cost: 10,
        threshold: 1,
        effects: TierEffects {
            cooldown_multiplier: 1.2,
            fail_rate_mod: 0,
            earning_penalty: 0.0,
            death_chance_mod: 0,
            prison_chance_mod: 0,
        },
        escape_modifier: -3,
    },
    InjuryTier {
        name: "Moderate Injury",
        heal_cost: 15,
        threshold: 2,
        effects: TierEffects {
            cooldown_multiplier: 1.2,
            fail_rate_mod: 10,
            earning_penalty: 0.0,
            death_chance_mod: 0,
            prison_chance_mod: 0,
        },
        escape_modifier: -5,
    },
    InjuryTier {
        name: "Needs Surgery",
        heal_cost: 30,
        threshold: 3,
        effects: TierEffects {
            cooldown_multiplier: 1.2,
            fail_rate_mod: 10,
            earning_penalty: 0.2,
            death_chance_mod: 15,
            prison_chance_mod: 20,
        },
        escape_modifier: -15,
    },
    InjuryTier {
        name: "Critical Condition",
        heal_cost: 50,
        threshold: 4,
        effects: TierEffects {
            cooldown_multiplier: 1.2,
            fail_rate_mod: 25,
            earning_penalty: 0.2,
            death_chance_mod: 25,
            prison_chance_mod: 30,
        },
        escape_modifier: -25,
    },
];

/// Injury counts that pin specific tiers (vial poisoning, Mortician escapes).
pub const NEEDS_SURGERY_INJURIES: u32 = 3;
pub const CRITICAL_INJURIES: u32 = 4;

/// Monotonic step function from injury count to tier.
pub fn tier_for(injuries: u32) -> &'static InjuryTier {
    for tier in INJURY_TIERS.iter().rev() {
        if injuries >= tier.threshold {
            return tier;
        }
    }
    &HEALTHY
}

/// Base fail rate for a risky activity. Activities without a failure branch
/// report zero.
pub fn base_fail_rate(activity: Activity) -> u32 {
    match activity {
        Activity::Crime => 51,
        Activity::Rob => 55,
        _ => 0,
    }
}

pub(crate) fn capped_fail_rate(base: u32, injuries: u32) -> u32 {
    (base + tier_for(injuries).effects.fail_rate_mod).min(MAX_FAIL_RATE)
}

/// Effective fail rate for `activity` at the given injury count, capped at
/// [`MAX_FAIL_RATE`].
pub fn fail_rate(activity: Activity, injuries: u32) -> u32 {
    capped_fail_rate(base_fail_rate(activity), injuries)
}

/// Chance a failed action turns fatal, bumped by the injury tier.
pub fn death_chance(injuries: u32) -> u32 {
    BASE_DEATH_CHANCE + tier_for(injuries).effects.death_chance_mod
}

/// Chance a failed action ends in prison, bumped by the injury tier.
pub fn prison_chance(injuries: u32) -> u32 {
    BASE_PRISON_CHANCE + tier_for(injuries).effects.prison_chance_mod
}

/// Injury is the remainder once death and prison chances are carved out, so
/// the three always cover the full roll range.
pub fn injury_chance(injuries: u32) -> u32 {
    100u32.saturating_sub(death_chance(injuries) + prison_chance(injuries))
}

/// Cooldown window stretched by the injury tier.
pub fn modified_cooldown(base_secs: i64, injuries: u32) -> i64 {
    (base_secs as f64 * tier_for(injuries).effects.cooldown_multiplier) as i64
}

/// Earnings scale: `1 - earning_penalty`.
pub fn earning_multiplier(injuries: u32) -> f64 {
    1.0 - tier_for(injuries).effects.earning_penalty
}

/// Effective escape chance: tier base plus the injury penalty, floored so the
/// attempt is never hopeless.
pub fn escape_chance(base: i32, injuries: u32, floor: i32) -> i32 {
    (base + tier_for(injuries).escape_modifier).max(floor)
}

/// Add one injury; returns the new count.
pub async fn add_injury(ledger: &Ledger, guild_id: u64, user_id: u64, username: &str) -> u32 {
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.injuries += 1;
            account.injured = true;
            account.injuries
        })
        .await
}

/// Pin the injury count to an exact value (used when an outcome dictates a
/// specific tier rather than a step).
pub async fn set_injuries(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    injuries: u32,
) {
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.injuries = injuries;
            account.injured = injuries > 0;
        })
        .await;
}

/// Relieve one injury step; returns the new count.
pub async fn relieve_injury(ledger: &Ledger, guild_id: u64, user_id: u64, username: &str) -> u32 {
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.injuries = account.injuries.saturating_sub(1);
            account.injured = account.injuries > 0;
            account.injuries
        })
        .await
}

/// Clear all injuries.
pub async fn heal_injuries(ledger: &Ledger, guild_id: u64, user_id: u64, username: &str) {
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.injuries = 0;
            account.injured = false;
        })
        .await;
}

/// Outcome of a paid healing attempt at the Mortician's Wing.
#[derive(Debug, Clone, PartialEq)]
pub enum HealOutcome {
    /// The Morts will not treat their own prisoners.
    RefusedMorticianWing,
    /// Jaegers do not allow treatment.
    RefusedJaegerCamp,
    NotInjured,
    InsufficientFunds { cost: i64, total: i64 },
    NegativePockets,
    Healed { cost: i64, tier_name: &'static str },
}

/// Paid healing: pockets are drained first, the remainder comes from savings,
/// and all injuries clear atomically with the payment.
pub async fn visit_mortician(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
) -> HealOutcome {
    match ledger.prison_status(guild_id, user_id, username).await {
        Some(status) if status.tier == PrisonTier::MorticianWing => {
            return HealOutcome::RefusedMorticianWing;
        }
        Some(status) if status.tier == PrisonTier::JaegerCamp => {
            return HealOutcome::RefusedJaegerCamp;
        }
        _ => {}
    }

    ledger
        .with_account(guild_id, user_id, username, |account| {
            if account.injuries == 0 {
                return HealOutcome::NotInjured;
            }
            let tier = tier_for(account.injuries);
            let cost = tier.heal_cost;
            let total = account.pockets + account.savings;
            if total < cost {
                return HealOutcome::InsufficientFunds { cost, total };
            }
            if account.pockets < 0 {
                return HealOutcome::NegativePockets;
            }
            if account.pockets >= cost {
                account.pockets -= cost;
            } else {
                let remainder = cost - account.pockets;
                account.pockets = 0;
                account.savings -= remainder;
            }
            account.injuries = 0;
            account.injured = false;
            HealOutcome::Healed {
                cost,
                tier_name: tier.name,
            }
        })
        .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{GUILD, TestEnv, USER, USER_NAME};

    #[test]
    fn tier_thresholds_are_monotonic_steps() {
        assert_eq!(tier_for(0).name, "Healthy");
        assert_eq!(tier_for(1).name, "Light Injury");
        assert_eq!(tier_for(2).name, "Moderate Injury");
        assert_eq!(tier_for(3).name, "Needs Surgery");
        assert_eq!(tier_for(4).name, "Critical Condition");
        assert_eq!(tier_for(17).name, "Critical Condition");
    }

    #[test]
    fn fail_rate_never_exceeds_the_cap() {
        for injuries in 0..10 {
            for activity in [Activity::Crime, Activity::Rob] {
                assert!(fail_rate(activity, injuries) <= MAX_FAIL_RATE);
            }
        }
        // A base near the cap still leaves a 5% success window.
        assert_eq!(capped_fail_rate(90, CRITICAL_INJURIES), MAX_FAIL_RATE);
    }

    #[test]
    fn outcome_chances_cover_the_full_roll_range() {
        for injuries in 0..6 {
            let total = death_chance(injuries) + prison_chance(injuries) + injury_chance(injuries);
            assert!(total >= 100, "injuries={injuries} total={total}");
        }
        assert_eq!(death_chance(0), 15);
        assert_eq!(prison_chance(0), 20);
        assert_eq!(injury_chance(0), 65);
        assert_eq!(death_chance(4), 40);
        assert_eq!(prison_chance(4), 50);
        assert_eq!(injury_chance(4), 10);
    }

    #[test]
    fn cooldowns_stretch_and_earnings_shrink_with_injuries() {
        assert_eq!(modified_cooldown(60, 0), 60);
        assert_eq!(modified_cooldown(60, 1), 72);
        assert!((earning_multiplier(0) - 1.0).abs() < f64::EPSILON);
        assert!((earning_multiplier(3) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn escape_chance_applies_penalty_with_floor() {
        assert_eq!(escape_chance(75, 0, ESCAPE_CHANCE_FLOOR), 75);
        assert_eq!(escape_chance(75, 4, ESCAPE_CHANCE_FLOOR), 50);
        assert_eq!(escape_chance(10, 4, ESCAPE_CHANCE_FLOOR), 5);
        assert_eq!(escape_chance(48, 4, PATH_CHANCE_FLOOR), 23);
        assert_eq!(escape_chance(6, 4, PATH_CHANCE_FLOOR), 8);
    }

    #[tokio::test]
    async fn injured_flag_tracks_injury_count() {
        let env = TestEnv::new();

        assert_eq!(add_injury(&env.ledger, GUILD, USER, USER_NAME).await, 1);
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert!(account.injured);
        assert_eq!(account.injuries, 1);

        add_injury(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(relieve_injury(&env.ledger, GUILD, USER, USER_NAME).await, 1);
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert!(account.injured);

        heal_injuries(&env.ledger, GUILD, USER, USER_NAME).await;
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert!(!account.injured);
        assert_eq!(account.injuries, 0);

        // Relieving below zero saturates and keeps the invariant.
        assert_eq!(relieve_injury(&env.ledger, GUILD, USER, USER_NAME).await, 0);
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert!(!account.injured);
    }

    #[tokio::test]
    async fn set_injuries_pins_exact_tiers() {
        let env = TestEnv::new();
        set_injuries(&env.ledger, GUILD, USER, USER_NAME, NEEDS_SURGERY_INJURIES).await;
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.injuries, 3);
        assert!(account.injured);
        assert_eq!(tier_for(account.injuries).name, "Needs Surgery");
    }

    #[tokio::test]
    async fn healing_pays_from_pockets_first_then_savings() {
        let env = TestEnv::new();
        set_injuries(&env.ledger, GUILD, USER, USER_NAME, 3).await;
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 12).await;
        // Account starts with 50 savings; heal cost at Needs Surgery is 30.

        let outcome = visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(
            outcome,
            HealOutcome::Healed {
                cost: 30,
                tier_name: "Needs Surgery"
            }
        );
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.pockets, 0);
        assert_eq!(account.savings, 32);
        assert_eq!(account.injuries, 0);
        assert!(!account.injured);
    }

    #[tokio::test]
    async fn healing_rejections_leave_balances_untouched() {
        let env = TestEnv::new();

        let outcome = visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(outcome, HealOutcome::NotInjured);

        set_injuries(&env.ledger, GUILD, USER, USER_NAME, 4).await;
        env.ledger.update_savings(GUILD, USER, USER_NAME, -30).await;
        // 0 pockets + 20 savings < 50 heal cost.
        let outcome = visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(outcome, HealOutcome::InsufficientFunds { cost: 50, total: 20 });
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.savings, 20);
        assert_eq!(account.injuries, 4);

        env.ledger.update_pockets(GUILD, USER, USER_NAME, -10).await;
        env.ledger.update_savings(GUILD, USER, USER_NAME, 100).await;
        let outcome = visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(outcome, HealOutcome::NegativePockets);
    }

    #[tokio::test]
    async fn morts_refuse_their_own_prisoners() {
        let env = TestEnv::new();
        set_injuries(&env.ledger, GUILD, USER, USER_NAME, 2).await;
        env.ledger
            .send_to_prison(GUILD, USER, USER_NAME, PrisonTier::MorticianWing, 3600)
            .await;
        assert_eq!(
            visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await,
            HealOutcome::RefusedMorticianWing
        );

        env.ledger
            .send_to_prison(GUILD, USER, USER_NAME, PrisonTier::JaegerCamp, 3600)
            .await;
        assert_eq!(
            visit_mortician(&env.ledger, GUILD, USER, USER_NAME).await,
            HealOutcome::RefusedJaegerCamp
        );
    }
}
