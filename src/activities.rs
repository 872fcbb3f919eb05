//! Activity resolvers: work, crime, rob, roulette.
//!
//! Each resolver is split in two: a `*Rolls` struct drawn synchronously from
//! an `Rng` (so no generator is ever held across an await), and an async
//! applier that turns those rolls into ledger mutations and a structured
//! outcome. Eligibility (prison, active challenge, cooldown, protection
//! windows) is checked by the caller before the resolver runs; the resolver
//! itself stamps the cooldown first, rolls, mutates, and reports.

use crate::config::BotSettings;
use crate::ledger::Ledger;
use crate::models::{Activity, DEFAULT_SENTENCE_SECS, PrisonTier};
use crate::status;
use rand::Rng;
use tracing::debug;

pub const WORK_COOLDOWN: i64 = 60;
pub const CRIME_COOLDOWN: i64 = 75;
pub const ROB_COOLDOWN: i64 = 300;
pub const ROULETTE_COOLDOWN: i64 = 420;
/// Protection window after being robbed.
pub const ROB_VICTIM_COOLDOWN: i64 = 600;

pub const WORK_PAYOUT_MIN: i64 = 4;
pub const WORK_PAYOUT_MAX: i64 = 12;
pub const CRIME_PAYOUT_MIN: i64 = 15;
pub const CRIME_PAYOUT_MAX: i64 = 35;
pub const FINE_MIN: i64 = 5;
pub const FINE_MAX: i64 = 30;

/// Share of savings taken by the reaper on death.
pub const DEATH_SAVINGS_PENALTY: f64 = 0.10;
/// Guaranteed floor on a successful robbery.
pub const ROB_MIN_AMOUNT: i64 = 15;
/// Targets holding this much or less are not worth robbing.
pub const ROB_POCKET_FLOOR: i64 = 5;

/// Tier used when a dead debtor cannot pay the reaper.
pub const REAPER_TIER: PrisonTier = PrisonTier::OfficerGroup;
/// Tier used when a failed crime or robbery ends in capture.
pub const CAUGHT_TIER: PrisonTier = PrisonTier::SoldatBrigade;

/// Which way a failed risky action resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Death,
    Injury,
    Prison,
}

/// Map an outcome roll (1..=100) onto the death/injury/prison split.
pub fn pick_failure(roll: u32, death_chance: u32, injury_chance: u32) -> FailureKind {
    if roll <= death_chance {
        FailureKind::Death
    } else if roll <= death_chance + injury_chance {
        FailureKind::Injury
    } else {
        FailureKind::Prison
    }
}

fn roll_critical(rng: &mut impl Rng, settings: &BotSettings) -> Option<u32> {
    if rng.gen_range(1..=100u32) <= settings.critical_success_chance {
        Some(rng.gen_range(settings.critical_multiplier_min..=settings.critical_multiplier_max))
    } else {
        None
    }
}

/// How a death resolves: pockets always empty; the savings tax redirects to
/// prison when there is nothing left to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathResolution {
    Died { pockets_lost: i64, savings_penalty: i64 },
    Imprisoned { pockets_lost: i64, tier: PrisonTier },
}

/// Clear the pockets and collect the reaper's tax, atomically.
pub(crate) async fn handle_death(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
) -> DeathResolution {
    let release_time = crate::ledger::unix_now() + DEFAULT_SENTENCE_SECS;
    ledger
        .with_account(guild_id, user_id, username, |account| {
            let pockets_lost = account.pockets;
            account.pockets = 0;
            let savings_penalty = (account.savings as f64 * DEATH_SAVINGS_PENALTY) as i64;
            if account.savings <= 0 || savings_penalty <= 0 {
                account.prison = Some(crate::models::PrisonStatus {
                    tier: REAPER_TIER,
                    release_time,
                });
                DeathResolution::Imprisoned {
                    pockets_lost,
                    tier: REAPER_TIER,
                }
            } else {
                account.savings -= savings_penalty;
                DeathResolution::Died {
                    pockets_lost,
                    savings_penalty,
                }
            }
        })
        .await
}

// ---------------------------------------------------------------------------
// work

#[derive(Debug, Clone, Copy)]
pub struct WorkRolls {
    pub base_wage: i64,
    pub critical: Option<u32>,
}

impl WorkRolls {
    pub fn roll(rng: &mut impl Rng, settings: &BotSettings) -> Self {
        WorkRolls {
            base_wage: rng.gen_range(WORK_PAYOUT_MIN..=WORK_PAYOUT_MAX),
            critical: roll_critical(rng, settings),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkOutcome {
    pub amount: i64,
    /// Pre-critical wage, for the rare-success message.
    pub original: i64,
    pub critical: Option<u32>,
    pub new_pockets: i64,
}

/// Work always pays out; injuries only shrink the wage.
pub async fn work(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    rolls: WorkRolls,
) -> WorkOutcome {
    let injuries = ledger.account(guild_id, user_id, username).await.injuries;
    ledger
        .set_cooldown(guild_id, user_id, username, Activity::Work)
        .await;

    let original = (rolls.base_wage as f64 * status::earning_multiplier(injuries)) as i64;
    let amount = match rolls.critical {
        Some(multiplier) => original * i64::from(multiplier),
        None => original,
    };
    let new_pockets = ledger
        .update_pockets(guild_id, user_id, username, amount)
        .await;
    debug!("work payout {amount} for {user_id} in guild {guild_id}");
    WorkOutcome {
        amount,
        original,
        critical: rolls.critical,
        new_pockets,
    }
}

// ---------------------------------------------------------------------------
// crime

#[derive(Debug, Clone, Copy)]
pub struct CrimeRolls {
    /// 1..=100 against the fail rate.
    pub attempt: u32,
    /// 1..=100 against the failure outcome split.
    pub outcome: u32,
    pub payout: i64,
    pub critical: Option<u32>,
    pub fine: i64,
}

impl CrimeRolls {
    pub fn roll(rng: &mut impl Rng, settings: &BotSettings) -> Self {
        CrimeRolls {
            attempt: rng.gen_range(1..=100),
            outcome: rng.gen_range(1..=100),
            payout: rng.gen_range(CRIME_PAYOUT_MIN..=CRIME_PAYOUT_MAX),
            critical: roll_critical(rng, settings),
            fine: rng.gen_range(FINE_MIN..=FINE_MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrimeOutcome {
    Success {
        amount: i64,
        original: i64,
        critical: Option<u32>,
    },
    Death {
        pockets_lost: i64,
        savings_penalty: i64,
    },
    /// Could not pay the reaper's tax; jailed instead.
    ReaperImprisoned { tier: PrisonTier },
    Injured {
        fine: i64,
        tier_name: &'static str,
    },
    Imprisoned { tier: PrisonTier },
}

pub async fn crime(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    rolls: CrimeRolls,
) -> CrimeOutcome {
    let injuries = ledger.account(guild_id, user_id, username).await.injuries;
    // Cooldown is stamped regardless of how the attempt resolves.
    ledger
        .set_cooldown(guild_id, user_id, username, Activity::Crime)
        .await;

    if rolls.attempt <= status::fail_rate(Activity::Crime, injuries) {
        let kind = pick_failure(
            rolls.outcome,
            status::death_chance(injuries),
            status::injury_chance(injuries),
        );
        apply_crime_failure(ledger, guild_id, user_id, username, kind, rolls.fine).await
    } else {
        let original = (rolls.payout as f64 * status::earning_multiplier(injuries)) as i64;
        let amount = match rolls.critical {
            Some(multiplier) => original * i64::from(multiplier),
            None => original,
        };
        ledger
            .update_pockets(guild_id, user_id, username, amount)
            .await;
        CrimeOutcome::Success {
            amount,
            original,
            critical: rolls.critical,
        }
    }
}

/// Apply one branch of the crime failure table. Exposed separately so the
/// branch behavior can be exercised without fighting the dice.
pub async fn apply_crime_failure(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    kind: FailureKind,
    fine: i64,
) -> CrimeOutcome {
    match kind {
        FailureKind::Death => match handle_death(ledger, guild_id, user_id, username).await {
            DeathResolution::Died {
                pockets_lost,
                savings_penalty,
            } => CrimeOutcome::Death {
                pockets_lost,
                savings_penalty,
            },
            DeathResolution::Imprisoned { tier, .. } => CrimeOutcome::ReaperImprisoned { tier },
        },
        FailureKind::Injury => {
            ledger
                .update_pockets(guild_id, user_id, username, -fine)
                .await;
            let injuries = status::add_injury(ledger, guild_id, user_id, username).await;
            CrimeOutcome::Injured {
                fine,
                tier_name: status::tier_for(injuries).name,
            }
        }
        FailureKind::Prison => {
            ledger
                .send_to_prison(guild_id, user_id, username, CAUGHT_TIER, DEFAULT_SENTENCE_SECS)
                .await;
            CrimeOutcome::Imprisoned { tier: CAUGHT_TIER }
        }
    }
}

// ---------------------------------------------------------------------------
// rob

#[derive(Debug, Clone, Copy)]
pub struct RobRolls {
    pub attempt: u32,
    pub outcome: u32,
    pub fine: i64,
    /// Fraction of the target's pockets taken on success, in `0.6..=0.8`.
    pub steal_fraction: f64,
}

impl RobRolls {
    pub fn roll(rng: &mut impl Rng) -> Self {
        RobRolls {
            attempt: rng.gen_range(1..=100),
            outcome: rng.gen_range(1..=100),
            fine: rng.gen_range(FINE_MIN..=FINE_MAX),
            steal_fraction: rng.gen_range(0.6..=0.8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobOutcome {
    /// The target barely has anything; nothing moves.
    NotWorthRobbing,
    Success { stolen: i64 },
    Death {
        pockets_lost: i64,
        savings_penalty: i64,
    },
    ReaperImprisoned { tier: PrisonTier },
    Injured {
        fine: i64,
        tier_name: &'static str,
    },
    Imprisoned { tier: PrisonTier },
}

/// How much a successful robbery takes from a target holding `target_pockets`.
pub fn stolen_amount(target_pockets: i64, steal_fraction: f64) -> i64 {
    if target_pockets < ROB_MIN_AMOUNT {
        return target_pockets;
    }
    ((target_pockets as f64 * steal_fraction) as i64).max(ROB_MIN_AMOUNT)
}

pub async fn rob(
    ledger: &Ledger,
    guild_id: u64,
    robber_id: u64,
    robber_name: &str,
    target_id: u64,
    target_name: &str,
    rolls: RobRolls,
) -> RobOutcome {
    let injuries = ledger.account(guild_id, robber_id, robber_name).await.injuries;
    ledger
        .set_cooldown(guild_id, robber_id, robber_name, Activity::Rob)
        .await;

    if rolls.attempt <= status::fail_rate(Activity::Rob, injuries) {
        // Same failure table as crime; the messaging differs upstream.
        match apply_crime_failure(
            ledger,
            guild_id,
            robber_id,
            robber_name,
            pick_failure(
                rolls.outcome,
                status::death_chance(injuries),
                status::injury_chance(injuries),
            ),
            rolls.fine,
        )
        .await
        {
            CrimeOutcome::Death {
                pockets_lost,
                savings_penalty,
            } => RobOutcome::Death {
                pockets_lost,
                savings_penalty,
            },
            CrimeOutcome::ReaperImprisoned { tier } => RobOutcome::ReaperImprisoned { tier },
            CrimeOutcome::Injured { fine, tier_name } => RobOutcome::Injured { fine, tier_name },
            CrimeOutcome::Imprisoned { tier } => RobOutcome::Imprisoned { tier },
            CrimeOutcome::Success { .. } => unreachable!("failure table cannot succeed"),
        }
    } else {
        let target_pockets = ledger.pockets(guild_id, target_id, target_name).await;
        if target_pockets <= ROB_POCKET_FLOOR {
            return RobOutcome::NotWorthRobbing;
        }
        let stolen = stolen_amount(target_pockets, rolls.steal_fraction);
        ledger
            .update_pockets(guild_id, robber_id, robber_name, stolen)
            .await;
        ledger
            .update_pockets(guild_id, target_id, target_name, -stolen)
            .await;
        ledger.set_last_robbed(guild_id, target_id, target_name).await;
        RobOutcome::Success { stolen }
    }
}

// ---------------------------------------------------------------------------
// roulette

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouletteColor {
    Purple,
    Yellow,
    Green,
}

impl RouletteColor {
    pub fn name(self) -> &'static str {
        match self {
            RouletteColor::Purple => "purple",
            RouletteColor::Yellow => "yellow",
            RouletteColor::Green => "green",
        }
    }

    pub fn multiplier(self) -> i64 {
        match self {
            RouletteColor::Purple | RouletteColor::Yellow => 2,
            RouletteColor::Green => 14,
        }
    }
}

/// Spin the wheel: purple 18/37, yellow 18/37, green 1/37.
pub fn spin_wheel(rng: &mut impl Rng) -> RouletteColor {
    match rng.gen_range(0..37u32) {
        0..=17 => RouletteColor::Purple,
        18..=35 => RouletteColor::Yellow,
        _ => RouletteColor::Green,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouletteOutcome {
    pub landed: RouletteColor,
    pub won: bool,
    pub payout: i64,
}

/// The bet is escrowed up front; a win pays `bet * multiplier` back.
pub async fn roulette(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    bet: i64,
    choice: RouletteColor,
    landed: RouletteColor,
) -> RouletteOutcome {
    ledger
        .set_cooldown(guild_id, user_id, username, Activity::Roulette)
        .await;
    ledger
        .update_pockets(guild_id, user_id, username, -bet)
        .await;

    if landed == choice {
        let payout = bet * landed.multiplier();
        ledger
            .update_pockets(guild_id, user_id, username, payout)
            .await;
        RouletteOutcome {
            landed,
            won: true,
            payout,
        }
    } else {
        RouletteOutcome {
            landed,
            won: false,
            payout: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ledger::unix_now;
    use crate::test_utils::{GUILD, TARGET, TARGET_NAME, TestEnv, USER, USER_NAME};

    fn no_critical(rolls: CrimeRolls) -> CrimeRolls {
        CrimeRolls {
            critical: None,
            ..rolls
        }
    }

    #[tokio::test]
    async fn work_pays_wage_and_sets_cooldown() {
        let env = TestEnv::new();
        let outcome = work(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            WorkRolls {
                base_wage: 10,
                critical: None,
            },
        )
        .await;
        assert_eq!(outcome.amount, 10);
        assert_eq!(outcome.new_pockets, 10);

        let (ready, _) = env
            .ledger
            .check_cooldown(GUILD, USER, USER_NAME, Activity::Work, WORK_COOLDOWN)
            .await;
        assert!(!ready);
    }

    #[tokio::test]
    async fn work_applies_earning_penalty_then_critical_multiplier() {
        let env = TestEnv::new();
        crate::status::set_injuries(&env.ledger, GUILD, USER, USER_NAME, 3).await;

        let outcome = work(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            WorkRolls {
                base_wage: 10,
                critical: Some(3),
            },
        )
        .await;
        // 10 * 0.8 = 8, then tripled by the critical.
        assert_eq!(outcome.original, 8);
        assert_eq!(outcome.amount, 24);
        assert_eq!(outcome.critical, Some(3));
    }

    #[tokio::test]
    async fn forced_crime_success_credits_payout() {
        let env = TestEnv::new();
        let outcome = crime(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            no_critical(CrimeRolls {
                attempt: 100, // above the 51% fail rate
                outcome: 1,
                payout: 20,
                critical: None,
                fine: 10,
            }),
        )
        .await;
        assert_eq!(
            outcome,
            CrimeOutcome::Success {
                amount: 20,
                original: 20,
                critical: None
            }
        );
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 20);
    }

    #[tokio::test]
    async fn forced_crime_prison_sets_tier_release_and_cooldown() {
        let env = TestEnv::new();
        let before = unix_now();
        let outcome = crime(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            CrimeRolls {
                attempt: 1,   // forced failure
                outcome: 100, // past death (15) + injury (65): prison
                payout: 20,
                critical: None,
                fine: 10,
            },
        )
        .await;
        assert_eq!(outcome, CrimeOutcome::Imprisoned { tier: CAUGHT_TIER });

        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        let prison = account.prison.unwrap();
        assert_eq!(prison.tier, PrisonTier::SoldatBrigade);
        let release = prison.release_time;
        assert!(release >= before + DEFAULT_SENTENCE_SECS);
        assert!(release <= unix_now() + DEFAULT_SENTENCE_SECS);

        let crime_stamp = account.cooldowns[&Activity::Crime];
        assert!(crime_stamp >= before && crime_stamp <= unix_now());
    }

    #[tokio::test]
    async fn forced_crime_injury_fines_and_wounds() {
        let env = TestEnv::new();
        let outcome = crime(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            CrimeRolls {
                attempt: 1,
                outcome: 50, // inside the injury band for a healthy account
                payout: 20,
                critical: None,
                fine: 12,
            },
        )
        .await;
        assert_eq!(
            outcome,
            CrimeOutcome::Injured {
                fine: 12,
                tier_name: "Light Injury"
            }
        );
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.pockets, -12);
        assert_eq!(account.injuries, 1);
        assert!(account.injured);
    }

    #[tokio::test]
    async fn forced_crime_death_clears_pockets_and_taxes_savings() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 40).await;
        // Savings start at 50; 10% tax = 5.
        let outcome = crime(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            CrimeRolls {
                attempt: 1,
                outcome: 10, // death band
                payout: 20,
                critical: None,
                fine: 10,
            },
        )
        .await;
        assert_eq!(
            outcome,
            CrimeOutcome::Death {
                pockets_lost: 40,
                savings_penalty: 5
            }
        );
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.pockets, 0);
        assert_eq!(account.savings, 45);
        assert!(account.prison.is_none());
    }

    #[tokio::test]
    async fn broke_death_redirects_to_the_reaper_prison() {
        let env = TestEnv::new();
        env.ledger.update_savings(GUILD, USER, USER_NAME, -50).await;
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 30).await;

        let outcome = apply_crime_failure(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            FailureKind::Death,
            10,
        )
        .await;
        assert_eq!(outcome, CrimeOutcome::ReaperImprisoned { tier: REAPER_TIER });

        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.pockets, 0);
        assert_eq!(account.savings, 0);
        assert_eq!(account.prison.unwrap().tier, PrisonTier::OfficerGroup);
    }

    #[tokio::test]
    async fn rob_success_transfers_and_protects_the_victim() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 100).await;

        let outcome = rob(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            TARGET,
            TARGET_NAME,
            RobRolls {
                attempt: 100, // above the 55% fail rate
                outcome: 1,
                fine: 10,
                steal_fraction: 0.6,
            },
        )
        .await;
        assert_eq!(outcome, RobOutcome::Success { stolen: 60 });
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 60);
        assert_eq!(env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await, 40);

        let (robbable, remaining) = env
            .ledger
            .check_last_robbed(GUILD, TARGET, TARGET_NAME, ROB_VICTIM_COOLDOWN)
            .await;
        assert!(!robbable);
        assert!(remaining > 0);
    }

    #[tokio::test]
    async fn rob_skips_targets_not_worth_robbing() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 5).await;

        let outcome = rob(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            TARGET,
            TARGET_NAME,
            RobRolls {
                attempt: 100,
                outcome: 1,
                fine: 10,
                steal_fraction: 0.8,
            },
        )
        .await;
        assert_eq!(outcome, RobOutcome::NotWorthRobbing);
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 0);
        assert_eq!(env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await, 5);
    }

    #[test]
    fn stolen_amount_respects_floor_and_small_pockets() {
        assert_eq!(stolen_amount(100, 0.6), 60);
        assert_eq!(stolen_amount(100, 0.8), 80);
        // The fraction of a small stash is topped up to the floor.
        assert_eq!(stolen_amount(16, 0.6), ROB_MIN_AMOUNT);
        // Targets under the floor lose everything they hold.
        assert_eq!(stolen_amount(10, 0.8), 10);
    }

    #[test]
    fn failure_roll_bands_are_contiguous() {
        // Healthy split: death 15 / injury 65 / prison 20.
        assert_eq!(pick_failure(1, 15, 65), FailureKind::Death);
        assert_eq!(pick_failure(15, 15, 65), FailureKind::Death);
        assert_eq!(pick_failure(16, 15, 65), FailureKind::Injury);
        assert_eq!(pick_failure(80, 15, 65), FailureKind::Injury);
        assert_eq!(pick_failure(81, 15, 65), FailureKind::Prison);
        assert_eq!(pick_failure(100, 15, 65), FailureKind::Prison);
    }

    #[tokio::test]
    async fn roulette_win_and_loss_settle_correctly() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 100).await;

        let outcome = roulette(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            50,
            RouletteColor::Green,
            RouletteColor::Green,
        )
        .await;
        assert!(outcome.won);
        assert_eq!(outcome.payout, 700);
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 750);

        let outcome = roulette(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            50,
            RouletteColor::Purple,
            RouletteColor::Yellow,
        )
        .await;
        assert!(!outcome.won);
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 700);
    }
}
