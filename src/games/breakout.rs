//! Prison escapes and breakout mini-games.
//!
//! Every prison tier has its own breakout game, but all of them share one
//! shape: a helper attempts to clear the *target's* prison field through a
//! bounded number of interactive steps; success frees the target, failure
//! jails (and sometimes injures) the helper. Helper and target never share
//! penalty math. The mini-games themselves are synchronous state machines;
//! the async helpers at the bottom apply their consequences to the ledger.

use crate::ledger::{Ledger, unix_now};
use crate::models::{DEFAULT_SENTENCE_SECS, PrisonTier};
use crate::status;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::info;

pub const ESCAPE_COOLDOWN: i64 = 120;
pub const BREAKOUT_COOLDOWN: i64 = 300;

/// Savings share taken when a breakout times out or a Jaeger execution lands.
pub const EXECUTION_SAVINGS_PENALTY: f64 = 0.25;
/// Flat debt applied instead when savings are already gone.
pub const EXECUTION_FLAT_PENALTY: i64 = 75;

/// Paths to survive in the Jaeger Camp run.
pub const JAEGER_PATHS_REQUIRED: u8 = 8;
/// Base per-path safety chance before the injury modifier.
pub const JAEGER_PATH_CHANCE: i32 = 48;

/// Seconds of sentence added by a broken watch.
pub const WATCH_EXTENSION_SECS: i64 = 15 * 60;
/// Seconds added by the Jaeger escape injury box.
pub const INJURY_EXTENSION_SECS: i64 = 30 * 60;

/// Whether a single-roll attempt (escape, Officer/Old Guards breakout)
/// succeeds: `roll` is 1..=100 against the tier's modified chance.
pub fn single_roll_succeeds(roll: i32, tier: PrisonTier, injuries: u32) -> bool {
    roll <= status::escape_chance(tier.base_escape_chance(), injuries, status::ESCAPE_CHANCE_FLOOR)
}

// ---------------------------------------------------------------------------
// Soldat Brigade: pick the right door out of two.

#[derive(Debug, Clone)]
pub struct DoorGuess {
    correct: u8,
    pub doors: u8,
}

impl DoorGuess {
    pub fn new(rng: &mut impl Rng, doors: u8) -> Self {
        DoorGuess {
            correct: rng.gen_range(1..=doors),
            doors,
        }
    }

    pub fn pick(&self, door: u8) -> bool {
        door == self.correct
    }
}

// ---------------------------------------------------------------------------
// Lancer Legion: four doors, one second chance among the remaining three.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LancerStep {
    Freed,
    /// Wrong door, but the feast is still going; pick again.
    SecondChance { remaining: Vec<u8> },
    Caught,
}

#[derive(Debug, Clone)]
pub struct LancerDoors {
    correct: u8,
    second_chance: bool,
    remaining: Vec<u8>,
}

impl LancerDoors {
    pub fn new(rng: &mut impl Rng) -> Self {
        LancerDoors {
            correct: rng.gen_range(1..=4),
            second_chance: false,
            remaining: vec![1, 2, 3, 4],
        }
    }

    pub fn pick(&mut self, rng: &mut impl Rng, door: u8) -> LancerStep {
        if door == self.correct {
            return LancerStep::Freed;
        }
        if self.second_chance {
            return LancerStep::Caught;
        }
        self.second_chance = true;
        self.remaining.retain(|d| *d != door);
        // The prize moves; the second guess is among the doors left standing.
        self.correct = *self.remaining.choose(rng).unwrap_or(&self.remaining[0]);
        LancerStep::SecondChance {
            remaining: self.remaining.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rook Division: a three-pin sequence with limited lockpick durability.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockPickStep {
    /// Pin seated; raise the next one.
    PinSet { remaining_pins: Vec<u8> },
    Opened,
    WrongPin { durability: u8 },
    Broke,
}

#[derive(Debug, Clone)]
pub struct LockPick {
    sequence: Vec<u8>,
    progress: usize,
    solved: Vec<u8>,
    pub durability: u8,
}

impl LockPick {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut pins = vec![1u8, 2, 3, 4];
        pins.shuffle(rng);
        pins.truncate(3);
        LockPick {
            sequence: pins,
            progress: 0,
            solved: Vec::new(),
            durability: 4,
        }
    }

    /// Pins not yet seated; the set of buttons still shown.
    pub fn available_pins(&self) -> Vec<u8> {
        (1..=4).filter(|pin| !self.solved.contains(pin)).collect()
    }

    pub fn try_pin(&mut self, pin: u8) -> LockPickStep {
        if self.sequence.get(self.progress) == Some(&pin) {
            self.solved.push(pin);
            self.progress += 1;
            if self.progress >= self.sequence.len() {
                LockPickStep::Opened
            } else {
                LockPickStep::PinSet {
                    remaining_pins: self.available_pins(),
                }
            }
        } else {
            self.durability -= 1;
            if self.durability == 0 {
                LockPickStep::Broke
            } else {
                LockPickStep::WrongPin {
                    durability: self.durability,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Mortician Wing: eliminate vials until only the Amatoxin remains.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VialColor {
    Red,
    Blue,
    Green,
    Purple,
    Yellow,
    Brown,
}

impl VialColor {
    pub const ALL: [VialColor; 6] = [
        VialColor::Red,
        VialColor::Blue,
        VialColor::Green,
        VialColor::Purple,
        VialColor::Yellow,
        VialColor::Brown,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            VialColor::Red => "\u{1f534}",
            VialColor::Blue => "\u{1f535}",
            VialColor::Green => "\u{1f7e2}",
            VialColor::Purple => "\u{1f7e3}",
            VialColor::Yellow => "\u{1f7e1}",
            VialColor::Brown => "\u{1f7e4}",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VialColor::Red => "red",
            VialColor::Blue => "blue",
            VialColor::Green => "green",
            VialColor::Purple => "purple",
            VialColor::Yellow => "yellow",
            VialColor::Brown => "brown",
        }
    }
}

/// Drug name and the observed effect when tested on a prisoner. Amatoxin is
/// the lethal one.
pub const VIAL_DRUGS: [(&str, &str); 6] = [
    (
        "Bicardine",
        "The prisoner you tested it on showed signs of their wounds healing.",
    ),
    (
        "Haloperidol",
        "The prisoner you tested it on became calm and focused.",
    ),
    (
        "Hydrocodone",
        "The prisoner you tested it on didn't feel pain for a bit.",
    ),
    (
        "Mephedrone",
        "The prisoner you tested it on showed signs of increased energy.",
    ),
    (
        "Synaptizine",
        "The prisoner you tested it on became restless.",
    ),
    (
        "Amatoxin",
        "The prisoner you tested it on had begun to cough and wheeze as they slowly slumped to the ground, lifeless.",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VialStep {
    /// Drew the Amatoxin: the helper plays the fool.
    Poisoned,
    /// A harmless vial revealed; `cleared` when only the Amatoxin remains.
    Revealed {
        drug: &'static str,
        effect: &'static str,
        cleared: bool,
    },
}

#[derive(Debug, Clone)]
pub struct VialPuzzle {
    amatoxin: VialColor,
    assignments: Vec<(VialColor, usize)>,
    pub remaining: Vec<VialColor>,
}

impl VialPuzzle {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut drug_indices: Vec<usize> = (0..6).collect();
        drug_indices.shuffle(rng);
        let assignments: Vec<(VialColor, usize)> = VialColor::ALL
            .iter()
            .copied()
            .zip(drug_indices)
            .collect();
        let amatoxin = assignments
            .iter()
            .find(|(_, drug)| *drug == 5)
            .map(|(color, _)| *color)
            .unwrap_or(VialColor::Brown);
        VialPuzzle {
            amatoxin,
            assignments,
            remaining: VialColor::ALL.to_vec(),
        }
    }

    pub fn amatoxin(&self) -> VialColor {
        self.amatoxin
    }

    pub fn pick(&mut self, color: VialColor) -> VialStep {
        if color == self.amatoxin {
            return VialStep::Poisoned;
        }
        self.remaining.retain(|c| *c != color);
        let drug = self
            .assignments
            .iter()
            .find(|(c, _)| *c == color)
            .map(|(_, drug)| *drug)
            .unwrap_or(0);
        let (name, effect) = VIAL_DRUGS[drug];
        VialStep::Revealed {
            drug: name,
            effect,
            cleared: self.remaining == [self.amatoxin],
        }
    }
}

// ---------------------------------------------------------------------------
// Jaeger Camp: traverse eight trapped paths, then (at Critical) the boxes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    Safe { progress: u8 },
    Hurt { progress: u8 },
    /// Eighth path reached; escape regardless of how the last one went.
    Arrived { last_was_safe: bool },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathRun {
    pub progress: u8,
}

impl PathRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one path. `roll` is 1..=100 against the helper's modified
    /// path chance.
    pub fn step(&mut self, roll: i32, injuries: u32) -> PathStep {
        self.progress += 1;
        let chance = status::escape_chance(JAEGER_PATH_CHANCE, injuries, status::PATH_CHANCE_FLOOR);
        let safe = roll <= chance;
        if self.progress >= JAEGER_PATHS_REQUIRED {
            PathStep::Arrived { last_was_safe: safe }
        } else if safe {
            PathStep::Safe {
                progress: self.progress,
            }
        } else {
            PathStep::Hurt {
                progress: self.progress,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxColor {
    Green,
    Blue,
    Yellow,
    Purple,
}

impl BoxColor {
    pub const ALL: [BoxColor; 4] = [
        BoxColor::Green,
        BoxColor::Blue,
        BoxColor::Yellow,
        BoxColor::Purple,
    ];

    pub fn emoji(self) -> &'static str {
        match self {
            BoxColor::Green => "\u{1f7e2}",
            BoxColor::Blue => "\u{1f535}",
            BoxColor::Yellow => "\u{1f7e1}",
            BoxColor::Purple => "\u{1f7e3}",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BoxColor::Green => "green",
            BoxColor::Blue => "blue",
            BoxColor::Yellow => "yellow",
            BoxColor::Purple => "purple",
        }
    }
}

/// Prizes in the breakout box table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxPrize {
    Knife,
    BrokenWatch,
    MedicalSupplies,
    JokerCard,
}

#[derive(Debug, Clone)]
pub struct BoxDraw {
    outcomes: Vec<(BoxColor, BoxPrize)>,
}

impl BoxDraw {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut prizes = [
            BoxPrize::Knife,
            BoxPrize::BrokenWatch,
            BoxPrize::MedicalSupplies,
            BoxPrize::JokerCard,
        ];
        prizes.shuffle(rng);
        BoxDraw {
            outcomes: BoxColor::ALL.iter().copied().zip(prizes).collect(),
        }
    }

    pub fn open(&self, color: BoxColor) -> BoxPrize {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == color)
            .map(|(_, prize)| *prize)
            .unwrap_or(BoxPrize::BrokenWatch)
    }
}

/// Outcomes in the Jaeger *escape* box table (self-escape variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JaegerEscapeBox {
    Death,
    Injury,
    Heal,
    BrokenWatch,
}

#[derive(Debug, Clone)]
pub struct JaegerEscapeDraw {
    outcomes: Vec<(BoxColor, JaegerEscapeBox)>,
}

impl JaegerEscapeDraw {
    pub fn new(rng: &mut impl Rng) -> Self {
        let mut boxes = [
            JaegerEscapeBox::Death,
            JaegerEscapeBox::Injury,
            JaegerEscapeBox::Heal,
            JaegerEscapeBox::BrokenWatch,
        ];
        boxes.shuffle(rng);
        JaegerEscapeDraw {
            outcomes: BoxColor::ALL.iter().copied().zip(boxes).collect(),
        }
    }

    pub fn open(&self, color: BoxColor) -> JaegerEscapeBox {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == color)
            .map(|(_, outcome)| *outcome)
            .unwrap_or(JaegerEscapeBox::BrokenWatch)
    }
}

// ---------------------------------------------------------------------------
// Ledger application

/// Free the breakout target. Returns `false` when they were not imprisoned
/// (already released or escaped on their own).
pub async fn free_target(ledger: &Ledger, guild_id: u64, target_id: u64, target_name: &str) -> bool {
    ledger.release_from_prison(guild_id, target_id, target_name).await
}

/// A failed breakout jails the helper in the target's tier for the standard
/// sentence.
pub async fn jail_helper(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    tier: PrisonTier,
) {
    ledger
        .send_to_prison(guild_id, helper_id, helper_name, tier, DEFAULT_SENTENCE_SECS)
        .await;
}

/// Jail the helper and add one injury; the harsher failure arms.
pub async fn jail_and_injure(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    tier: PrisonTier,
) -> &'static str {
    jail_helper(ledger, guild_id, helper_id, helper_name, tier).await;
    let injuries = status::add_injury(ledger, guild_id, helper_id, helper_name).await;
    status::tier_for(injuries).name
}

/// The harsh forced resolution when an attempt is abandoned (view timeout):
/// pockets wiped, a quarter of savings (or a flat debt) taken, prison and
/// injuries cleared. Returns the savings penalty for the message.
pub async fn forced_loss(ledger: &Ledger, guild_id: u64, user_id: u64, username: &str) -> i64 {
    info!("Forced loss for {user_id} in guild {guild_id}");
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.pockets = 0;
            let penalty = (account.savings as f64 * EXECUTION_SAVINGS_PENALTY) as i64;
            let penalty = if account.savings <= 0 || penalty <= 0 {
                account.savings -= EXECUTION_FLAT_PENALTY;
                EXECUTION_FLAT_PENALTY
            } else {
                account.savings -= penalty;
                penalty
            };
            account.prison = None;
            account.injuries = 0;
            account.injured = false;
            penalty
        })
        .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnifeResolution {
    /// The target is shot and looted; the helper goes back to the camp.
    TargetExecuted { savings_penalty: i64 },
    /// Both walk free.
    LuckyEscape,
}

/// The knife box: 55% the target dies (pockets wiped, savings looted, then
/// freed and healed posthumously-flavored), 45% both escape. `lucky` carries
/// the pre-rolled outcome.
pub async fn resolve_knife(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
    lucky: bool,
) -> KnifeResolution {
    if lucky {
        ledger.release_from_prison(guild_id, helper_id, helper_name).await;
        ledger.release_from_prison(guild_id, target_id, target_name).await;
        return KnifeResolution::LuckyEscape;
    }

    let savings_penalty = ledger
        .with_account(guild_id, target_id, target_name, |account| {
            account.pockets = 0;
            let penalty = (account.savings as f64 * EXECUTION_SAVINGS_PENALTY) as i64;
            let penalty = if account.savings <= 0 || penalty <= 0 {
                account.savings -= EXECUTION_FLAT_PENALTY;
                EXECUTION_FLAT_PENALTY
            } else {
                account.savings -= penalty;
                penalty
            };
            account.prison = None;
            account.injuries = 0;
            account.injured = false;
            penalty
        })
        .await;
    jail_helper(ledger, guild_id, helper_id, helper_name, PrisonTier::JaegerCamp).await;
    KnifeResolution::TargetExecuted { savings_penalty }
}

/// Broken watch (breakout variant): the helper is jailed in the camp and both
/// sentences stretch by fifteen minutes.
pub async fn apply_broken_watch(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
) {
    jail_helper(ledger, guild_id, helper_id, helper_name, PrisonTier::JaegerCamp).await;
    ledger
        .extend_sentence(guild_id, helper_id, helper_name, WATCH_EXTENSION_SECS)
        .await;
    ledger
        .extend_sentence(guild_id, target_id, target_name, WATCH_EXTENSION_SECS)
        .await;
}

/// Medical supplies: both sides relieve one injury step, but nobody leaves.
/// Returns the post-treatment tier names `(helper, target)`.
pub async fn apply_medical_supplies(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
) -> (&'static str, &'static str) {
    jail_helper(ledger, guild_id, helper_id, helper_name, PrisonTier::JaegerCamp).await;
    let helper_injuries = status::relieve_injury(ledger, guild_id, helper_id, helper_name).await;
    let target_injuries = status::relieve_injury(ledger, guild_id, target_id, target_name).await;
    (
        status::tier_for(helper_injuries).name,
        status::tier_for(target_injuries).name,
    )
}

/// Joker card: the target takes the punishment. Returns their new tier name.
pub async fn apply_joker_card(
    ledger: &Ledger,
    guild_id: u64,
    helper_id: u64,
    helper_name: &str,
    target_id: u64,
    target_name: &str,
) -> &'static str {
    jail_helper(ledger, guild_id, helper_id, helper_name, PrisonTier::JaegerCamp).await;
    let injuries = status::add_injury(ledger, guild_id, target_id, target_name).await;
    status::tier_for(injuries).name
}

// ---------------------------------------------------------------------------
// Escape failure penalties (self-escape, per tier)

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeFailure {
    /// Officer Group lets it slide.
    NoPenalty,
    SavingsFine { amount: i64 },
    FineAndInjury {
        amount: i64,
        tier_name: &'static str,
    },
    ExtendedAndInjured {
        extra_secs: i64,
        tier_name: &'static str,
    },
    /// Mortician Wing pins the condition a tier deeper.
    Worsened { tier_name: &'static str },
    /// Already Critical; the Morts take Medals instead.
    MortsTookSavings { amount: i64 },
}

/// Apply the tier-specific penalty for a failed escape roll.
pub async fn apply_escape_failure(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    tier: PrisonTier,
) -> EscapeFailure {
    match tier {
        PrisonTier::OfficerGroup => EscapeFailure::NoPenalty,
        PrisonTier::OldGuards => {
            ledger.update_savings(guild_id, user_id, username, -5).await;
            EscapeFailure::SavingsFine { amount: 5 }
        }
        PrisonTier::SoldatBrigade => {
            ledger.update_savings(guild_id, user_id, username, -10).await;
            EscapeFailure::SavingsFine { amount: 10 }
        }
        PrisonTier::LancerLegion => {
            ledger.update_savings(guild_id, user_id, username, -15).await;
            let tier_name = injure_unless_critical(ledger, guild_id, user_id, username).await;
            EscapeFailure::FineAndInjury {
                amount: 15,
                tier_name,
            }
        }
        PrisonTier::RookDivision => {
            ledger
                .extend_sentence(guild_id, user_id, username, WATCH_EXTENSION_SECS)
                .await;
            let tier_name = injure_unless_critical(ledger, guild_id, user_id, username).await;
            EscapeFailure::ExtendedAndInjured {
                extra_secs: WATCH_EXTENSION_SECS,
                tier_name,
            }
        }
        PrisonTier::MorticianWing => {
            let injuries = ledger
                .account(guild_id, user_id, username)
                .await
                .injuries;
            if injuries >= status::CRITICAL_INJURIES {
                ledger.update_savings(guild_id, user_id, username, -20).await;
                EscapeFailure::MortsTookSavings { amount: 20 }
            } else if injuries >= status::NEEDS_SURGERY_INJURIES {
                status::set_injuries(ledger, guild_id, user_id, username, status::CRITICAL_INJURIES)
                    .await;
                EscapeFailure::Worsened {
                    tier_name: "Critical Condition",
                }
            } else {
                status::set_injuries(
                    ledger,
                    guild_id,
                    user_id,
                    username,
                    status::NEEDS_SURGERY_INJURIES,
                )
                .await;
                EscapeFailure::Worsened {
                    tier_name: "Needs Surgery",
                }
            }
        }
        // Jaeger Camp escapes resolve through the box game, never here.
        PrisonTier::JaegerCamp => EscapeFailure::NoPenalty,
    }
}

async fn injure_unless_critical(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
) -> &'static str {
    let injuries = ledger.account(guild_id, user_id, username).await.injuries;
    let updated = if status::tier_for(injuries).name == "Critical Condition" {
        injuries
    } else {
        status::add_injury(ledger, guild_id, user_id, username).await
    };
    status::tier_for(updated).name
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JaegerEscapeResolution {
    LuckyEscape,
    Executed { savings_penalty: i64 },
    Injured {
        tier_name: &'static str,
        extension_secs: i64,
    },
    Healed { tier_name: &'static str },
    Extended { extension_secs: i64 },
}

/// Apply one box of the Jaeger escape table. `lucky` is the pre-rolled 45%
/// break for the death box and ignored otherwise.
pub async fn apply_jaeger_escape(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    outcome: JaegerEscapeBox,
    lucky: bool,
) -> JaegerEscapeResolution {
    match outcome {
        JaegerEscapeBox::Death => {
            if lucky {
                ledger.release_from_prison(guild_id, user_id, username).await;
                JaegerEscapeResolution::LuckyEscape
            } else {
                let savings_penalty = forced_loss(ledger, guild_id, user_id, username).await;
                JaegerEscapeResolution::Executed { savings_penalty }
            }
        }
        JaegerEscapeBox::Injury => {
            let tier_name = injure_unless_critical(ledger, guild_id, user_id, username).await;
            ledger
                .extend_sentence(guild_id, user_id, username, INJURY_EXTENSION_SECS)
                .await;
            JaegerEscapeResolution::Injured {
                tier_name,
                extension_secs: INJURY_EXTENSION_SECS,
            }
        }
        JaegerEscapeBox::Heal => {
            ledger.update_savings(guild_id, user_id, username, -20).await;
            let injuries = status::relieve_injury(ledger, guild_id, user_id, username).await;
            JaegerEscapeResolution::Healed {
                tier_name: status::tier_for(injuries).name,
            }
        }
        JaegerEscapeBox::BrokenWatch => {
            ledger
                .extend_sentence(guild_id, user_id, username, WATCH_EXTENSION_SECS)
                .await;
            JaegerEscapeResolution::Extended {
                extension_secs: WATCH_EXTENSION_SECS,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{GUILD, TARGET, TARGET_NAME, TestEnv, USER, USER_NAME};
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn single_roll_uses_tier_base_and_injury_floor() {
        // Officer Group, healthy: 75.
        assert!(single_roll_succeeds(75, PrisonTier::OfficerGroup, 0));
        assert!(!single_roll_succeeds(76, PrisonTier::OfficerGroup, 0));
        // Jaeger Camp at Critical floors at 5.
        assert!(single_roll_succeeds(5, PrisonTier::JaegerCamp, 4));
        assert!(!single_roll_succeeds(6, PrisonTier::JaegerCamp, 4));
    }

    #[test]
    fn lancer_doors_offer_exactly_one_second_chance() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = LancerDoors::new(&mut rng);
        let first_correct = game.correct;
        let wrong = (1..=4).find(|d| *d != first_correct).unwrap();

        match game.pick(&mut rng, wrong) {
            LancerStep::SecondChance { remaining } => {
                assert_eq!(remaining.len(), 3);
                assert!(!remaining.contains(&wrong));
                assert!(remaining.contains(&game.correct));
            }
            step => panic!("expected a second chance, got {step:?}"),
        }

        let second_wrong = game
            .remaining
            .iter()
            .copied()
            .find(|d| *d != game.correct)
            .unwrap();
        assert_eq!(game.pick(&mut rng, second_wrong), LancerStep::Caught);
    }

    #[test]
    fn lockpick_opens_on_the_full_sequence() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut lock = LockPick::new(&mut rng);
        let sequence = lock.sequence.clone();
        assert_eq!(sequence.len(), 3);

        for (i, pin) in sequence.iter().enumerate() {
            match lock.try_pin(*pin) {
                LockPickStep::Opened => assert_eq!(i, 2),
                LockPickStep::PinSet { remaining_pins } => {
                    assert!(i < 2);
                    assert!(!remaining_pins.contains(pin));
                }
                step => panic!("unexpected step {step:?}"),
            }
        }
    }

    #[test]
    fn lockpick_breaks_after_four_wrong_pins() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut lock = LockPick::new(&mut rng);
        let first = lock.sequence[0];
        let wrong = (1..=4).find(|p| *p != first).unwrap();

        for attempt in 1..=4u8 {
            match lock.try_pin(wrong) {
                LockPickStep::WrongPin { durability } => {
                    assert_eq!(durability, 4 - attempt);
                }
                LockPickStep::Broke => {
                    assert_eq!(attempt, 4);
                    return;
                }
                step => panic!("unexpected step {step:?}"),
            }
        }
        panic!("lockpick never broke");
    }

    #[test]
    fn vial_puzzle_clears_after_eliminating_every_safe_vial() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut puzzle = VialPuzzle::new(&mut rng);
        let amatoxin = puzzle.amatoxin();
        let safe: Vec<VialColor> = VialColor::ALL
            .iter()
            .copied()
            .filter(|c| *c != amatoxin)
            .collect();

        for (i, color) in safe.iter().enumerate() {
            match puzzle.pick(*color) {
                VialStep::Revealed { drug, cleared, .. } => {
                    assert_ne!(drug, "Amatoxin");
                    assert_eq!(cleared, i == safe.len() - 1);
                }
                VialStep::Poisoned => panic!("safe vial reported as poison"),
            }
        }
    }

    #[test]
    fn drawing_the_amatoxin_poisons_immediately() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut puzzle = VialPuzzle::new(&mut rng);
        let amatoxin = puzzle.amatoxin();
        assert_eq!(puzzle.pick(amatoxin), VialStep::Poisoned);
    }

    #[test]
    fn path_run_arrives_on_the_eighth_step_even_when_hurt() {
        let mut run = PathRun::new();
        for i in 1..=7 {
            match run.step(100, 0) {
                PathStep::Hurt { progress } => assert_eq!(progress, i),
                step => panic!("unexpected step {step:?}"),
            }
        }
        assert_eq!(run.step(100, 0), PathStep::Arrived { last_was_safe: false });

        let mut run = PathRun::new();
        for _ in 1..=7 {
            let _ = run.step(1, 0);
        }
        assert_eq!(run.step(1, 0), PathStep::Arrived { last_was_safe: true });
    }

    #[test]
    fn box_draws_cover_all_four_prizes() {
        let mut rng = StdRng::seed_from_u64(31);
        let draw = BoxDraw::new(&mut rng);
        let prizes: Vec<BoxPrize> = BoxColor::ALL.iter().map(|c| draw.open(*c)).collect();
        for prize in [
            BoxPrize::Knife,
            BoxPrize::BrokenWatch,
            BoxPrize::MedicalSupplies,
            BoxPrize::JokerCard,
        ] {
            assert!(prizes.contains(&prize));
        }

        let escape_draw = JaegerEscapeDraw::new(&mut rng);
        let outcomes: Vec<JaegerEscapeBox> =
            BoxColor::ALL.iter().map(|c| escape_draw.open(*c)).collect();
        for outcome in [
            JaegerEscapeBox::Death,
            JaegerEscapeBox::Injury,
            JaegerEscapeBox::Heal,
            JaegerEscapeBox::BrokenWatch,
        ] {
            assert!(outcomes.contains(&outcome));
        }
    }

    #[tokio::test]
    async fn successful_breakout_frees_only_the_target() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, TARGET, TARGET_NAME, PrisonTier::OldGuards, 3600)
            .await;

        assert!(free_target(&env.ledger, GUILD, TARGET, TARGET_NAME).await);
        assert!(!env.ledger.is_in_prison(GUILD, TARGET, TARGET_NAME).await);
        assert!(!env.ledger.is_in_prison(GUILD, USER, USER_NAME).await);
        // Freeing an already-free target reports false.
        assert!(!free_target(&env.ledger, GUILD, TARGET, TARGET_NAME).await);
    }

    #[tokio::test]
    async fn failed_breakout_jails_the_helper_not_the_target_further() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, TARGET, TARGET_NAME, PrisonTier::RookDivision, 3600)
            .await;

        let tier_name =
            jail_and_injure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::RookDivision).await;
        assert_eq!(tier_name, "Light Injury");

        let helper = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(helper.prison.unwrap().tier, PrisonTier::RookDivision);
        assert_eq!(helper.injuries, 1);
        assert!(env.ledger.is_in_prison(GUILD, TARGET, TARGET_NAME).await);
    }

    #[tokio::test]
    async fn forced_loss_wipes_pockets_and_quarters_savings() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 200).await;
        env.ledger.update_savings(GUILD, USER, USER_NAME, 350).await; // 400 total
        env.ledger
            .send_to_prison(GUILD, USER, USER_NAME, PrisonTier::JaegerCamp, 3600)
            .await;
        crate::status::add_injury(&env.ledger, GUILD, USER, USER_NAME).await;

        let penalty = forced_loss(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(penalty, 100);

        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.pockets, 0);
        assert_eq!(account.savings, 300);
        assert!(account.prison.is_none());
        assert_eq!(account.injuries, 0);
        assert!(!account.injured);
    }

    #[tokio::test]
    async fn forced_loss_on_empty_savings_applies_the_flat_debt() {
        let env = TestEnv::new();
        env.ledger.update_savings(GUILD, USER, USER_NAME, -50).await; // zero savings

        let penalty = forced_loss(&env.ledger, GUILD, USER, USER_NAME).await;
        assert_eq!(penalty, EXECUTION_FLAT_PENALTY);
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.savings, -EXECUTION_FLAT_PENALTY);
    }

    #[tokio::test]
    async fn knife_execution_loots_the_target_and_rejails_the_helper() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 80).await;
        env.ledger.update_savings(GUILD, TARGET, TARGET_NAME, 150).await; // 200 total
        env.ledger
            .send_to_prison(GUILD, TARGET, TARGET_NAME, PrisonTier::JaegerCamp, 3600)
            .await;

        let resolution = resolve_knife(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            TARGET,
            TARGET_NAME,
            false,
        )
        .await;
        assert_eq!(resolution, KnifeResolution::TargetExecuted { savings_penalty: 50 });

        let target = env.ledger.account(GUILD, TARGET, TARGET_NAME).await;
        assert_eq!(target.pockets, 0);
        assert_eq!(target.savings, 150);
        assert!(target.prison.is_none());

        let helper = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(helper.prison.unwrap().tier, PrisonTier::JaegerCamp);
    }

    #[tokio::test]
    async fn lucky_knife_frees_both() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, TARGET, TARGET_NAME, PrisonTier::JaegerCamp, 3600)
            .await;
        let resolution = resolve_knife(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            TARGET,
            TARGET_NAME,
            true,
        )
        .await;
        assert_eq!(resolution, KnifeResolution::LuckyEscape);
        assert!(!env.ledger.is_in_prison(GUILD, TARGET, TARGET_NAME).await);
        assert!(!env.ledger.is_in_prison(GUILD, USER, USER_NAME).await);
    }

    #[tokio::test]
    async fn broken_watch_extends_both_sentences() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, TARGET, TARGET_NAME, PrisonTier::JaegerCamp, 3600)
            .await;
        let target_release_before = env
            .ledger
            .prison_status(GUILD, TARGET, TARGET_NAME)
            .await
            .unwrap()
            .release_time;

        apply_broken_watch(&env.ledger, GUILD, USER, USER_NAME, TARGET, TARGET_NAME).await;

        let helper = env.ledger.prison_status(GUILD, USER, USER_NAME).await.unwrap();
        assert_eq!(helper.tier, PrisonTier::JaegerCamp);
        let target_release_after = env
            .ledger
            .prison_status(GUILD, TARGET, TARGET_NAME)
            .await
            .unwrap()
            .release_time;
        assert_eq!(
            target_release_after,
            target_release_before + WATCH_EXTENSION_SECS
        );
    }

    #[tokio::test]
    async fn escape_failure_penalties_match_their_tier() {
        let env = TestEnv::new();

        assert_eq!(
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::OfficerGroup)
                .await,
            EscapeFailure::NoPenalty
        );

        assert_eq!(
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::SoldatBrigade)
                .await,
            EscapeFailure::SavingsFine { amount: 10 }
        );
        assert_eq!(env.ledger.savings(GUILD, USER, USER_NAME).await, 40);

        let failure =
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::LancerLegion)
                .await;
        assert_eq!(
            failure,
            EscapeFailure::FineAndInjury {
                amount: 15,
                tier_name: "Light Injury"
            }
        );
        assert_eq!(env.ledger.savings(GUILD, USER, USER_NAME).await, 25);
    }

    #[tokio::test]
    async fn mortician_escape_failures_pin_tiers_then_take_medals() {
        let env = TestEnv::new();

        let failure =
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::MorticianWing)
                .await;
        assert_eq!(
            failure,
            EscapeFailure::Worsened {
                tier_name: "Needs Surgery"
            }
        );
        assert_eq!(env.ledger.account(GUILD, USER, USER_NAME).await.injuries, 3);

        let failure =
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::MorticianWing)
                .await;
        assert_eq!(
            failure,
            EscapeFailure::Worsened {
                tier_name: "Critical Condition"
            }
        );

        let failure =
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::MorticianWing)
                .await;
        assert_eq!(failure, EscapeFailure::MortsTookSavings { amount: 20 });
        assert_eq!(env.ledger.savings(GUILD, USER, USER_NAME).await, 30);
    }

    #[tokio::test]
    async fn rook_escape_failure_extends_sentence_and_injures() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, USER, USER_NAME, PrisonTier::RookDivision, 3600)
            .await;
        let before = env
            .ledger
            .prison_status(GUILD, USER, USER_NAME)
            .await
            .unwrap()
            .release_time;

        let failure =
            apply_escape_failure(&env.ledger, GUILD, USER, USER_NAME, PrisonTier::RookDivision)
                .await;
        assert_eq!(
            failure,
            EscapeFailure::ExtendedAndInjured {
                extra_secs: WATCH_EXTENSION_SECS,
                tier_name: "Light Injury"
            }
        );
        let after = env
            .ledger
            .prison_status(GUILD, USER, USER_NAME)
            .await
            .unwrap()
            .release_time;
        assert_eq!(after, before + WATCH_EXTENSION_SECS);
    }

    #[tokio::test]
    async fn jaeger_escape_boxes_resolve_each_arm() {
        let env = TestEnv::new();
        env.ledger
            .send_to_prison(GUILD, USER, USER_NAME, PrisonTier::JaegerCamp, 3600)
            .await;

        // Injury box: one step worse plus thirty minutes.
        let resolution = apply_jaeger_escape(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            JaegerEscapeBox::Injury,
            false,
        )
        .await;
        assert_eq!(
            resolution,
            JaegerEscapeResolution::Injured {
                tier_name: "Light Injury",
                extension_secs: INJURY_EXTENSION_SECS
            }
        );

        // Heal box: twenty Medals for one injury step.
        let resolution = apply_jaeger_escape(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            JaegerEscapeBox::Heal,
            false,
        )
        .await;
        assert_eq!(
            resolution,
            JaegerEscapeResolution::Healed {
                tier_name: "Healthy"
            }
        );
        assert_eq!(env.ledger.savings(GUILD, USER, USER_NAME).await, 30);

        // Lucky death box: straight release.
        let resolution = apply_jaeger_escape(
            &env.ledger,
            GUILD,
            USER,
            USER_NAME,
            JaegerEscapeBox::Death,
            true,
        )
        .await;
        assert_eq!(resolution, JaegerEscapeResolution::LuckyEscape);
        assert!(!env.ledger.is_in_prison(GUILD, USER, USER_NAME).await);
    }
}
