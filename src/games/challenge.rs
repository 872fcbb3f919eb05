//! Balance challenge: the one-time forced gauntlet against the house.
//!
//! Crossing the wealth threshold after any balance-affecting command drags
//! the player into a best-of-5 blackjack series against the house. Victory
//! pays a fixed reward and sets a flag so the challenge never re-triggers;
//! defeat fines the player, jails them, and jails every other tracked user in
//! the guild alongside them.

use crate::games::SessionRegistry;
use crate::games::deck::{self, Card, Deck};
use crate::ledger::{Ledger, unix_now};
use crate::models::{PrisonStatus, PrisonTier};
use rand::Rng;
use tracing::info;

/// Combined pockets+savings above which the challenge triggers.
pub const CHALLENGE_THRESHOLD: i64 = 15_000;
/// Fixed stake: the victory reward and the defeat penalty.
pub const CHALLENGE_STAKE: i64 = 1_000;
pub const WINS_NEEDED: u32 = 3;
/// Seconds the player has per decision before the hand is scored for the house.
pub const HAND_TIMEOUT_SECS: u64 = 120;
/// The house draws until reaching this value.
pub const HOUSE_STANDS_AT: u32 = 17;

/// Where the loser goes, and for how long.
pub const LOSER_TIER: PrisonTier = PrisonTier::JaegerCamp;
pub const LOSER_SENTENCE_SECS: i64 = 3600;
/// Everyone else in the guild shares the loss.
pub const BYSTANDER_TIER: PrisonTier = PrisonTier::RookDivision;
pub const BYSTANDER_SENTENCE_SECS: i64 = 21_600;

/// Should this player be pulled into the challenge right now?
pub async fn should_trigger(
    ledger: &Ledger,
    sessions: &SessionRegistry,
    guild_id: u64,
    user_id: u64,
    username: &str,
) -> bool {
    let account = ledger.account(guild_id, user_id, username).await;
    if account.beat_balance_challenge {
        return false;
    }
    if sessions.is_active(guild_id, user_id).await {
        return false;
    }
    account.total_balance() > CHALLENGE_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandVerdict {
    Player,
    House,
    /// Replayed without counting.
    Tie,
}

/// One blackjack hand against the house.
#[derive(Debug, Clone)]
pub struct ChallengeHand {
    deck: Deck,
    player_hand: Vec<Card>,
    house_hand: Vec<Card>,
}

impl ChallengeHand {
    pub fn deal(rng: &mut impl Rng) -> Self {
        let mut deck = Deck::shuffled(rng);
        let player_hand = vec![deck.draw(rng), deck.draw(rng)];
        let house_hand = vec![deck.draw(rng), deck.draw(rng)];
        ChallengeHand {
            deck,
            player_hand,
            house_hand,
        }
    }

    pub fn player_hand(&self) -> &[Card] {
        &self.player_hand
    }

    pub fn house_hand(&self) -> &[Card] {
        &self.house_hand
    }

    pub fn player_value(&self) -> u32 {
        deck::hand_value(&self.player_hand)
    }

    pub fn house_value(&self) -> u32 {
        deck::hand_value(&self.house_hand)
    }

    /// The card the house shows before its turn.
    pub fn house_upcard(&self) -> Card {
        self.house_hand[0]
    }

    /// Player draws. Busting loses the hand outright.
    pub fn hit(&mut self, rng: &mut impl Rng) -> u32 {
        let card = self.deck.draw(rng);
        self.player_hand.push(card);
        self.player_value()
    }

    pub fn player_busted(&self) -> bool {
        self.player_value() > deck::BLACKJACK
    }

    /// Player stands: the house draws to [`HOUSE_STANDS_AT`] and the hand is
    /// scored.
    pub fn resolve_stand(&mut self, rng: &mut impl Rng) -> HandVerdict {
        while self.house_value() < HOUSE_STANDS_AT {
            let card = self.deck.draw(rng);
            self.house_hand.push(card);
        }
        let player = self.player_value();
        let house = self.house_value();
        if house > deck::BLACKJACK {
            HandVerdict::Player
        } else if player > deck::BLACKJACK || house > player {
            HandVerdict::House
        } else if player > house {
            HandVerdict::Player
        } else {
            HandVerdict::Tie
        }
    }
}

/// Running score of the best-of-5 series.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChallengeSeries {
    pub player_wins: u32,
    pub house_wins: u32,
    pub hands_played: u32,
}

impl ChallengeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the next hand; returns its round number for display.
    pub fn begin_hand(&mut self) -> u32 {
        self.hands_played += 1;
        self.hands_played
    }

    /// Record a verdict. Ties are replayed without counting. Returns
    /// `Some(player_won_series)` once either side reaches [`WINS_NEEDED`].
    pub fn record(&mut self, verdict: HandVerdict) -> Option<bool> {
        match verdict {
            HandVerdict::Tie => {
                self.hands_played = self.hands_played.saturating_sub(1);
                return None;
            }
            HandVerdict::Player => self.player_wins += 1,
            HandVerdict::House => self.house_wins += 1,
        }
        if self.player_wins >= WINS_NEEDED {
            Some(true)
        } else if self.house_wins >= WINS_NEEDED {
            Some(false)
        } else {
            None
        }
    }
}

/// Player beat the house: reward to savings, flag set forever.
pub async fn settle_victory(ledger: &Ledger, guild_id: u64, user_id: u64, username: &str) {
    ledger
        .with_account(guild_id, user_id, username, |account| {
            account.savings += CHALLENGE_STAKE;
            account.beat_balance_challenge = true;
        })
        .await;
    info!("{user_id} beat the balance challenge in guild {guild_id}");
}

/// The house won: stake moves to the house account, the loser rots in the
/// Jaeger Camp, and every other tracked user is jailed with the Rook
/// Division. One locked document pass covers all of it.
pub async fn settle_defeat(
    ledger: &Ledger,
    guild_id: u64,
    user_id: u64,
    username: &str,
    house_user_id: u64,
) {
    let starting_balance = ledger.settings().starting_balance().await;
    let now = unix_now();
    ledger
        .with_guild(guild_id, |document| {
            let loser = document.entry(user_id, username, starting_balance);
            loser.savings -= CHALLENGE_STAKE;
            loser.prison = Some(PrisonStatus {
                tier: LOSER_TIER,
                release_time: now + LOSER_SENTENCE_SECS,
            });

            let house = document.entry(house_user_id, "The House", starting_balance);
            house.savings += CHALLENGE_STAKE;

            for (key, account) in document.accounts.iter_mut() {
                if account.user_id == user_id || account.user_id == house_user_id {
                    continue;
                }
                // Non-numeric keys are guild flags, not accounts.
                if key.parse::<u64>().is_err() {
                    continue;
                }
                account.prison = Some(PrisonStatus {
                    tier: BYSTANDER_TIER,
                    release_time: now + BYSTANDER_SENTENCE_SECS,
                });
            }
        })
        .await;
    info!("The house collected the balance challenge in guild {guild_id}");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::games::SessionKind;
    use crate::test_utils::{GUILD, TestEnv, USER, USER_NAME};
    use rand::{SeedableRng, rngs::StdRng};

    const HOUSE: u64 = 777;

    #[tokio::test]
    async fn trigger_requires_wealth_above_threshold() {
        let env = TestEnv::new();
        let sessions = SessionRegistry::new();

        env.ledger
            .update_savings(GUILD, USER, USER_NAME, 14_000)
            .await;
        assert!(!should_trigger(&env.ledger, &sessions, GUILD, USER, USER_NAME).await);

        // 50 starting savings + 14_000 + 1_000 pockets crosses 15_000.
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 1_000).await;
        assert!(should_trigger(&env.ledger, &sessions, GUILD, USER, USER_NAME).await);
    }

    #[tokio::test]
    async fn beaten_flag_gates_retrigger_forever() {
        let env = TestEnv::new();
        let sessions = SessionRegistry::new();
        env.ledger
            .update_savings(GUILD, USER, USER_NAME, 20_000)
            .await;
        assert!(should_trigger(&env.ledger, &sessions, GUILD, USER, USER_NAME).await);

        settle_victory(&env.ledger, GUILD, USER, USER_NAME).await;
        assert!(!should_trigger(&env.ledger, &sessions, GUILD, USER, USER_NAME).await);
    }

    #[tokio::test]
    async fn players_already_in_a_session_are_not_retriggered() {
        let env = TestEnv::new();
        let sessions = SessionRegistry::new();
        env.ledger
            .update_savings(GUILD, USER, USER_NAME, 20_000)
            .await;
        sessions.try_claim(GUILD, &[USER], SessionKind::Challenge).await;
        assert!(!should_trigger(&env.ledger, &sessions, GUILD, USER, USER_NAME).await);
    }

    #[test]
    fn series_needs_three_wins_and_replays_ties() {
        let mut series = ChallengeSeries::new();
        assert_eq!(series.begin_hand(), 1);
        assert_eq!(series.record(HandVerdict::Player), None);

        assert_eq!(series.begin_hand(), 2);
        assert_eq!(series.record(HandVerdict::Tie), None);
        // The tie did not consume a round.
        assert_eq!(series.begin_hand(), 2);
        assert_eq!(series.record(HandVerdict::House), None);

        series.begin_hand();
        assert_eq!(series.record(HandVerdict::Player), None);
        series.begin_hand();
        assert_eq!(series.record(HandVerdict::Player), Some(true));
        assert_eq!(series.player_wins, 3);
        assert_eq!(series.house_wins, 1);
    }

    #[test]
    fn house_reaching_three_wins_ends_the_series() {
        let mut series = ChallengeSeries::new();
        for _ in 0..2 {
            series.begin_hand();
            assert_eq!(series.record(HandVerdict::House), None);
        }
        series.begin_hand();
        assert_eq!(series.record(HandVerdict::House), Some(false));
    }

    #[test]
    fn house_draws_to_seventeen_on_stand() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..25 {
            let mut hand = ChallengeHand::deal(&mut rng);
            let _ = hand.resolve_stand(&mut rng);
            assert!(hand.house_value() >= HOUSE_STANDS_AT);
        }
    }

    #[tokio::test]
    async fn victory_pays_savings_and_sets_the_flag() {
        let env = TestEnv::new();
        settle_victory(&env.ledger, GUILD, USER, USER_NAME).await;
        let account = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(account.savings, 50 + CHALLENGE_STAKE);
        assert!(account.beat_balance_challenge);
    }

    #[tokio::test]
    async fn defeat_fines_jails_and_takes_the_whole_guild_down() {
        let env = TestEnv::new();
        // Seed a bystander and the challenger.
        env.ledger.update_pockets(GUILD, 555, "bystander", 10).await;
        env.ledger
            .update_savings(GUILD, USER, USER_NAME, 20_000)
            .await;

        settle_defeat(&env.ledger, GUILD, USER, USER_NAME, HOUSE).await;

        let loser = env.ledger.account(GUILD, USER, USER_NAME).await;
        assert_eq!(loser.savings, 50 + 20_000 - CHALLENGE_STAKE);
        let loser_prison = loser.prison.unwrap();
        assert_eq!(loser_prison.tier, PrisonTier::JaegerCamp);

        let house = env.ledger.account(GUILD, HOUSE, "The House").await;
        assert_eq!(house.savings, 50 + CHALLENGE_STAKE);
        assert!(house.prison.is_none());

        let bystander = env.ledger.account(GUILD, 555, "bystander").await;
        let bystander_prison = bystander.prison.unwrap();
        assert_eq!(bystander_prison.tier, PrisonTier::RookDivision);
        // Bystanders serve the longer sentence.
        assert!(bystander_prison.release_time > loser_prison.release_time);
    }
}
