//! Player-vs-player blackjack: invite handshake, turn loop, settlement.
//!
//! The match itself is a synchronous state machine; funds move through the
//! async settlement helpers. Both bets are escrowed the moment the invite is
//! accepted, so every terminal path (win, tie, forfeit, error) must route
//! through exactly one settlement call.

use crate::games::deck::{self, Card, Deck};
use crate::ledger::Ledger;
use rand::Rng;
use tracing::warn;

/// Seconds the invited player has to accept or decline.
pub const INVITE_TIMEOUT_SECS: u64 = 30;
/// Seconds a player has to act on their turn before being stood for them.
pub const TURN_TIMEOUT_SECS: u64 = 180;

/// Winning with a natural pays half the bet on top of the pot.
pub fn natural_bonus(bet: i64) -> i64 {
    bet / 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Initiator,
    Opponent,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::Initiator => Seat::Opponent,
            Seat::Opponent => Seat::Initiator,
        }
    }

    fn index(self) -> usize {
        match self {
            Seat::Initiator => 0,
            Seat::Opponent => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandResult {
    /// `None` is a tie; bets go back.
    pub winner: Option<Seat>,
    /// Winner held a natural; a bonus rides on the pot.
    pub natural: bool,
}

#[derive(Debug, Clone)]
pub struct BlackjackMatch {
    pub initiator: u64,
    pub opponent: u64,
    pub bet: i64,
    deck: Deck,
    hands: [Vec<Card>; 2],
    stood: [bool; 2],
    turn: Seat,
    result: Option<HandResult>,
}

impl BlackjackMatch {
    /// Shuffle a fresh shoe and deal both opening hands; the initiator acts
    /// first.
    pub fn deal(initiator: u64, opponent: u64, bet: i64, rng: &mut impl Rng) -> Self {
        let mut deck = Deck::shuffled(rng);
        let initiator_hand = vec![deck.draw(rng), deck.draw(rng)];
        let opponent_hand = vec![deck.draw(rng), deck.draw(rng)];
        BlackjackMatch {
            initiator,
            opponent,
            bet,
            deck,
            hands: [initiator_hand, opponent_hand],
            stood: [false, false],
            turn: Seat::Initiator,
            result: None,
        }
    }

    pub fn pot(&self) -> i64 {
        self.bet * 2
    }

    pub fn seat_of(&self, user_id: u64) -> Option<Seat> {
        if user_id == self.initiator {
            Some(Seat::Initiator)
        } else if user_id == self.opponent {
            Some(Seat::Opponent)
        } else {
            None
        }
    }

    pub fn player(&self, seat: Seat) -> u64 {
        match seat {
            Seat::Initiator => self.initiator,
            Seat::Opponent => self.opponent,
        }
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat.index()]
    }

    pub fn value(&self, seat: Seat) -> u32 {
        deck::hand_value(self.hand(seat))
    }

    pub fn has_stood(&self, seat: Seat) -> bool {
        self.stood[seat.index()]
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn current_player(&self) -> u64 {
        self.player(self.turn)
    }

    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<HandResult> {
        self.result
    }

    /// Draw a card for `seat`; busting stands them automatically. Returns the
    /// new hand value.
    pub fn hit(&mut self, seat: Seat, rng: &mut impl Rng) -> u32 {
        let card = self.deck.draw(rng);
        self.hands[seat.index()].push(card);
        let value = self.value(seat);
        if value > deck::BLACKJACK {
            self.stood[seat.index()] = true;
            self.advance();
        }
        value
    }

    pub fn stand(&mut self, seat: Seat) {
        self.stood[seat.index()] = true;
        self.advance();
    }

    /// The player in `absent` never responded: the other seat takes the pot
    /// unconditionally, cards notwithstanding.
    pub fn forfeit(&mut self, absent: Seat) {
        self.stood = [true, true];
        self.result = Some(HandResult {
            winner: Some(absent.other()),
            natural: false,
        });
    }

    fn advance(&mut self) {
        if self.stood[0] && self.stood[1] {
            self.resolve();
        } else if self.stood[self.turn.index()] {
            self.turn = self.turn.other();
        }
    }

    fn resolve(&mut self) {
        let initiator_value = self.value(Seat::Initiator);
        let opponent_value = self.value(Seat::Opponent);
        let initiator_natural = deck::is_natural(self.hand(Seat::Initiator));
        let opponent_natural = deck::is_natural(self.hand(Seat::Opponent));

        // Naturals beat everything except another natural.
        let result = if initiator_natural && !opponent_natural {
            HandResult {
                winner: Some(Seat::Initiator),
                natural: true,
            }
        } else if opponent_natural && !initiator_natural {
            HandResult {
                winner: Some(Seat::Opponent),
                natural: true,
            }
        } else if initiator_value > deck::BLACKJACK {
            HandResult {
                // Both busting is a push.
                winner: (opponent_value <= deck::BLACKJACK).then_some(Seat::Opponent),
                natural: false,
            }
        } else if opponent_value > deck::BLACKJACK {
            HandResult {
                winner: Some(Seat::Initiator),
                natural: false,
            }
        } else if initiator_value > opponent_value {
            HandResult {
                winner: Some(Seat::Initiator),
                natural: false,
            }
        } else if opponent_value > initiator_value {
            HandResult {
                winner: Some(Seat::Opponent),
                natural: false,
            }
        } else {
            HandResult {
                winner: None,
                natural: false,
            }
        };
        self.result = Some(result);
    }
}

/// Take both bets out of the players' pockets. Called exactly once, on
/// acceptance of the invite.
pub async fn escrow_bets(
    ledger: &Ledger,
    guild_id: u64,
    game: &BlackjackMatch,
    initiator_name: &str,
    opponent_name: &str,
) {
    ledger
        .update_pockets(guild_id, game.initiator, initiator_name, -game.bet)
        .await;
    ledger
        .update_pockets(guild_id, game.opponent, opponent_name, -game.bet)
        .await;
}

/// Return both bets; the conservative default when anything goes wrong after
/// escrow.
pub async fn refund_bets(
    ledger: &Ledger,
    guild_id: u64,
    game: &BlackjackMatch,
    initiator_name: &str,
    opponent_name: &str,
) {
    ledger
        .update_pockets(guild_id, game.initiator, initiator_name, game.bet)
        .await;
    ledger
        .update_pockets(guild_id, game.opponent, opponent_name, game.bet)
        .await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Winner credited with the pot (plus the bonus on a natural).
    Paid {
        winner: u64,
        amount: i64,
        bonus: i64,
    },
    /// Tie: both bets refunded.
    Refunded,
}

/// Pay out a finished match. Funds were escrowed at acceptance, so a tie puts
/// each bet back and a win moves the whole pot.
pub async fn settle(
    ledger: &Ledger,
    guild_id: u64,
    game: &BlackjackMatch,
    initiator_name: &str,
    opponent_name: &str,
) -> Settlement {
    let Some(result) = game.result() else {
        // Settling an unfinished match is a coordinator bug; refund rather
        // than strand the escrow.
        warn!("settle called on an unfinished blackjack match");
        refund_bets(ledger, guild_id, game, initiator_name, opponent_name).await;
        return Settlement::Refunded;
    };

    match result.winner {
        None => {
            refund_bets(ledger, guild_id, game, initiator_name, opponent_name).await;
            Settlement::Refunded
        }
        Some(seat) => {
            let bonus = if result.natural {
                natural_bonus(game.bet)
            } else {
                0
            };
            let amount = game.pot() + bonus;
            let (winner_id, winner_name) = match seat {
                Seat::Initiator => (game.initiator, initiator_name),
                Seat::Opponent => (game.opponent, opponent_name),
            };
            ledger
                .update_pockets(guild_id, winner_id, winner_name, amount)
                .await;
            Settlement::Paid {
                winner: winner_id,
                amount,
                bonus,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::games::deck::{Face, Suit};
    use crate::test_utils::{GUILD, TARGET, TARGET_NAME, TestEnv, USER, USER_NAME};
    use rand::{SeedableRng, rngs::StdRng};

    fn card(face: Face) -> Card {
        Card {
            face,
            suit: Suit::Clubs,
        }
    }

    /// A match with chosen hands, both players still to act.
    fn rigged(initiator_hand: Vec<Card>, opponent_hand: Vec<Card>, bet: i64) -> BlackjackMatch {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = BlackjackMatch::deal(USER, TARGET, bet, &mut rng);
        game.hands = [initiator_hand, opponent_hand];
        game
    }

    #[test]
    fn natural_beats_a_plain_eighteen() {
        let mut game = rigged(
            vec![card(Face::Ace), card(Face::King)],
            vec![card(Face::Nine), card(Face::Nine)],
            100,
        );
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        assert_eq!(
            game.result().unwrap(),
            HandResult {
                winner: Some(Seat::Initiator),
                natural: true
            }
        );
    }

    #[test]
    fn natural_beats_a_drawn_twenty_one() {
        // 21 on three cards is not a natural and loses to one.
        let mut game = rigged(
            vec![card(Face::Seven), card(Face::Seven), card(Face::Seven)],
            vec![card(Face::Ace), card(Face::Queen)],
            50,
        );
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        assert_eq!(
            game.result().unwrap(),
            HandResult {
                winner: Some(Seat::Opponent),
                natural: true
            }
        );
    }

    #[test]
    fn equal_values_tie_and_both_busting_ties() {
        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Eight)],
            vec![card(Face::Nine), card(Face::Nine)],
            10,
        );
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        assert_eq!(game.result().unwrap().winner, None);

        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Eight), card(Face::Five)],
            vec![card(Face::Nine), card(Face::Nine), card(Face::Seven)],
            10,
        );
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        assert_eq!(game.result().unwrap().winner, None);
    }

    #[test]
    fn busting_on_a_hit_stands_the_player_automatically() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Nine)],
            vec![card(Face::Ten), card(Face::Five)],
            10,
        );
        game.stand(Seat::Initiator);
        assert_eq!(game.turn(), Seat::Opponent);

        // Draw until the opponent busts; the bust must end their turn.
        while game.hit(Seat::Opponent, &mut rng) <= deck::BLACKJACK {}
        assert!(game.has_stood(Seat::Opponent));
        assert!(game.is_over());
        assert_eq!(game.result().unwrap().winner, Some(Seat::Initiator));
    }

    #[test]
    fn turn_passes_to_the_seat_still_playing() {
        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Nine)],
            vec![card(Face::Ten), card(Face::Five)],
            10,
        );
        assert_eq!(game.turn(), Seat::Initiator);
        game.stand(Seat::Initiator);
        assert_eq!(game.turn(), Seat::Opponent);
        assert!(!game.is_over());
    }

    #[test]
    fn forfeit_hands_the_pot_to_the_present_player() {
        let mut game = rigged(
            vec![card(Face::Ace), card(Face::King)],
            vec![card(Face::Two), card(Face::Three)],
            10,
        );
        // Even a winning hand forfeits by inaction.
        game.forfeit(Seat::Initiator);
        assert_eq!(
            game.result().unwrap(),
            HandResult {
                winner: Some(Seat::Opponent),
                natural: false
            }
        );
    }

    #[tokio::test]
    async fn natural_win_pays_pot_plus_half_bet_bonus() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 100).await;
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 100).await;

        let mut game = rigged(
            vec![card(Face::Ace), card(Face::King)],
            vec![card(Face::Nine), card(Face::Nine)],
            100,
        );
        escrow_bets(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 0);
        assert_eq!(env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await, 0);

        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        let settlement = settle(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;
        assert_eq!(
            settlement,
            Settlement::Paid {
                winner: USER,
                amount: 250, // 2x100 pot + 50% bonus
                bonus: 50
            }
        );
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 250);
        assert_eq!(env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await, 0);
    }

    #[tokio::test]
    async fn tie_refunds_both_escrowed_bets() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 40).await;
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 40).await;

        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Seven)],
            vec![card(Face::Nine), card(Face::Eight)],
            40,
        );
        escrow_bets(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);

        let settlement = settle(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;
        assert_eq!(settlement, Settlement::Refunded);
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 40);
        assert_eq!(env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await, 40);
    }

    #[tokio::test]
    async fn settlement_conserves_total_funds() {
        let env = TestEnv::new();
        env.ledger.update_pockets(GUILD, USER, USER_NAME, 500).await;
        env.ledger.update_pockets(GUILD, TARGET, TARGET_NAME, 500).await;

        let mut game = rigged(
            vec![card(Face::Ten), card(Face::Nine)],
            vec![card(Face::Ten), card(Face::Eight)],
            200,
        );
        escrow_bets(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;
        game.stand(Seat::Initiator);
        game.stand(Seat::Opponent);
        settle(&env.ledger, GUILD, &game, USER_NAME, TARGET_NAME).await;

        let total = env.ledger.pockets(GUILD, USER, USER_NAME).await
            + env.ledger.pockets(GUILD, TARGET, TARGET_NAME).await;
        // No natural involved: the pot merely moved between the players.
        assert_eq!(total, 1000);
        assert_eq!(env.ledger.pockets(GUILD, USER, USER_NAME).await, 700);
    }
}
