//! Card primitives shared by the blackjack games: a 52-card shoe and
//! ace-aware hand valuation.

use rand::Rng;
use rand::seq::SliceRandom;

pub const BLACKJACK: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "\u{2660}\u{fe0f}",
            Suit::Hearts => "\u{2665}\u{fe0f}",
            Suit::Diamonds => "\u{2666}\u{fe0f}",
            Suit::Clubs => "\u{2663}\u{fe0f}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Face {
    pub const ALL: [Face; 13] = [
        Face::Ace,
        Face::Two,
        Face::Three,
        Face::Four,
        Face::Five,
        Face::Six,
        Face::Seven,
        Face::Eight,
        Face::Nine,
        Face::Ten,
        Face::Jack,
        Face::Queen,
        Face::King,
    ];

    /// Ace counts as 11 here; [`hand_value`] demotes to 1 as needed.
    pub fn value(self) -> u32 {
        match self {
            Face::Ace => 11,
            Face::Two => 2,
            Face::Three => 3,
            Face::Four => 4,
            Face::Five => 5,
            Face::Six => 6,
            Face::Seven => 7,
            Face::Eight => 8,
            Face::Nine => 9,
            Face::Ten | Face::Jack | Face::Queen | Face::King => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Face::Ace => "A",
            Face::Two => "2",
            Face::Three => "3",
            Face::Four => "4",
            Face::Five => "5",
            Face::Six => "6",
            Face::Seven => "7",
            Face::Eight => "8",
            Face::Nine => "9",
            Face::Ten => "10",
            Face::Jack => "J",
            Face::Queen => "Q",
            Face::King => "K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub face: Face,
    pub suit: Suit,
}

impl Card {
    pub fn label(self) -> String {
        format!("{}{}", self.face.label(), self.suit.symbol())
    }
}

/// A single shuffled 52-card shoe, rebuilt and reshuffled if it runs dry.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut cards: Vec<Card> = Suit::ALL
            .iter()
            .flat_map(|suit| Face::ALL.iter().map(|face| Card {
                face: *face,
                suit: *suit,
            }))
            .collect();
        cards.shuffle(rng);
        Deck { cards }
    }

    pub fn draw(&mut self, rng: &mut impl Rng) -> Card {
        if self.cards.is_empty() {
            *self = Deck::shuffled(rng);
        }
        // Non-empty by construction.
        self.cards.pop().unwrap_or(Card {
            face: Face::Ace,
            suit: Suit::Spades,
        })
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// Blackjack hand value: aces drop from 11 to 1 while the hand would bust.
pub fn hand_value(hand: &[Card]) -> u32 {
    let mut value: u32 = hand.iter().map(|card| card.face.value()).sum();
    let mut aces = hand.iter().filter(|card| card.face == Face::Ace).count();
    while value > BLACKJACK && aces > 0 {
        value -= 10;
        aces -= 1;
    }
    value
}

/// A natural: 21 from the first two cards.
pub fn is_natural(hand: &[Card]) -> bool {
    hand.len() == 2 && hand_value(hand) == BLACKJACK
}

/// Render a hand for display, e.g. `A♠️ K♥️`.
pub fn format_hand(hand: &[Card]) -> String {
    hand.iter()
        .map(|card| card.label())
        .collect::<Vec<_>>()
        .join(" ")
}
