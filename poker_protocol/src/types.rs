use crate::errors::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '♣' => Some(Suit::Clubs),
            '♦' => Some(Suit::Diamonds),
            '♥' => Some(Suit::Hearts),
            '♠' => Some(Suit::Spades),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(Rank::Two),
            3 => Some(Rank::Three),
            4 => Some(Rank::Four),
            5 => Some(Rank::Five),
            6 => Some(Rank::Six),
            7 => Some(Rank::Seven),
            8 => Some(Rank::Eight),
            9 => Some(Rank::Nine),
            10 => Some(Rank::Ten),
            11 => Some(Rank::Jack),
            12 => Some(Rank::Queen),
            13 => Some(Rank::King),
            14 => Some(Rank::Ace),
            _ => None,
        }
    }

    /// Ordinal value, 2 through 14 (ace high).
    pub fn value(self) -> u8 {
        self as u8
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "J" => Some(Rank::Jack),
            "Q" => Some(Rank::Queen),
            "K" => Some(Rank::King),
            "A" => Some(Rank::Ace),
            digits => digits.parse::<u8>().ok().and_then(Rank::from_u8),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rank::Jack => write!(f, "J"),
            Rank::Queen => write!(f, "Q"),
            Rank::King => write!(f, "K"),
            Rank::Ace => write!(f, "A"),
            numeric => write!(f, "{}", numeric.value()),
        }
    }
}

/// A playing card. The text form `{rank}{suit}` (for example `10♠`) is both
/// the wire format and the equality key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s
            .chars()
            .last()
            .ok_or_else(|| ProtocolError::InvalidCard(s.to_string()))?;
        let suit =
            Suit::from_symbol(suit_char).ok_or_else(|| ProtocolError::InvalidCard(s.to_string()))?;
        let label = &s[..s.len() - suit_char.len_utf8()];
        let rank = Rank::from_label(label).ok_or_else(|| ProtocolError::InvalidCard(s.to_string()))?;
        Ok(Card::new(rank, suit))
    }
}

/// Which ranks the deck contains. The variant also decides whether the
/// A-2-3-4-5 wheel counts as a straight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckVariant {
    /// Ten through Ace, 20 cards.
    Short,
    /// Two through Ace, 52 cards.
    #[default]
    Full,
}

impl DeckVariant {
    pub fn ranks(self) -> &'static [Rank] {
        match self {
            DeckVariant::Short => &Rank::ALL[8..],
            DeckVariant::Full => &Rank::ALL,
        }
    }

    pub fn deck_size(self) -> usize {
        self.ranks().len() * Suit::ALL.len()
    }

    /// Most players a single hand can seat: two hole cards each plus a full board.
    pub fn max_players(self) -> usize {
        (self.deck_size() - 5) / 2
    }

    pub fn allows_wheel(self) -> bool {
        matches!(self, DeckVariant::Full)
    }
}

impl FromStr for DeckVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(DeckVariant::Short),
            "full" => Ok(DeckVariant::Full),
            other => Err(format!("unknown deck variant '{}'", other)),
        }
    }
}

impl fmt::Display for DeckVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeckVariant::Short => write!(f, "short"),
            DeckVariant::Full => write!(f, "full"),
        }
    }
}

/// Phase of the hand state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WaitingForPlayers,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Phase {
    pub fn is_betting(self) -> bool {
        matches!(
            self,
            Phase::PreFlop | Phase::Flop | Phase::Turn | Phase::River
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Phase::WaitingForPlayers => write!(f, "Waiting for players"),
            Phase::PreFlop => write!(f, "Pre-Flop"),
            Phase::Flop => write!(f, "Flop"),
            Phase::Turn => write!(f, "Turn"),
            Phase::River => write!(f, "River"),
            Phase::Showdown => write!(f, "Showdown"),
        }
    }
}

/// Hand categories, weakest first. The discriminant is the category's
/// position in the score encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandRank {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandRank {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(HandRank::HighCard),
            1 => Some(HandRank::Pair),
            2 => Some(HandRank::TwoPair),
            3 => Some(HandRank::ThreeOfAKind),
            4 => Some(HandRank::Straight),
            5 => Some(HandRank::Flush),
            6 => Some(HandRank::FullHouse),
            7 => Some(HandRank::FourOfAKind),
            8 => Some(HandRank::StraightFlush),
            _ => None,
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HandRank::HighCard => "High Card",
            HandRank::Pair => "Pair",
            HandRank::TwoPair => "Two Pair",
            HandRank::ThreeOfAKind => "Three of a Kind",
            HandRank::Straight => "Straight",
            HandRank::Flush => "Flush",
            HandRank::FullHouse => "Full House",
            HandRank::FourOfAKind => "Four of a Kind",
            HandRank::StraightFlush => "Straight Flush",
        };
        write!(f, "{}", name)
    }
}
