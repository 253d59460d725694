use poker_protocol::{Card, DeckVariant, Suit};
use rand::seq::SliceRandom;
use rand::Rng;

/// Undealt cards. The next card dealt is the last element.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn ordered(variant: DeckVariant) -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| variant.ranks().iter().map(move |&rank| Card::new(rank, suit)))
            .collect();
        Self { cards }
    }

    pub fn shuffled<R: Rng + ?Sized>(variant: DeckVariant, rng: &mut R) -> Self {
        let mut deck = Self::ordered(variant);
        deck.cards.shuffle(rng);
        deck
    }

    pub fn deal(&mut self) -> Option<Card> {
        self.cards.pop()
    }
}

#[cfg(test)]
impl Deck {
    /// A deck that deals `cards` front to back.
    pub fn stacked(mut cards: Vec<Card>) -> Self {
        cards.reverse();
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
