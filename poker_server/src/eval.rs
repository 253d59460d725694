use poker_protocol::{Card, DeckVariant, HandRank, Rank, Suit};
use serde::Serialize;
use std::fmt;

const CATEGORY_SHIFT: u32 = 20;
const KICKER_BITS: u32 = 4;
const KICKER_SLOTS: usize = 5;

/// A hand's strength packed into one integer: the category in the top bits,
/// then up to five tie-break ranks of four bits each, most significant first.
/// Comparing two scores as integers orders the hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HandScore(u32);

impl HandScore {
    fn encode(category: HandRank, tiebreakers: &[u8]) -> Self {
        let mut value = (category as u32) << CATEGORY_SHIFT;
        for (slot, rank) in tiebreakers.iter().take(KICKER_SLOTS).enumerate() {
            let shift = KICKER_BITS * (KICKER_SLOTS - 1 - slot) as u32;
            value |= (*rank as u32) << shift;
        }
        Self(value)
    }

    pub fn category(self) -> HandRank {
        HandRank::from_u32(self.0 >> CATEGORY_SHIFT).unwrap_or(HandRank::HighCard)
    }

    /// Tie-break ranks in descending significance, empty slots dropped.
    pub fn tiebreakers(self) -> Vec<u8> {
        (0..KICKER_SLOTS)
            .map(|slot| {
                let shift = KICKER_BITS * (KICKER_SLOTS - 1 - slot) as u32;
                ((self.0 >> shift) & 0xF) as u8
            })
            .filter(|&rank| rank != 0)
            .collect()
    }
}

impl fmt::Display for HandScore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ranks: Vec<String> = self
            .tiebreakers()
            .into_iter()
            .filter_map(Rank::from_u8)
            .map(|r| r.to_string())
            .collect();
        write!(f, "{} ({})", self.category(), ranks.join(" "))
    }
}

/// Scores two hole cards plus up to five community cards.
///
/// Production callers only score a full board; shorter boards are accepted so
/// partial hands can be tested in isolation.
pub fn evaluate(variant: DeckVariant, hole: &[Card; 2], community: &[Card]) -> HandScore {
    let cards: Vec<Card> = hole.iter().chain(community.iter()).copied().collect();
    evaluate_cards(variant, &cards)
}

pub fn evaluate_cards(variant: DeckVariant, cards: &[Card]) -> HandScore {
    let mut rank_counts = [0u8; 15];
    for card in cards {
        rank_counts[card.rank.value() as usize] += 1;
    }

    let flush_ranks = flush_ranks(cards);

    if let Some(suited) = &flush_ranks {
        if let Some(high) = straight_high(suited, variant) {
            return HandScore::encode(HandRank::StraightFlush, &[high]);
        }
    }

    // (count, rank), most copies first, then highest rank.
    let mut groups: Vec<(u8, u8)> = (2..=14u8)
        .filter(|&r| rank_counts[r as usize] > 0)
        .map(|r| (rank_counts[r as usize], r))
        .collect();
    groups.sort_by(|a, b| b.cmp(a));

    let count_at = |i: usize| groups.get(i).map(|g| g.0).unwrap_or(0);
    let rank_at = |i: usize| groups.get(i).map(|g| g.1).unwrap_or(0);

    if count_at(0) == 4 {
        let quad = rank_at(0);
        return HandScore::encode(HandRank::FourOfAKind, &[quad, highest_except(&groups, &[quad])]);
    }

    if count_at(0) == 3 && count_at(1) >= 2 {
        return HandScore::encode(HandRank::FullHouse, &[rank_at(0), rank_at(1)]);
    }

    if let Some(suited) = &flush_ranks {
        return HandScore::encode(HandRank::Flush, &suited[..KICKER_SLOTS]);
    }

    let mut distinct_desc: Vec<u8> = groups.iter().map(|g| g.1).collect();
    distinct_desc.sort_unstable_by(|a, b| b.cmp(a));
    if let Some(high) = straight_high(&distinct_desc, variant) {
        return HandScore::encode(HandRank::Straight, &[high]);
    }

    if count_at(0) == 3 {
        let trips = rank_at(0);
        let mut tiebreakers = vec![trips];
        tiebreakers.extend(kickers(&distinct_desc, &[trips], 2));
        return HandScore::encode(HandRank::ThreeOfAKind, &tiebreakers);
    }

    if count_at(0) == 2 && count_at(1) == 2 {
        let (high, low) = (rank_at(0), rank_at(1));
        return HandScore::encode(
            HandRank::TwoPair,
            &[high, low, highest_except(&groups, &[high, low])],
        );
    }

    if count_at(0) == 2 {
        let pair = rank_at(0);
        let mut tiebreakers = vec![pair];
        tiebreakers.extend(kickers(&distinct_desc, &[pair], 3));
        return HandScore::encode(HandRank::Pair, &tiebreakers);
    }

    HandScore::encode(HandRank::HighCard, &kickers(&distinct_desc, &[], KICKER_SLOTS))
}

/// Ranks of the flush suit, descending, when some suit has five or more cards.
fn flush_ranks(cards: &[Card]) -> Option<Vec<u8>> {
    Suit::ALL.iter().find_map(|&suit| {
        let mut ranks: Vec<u8> = cards
            .iter()
            .filter(|c| c.suit == suit)
            .map(|c| c.rank.value())
            .collect();
        if ranks.len() < 5 {
            return None;
        }
        ranks.sort_unstable_by(|a, b| b.cmp(a));
        Some(ranks)
    })
}

/// Highest card of a five-rank run within `ranks` (descending, distinct).
/// The wheel counts as five-high, and only where the variant deals low cards.
fn straight_high(ranks: &[u8], variant: DeckVariant) -> Option<u8> {
    let has = |r: u8| ranks.contains(&r);

    let run = ranks
        .iter()
        .copied()
        .filter(|&high| high >= 6)
        .find(|&high| (high - 4..high).all(has));
    if run.is_some() {
        return run;
    }

    let wheel = [14, 2, 3, 4, 5];
    if variant.allows_wheel() && wheel.iter().all(|&r| has(r)) {
        return Some(5);
    }
    None
}

fn highest_except(groups: &[(u8, u8)], excluded: &[u8]) -> u8 {
    groups
        .iter()
        .map(|g| g.1)
        .filter(|r| !excluded.contains(r))
        .max()
        .unwrap_or(0)
}

fn kickers(distinct_desc: &[u8], excluded: &[u8], take: usize) -> Vec<u8> {
    distinct_desc
        .iter()
        .copied()
        .filter(|r| !excluded.contains(r))
        .take(take)
        .collect()
}

#[cfg(test)]
impl HandScore {
    pub fn value(self) -> u32 {
        self.0
    }
}
