use crate::eval::HandScore;

/// How a finished hand's pot is distributed, by seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Everyone else folded; no cards are compared.
    Uncontested { seat: usize, amount: u32 },
    BestHand {
        seat: usize,
        amount: u32,
        score: HandScore,
    },
    /// Tied best hands. The odd chips go to the first winner in seat order.
    Split {
        seats: Vec<usize>,
        share: u32,
        remainder: u32,
        score: HandScore,
    },
}

impl Resolution {
    /// Chips owed to each winning seat. Always sums to the pot.
    pub fn payouts(&self) -> Vec<(usize, u32)> {
        match self {
            Resolution::Uncontested { seat, amount } | Resolution::BestHand { seat, amount, .. } => {
                vec![(*seat, *amount)]
            }
            Resolution::Split {
                seats,
                share,
                remainder,
                ..
            } => seats
                .iter()
                .enumerate()
                .map(|(i, &seat)| (seat, if i == 0 { share + remainder } else { *share }))
                .collect(),
        }
    }
}

pub fn uncontested(pot: u32, seat: usize) -> Resolution {
    Resolution::Uncontested { seat, amount: pot }
}

/// Picks the winner(s) among `(seat, score)` pairs. Returns `None` when
/// there is nobody to pay.
pub fn resolve(pot: u32, contenders: &[(usize, HandScore)]) -> Option<Resolution> {
    let best = contenders.iter().map(|(_, score)| *score).max()?;
    let mut seats: Vec<usize> = contenders
        .iter()
        .filter(|(_, score)| *score == best)
        .map(|(seat, _)| *seat)
        .collect();
    seats.sort_unstable();

    if let [seat] = seats.as_slice() {
        return Some(Resolution::BestHand {
            seat: *seat,
            amount: pot,
            score: best,
        });
    }

    let winners = seats.len() as u32;
    Some(Resolution::Split {
        share: pot / winners,
        remainder: pot % winners,
        seats,
        score: best,
    })
}
