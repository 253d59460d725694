use poker_protocol::{Card, ServerError, ServerResult};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque transport identity. Used to route messages, never to order seats.
pub type ConnectionId = Uuid;

const MAX_NAME_LEN: usize = 20;

/// A seated player.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    #[serde(skip)]
    pub connection: ConnectionId,
    pub chips: u32,
    /// Chips committed in the current betting round.
    pub current_bet: u32,
    #[serde(skip)]
    pub hole_cards: Option<[Card; 2]>,
    /// Still contesting the pot this hand.
    pub active: bool,
    /// Has responded since the bet level last changed.
    pub has_acted: bool,
    pub stats: HandStats,
}

/// Running results for one seated player. Lives as long as the seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HandStats {
    pub hands_played: u32,
    pub hands_won: u32,
    pub hands_lost: u32,
    pub hands_split: u32,
    /// Percentage of played hands won outright, two decimals.
    pub win_rate: f64,
}

/// How a dealt-in player finished a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandOutcome {
    Won,
    Lost,
    Split,
}

impl HandStats {
    pub fn record(&mut self, outcome: HandOutcome) {
        self.hands_played += 1;
        match outcome {
            HandOutcome::Won => self.hands_won += 1,
            HandOutcome::Lost => self.hands_lost += 1,
            HandOutcome::Split => self.hands_split += 1,
        }
        let rate = f64::from(self.hands_won) / f64::from(self.hands_played) * 100.0;
        self.win_rate = (rate * 100.0).round() / 100.0;
    }
}

impl Player {
    pub fn new(id: u32, name: String, connection: ConnectionId, chips: u32) -> Self {
        Self {
            id,
            name,
            connection,
            chips,
            current_bet: 0,
            hole_cards: None,
            active: false,
            has_acted: false,
            stats: HandStats::default(),
        }
    }
}

#[cfg(test)]
impl Player {
    pub fn is_all_in(&self) -> bool {
        self.active && self.chips == 0
    }
}

/// Maps connections to seats and owns the canonical seat order.
#[derive(Debug)]
pub struct SessionRegistry {
    players: Vec<Player>,
    seats: HashMap<ConnectionId, usize>,
    next_id: u32,
    max_seats: usize,
}

impl SessionRegistry {
    pub fn new(max_seats: usize) -> Self {
        Self {
            players: Vec::new(),
            seats: HashMap::new(),
            next_id: 1,
            max_seats,
        }
    }

    /// Seats a new player at the end of the seat order and returns the seat.
    ///
    /// Records whose connection is gone are waiting to be removed. They keep
    /// neither their name nor a place under the seat cap.
    pub fn join(&mut self, connection: ConnectionId, name: &str, chips: u32) -> ServerResult<usize> {
        if let Some(&seat) = self.seats.get(&connection) {
            return Err(ServerError::AlreadyJoined(self.players[seat].name.clone()));
        }
        validate_name(name)?;
        if self.seats.values().any(|&seat| self.players[seat].name == name) {
            return Err(ServerError::NameTaken(name.to_string()));
        }
        if self.seats.len() >= self.max_seats {
            return Err(ServerError::TableFull(self.max_seats));
        }

        let seat = self.players.len();
        self.players
            .push(Player::new(self.next_id, name.to_string(), connection, chips));
        self.next_id += 1;
        self.seats.insert(connection, seat);
        Ok(seat)
    }

    pub fn seat_of(&self, connection: &ConnectionId) -> ServerResult<usize> {
        self.seats
            .get(connection)
            .copied()
            .ok_or(ServerError::UnknownConnection)
    }

    /// Drops the route for a connection. The record stays until `remove`.
    pub fn unbind(&mut self, connection: &ConnectionId) -> Option<usize> {
        self.seats.remove(connection)
    }

    /// Deletes the record at `seat`. Every later seat shifts down by one.
    pub fn remove(&mut self, seat: usize) -> Player {
        let player = self.players.remove(seat);
        self.seats.retain(|_, s| *s != seat);
        for s in self.seats.values_mut() {
            if *s > seat {
                *s -= 1;
            }
        }
        player
    }

    /// Seats whose connection is gone, highest first.
    pub fn unbound_seats(&self) -> Vec<usize> {
        (0..self.players.len())
            .rev()
            .filter(|&seat| !self.is_bound(seat))
            .collect()
    }

    pub fn is_bound(&self, seat: usize) -> bool {
        self.players
            .get(seat)
            .map(|p| self.seats.get(&p.connection) == Some(&seat))
            .unwrap_or(false)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.active).count()
    }

    /// A seat is dealt in only while it has chips and a live connection.
    pub fn can_be_dealt(&self, seat: usize) -> bool {
        self.is_bound(seat) && self.players[seat].chips > 0
    }

    /// Players who would be dealt in if a hand started now.
    pub fn funded_count(&self) -> usize {
        (0..self.players.len())
            .filter(|&seat| self.can_be_dealt(seat))
            .count()
    }
}

fn validate_name(name: &str) -> ServerResult<()> {
    let valid = !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ServerError::InvalidName)
    }
}
