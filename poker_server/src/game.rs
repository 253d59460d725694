use crate::betting::BettingEngine;
use crate::config::TableConfig;
use crate::deck::Deck;
use crate::eval::{evaluate, HandScore};
use crate::registry::{ConnectionId, HandOutcome, Player, SessionRegistry};
use crate::showdown::{self, Resolution};
use log::{debug, error, info, log_enabled, warn, Level};
use poker_protocol::{
    ActionReport, Card, Phase, PlayerAction, ServerError, ServerEvent, ServerResult,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::mpsc;

/// Who an outbound event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Player(ConnectionId),
}

#[derive(Debug, Clone)]
pub struct Dispatch {
    pub audience: Audience,
    pub event: ServerEvent,
}

pub type EventSender = mpsc::UnboundedSender<Dispatch>;

/// Read-only copy of the table. Hole cards and connections are never included.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub hand_number: u32,
    pub phase: Phase,
    pub dealer_seat: usize,
    pub to_act: Option<usize>,
    pub pot: u32,
    pub current_bet: u32,
    pub community: Vec<Card>,
    pub players: Vec<Player>,
}

/// The street that follows `phase` once its betting round closes.
fn next_phase(phase: Phase) -> Option<Phase> {
    match phase {
        Phase::PreFlop => Some(Phase::Flop),
        Phase::Flop => Some(Phase::Turn),
        Phase::Turn => Some(Phase::River),
        Phase::River => Some(Phase::Showdown),
        Phase::WaitingForPlayers | Phase::Showdown => None,
    }
}

/// One table's authoritative state. Every mutation goes through `&mut self`,
/// so whoever owns the game is the single writer.
#[derive(Debug)]
pub struct PokerGame {
    config: TableConfig,
    registry: SessionRegistry,
    betting: BettingEngine,
    community: Vec<Card>,
    deck: Deck,
    phase: Phase,
    dealer_seat: usize,
    /// Seat whose action is awaited.
    to_act: Option<usize>,
    hand_number: u32,
    rng: StdRng,
    tx: EventSender,
}

impl PokerGame {
    pub fn new(config: TableConfig, tx: EventSender) -> Self {
        let rng = match config.deck_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: SessionRegistry::new(config.max_players),
            betting: BettingEngine::new(),
            community: Vec::with_capacity(5),
            deck: Deck::default(),
            phase: Phase::WaitingForPlayers,
            dealer_seat: 0,
            to_act: None,
            hand_number: 0,
            rng,
            tx,
            config,
        }
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            hand_number: self.hand_number,
            phase: self.phase,
            dealer_seat: self.dealer_seat,
            to_act: self.to_act,
            pot: self.betting.pot(),
            current_bet: self.betting.current_bet(),
            community: self.community.clone(),
            players: self.registry.players().to_vec(),
        }
    }

    fn emit(&self, audience: Audience, event: ServerEvent) {
        if let Err(mpsc::error::SendError(dispatch)) = self.tx.send(Dispatch { audience, event }) {
            debug!("No dispatcher for event: {}", dispatch.event);
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        self.emit(Audience::All, event);
    }

    fn name_of(&self, seat: usize) -> String {
        self.registry.players()[seat].name.clone()
    }

    /// Seats a player. A hand starts as soon as enough funded players are seated.
    pub fn join(&mut self, connection: ConnectionId, name: &str) -> ServerResult<usize> {
        let seat = self
            .registry
            .join(connection, name, self.config.starting_chips)?;
        info!("Player {} joined at seat {}", name, seat);
        self.broadcast(ServerEvent::PlayerJoined {
            name: name.to_string(),
        });
        self.maybe_start_hand();
        Ok(seat)
    }

    /// Applies an action from `connection`. Rejections leave the table untouched.
    pub fn handle_action(
        &mut self,
        connection: ConnectionId,
        action: PlayerAction,
    ) -> ServerResult<ActionReport> {
        let seat = self.registry.seat_of(&connection)?;
        if !self.phase.is_betting() {
            return Err(ServerError::NoHandInProgress);
        }
        if !self.registry.players()[seat].active {
            return Err(ServerError::PlayerNotActive);
        }
        if self.to_act != Some(seat) {
            return Err(ServerError::NotYourTurn);
        }

        let report = self
            .betting
            .apply(self.registry.players_mut(), seat, action)?;
        let name = self.name_of(seat);
        debug!(
            "Hand #{} {}: {} {} -> {:?} (pot {})",
            self.hand_number,
            self.phase,
            name,
            action,
            report,
            self.betting.pot()
        );
        self.broadcast(ServerEvent::Action { name, report });

        self.advance(seat + 1);
        self.maybe_start_hand();
        Ok(report)
    }

    /// Drops a connection. A player still in the hand folds on the spot,
    /// whether or not it is their turn. The seat is freed at once between
    /// hands, otherwise when the hand ends.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(seat) = self.registry.unbind(&connection) else {
            return;
        };
        info!("Seat {} disconnected", seat);

        if self.phase.is_betting() {
            let forfeited = self
                .betting
                .forfeit(&mut self.registry.players_mut()[seat]);
            if let Some(report) = forfeited {
                let name = self.name_of(seat);
                info!("Player {} left during hand #{} and folds", name, self.hand_number);
                self.broadcast(ServerEvent::Action { name, report });
                let from = self.to_act.unwrap_or(seat);
                self.advance(from);
            }
        }

        if !self.phase.is_betting() {
            self.release_departed();
        }
        self.maybe_start_hand();
    }

    /// Removes every record whose connection is gone. The dealer button
    /// stays on the same player, or passes to the next one if the dealer left.
    fn release_departed(&mut self) {
        for seat in self.registry.unbound_seats() {
            let player = self.registry.remove(seat);
            if seat < self.dealer_seat {
                self.dealer_seat -= 1;
            }
            info!("Seat {} released by {}", seat, player.name);
        }
        if self.dealer_seat >= self.registry.len() {
            self.dealer_seat = 0;
        }
    }

    fn maybe_start_hand(&mut self) {
        while self.phase == Phase::WaitingForPlayers
            && self.registry.funded_count() >= self.config.min_players
        {
            if !self.start_hand() {
                break;
            }
        }
    }

    fn start_hand(&mut self) -> bool {
        let deck = Deck::shuffled(self.config.deck_variant, &mut self.rng);
        self.start_hand_with(deck)
    }

    /// Deals a hand from `deck`, posts blinds and opens preflop betting.
    /// Returns false when fewer than two seats can be dealt in.
    pub fn start_hand_with(&mut self, deck: Deck) -> bool {
        let seats = self.registry.len();
        for seat in 0..seats {
            let dealt = self.registry.can_be_dealt(seat);
            let player = &mut self.registry.players_mut()[seat];
            player.active = dealt;
            player.has_acted = false;
            player.current_bet = 0;
            player.hole_cards = None;
        }
        if self.registry.active_count() < 2 {
            debug!("Not enough funded players to deal");
            for player in self.registry.players_mut() {
                player.active = false;
            }
            return false;
        }

        self.hand_number += 1;
        self.deck = deck;
        self.community.clear();
        self.betting.open_hand();
        info!(
            "Hand #{} starting: {} players, dealer seat {}",
            self.hand_number,
            self.registry.active_count(),
            self.dealer_seat
        );
        self.broadcast(ServerEvent::GameStarted);

        let dealt: Vec<usize> = (0..seats)
            .filter(|&seat| self.registry.players()[seat].active)
            .collect();
        let first: Vec<Card> = dealt.iter().map(|_| self.draw()).collect();
        for (&seat, &card) in dealt.iter().zip(&first) {
            let hole = [card, self.draw()];
            let player = &mut self.registry.players_mut()[seat];
            player.hole_cards = Some(hole);
            let connection = player.connection;
            self.emit(
                Audience::Player(connection),
                ServerEvent::YourCards(hole[0], hole[1]),
            );
        }

        let small = self.next_dealt(self.dealer_seat + 1);
        let big = self.next_dealt(small + 1);
        self.post_blind(small, self.config.small_blind);
        self.post_blind(big, self.config.big_blind);
        self.betting
            .set_level(self.config.big_blind, self.config.big_blind);

        self.phase = Phase::PreFlop;
        self.to_act = self.seek_from(big + 1);
        if self.betting.round_closed(self.registry.players()) {
            self.close_street();
        }
        true
    }

    fn post_blind(&mut self, seat: usize, amount: u32) {
        let posted = self
            .betting
            .post_blind(&mut self.registry.players_mut()[seat], amount);
        self.broadcast(ServerEvent::BlindPosted {
            name: self.name_of(seat),
            amount: posted,
        });
    }

    /// First seat at or after `start` that was dealt into this hand.
    fn next_dealt(&self, start: usize) -> usize {
        let players = self.registry.players();
        let n = players.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&seat| players[seat].active)
            .unwrap_or(start % n)
    }

    /// First seat at or after `start`, wrapping, that still owes an action.
    fn seek_from(&self, start: usize) -> Option<usize> {
        let players = self.registry.players();
        let n = players.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&seat| self.betting.needs_to_act(&players[seat]))
    }

    fn draw(&mut self) -> Card {
        self.deck
            .deal()
            .expect("deck exhausted: seat cap must keep every deal within the deck")
    }

    fn advance(&mut self, from: usize) {
        if self.registry.active_count() <= 1 {
            self.award_uncontested();
            return;
        }
        if !self.betting.round_closed(self.registry.players()) {
            self.to_act = self.seek_from(from);
            if self.to_act.is_some() {
                return;
            }
        }
        self.close_street();
    }

    /// Moves through the streets until a betting round needs input or the
    /// hand reaches showdown. Streets where fewer than two players can bet
    /// are revealed without stopping.
    fn close_street(&mut self) {
        self.to_act = None;
        while let Some(next) = next_phase(self.phase) {
            self.phase = next;
            match next {
                Phase::Flop => {
                    let flop = [self.draw(), self.draw(), self.draw()];
                    self.community.extend_from_slice(&flop);
                    self.broadcast(ServerEvent::Flop(flop));
                }
                Phase::Turn => {
                    let card = self.draw();
                    self.community.push(card);
                    self.broadcast(ServerEvent::Turn(card));
                }
                Phase::River => {
                    let card = self.draw();
                    self.community.push(card);
                    self.broadcast(ServerEvent::River(card));
                }
                Phase::Showdown => {
                    self.showdown();
                    return;
                }
                Phase::WaitingForPlayers | Phase::PreFlop => return,
            }

            self.betting
                .open_street(self.registry.players_mut(), self.config.big_blind);
            if !self.betting.betting_exhausted(self.registry.players()) {
                self.to_act = self.seek_from(self.dealer_seat + 1);
                return;
            }
        }
    }

    fn showdown(&mut self) {
        let variant = self.config.deck_variant;
        let contenders: Vec<(usize, HandScore)> = self
            .registry
            .players()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.active)
            .filter_map(|(seat, p)| {
                p.hole_cards
                    .map(|hole| (seat, evaluate(variant, &hole, &self.community)))
            })
            .collect();
        for (seat, score) in &contenders {
            debug!("Seat {} shows {}", seat, score);
        }

        let pot = self.betting.take_pot();
        let resolution = showdown::resolve(pot, &contenders)
            .expect("showdown reached with no contender holding cards");
        self.pay(resolution);
        self.reset();
    }

    fn award_uncontested(&mut self) {
        let pot = self.betting.take_pot();
        match self.registry.players().iter().position(|p| p.active) {
            Some(seat) => self.pay(showdown::uncontested(pot, seat)),
            None => error!("Hand #{} ended with nobody left for {} chips", self.hand_number, pot),
        }
        self.reset();
    }

    fn pay(&mut self, resolution: Resolution) {
        for (seat, amount) in resolution.payouts() {
            self.registry.players_mut()[seat].chips += amount;
        }
        self.record_outcomes(&resolution);

        let event = match resolution {
            Resolution::Uncontested { seat, amount } => {
                info!("Hand #{}: seat {} wins {} uncontested", self.hand_number, seat, amount);
                ServerEvent::PotUncontested {
                    name: self.name_of(seat),
                    amount,
                }
            }
            Resolution::BestHand {
                seat,
                amount,
                score,
            } => {
                info!(
                    "Hand #{}: seat {} wins {} with {}",
                    self.hand_number, seat, amount, score
                );
                ServerEvent::PotWon {
                    name: self.name_of(seat),
                    amount,
                }
            }
            Resolution::Split {
                seats,
                share,
                remainder,
                score,
            } => {
                info!(
                    "Hand #{}: seats {:?} split with {}, {} each, {} odd chips to seat {}",
                    self.hand_number, seats, score, share, remainder, seats[0]
                );
                ServerEvent::PotSplit {
                    names: seats.iter().map(|&seat| self.name_of(seat)).collect(),
                    share,
                }
            }
        };
        self.broadcast(event);
    }

    /// Every player dealt into the hand, folded or not, gets one result.
    fn record_outcomes(&mut self, resolution: &Resolution) {
        for (seat, player) in self.registry.players_mut().iter_mut().enumerate() {
            if player.hole_cards.is_none() {
                continue;
            }
            let outcome = match resolution {
                Resolution::Uncontested { seat: winner, .. }
                | Resolution::BestHand { seat: winner, .. }
                    if *winner == seat =>
                {
                    HandOutcome::Won
                }
                Resolution::Split { seats, .. } if seats.contains(&seat) => HandOutcome::Split,
                _ => HandOutcome::Lost,
            };
            player.stats.record(outcome);
        }
    }

    /// Clears per-hand state, rotates the dealer and frees the seats of
    /// players who left during the hand. Stacks are kept.
    fn reset(&mut self) {
        for player in self.registry.players_mut() {
            player.current_bet = 0;
            player.has_acted = false;
            player.active = false;
            player.hole_cards = None;
        }
        self.community.clear();
        self.betting.open_hand();
        self.to_act = None;
        if !self.registry.is_empty() {
            self.dealer_seat = (self.dealer_seat + 1) % self.registry.len();
        }
        self.release_departed();
        self.phase = Phase::WaitingForPlayers;
        self.broadcast(ServerEvent::Reset);

        if log_enabled!(Level::Debug) {
            match serde_json::to_string(&self.snapshot()) {
                Ok(json) => debug!("Table after hand #{}: {}", self.hand_number, json),
                Err(e) => warn!("Failed to serialize table snapshot: {}", e),
            }
        }
    }
}

#[cfg(test)]
impl PokerGame {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn dealer_seat(&self) -> usize {
        self.dealer_seat
    }

    pub fn to_act(&self) -> Option<usize> {
        self.to_act
    }

    pub fn pot(&self) -> u32 {
        self.betting.pot()
    }

    pub fn community(&self) -> &[Card] {
        &self.community
    }

    pub fn players(&self) -> &[Player] {
        self.registry.players()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn cards(text: &str) -> Vec<Card> {
        text.split_whitespace().map(|c| c.parse().unwrap()).collect()
    }

    /// A table that never starts hands on its own.
    fn table(names: &[&str]) -> (PokerGame, Vec<ConnectionId>, mpsc::UnboundedReceiver<Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = TableConfig {
            min_players: 10,
            ..TableConfig::default()
        };
        let mut game = PokerGame::new(config, tx);
        let connections: Vec<ConnectionId> = names
            .iter()
            .map(|name| {
                let connection = Uuid::new_v4();
                game.join(connection, name).unwrap();
                connection
            })
            .collect();
        (game, connections, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Dispatch>) -> Vec<Dispatch> {
        let mut out = Vec::new();
        while let Ok(dispatch) = rx.try_recv() {
            out.push(dispatch);
        }
        out
    }

    fn broadcasts(rx: &mut mpsc::UnboundedReceiver<Dispatch>) -> Vec<String> {
        drain(rx)
            .into_iter()
            .filter(|d| d.audience == Audience::All)
            .map(|d| d.event.to_string())
            .collect()
    }

    fn act(game: &mut PokerGame, connections: &[ConnectionId], action: PlayerAction) -> ActionReport {
        let seat = game.to_act().expect("someone should be to act");
        game.handle_action(connections[seat], action).unwrap()
    }

    fn check_down(game: &mut PokerGame, connections: &[ConnectionId]) {
        while game.phase().is_betting() {
            act(game, connections, PlayerAction::Check);
        }
    }

    fn total_chips(game: &PokerGame) -> u32 {
        game.pot() + game.players().iter().map(|p| p.chips).sum::<u32>()
    }

    #[test]
    fn test_blinds_follow_dealer_and_dealer_rotates() {
        let (mut game, conns, mut rx) = table(&["a", "b", "c", "d"]);
        drain(&mut rx);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));

        assert_eq!(game.phase(), Phase::PreFlop);
        assert_eq!(game.dealer_seat(), 0);
        assert_eq!(game.players()[1].current_bet, 10);
        assert_eq!(game.players()[2].current_bet, 20);
        assert_eq!(game.pot(), 30);
        assert_eq!(game.to_act(), Some(3));

        act(&mut game, &conns, PlayerAction::Fold);
        act(&mut game, &conns, PlayerAction::Fold);
        act(&mut game, &conns, PlayerAction::Fold);

        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        assert_eq!(game.dealer_seat(), 1);
        assert_eq!(game.players()[2].chips, 1010);
        assert_eq!(game.players()[1].chips, 990);
        assert_eq!(total_chips(&game), 4000);

        let events = broadcasts(&mut rx);
        assert_eq!(events[0], "[GAME] Game started. Preflop betting begins.");
        assert_eq!(events[1], "[BLIND] b posts 10.");
        assert_eq!(events[2], "[BLIND] c posts 20.");
        assert!(events.contains(&"[SHOWDOWN] c wins the pot of 30 chips!".to_string()));
        assert_eq!(events.last().unwrap(), "[RESET] Game reset. Waiting for next hand.");
    }

    #[test]
    fn test_hole_cards_are_unicast() {
        let (mut game, conns, mut rx) = table(&["a", "b"]);
        drain(&mut rx);
        game.start_hand_with(Deck::stacked(cards("2♠ A♥ 3♠ A♦ 4♠ 5♠ 6♠ A♣ A♠")));

        let private: Vec<Dispatch> = drain(&mut rx)
            .into_iter()
            .filter(|d| d.audience != Audience::All)
            .collect();
        assert_eq!(private.len(), 2);
        assert_eq!(private[0].audience, Audience::Player(conns[0]));
        assert_eq!(private[0].event.to_string(), "[YOUR_CARDS] 2♠ 3♠");
        assert_eq!(private[1].audience, Audience::Player(conns[1]));
        assert_eq!(private[1].event.to_string(), "[YOUR_CARDS] A♥ A♦");
    }

    #[test]
    fn test_straight_flush_beats_quads_at_showdown() {
        let (mut game, conns, mut rx) = table(&["alice", "bob"]);
        drain(&mut rx);
        game.start_hand_with(Deck::stacked(cards("2♠ A♥ 3♠ A♦ 4♠ 5♠ 6♠ A♣ A♠")));

        // Heads-up: dealer 0 means bob posts small and alice big.
        assert_eq!(game.to_act(), Some(1));
        act(&mut game, &conns, PlayerAction::Call);
        assert_eq!(game.to_act(), Some(0));
        check_down(&mut game, &conns);

        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        assert_eq!(game.players()[0].chips, 1020);
        assert_eq!(game.players()[1].chips, 980);

        let events = broadcasts(&mut rx);
        assert!(events.contains(&"[FLOP] 4♠, 5♠, 6♠".to_string()));
        assert!(events.contains(&"[TURN] A♣".to_string()));
        assert!(events.contains(&"[RIVER] A♠".to_string()));
        assert!(events.contains(&"[SHOWDOWN] alice wins 40 chips with the best hand!".to_string()));
    }

    #[test]
    fn test_wheel_beats_king_high() {
        let (mut game, conns, _rx) = table(&["alice", "bob"]);
        game.start_hand_with(Deck::stacked(cards("A♠ K♠ 7♠ Q♠ 2♥ 3♦ 4♠ 5♣ 10♠")));
        act(&mut game, &conns, PlayerAction::Call);
        check_down(&mut game, &conns);
        assert_eq!(game.players()[0].chips, 1020);
    }

    #[test]
    fn test_board_plays_splits_pot() {
        let (mut game, conns, mut rx) = table(&["alice", "bob"]);
        drain(&mut rx);
        game.start_hand_with(Deck::stacked(cards("2♣ 2♦ 3♦ 3♣ A♠ K♠ Q♠ J♠ 10♠")));
        act(&mut game, &conns, PlayerAction::Call);
        check_down(&mut game, &conns);

        assert_eq!(game.players()[0].chips, 1000);
        assert_eq!(game.players()[1].chips, 1000);
        for player in game.players() {
            assert_eq!(player.stats.hands_split, 1);
            assert_eq!(player.stats.hands_won, 0);
            assert_eq!(player.stats.win_rate, 0.0);
        }
        let events = broadcasts(&mut rx);
        assert!(events
            .contains(&"[SHOWDOWN] alice and bob split the pot! Each gets 20 chips.".to_string()));
    }

    #[test]
    fn test_out_of_turn_and_idle_actions_rejected() {
        let (mut game, conns, _rx) = table(&["a", "b", "c"]);
        assert_eq!(
            game.handle_action(conns[0], PlayerAction::Check),
            Err(ServerError::NoHandInProgress)
        );
        assert_eq!(
            game.handle_action(Uuid::new_v4(), PlayerAction::Check),
            Err(ServerError::UnknownConnection)
        );

        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        assert_eq!(game.to_act(), Some(0));
        assert_eq!(
            game.handle_action(conns[1], PlayerAction::Call),
            Err(ServerError::NotYourTurn)
        );
        assert_eq!(game.pot(), 30);
        assert_eq!(game.players()[1].current_bet, 10);
    }

    #[test]
    fn test_preflop_ends_only_after_big_blind_option() {
        let (mut game, conns, _rx) = table(&["a", "b", "c"]);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));

        act(&mut game, &conns, PlayerAction::Call);
        act(&mut game, &conns, PlayerAction::Call);
        assert_eq!(game.phase(), Phase::PreFlop);
        assert_eq!(game.to_act(), Some(2));

        assert_eq!(act(&mut game, &conns, PlayerAction::Raise(40)), ActionReport::RaisedBy(40));
        assert_eq!(game.to_act(), Some(0));
        act(&mut game, &conns, PlayerAction::Call);
        act(&mut game, &conns, PlayerAction::Call);

        assert_eq!(game.phase(), Phase::Flop);
        assert_eq!(game.community().len(), 3);
        assert_eq!(game.pot(), 180);
        // First seat after the dealer opens the flop.
        assert_eq!(game.to_act(), Some(1));
    }

    #[test]
    fn test_all_in_runs_out_the_board() {
        let (mut game, conns, mut rx) = table(&["alice", "bob"]);
        drain(&mut rx);
        game.start_hand_with(Deck::stacked(cards("A♠ 2♣ A♦ 7♥ K♣ 9♦ 4♥ J♠ 3♣")));

        assert_eq!(act(&mut game, &conns, PlayerAction::AllIn), ActionReport::AllIn(990));
        assert_eq!(game.to_act(), Some(0));
        assert_eq!(act(&mut game, &conns, PlayerAction::Call), ActionReport::Called(980));

        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        assert_eq!(game.players()[0].chips, 2000);
        assert_eq!(game.players()[1].chips, 0);

        let events = broadcasts(&mut rx);
        let reveals = events
            .iter()
            .filter(|e| e.starts_with("[FLOP]") || e.starts_with("[TURN]") || e.starts_with("[RIVER]"))
            .count();
        assert_eq!(reveals, 3);
        assert!(events.contains(&"[SHOWDOWN] alice wins 2000 chips with the best hand!".to_string()));
    }

    #[test]
    fn test_disconnect_folds_and_passes_turn() {
        let (mut game, conns, mut rx) = table(&["a", "b", "c"]);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        drain(&mut rx);
        assert_eq!(game.to_act(), Some(0));

        // Leaving out of turn does not move the pointer.
        game.disconnect(conns[2]);
        assert!(!game.players()[2].active);
        assert_eq!(game.to_act(), Some(0));

        game.disconnect(conns[0]);
        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        // Both leavers are gone once the hand is over.
        assert_eq!(game.players().len(), 1);
        assert_eq!(game.players()[0].name, "b");
        assert_eq!(game.players()[0].chips, 1020);
        assert_eq!(game.dealer_seat(), 0);

        let events = broadcasts(&mut rx);
        assert_eq!(events[0], "[ACTION] c folds.");
        assert_eq!(events[1], "[ACTION] a folds.");
        assert_eq!(events[2], "[SHOWDOWN] b wins the pot of 30 chips!");
    }

    #[test]
    fn test_join_mid_hand_waits_for_next_hand() {
        let (mut game, conns, _rx) = table(&["a", "b"]);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        let late = Uuid::new_v4();
        assert_eq!(game.join(late, "late"), Ok(2));
        assert!(!game.players()[2].active);
        assert!(game.players()[2].hole_cards.is_none());
        assert_eq!(
            game.handle_action(late, PlayerAction::Check),
            Err(ServerError::PlayerNotActive)
        );
        assert_eq!(game.to_act(), Some(1));
        assert!(game.handle_action(conns[1], PlayerAction::Fold).is_ok());

        assert_eq!(game.players()[0].stats.hands_won, 1);
        assert_eq!(game.players()[1].stats.hands_lost, 1);
        assert_eq!(game.players()[2].stats.hands_played, 0);
    }

    #[test]
    fn test_leaving_between_hands_frees_seat_and_name() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut game = PokerGame::new(
            TableConfig {
                deck_variant: poker_protocol::DeckVariant::Short,
                max_players: 7,
                ..TableConfig::default()
            },
            tx,
        );
        for i in 0..7 {
            let connection = Uuid::new_v4();
            game.join(connection, &format!("p{}", i)).unwrap();
            game.disconnect(connection);
        }
        assert!(game.players().is_empty());

        assert_eq!(game.join(Uuid::new_v4(), "newcomer"), Ok(0));
        assert_eq!(game.join(Uuid::new_v4(), "p0"), Ok(1));
        assert_eq!(game.phase(), Phase::PreFlop);
    }

    #[test]
    fn test_leaving_mid_hand_frees_seat_when_hand_ends() {
        let (mut game, conns, mut rx) = table(&["a", "b", "c", "d"]);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        drain(&mut rx);
        assert_eq!(game.to_act(), Some(3));

        // The small blind leaves; their chips stay in the pot.
        game.disconnect(conns[1]);
        assert_eq!(game.players().len(), 4);
        assert_eq!(game.to_act(), Some(3));
        // The name is free again even though the record is still seated.
        let rejoin = Uuid::new_v4();
        assert_eq!(game.join(rejoin, "b"), Ok(4));

        act(&mut game, &conns, PlayerAction::Fold);
        act(&mut game, &conns, PlayerAction::Fold);
        assert_eq!(game.phase(), Phase::WaitingForPlayers);

        let names: Vec<&str> = game.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "c", "d", "b"]);
        assert_eq!(game.players()[1].chips, 1010);
        // The button moved from a to where b sat, which is now c.
        assert_eq!(game.dealer_seat(), 1);
        assert_eq!(
            game.handle_action(rejoin, PlayerAction::Check),
            Err(ServerError::NoHandInProgress)
        );

        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        assert_eq!(game.players()[2].current_bet, 10);
        assert_eq!(game.players()[3].current_bet, 20);
        assert_eq!(game.to_act(), Some(0));
    }

    #[test]
    fn test_stats_follow_each_hand() {
        let (mut game, conns, _rx) = table(&["alice", "bob"]);
        game.start_hand_with(Deck::stacked(cards("2♠ A♥ 3♠ A♦ 4♠ 5♠ 6♠ A♣ A♠")));
        act(&mut game, &conns, PlayerAction::Call);
        check_down(&mut game, &conns);

        let alice = game.players()[0].stats;
        assert_eq!((alice.hands_played, alice.hands_won, alice.win_rate), (1, 1, 100.0));
        assert_eq!(game.players()[1].stats.hands_lost, 1);

        // Whoever acts first folds; the other takes the blinds.
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        act(&mut game, &conns, PlayerAction::Fold);
        for player in game.players() {
            assert_eq!(player.stats.hands_played, 2);
            assert_eq!(player.stats.hands_won, 1);
            assert_eq!(player.stats.hands_lost, 1);
            assert_eq!(player.stats.win_rate, 50.0);
        }
    }

    #[test]
    fn test_hand_starts_when_threshold_met() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut game = PokerGame::new(
            TableConfig {
                deck_seed: Some(7),
                ..TableConfig::default()
            },
            tx,
        );
        game.join(Uuid::new_v4(), "a").unwrap();
        assert_eq!(game.phase(), Phase::WaitingForPlayers);
        game.join(Uuid::new_v4(), "b").unwrap();
        assert_eq!(game.phase(), Phase::PreFlop);

        let events: Vec<String> = drain(&mut rx).iter().map(|d| d.event.to_string()).collect();
        assert_eq!(events[0], "Player a joined.");
        assert_eq!(events[1], "Player b joined.");
        assert_eq!(events[2], "[GAME] Game started. Preflop betting begins.");
        assert!(game.players().iter().all(|p| p.hole_cards.is_some()));
    }

    #[test]
    fn test_snapshot_hides_hole_cards() {
        let (mut game, _conns, _rx) = table(&["a", "b"]);
        game.start_hand_with(Deck::ordered(poker_protocol::DeckVariant::Full));
        let snapshot = game.snapshot();
        assert_eq!(snapshot.pot, 30);
        assert_eq!(snapshot.phase, Phase::PreFlop);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("hole_cards"));
        assert!(!json.contains("connection"));
        assert!(json.contains("\"hands_played\":0"));
        assert!(json.contains("\"win_rate\""));
    }
}
