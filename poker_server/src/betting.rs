use crate::registry::Player;
use log::debug;
use poker_protocol::{ActionReport, PlayerAction, ServerError, ServerResult};
use serde::Serialize;

/// Pot and bet-level bookkeeping for one hand.
///
/// Chips only ever move between a player's stack and the pot, so the sum of
/// stacks plus the pot is constant from the first blind to the payout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BettingEngine {
    pot: u32,
    /// Amount every active player must match.
    current_bet: u32,
    /// Smallest legal raise increment.
    last_raise: u32,
}

impl BettingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pot(&self) -> u32 {
        self.pot
    }

    pub fn current_bet(&self) -> u32 {
        self.current_bet
    }

    pub fn open_hand(&mut self) {
        self.pot = 0;
        self.current_bet = 0;
        self.last_raise = 0;
    }

    /// Posts a forced bet, capped at the player's stack. Returns the chips posted.
    pub fn post_blind(&mut self, player: &mut Player, amount: u32) -> u32 {
        let posted = amount.min(player.chips);
        self.commit(player, posted);
        posted
    }

    pub fn set_level(&mut self, current_bet: u32, min_raise: u32) {
        self.current_bet = current_bet;
        self.last_raise = min_raise;
    }

    /// Starts a new betting round. The pot carries over.
    pub fn open_street(&mut self, players: &mut [Player], min_raise: u32) {
        self.set_level(0, min_raise);
        for player in players.iter_mut().filter(|p| p.active) {
            player.current_bet = 0;
            player.has_acted = false;
        }
    }

    pub fn take_pot(&mut self) -> u32 {
        std::mem::take(&mut self.pot)
    }

    /// Whether `player` still owes a response in this round.
    pub fn needs_to_act(&self, player: &Player) -> bool {
        player.active
            && player.chips > 0
            && (!player.has_acted || player.current_bet < self.current_bet)
    }

    /// Applies one action for the player in `seat`. A rejected action leaves
    /// every field untouched.
    pub fn apply(
        &mut self,
        players: &mut [Player],
        seat: usize,
        action: PlayerAction,
    ) -> ServerResult<ActionReport> {
        let player = players.get(seat).ok_or(ServerError::UnknownConnection)?;
        if !player.active {
            return Err(ServerError::PlayerNotActive);
        }
        if player.chips == 0 {
            return Err(ServerError::NoChips);
        }
        if player.has_acted && player.current_bet >= self.current_bet {
            return Err(ServerError::AlreadyActed);
        }

        match action {
            PlayerAction::Check => self.check(&mut players[seat]),
            PlayerAction::Call => Ok(self.call(&mut players[seat])),
            PlayerAction::Raise(amount) => self.raise(players, seat, amount),
            PlayerAction::Fold => Ok(Self::fold(&mut players[seat])),
            PlayerAction::AllIn => Ok(self.all_in(players, seat)),
        }
    }

    fn check(&mut self, player: &mut Player) -> ServerResult<ActionReport> {
        if player.current_bet < self.current_bet {
            return Err(ServerError::CannotCheck(self.current_bet - player.current_bet));
        }
        player.has_acted = true;
        Ok(ActionReport::Checked)
    }

    fn call(&mut self, player: &mut Player) -> ActionReport {
        let owed = self.current_bet.saturating_sub(player.current_bet);
        let amount = owed.min(player.chips);
        self.commit(player, amount);
        player.has_acted = true;
        ActionReport::Called(amount)
    }

    fn raise(
        &mut self,
        players: &mut [Player],
        seat: usize,
        amount: u32,
    ) -> ServerResult<ActionReport> {
        let player = &players[seat];
        // Facing an incomplete all-in raise, a player who already acted may
        // only call or fold.
        if player.has_acted {
            return Err(ServerError::ActionNotReopened);
        }
        if amount < self.last_raise {
            return Err(ServerError::RaiseBelowMinimum(self.last_raise));
        }

        let target = self.current_bet.saturating_add(amount);
        let needed = target - player.current_bet;
        if needed >= player.chips {
            return Ok(self.all_in(players, seat));
        }

        self.commit(&mut players[seat], needed);
        self.current_bet = target;
        self.last_raise = amount;
        Self::reopen(players, seat);
        players[seat].has_acted = true;
        Ok(ActionReport::RaisedBy(needed))
    }

    fn fold(player: &mut Player) -> ActionReport {
        player.active = false;
        player.has_acted = true;
        ActionReport::Folded
    }

    /// Folds a player regardless of turn or acted state. Used when a player
    /// leaves mid-hand.
    pub fn forfeit(&mut self, player: &mut Player) -> Option<ActionReport> {
        if !player.active {
            return None;
        }
        Some(Self::fold(player))
    }

    fn all_in(&mut self, players: &mut [Player], seat: usize) -> ActionReport {
        let already_acted = players[seat].has_acted;
        let amount = players[seat].chips;
        self.commit(&mut players[seat], amount);
        let total = players[seat].current_bet;

        if total > self.current_bet {
            let increment = total - self.current_bet;
            if increment >= self.last_raise && !already_acted {
                self.last_raise = increment;
                Self::reopen(players, seat);
            } else {
                debug!(
                    "under-raise all-in by seat {}: +{} (minimum {})",
                    seat, increment, self.last_raise
                );
            }
            self.current_bet = total;
        }

        players[seat].has_acted = true;
        ActionReport::AllIn(amount)
    }

    /// The round is closed when at most one player still contests the pot,
    /// when every contender with chips has acted and matched the bet, or when
    /// nobody is left to respond to the only contender who can still bet.
    /// All-in players are exempt from matching.
    pub fn round_closed(&self, players: &[Player]) -> bool {
        let contenders: Vec<&Player> = players.iter().filter(|p| p.active).collect();
        if contenders.len() <= 1 {
            return true;
        }

        let can_bet: Vec<&&Player> = contenders.iter().filter(|p| p.chips > 0).collect();
        if can_bet
            .iter()
            .all(|p| p.has_acted && p.current_bet == self.current_bet)
        {
            return true;
        }
        can_bet.len() <= 1 && can_bet.iter().all(|p| p.current_bet >= self.current_bet)
    }

    /// Whether fewer than two contenders can still put chips in.
    pub fn betting_exhausted(&self, players: &[Player]) -> bool {
        players.iter().filter(|p| p.active && p.chips > 0).count() < 2
    }

    fn commit(&mut self, player: &mut Player, amount: u32) {
        player.chips -= amount;
        player.current_bet += amount;
        self.pot += amount;
    }

    fn reopen(players: &mut [Player], raiser: usize) {
        for (seat, player) in players.iter_mut().enumerate() {
            if seat != raiser && player.active {
                player.has_acted = false;
            }
        }
    }
}

#[cfg(test)]
impl BettingEngine {
    pub fn last_raise(&self) -> u32 {
        self.last_raise
    }
}
