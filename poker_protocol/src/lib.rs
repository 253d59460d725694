use std::fmt;

mod errors;
mod types;

pub use errors::{ProtocolError, ServerError};
pub use types::{Card, DeckVariant, HandRank, Phase, Rank, Suit};
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// A betting decision. `bet <n>` and `raise <n>` both arrive as `Raise(n)`,
/// where `n` is the increment over the table's current bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Check,
    Call,
    Raise(u32),
    Fold,
    AllIn,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayerAction::Check => write!(f, "check"),
            PlayerAction::Call => write!(f, "call"),
            PlayerAction::Raise(amount) => write!(f, "raise {}", amount),
            PlayerAction::Fold => write!(f, "fold"),
            PlayerAction::AllIn => write!(f, "allin"),
        }
    }
}

/// An inbound text command. The sender's identity comes from the connection,
/// never from the message body; only `join` carries a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Join(String),
    Action(PlayerAction),
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut parts = text.split_whitespace();
        let command = parts.next().ok_or(ProtocolError::Empty)?;

        match command.to_ascii_lowercase().as_str() {
            "join" => parts
                .next()
                .map(|name| ClientCommand::Join(name.to_string()))
                .ok_or(ProtocolError::MissingArgument("join")),
            "check" => Ok(ClientCommand::Action(PlayerAction::Check)),
            "call" => Ok(ClientCommand::Action(PlayerAction::Call)),
            "fold" => Ok(ClientCommand::Action(PlayerAction::Fold)),
            "allin" => Ok(ClientCommand::Action(PlayerAction::AllIn)),
            "bet" | "raise" => {
                let raw = parts
                    .next()
                    .ok_or(ProtocolError::MissingArgument("raise"))?;
                let amount = raw
                    .parse::<u32>()
                    .map_err(|_| ProtocolError::InvalidAmount(raw.to_string()))?;
                Ok(ClientCommand::Action(PlayerAction::Raise(amount)))
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// What an accepted action did, as reported to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionReport {
    Checked,
    Called(u32),
    RaisedBy(u32),
    Folded,
    AllIn(u32),
}

/// Outbound engine events. `Display` renders the exact wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    PlayerJoined {
        name: String,
    },
    GameStarted,
    BlindPosted {
        name: String,
        amount: u32,
    },
    Action {
        name: String,
        report: ActionReport,
    },
    Flop([Card; 3]),
    Turn(Card),
    River(Card),
    /// Everyone else folded.
    PotUncontested {
        name: String,
        amount: u32,
    },
    PotWon {
        name: String,
        amount: u32,
    },
    PotSplit {
        names: Vec<String>,
        share: u32,
    },
    Reset,
    /// Unicast only.
    YourCards(Card, Card),
    /// Unicast only: private notice of a rejected command.
    Rejected(String),
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerEvent::PlayerJoined { name } => write!(f, "Player {} joined.", name),
            ServerEvent::GameStarted => write!(f, "[GAME] Game started. Preflop betting begins."),
            ServerEvent::BlindPosted { name, amount } => {
                write!(f, "[BLIND] {} posts {}.", name, amount)
            }
            ServerEvent::Action { name, report } => match report {
                ActionReport::Checked => write!(f, "[ACTION] {} checks.", name),
                ActionReport::Called(amount) => write!(f, "[ACTION] {} calls {}.", name, amount),
                ActionReport::RaisedBy(amount) => {
                    write!(f, "[ACTION] {} raises by {}.", name, amount)
                }
                ActionReport::Folded => write!(f, "[ACTION] {} folds.", name),
                ActionReport::AllIn(amount) => {
                    write!(f, "[ACTION] {} goes all-in with {}.", name, amount)
                }
            },
            ServerEvent::Flop([a, b, c]) => write!(f, "[FLOP] {}, {}, {}", a, b, c),
            ServerEvent::Turn(card) => write!(f, "[TURN] {}", card),
            ServerEvent::River(card) => write!(f, "[RIVER] {}", card),
            ServerEvent::PotUncontested { name, amount } => {
                write!(f, "[SHOWDOWN] {} wins the pot of {} chips!", name, amount)
            }
            ServerEvent::PotWon { name, amount } => {
                write!(f, "[SHOWDOWN] {} wins {} chips with the best hand!", name, amount)
            }
            ServerEvent::PotSplit { names, share } => write!(
                f,
                "[SHOWDOWN] {} split the pot! Each gets {} chips.",
                names.join(" and "),
                share
            ),
            ServerEvent::Reset => write!(f, "[RESET] Game reset. Waiting for next hand."),
            ServerEvent::YourCards(a, b) => write!(f, "[YOUR_CARDS] {} {}", a, b),
            ServerEvent::Rejected(reason) => write!(f, "[ERROR] {}", reason),
        }
    }
}
