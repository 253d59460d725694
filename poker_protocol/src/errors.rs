use thiserror::Error;

/// Malformed or unknown inbound messages. Never changes table state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Empty message")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for '{0}'")]
    MissingArgument(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid card: {0}")]
    InvalidCard(String),
}

/// Rule violations: the command parsed but is illegal in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("Connection has not joined the table")]
    UnknownConnection,

    #[error("Already joined as {0}")]
    AlreadyJoined(String),

    #[error("Name {0} is already taken")]
    NameTaken(String),

    #[error("Invalid player name")]
    InvalidName,

    #[error("Table is full ({0} seats)")]
    TableFull(usize),

    #[error("No hand in progress")]
    NoHandInProgress,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("You are not in this hand")]
    PlayerNotActive,

    #[error("You have already acted at this bet level")]
    AlreadyActed,

    #[error("You have no chips left to act with")]
    NoChips,

    #[error("Cannot check, must call {0}")]
    CannotCheck(u32),

    #[error("Minimum raise is {0}")]
    RaiseBelowMinimum(u32),

    #[error("Action was not reopened, you may only call or fold")]
    ActionNotReopened,

    #[error("Table is closed")]
    TableClosed,
}
