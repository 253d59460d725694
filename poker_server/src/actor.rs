//! The table actor: one task owns the game and applies commands in arrival order.

use crate::config::TableConfig;
use crate::game::{EventSender, PokerGame, TableSnapshot};
use crate::registry::ConnectionId;
use log::{debug, info, warn};
use poker_protocol::{ActionReport, PlayerAction, ServerError, ServerResult};
use tokio::sync::{mpsc, oneshot};

const INBOX_CAPACITY: usize = 100;

/// Commands accepted by the table actor.
#[derive(Debug)]
pub enum TableCommand {
    Join {
        connection: ConnectionId,
        name: String,
        response: oneshot::Sender<ServerResult<usize>>,
    },
    Act {
        connection: ConnectionId,
        action: PlayerAction,
        response: oneshot::Sender<ServerResult<ActionReport>>,
    },
    /// Fire and forget: the connection is already gone.
    Disconnect { connection: ConnectionId },
    Snapshot {
        response: oneshot::Sender<TableSnapshot>,
    },
}

/// Cloneable sender side of the table inbox.
#[derive(Debug, Clone)]
pub struct TableHandle {
    sender: mpsc::Sender<TableCommand>,
}

impl TableHandle {
    async fn request<T>(
        &self,
        command: TableCommand,
        response: oneshot::Receiver<T>,
    ) -> Result<T, ServerError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ServerError::TableClosed)?;
        response.await.map_err(|_| ServerError::TableClosed)
    }

    pub async fn join(&self, connection: ConnectionId, name: String) -> ServerResult<usize> {
        let (response, rx) = oneshot::channel();
        self.request(
            TableCommand::Join {
                connection,
                name,
                response,
            },
            rx,
        )
        .await?
    }

    pub async fn act(
        &self,
        connection: ConnectionId,
        action: PlayerAction,
    ) -> ServerResult<ActionReport> {
        let (response, rx) = oneshot::channel();
        self.request(
            TableCommand::Act {
                connection,
                action,
                response,
            },
            rx,
        )
        .await?
    }

    pub async fn disconnect(&self, connection: ConnectionId) {
        if self
            .sender
            .send(TableCommand::Disconnect { connection })
            .await
            .is_err()
        {
            debug!("Table closed before disconnect of {}", connection);
        }
    }

    pub async fn snapshot(&self) -> ServerResult<TableSnapshot> {
        let (response, rx) = oneshot::channel();
        self.request(TableCommand::Snapshot { response }, rx).await
    }
}

/// Owns the `PokerGame`. Nothing else can reach it, so commands never race.
pub struct TableActor {
    game: PokerGame,
    inbox: mpsc::Receiver<TableCommand>,
}

impl TableActor {
    pub fn new(config: TableConfig, events: EventSender) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let actor = Self {
            game: PokerGame::new(config, events),
            inbox,
        };
        (actor, TableHandle { sender })
    }

    /// Runs until every handle is dropped.
    pub async fn run(mut self) {
        info!("Table starting");
        while let Some(command) = self.inbox.recv().await {
            self.handle(command);
        }
        info!("Table closed");
    }

    fn handle(&mut self, command: TableCommand) {
        match command {
            TableCommand::Join {
                connection,
                name,
                response,
            } => {
                let result = self.game.join(connection, &name);
                if let Err(e) = &result {
                    warn!("Join as '{}' rejected: {}", name, e);
                }
                let _ = response.send(result);
            }
            TableCommand::Act {
                connection,
                action,
                response,
            } => {
                let result = self.game.handle_action(connection, action);
                if let Err(e) = &result {
                    warn!("Action '{}' from {} rejected: {}", action, connection, e);
                }
                let _ = response.send(result);
            }
            TableCommand::Disconnect { connection } => self.game.disconnect(connection),
            TableCommand::Snapshot { response } => {
                let _ = response.send(self.game.snapshot());
            }
        }
    }
}
