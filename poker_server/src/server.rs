use crate::game::{Audience, Dispatch};
use crate::registry::ConnectionId;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Routes rendered lines to connection writers.
///
/// Each connection gets one unbounded queue drained by its writer task, so
/// lines reach a client in the order the table produced them.
#[derive(Debug, Default)]
pub struct PokerServer {
    connections: HashMap<ConnectionId, UnboundedSender<String>>,
}

impl PokerServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(&mut self, connection: ConnectionId, sender: UnboundedSender<String>) {
        self.connections.insert(connection, sender);
    }

    pub fn unregister_connection(&mut self, connection: &ConnectionId) -> bool {
        self.connections.remove(connection).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn send_to_player(&self, connection: &ConnectionId, message: String) {
        if let Some(sender) = self.connections.get(connection) {
            if sender.send(message).is_err() {
                debug!("Writer for {} already closed", connection);
            }
        }
    }

    pub fn broadcast(&self, message: &str) {
        for (connection, sender) in &self.connections {
            if sender.send(message.to_string()).is_err() {
                debug!("Writer for {} already closed", connection);
            }
        }
    }

    pub fn dispatch(&self, dispatch: Dispatch) {
        let line = dispatch.event.to_string();
        match dispatch.audience {
            Audience::All => self.broadcast(&line),
            Audience::Player(connection) => self.send_to_player(&connection, line),
        }
    }
}

/// Forwards table events to connections until the table drops its sender.
pub async fn run_dispatcher(server: Arc<Mutex<PokerServer>>, mut events: UnboundedReceiver<Dispatch>) {
    while let Some(dispatch) = events.recv().await {
        server.lock().dispatch(dispatch);
    }
    info!("Event dispatcher stopped");
}
