mod actor;
mod betting;
mod config;
mod deck;
mod eval;
mod game;
mod registry;
mod server;
mod showdown;

use crate::actor::{TableActor, TableHandle};
use crate::config::ServerConfig;
use crate::registry::ConnectionId;
use crate::server::PokerServer;
use anyhow::Context;
use futures::stream::StreamExt;
use futures::SinkExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use poker_protocol::{ClientCommand, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

pub const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        };

        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        "Poker server listening on: {} ({} deck, blinds {}/{})",
        config.bind, config.table.deck_variant, config.table.small_blind, config.table.big_blind
    );

    let server = Arc::new(Mutex::new(PokerServer::new()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (table, handle) = TableActor::new(config.table.clone(), events_tx);
    let table_task = tokio::spawn(table.run());
    let dispatch_task = tokio::spawn(server::run_dispatcher(Arc::clone(&server), events_rx));

    let mut active_connections: Vec<tokio::task::JoinHandle<()>> = Vec::new();
    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                info!(
                    "New client connected: {} ({} open)",
                    addr,
                    server.lock().connection_count()
                );

                let server = Arc::clone(&server);
                let handle = handle.clone();
                let max_message_size = config.max_message_size;
                active_connections.retain(|task| !task.is_finished());
                active_connections.push(tokio::spawn(async move {
                    if let Err(e) =
                        handle_connection(stream, addr, server, handle, max_message_size).await
                    {
                        error!("Error handling connection {}: {:#}", addr, e);
                    }
                }));
            }
        }
    }

    info!("Shutdown signal received, closing {} connections", active_connections.len());
    let deadline = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
    for task in active_connections {
        task.abort();
        let _ = tokio::time::timeout(deadline, task).await;
    }

    match handle.snapshot().await {
        Ok(snapshot) => {
            info!("Closing table after {} hands", snapshot.hand_number);
            match serde_json::to_string(&snapshot) {
                Ok(json) => debug!("Final table state: {}", json),
                Err(e) => warn!("Failed to serialize table snapshot: {}", e),
            }
        }
        Err(e) => warn!("Table unavailable at shutdown: {}", e),
    }

    // Dropping the last handle stops the table, which stops the dispatcher.
    drop(handle);
    if tokio::time::timeout(deadline, table_task).await.is_err() {
        warn!("Table did not stop within {}s", SHUTDOWN_TIMEOUT_SECS);
    }
    let _ = tokio::time::timeout(deadline, dispatch_task).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Private rejection notice, routed like any other event.
fn reject(server: &Mutex<PokerServer>, connection: &ConnectionId, reason: String) {
    server
        .lock()
        .send_to_player(connection, ServerEvent::Rejected(reason).to_string());
}

async fn handle_command(
    text: &str,
    connection: ConnectionId,
    server: &Mutex<PokerServer>,
    handle: &TableHandle,
) {
    let command = match ClientCommand::parse(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Bad message from {}: {}", connection, e);
            reject(server, &connection, e.to_string());
            return;
        }
    };

    let result = match command {
        ClientCommand::Join(name) => handle.join(connection, name).await.map(|_| ()),
        ClientCommand::Action(action) => handle.act(connection, action).await.map(|_| ()),
    };
    if let Err(e) = result {
        reject(server, &connection, e.to_string());
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server: Arc<Mutex<PokerServer>>,
    handle: TableHandle,
    max_message_size: usize,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .context("WebSocket handshake failed")?;
    let connection: ConnectionId = Uuid::new_v4();
    debug!("WebSocket handshake completed for {} as {}", addr, connection);

    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = write.send(Message::Text(line.into())).await {
                debug!("Failed to send message: {}", e);
                break;
            }
        }
    });

    server.lock().register_connection(connection, tx);

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if text.len() > max_message_size {
                    warn!("Message from {} too large: {} bytes", connection, text.len());
                    reject(&server, &connection, "Message too large".to_string());
                    continue;
                }
                debug!("Received from {}: {}", connection, text.as_str());
                handle_command(text.as_str(), connection, &server, &handle).await;
            }
            Ok(Message::Close(_)) => {
                debug!("Client {} closed the connection", connection);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error from {}: {}", connection, e);
                break;
            }
        }
    }

    handle.disconnect(connection).await;
    server.lock().unregister_connection(&connection);
    write_task.abort();
    info!("Client {} disconnected", addr);
    Ok(())
}
