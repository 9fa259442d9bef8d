//! Per-connection lifecycle: the bridge between socket lines and typed
//! protocol messages.

use crate::coordinator::Coordinator;
use log::{debug, info, warn};
use shared::{ClientCommand, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Runs one client connection from accept to teardown.
///
/// The first line must decode to a join request with a non-empty name;
/// anything else ends the session before a player exists. After the join,
/// the inbound loop decodes each line and hands it to the coordinator,
/// while a spawned writer task drains the session's outbound queue onto
/// the socket. Reaching the end of this function is the one and only
/// deregistration point, so cleanup runs exactly once per session.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, coordinator: Arc<Coordinator>) {
    let (read_half, write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let name = match lines.next_line().await {
        Ok(Some(line)) => match ClientCommand::parse(&line) {
            Some(ClientCommand::Join { name }) => name,
            _ => {
                warn!("Invalid first message from {}: {:?}", addr, line);
                return;
            }
        },
        Ok(None) => {
            info!("Client {} disconnected before joining", addr);
            return;
        }
        Err(e) => {
            warn!("Read error from {} before join: {}", addr, e);
            return;
        }
    };

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(write_events(write_half, event_rx));

    let player_id = coordinator.join(&name, event_tx).await;

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ClientCommand::parse(&line) {
                Some(command) => coordinator.handle(player_id, command).await,
                None => debug!("Discarding line from player {}: {:?}", player_id, line),
            },
            Ok(None) => {
                info!("Player {} closed the connection", player_id);
                break;
            }
            Err(e) => {
                warn!("Read error from player {}: {}", player_id, e);
                break;
            }
        }
    }

    coordinator.disconnect(player_id).await;
}

/// Drains a session's outbound queue onto its socket.
///
/// Ends when the queue closes (the player was deregistered and the
/// session dropped its sender) or a write fails; a failed write is never
/// retried and never touches any other session.
async fn write_events(
    mut write_half: OwnedWriteHalf,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        let mut line = event.to_line();
        line.push('\n');
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            debug!("Write failed, closing outbound flow: {}", e);
            break;
        }
    }
}
