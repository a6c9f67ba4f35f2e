//! TCP transport for the arena server
//!
//! Every accepted connection gets two tasks: a reader that splits the byte
//! stream into newline-terminated lines, and a writer that drains an outbound
//! text queue into the socket. Readers never touch game state. They forward
//! what they read to the tick loop as [`ServerMessage`]s.

use crate::client_manager::{outbound_channel, ClientReceiver, ClientSender, ConnectionId};
use log::{debug, error, info, warn};
use shared::{read_line, ProtocolError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Events sent from connection tasks to the tick loop
#[derive(Debug)]
pub enum ServerMessage {
    /// First complete line on a connection: the player's name.
    Join {
        connection: ConnectionId,
        addr: SocketAddr,
        name: String,
        sender: ClientSender,
    },
    /// One gameplay line, not yet decoded.
    Command {
        connection: ConnectionId,
        line: String,
    },
    /// The connection closed or failed after joining.
    Disconnected { connection: ConnectionId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingName,
    Playing,
}

/// Accepts connections and spawns their reader/writer tasks
pub struct Server {
    listener: TcpListener,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    next_connection: ConnectionId,
}

impl Server {
    pub async fn bind(
        addr: &str,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            server_tx,
            next_connection: 1,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Returns only when the tick loop has gone away.
    pub async fn run(mut self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let connection = self.next_connection;
                    self.next_connection += 1;
                    debug!("Connection {} accepted from {}", connection, addr);

                    let server_tx = self.server_tx.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, connection, server_tx).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }

            if self.server_tx.is_closed() {
                info!("Tick loop stopped, closing listener");
                break;
            }
        }
    }
}

/// Services one connection until it closes.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    let (read_half, write_half) = stream.into_split();
    let (out_tx, out_rx) = outbound_channel();
    tokio::spawn(write_loop(write_half, out_rx, connection));

    let phase = read_loop(read_half, addr, connection, out_tx, &server_tx).await;

    if phase == Phase::Playing {
        let _ = server_tx.send(ServerMessage::Disconnected { connection });
    } else {
        debug!("Connection {} closed before joining", connection);
    }
}

/// Reads until EOF or error. Returns how far the connection got.
async fn read_loop(
    read_half: OwnedReadHalf,
    addr: SocketAddr,
    connection: ConnectionId,
    out_tx: ClientSender,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Phase {
    let mut reader = BufReader::new(read_half);
    let mut phase = Phase::AwaitingName;
    let mut sender = Some(out_tx);

    loop {
        let line = match read_line(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return phase,
            Err(ProtocolError::LineTooLong(limit)) => {
                warn!(
                    "Connection {} from {} sent a line over {} bytes, closing it",
                    connection, addr, limit
                );
                return phase;
            }
            Err(e) => {
                debug!("Read error on connection {}: {}", connection, e);
                return phase;
            }
        };

        let message = match phase {
            Phase::AwaitingName => match sender.take() {
                Some(sender) => {
                    phase = Phase::Playing;
                    ServerMessage::Join {
                        connection,
                        addr,
                        name: line,
                        sender,
                    }
                }
                None => continue,
            },
            Phase::Playing => ServerMessage::Command { connection, line },
        };

        if server_tx.send(message).is_err() {
            return phase;
        }
    }
}

/// Drains queued text into the socket until the queue closes or a write fails.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut out_rx: ClientReceiver,
    connection: ConnectionId,
) {
    while let Some(text) = out_rx.recv().await {
        if let Err(e) = write_half.write_all(text.as_bytes()).await {
            debug!("Write error on connection {}: {}", connection, e);
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
