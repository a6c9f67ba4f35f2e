//! Connected-client bookkeeping for the arena server
//!
//! This module tracks, per TCP connection:
//! - Which player (tank) the connection controls once it has joined
//! - The outbound queue used to deliver handshake and broadcast text
//! - The latest undelivered command for that player
//!
//! Commands are not queued. A newer command overwrites the older one, and the
//! tick loop drains the whole table at the start of every step.

use log::{info, warn};
use shared::{ControlCommand, EntityId};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Transport-assigned identity of one TCP connection.
pub type ConnectionId = u64;

/// Outbound text queue feeding a connection's writer task.
pub type ClientSender = mpsc::Sender<String>;
pub type ClientReceiver = mpsc::Receiver<String>;

/// Frames a connection may have queued before it counts as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Creates the outbound queue for a new connection.
pub fn outbound_channel() -> (ClientSender, ClientReceiver) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// A connection that has completed the join handshake
#[derive(Debug)]
pub struct Client {
    pub connection: ConnectionId,
    /// Tank controlled by this connection
    pub player_id: EntityId,
    pub name: String,
    pub addr: SocketAddr,
    sender: ClientSender,
}

impl Client {
    pub fn new(
        connection: ConnectionId,
        player_id: EntityId,
        name: impl Into<String>,
        addr: SocketAddr,
        sender: ClientSender,
    ) -> Self {
        Self {
            connection,
            player_id,
            name: name.into(),
            addr,
            sender,
        }
    }

    /// Queues text for the writer task. Returns false once the writer is
    /// gone or has fallen a full queue behind.
    pub fn send(&self, text: &str) -> bool {
        match self.sender.try_send(text.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Client {} (player {}) is not reading, dropping it",
                    self.connection, self.player_id
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Latest command per player, overwritten on every decode.
#[derive(Debug, Default)]
pub struct CommandTable {
    latest: HashMap<EntityId, ControlCommand>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, player_id: EntityId, command: ControlCommand) {
        self.latest.insert(player_id, command);
    }

    pub fn remove(&mut self, player_id: EntityId) {
        self.latest.remove(&player_id);
    }

    pub fn get(&self, player_id: EntityId) -> Option<&ControlCommand> {
        self.latest.get(&player_id)
    }

    /// Hands every pending command to the caller and leaves the table empty.
    pub fn drain(&mut self) -> HashMap<EntityId, ControlCommand> {
        std::mem::take(&mut self.latest)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Manages the set of joined connections and their pending commands
pub struct ClientManager {
    clients: BTreeMap<ConnectionId, Client>,
    commands: CommandTable,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            commands: CommandTable::new(),
        }
    }

    /// Registers a joined connection.
    pub fn add_client(&mut self, client: Client) {
        info!(
            "Client {} from {} joined as player {} ({:?})",
            client.connection, client.addr, client.player_id, client.name
        );
        self.clients.insert(client.connection, client);
    }

    /// Removes a connection and any command it left behind.
    pub fn remove_client(&mut self, connection: ConnectionId) -> Option<Client> {
        let client = self.clients.remove(&connection)?;
        self.commands.remove(client.player_id);
        info!(
            "Client {} (player {}) disconnected",
            connection, client.player_id
        );
        Some(client)
    }

    pub fn player_for(&self, connection: ConnectionId) -> Option<EntityId> {
        self.clients.get(&connection).map(|c| c.player_id)
    }

    /// Stores `command` as the latest intent of the connection's player.
    /// Returns false if the connection has not joined.
    pub fn set_command(&mut self, connection: ConnectionId, command: ControlCommand) -> bool {
        match self.player_for(connection) {
            Some(player_id) => {
                self.commands.set(player_id, command);
                true
            }
            None => false,
        }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn take_commands(&mut self) -> HashMap<EntityId, ControlCommand> {
        self.commands.drain()
    }

    /// Sends `text` to every joined connection and returns the ones whose
    /// writer has shut down or stalled.
    pub fn broadcast(&self, text: &str) -> Vec<ConnectionId> {
        self.clients
            .values()
            .filter(|client| !client.send(text))
            .map(|client| client.connection)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{FireMode, MoveDirection, Vector2D};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_client(
        connection: ConnectionId,
        player_id: EntityId,
    ) -> (Client, ClientReceiver) {
        let (tx, rx) = outbound_channel();
        (
            Client::new(connection, player_id, "tester", test_addr(), tx),
            rx,
        )
    }

    fn up() -> ControlCommand {
        ControlCommand::new(MoveDirection::Up, FireMode::None, Vector2D::UP)
    }

    fn down() -> ControlCommand {
        ControlCommand::new(MoveDirection::Down, FireMode::Main, Vector2D::DOWN)
    }

    #[test]
    fn test_client_send() {
        let (client, mut rx) = test_client(1, 0);
        assert!(client.send("hello\n"));
        assert_eq!(rx.try_recv().unwrap(), "hello\n");

        drop(rx);
        assert!(!client.send("again\n"));
    }

    #[test]
    fn test_client_send_fails_when_queue_is_full() {
        let (tx, mut rx) = mpsc::channel(2);
        let client = Client::new(1, 0, "slow", test_addr(), tx);

        assert!(client.send("one\n"));
        assert!(client.send("two\n"));
        assert!(!client.send("three\n"));

        assert_eq!(rx.try_recv().unwrap(), "one\n");
        assert!(client.send("four\n"));
    }

    #[test]
    fn test_command_table_overwrites() {
        let mut table = CommandTable::new();
        table.set(3, up());
        table.set(3, down());

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(3), Some(&down()));

        let drained = table.drain();
        assert_eq!(drained.len(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_add_and_remove_client() {
        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(7, 2);
        manager.add_client(client);

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.player_for(7), Some(2));
        assert!(manager.set_command(7, up()));

        let removed = manager.remove_client(7).unwrap();
        assert_eq!(removed.player_id, 2);
        assert!(manager.is_empty());
        assert!(manager.commands().is_empty());
        assert!(manager.remove_client(7).is_none());
    }

    #[test]
    fn test_command_for_unknown_connection() {
        let mut manager = ClientManager::new();
        assert!(!manager.set_command(99, up()));
        assert!(manager.take_commands().is_empty());
    }

    #[test]
    fn test_latest_command_wins() {
        let mut manager = ClientManager::new();
        let (client, _rx) = test_client(1, 0);
        manager.add_client(client);

        manager.set_command(1, up());
        manager.set_command(1, down());

        let commands = manager.take_commands();
        assert_eq!(commands.get(&0), Some(&down()));
        assert!(manager.take_commands().is_empty());
    }

    #[test]
    fn test_broadcast_reports_closed_writers() {
        let mut manager = ClientManager::new();
        let (a, mut rx_a) = test_client(1, 0);
        let (b, rx_b) = test_client(2, 1);
        manager.add_client(a);
        manager.add_client(b);
        drop(rx_b);

        let failed = manager.broadcast("frame\n");
        assert_eq!(failed, vec![2]);
        assert_eq!(rx_a.try_recv().unwrap(), "frame\n");
    }

    #[test]
    fn test_broadcast_reports_stalled_readers() {
        let mut manager = ClientManager::new();
        let (reader, mut rx_reader) = test_client(1, 0);
        let (stalled, _rx_stalled) = test_client(2, 1);
        manager.add_client(reader);
        manager.add_client(stalled);

        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            assert!(manager.broadcast("frame\n").is_empty());
            rx_reader.try_recv().unwrap();
        }
        assert_eq!(manager.broadcast("frame\n"), vec![2]);
    }
}
