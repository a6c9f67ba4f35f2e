//! Bridge between connections and the world engine.
//!
//! The session owns the [`World`] and the [`ClientManager`]. It is driven by
//! the tick loop alone, so connection tasks never touch world state directly:
//! they hand their events over as [`ServerMessage`]s.

use crate::client_manager::{Client, ClientManager, ClientSender, ConnectionId};
use crate::network::ServerMessage;
use crate::world::World;
use log::{debug, warn};
use shared::{encode_line, ControlCommand, EntityId, Handshake, ProtocolError, WireRecord};
use std::net::SocketAddr;

pub struct Session {
    world: World,
    clients: ClientManager,
}

impl Session {
    pub fn new(world: World) -> Self {
        Self {
            world,
            clients: ClientManager::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Dispatches one event from a connection task.
    pub fn handle(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Join {
                connection,
                addr,
                name,
                sender,
            } => {
                if let Err(e) = self.join(connection, addr, &name, sender) {
                    warn!("Join from {} failed: {}", addr, e);
                }
            }
            ServerMessage::Command { connection, line } => {
                self.ingest(connection, &line);
            }
            ServerMessage::Disconnected { connection } => {
                self.disconnect(connection);
            }
        }
    }

    /// Registers a tank for the connection and sends it the handshake: its
    /// player id, the world size and every wall.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        addr: SocketAddr,
        name: &str,
        sender: ClientSender,
    ) -> Result<EntityId, ProtocolError> {
        // Nothing is registered until the handshake has been encoded.
        let handshake = Handshake {
            player_id: self.world.next_tank_id(),
            world_size: self.world.size() as u32,
        };
        let text = handshake.encode(self.world.walls())?;
        let player_id = self.world.add_tank(name);

        let client = Client::new(connection, player_id, name, addr, sender);
        if !client.send(&text) {
            debug!("Connection {} closed before its handshake", connection);
        }
        self.clients.add_client(client);
        Ok(player_id)
    }

    /// Decodes one gameplay line into the player's latest command. Malformed
    /// lines are dropped and the previous command stays in effect.
    pub fn ingest(&mut self, connection: ConnectionId, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        match ControlCommand::decode(line) {
            Ok(command) => self.clients.set_command(connection, command),
            Err(e) => {
                debug!("Dropping command from connection {}: {}", connection, e);
                false
            }
        }
    }

    /// Forgets the connection and turns its tank into a disconnected corpse.
    /// The tank is dropped after the next broadcast has reported it.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        if let Some(client) = self.clients.remove_client(connection) {
            self.world.disconnect_tank(client.player_id);
        }
    }

    /// Runs one world tick with the latest command of every player.
    pub fn step(&mut self) {
        let commands = self.clients.take_commands();
        self.world.update(&commands);
    }

    /// Serializes the current world, sends it to every client, then purges
    /// whatever the frame reported as gone. Returns the frame text.
    pub fn broadcast(&mut self) -> Result<String, ProtocolError> {
        let frame = encode_frame(&self.world)?;

        let closed = if frame.is_empty() {
            Vec::new()
        } else {
            self.clients.broadcast(&frame)
        };
        let purged = self.world.purge_reported();
        if !purged.tanks.is_empty() || purged.projectiles > 0 || purged.powerups > 0 {
            debug!(
                "Tick {}: purged tanks {:?}, {} projectiles, {} powerups",
                self.world.tick(),
                purged.tanks,
                purged.projectiles,
                purged.powerups
            );
        }

        for connection in closed {
            self.disconnect(connection);
        }
        Ok(frame)
    }
}

/// One line per tank, projectile, powerup and beam currently in the world.
pub fn encode_frame(world: &World) -> Result<String, ProtocolError> {
    let mut frame = String::new();
    for tank in world.tanks() {
        frame.push_str(&encode_line(tank)?);
    }
    for proj in world.projectiles() {
        frame.push_str(&encode_line(proj)?);
    }
    for powerup in world.powerups() {
        frame.push_str(&encode_line(powerup)?);
    }
    for beam in world.beams() {
        frame.push_str(&encode_line(beam)?);
    }
    Ok(frame)
}

/// Parses a frame back into records, skipping lines that fail to decode.
pub fn decode_frame(frame: &str) -> Vec<WireRecord> {
    frame
        .lines()
        .filter_map(|line| WireRecord::decode(line).ok())
        .collect()
}
