//! Live-client table and message delivery for the multiplayer server
//!
//! This module owns the mapping from client identity to connection handle:
//! - Identity allocation (monotonic from 0, never reused)
//! - Registration, which always sends `Initialize` before anything else
//! - Unicast, broadcast and broadcast-excluding sends
//! - Routing of the [`GameMessage`]s produced by the simulation
//!
//! A broadcast encodes its frame once and hands the same bytes to every
//! connection. A failed send to one client never stops the others.

use crate::game::GameMessage;
use log::{debug, info, warn};
use shared::message::{Initialize, Message};
use shared::{encode_frame, ClientId, Connection};
use std::collections::BTreeMap;

/// Manages all connected clients and outbound message routing
pub struct ClientManager {
    /// Connected clients indexed by their identity
    clients: BTreeMap<ClientId, Connection>,
    /// Next identity to hand out
    next_client_id: ClientId,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 0,
        }
    }

    /// Reserves the next identity for a connection about to be spawned
    pub fn allocate_id(&mut self) -> ClientId {
        let id = self.next_client_id;
        self.next_client_id += 1;
        id
    }

    /// Registers a running connection and sends it `Initialize` first
    ///
    /// Returns false if the identity is already in the table.
    pub fn add_client(&mut self, connection: Connection) -> bool {
        let id = connection.id();
        if self.clients.contains_key(&id) {
            warn!("Client {} is already registered", id);
            return false;
        }

        connection.send(&Initialize { id }.into());
        info!("Client {} connected", id);
        self.clients.insert(id, connection);
        true
    }

    /// Drops a client from the table
    ///
    /// Returns the connection if it was present, so callers can tell whether
    /// the game-level disconnect still has to run.
    pub fn remove_client(&mut self, id: ClientId) -> Option<Connection> {
        let removed = self.clients.remove(&id);
        if removed.is_some() {
            info!("Client {} disconnected", id);
        }
        removed
    }

    /// Asks a client's connection to close
    ///
    /// The table entry stays until the connection reports `Disconnected`.
    pub fn disconnect(&self, id: ClientId) -> bool {
        match self.clients.get(&id) {
            Some(connection) => connection.close(),
            None => false,
        }
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn get(&self, id: ClientId) -> Option<&Connection> {
        self.clients.get(&id)
    }

    /// Identities of all registered clients in ascending order
    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Sends to a single client. Unknown identities are ignored.
    pub fn send_to(&self, id: ClientId, message: &Message) -> bool {
        match self.clients.get(&id) {
            Some(connection) => connection.send(message),
            None => {
                debug!("Dropping {:?} for unknown client {}", message.message_type(), id);
                false
            }
        }
    }

    /// Sends to every client. Returns how many accepted the frame.
    pub fn send_to_all(&self, message: &Message) -> usize {
        self.broadcast(message, None)
    }

    /// Sends to every client except `exclude`
    pub fn send_to_all_excluding(&self, exclude: ClientId, message: &Message) -> usize {
        self.broadcast(message, Some(exclude))
    }

    fn broadcast(&self, message: &Message, exclude: Option<ClientId>) -> usize {
        let frame = encode_frame(message);
        self.clients
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .filter(|(_, connection)| connection.send_frame(frame.clone()))
            .count()
    }

    /// Routes simulation output to the addressed clients in order
    pub fn deliver(&self, messages: impl IntoIterator<Item = GameMessage>) {
        for message in messages {
            match message {
                GameMessage::SendMessage { to, message } => {
                    self.send_to(to, &message);
                }
                GameMessage::BroadcastMessage { message, exclude } => {
                    self.broadcast(&message, exclude);
                }
            }
        }
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
