//! Registry actor implementation
//!
//! The central actor that owns the mapping of connected users. All
//! registry reads and writes go through its event loop, so no lock is
//! needed: events are processed one at a time, in receipt order, and
//! message delivery to each recipient happens in that same order.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::AppError;
use crate::message::Message;
use crate::types::UserName;

/// Events sent from connection handlers to the registry actor
#[derive(Debug)]
pub enum RegistryEvent {
    /// Deliver a formatted line, directed or broadcast
    Deliver(Message),
    /// Register a newly connected client
    Admit {
        client: Client,
        reply: oneshot::Sender<Admission>,
    },
    /// Forcibly remove a client and close its connection
    Kick { name: UserName },
    /// Voluntary leave; the handler closes the connection itself
    Remove { name: UserName },
    /// Read-only snapshot of the registry for command handling
    Roster {
        reply: oneshot::Sender<Vec<RosterEntry>>,
    },
}

/// Reply to an `Admit` event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted; `is_admin` is true for the first client ever admitted
    Admitted { is_admin: bool },
    /// Another client is already registered under this name
    NameTaken,
}

/// One row of the registry snapshot served to commands
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub name: UserName,
    pub addr: std::net::SocketAddr,
    pub connected_at: chrono::DateTime<chrono::Local>,
}

/// The registry actor
///
/// Owns the only mapping from user name to connected client; membership
/// in that map is the single source of truth for "currently connected".
/// Reachable solely through `RegistryEvent` messages.
pub struct Registry {
    /// All connected clients, keyed by display name
    clients: HashMap<UserName, Client>,
    /// Set when the first client ever is admitted and never reset, so
    /// the admin role is not handed out again after the admin leaves
    admin_assigned: bool,
    /// Event receiver channel
    events: mpsc::Receiver<RegistryEvent>,
}

impl Registry {
    /// Create a new registry actor with the given event receiver
    pub fn new(events: mpsc::Receiver<RegistryEvent>) -> Self {
        Self {
            clients: HashMap::new(),
            admin_assigned: false,
            events,
        }
    }

    /// Run the event loop
    ///
    /// Processes events until all senders are dropped. Never fails:
    /// missing names are no-ops and closed outbound queues are ignored.
    pub async fn run(mut self) {
        info!("registry actor started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }

        info!("registry actor shutting down");
    }

    fn handle_event(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Deliver(msg) => self.handle_deliver(msg),
            RegistryEvent::Admit { client, reply } => self.handle_admit(client, reply),
            RegistryEvent::Kick { name } => self.handle_kick(name),
            RegistryEvent::Remove { name } => self.handle_remove(name),
            RegistryEvent::Roster { reply } => {
                let _ = reply.send(self.roster());
            }
        }
    }

    /// Push a line onto the recipient queue(s)
    fn handle_deliver(&mut self, msg: Message) {
        let Message { text, from, to } = msg;
        match to {
            // Recipient may have vanished since the sender looked it up;
            // that is a tolerated race, not an error.
            Some(to) => {
                if let Some(client) = self.clients.get(&to) {
                    client.push(text);
                }
            }
            None => {
                for (name, client) in &self.clients {
                    if from.as_ref() != Some(name) {
                        client.push(text.clone());
                    }
                }
            }
        }
    }

    /// Insert a new client, rejecting duplicate names atomically
    fn handle_admit(&mut self, mut client: Client, reply: oneshot::Sender<Admission>) {
        if self.clients.contains_key(&client.name) {
            let _ = reply.send(Admission::NameTaken);
            return;
        }

        client.is_admin = !self.admin_assigned;
        self.admin_assigned = true;

        let admission = Admission::Admitted {
            is_admin: client.is_admin,
        };
        info!(
            "user [{}] admitted ({} connected)",
            client.name,
            self.clients.len() + 1
        );
        self.clients.insert(client.name.clone(), client);
        let _ = reply.send(admission);
    }

    /// Forced removal: close the queue and wake the session's read loop
    fn handle_kick(&mut self, name: UserName) {
        // Kicking an absent name is a no-op
        if let Some(client) = self.clients.remove(&name) {
            info!("user [{}] kicked", name);
            // Dropping the client closes its outbound queue, ending the
            // writer once queued notices are flushed; the shutdown signal
            // wakes the read loop so both socket halves get dropped.
            let _ = client.shutdown.send(());
        }
    }

    /// Voluntary removal: close the queue, leave the socket to the handler
    fn handle_remove(&mut self, name: UserName) {
        if self.clients.remove(&name).is_some() {
            debug!("user [{}] removed ({} connected)", name, self.clients.len());
        }
    }

    fn roster(&self) -> Vec<RosterEntry> {
        self.clients
            .values()
            .map(|client| RosterEntry {
                name: client.name.clone(),
                addr: client.addr,
                connected_at: client.connected_at,
            })
            .collect()
    }
}

/// Queue a delivery with the registry actor
pub async fn deliver(
    events: &mpsc::Sender<RegistryEvent>,
    msg: Message,
) -> Result<(), AppError> {
    events
        .send(RegistryEvent::Deliver(msg))
        .await
        .map_err(|_| AppError::RegistryClosed)
}

/// Fetch a point-in-time snapshot of the registry
pub async fn roster(events: &mpsc::Sender<RegistryEvent>) -> Result<Vec<RosterEntry>, AppError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    events
        .send(RegistryEvent::Roster { reply: reply_tx })
        .await
        .map_err(|_| AppError::RegistryClosed)?;
    reply_rx.await.map_err(|_| AppError::RegistryClosed)
}
