//! Client struct definition
//!
//! Represents a connected client: identity, outbound queue, and the
//! handles the registry actor uses to tear the session down.

use std::net::SocketAddr;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot};

use crate::types::UserName;

/// Connected client information
///
/// Created by the connection handler at handshake time and owned by the
/// registry actor for the rest of the session. The outbound queue is
/// written only by the actor and drained only by this client's writer
/// task; it is unbounded so one slow reader cannot stall fan-out to the
/// others.
#[derive(Debug)]
pub struct Client {
    /// Display name, unique across the registry
    pub name: UserName,
    /// Pending wire lines for this client's writer
    pub outbound: mpsc::UnboundedSender<String>,
    /// Remote address, fixed at connection time
    pub addr: SocketAddr,
    /// Admission timestamp
    pub connected_at: DateTime<Local>,
    /// True only for the first client admitted after server start
    pub is_admin: bool,
    /// Fired by the registry actor to force-disconnect this session
    pub shutdown: oneshot::Sender<()>,
}

impl Client {
    /// Create a new client record; the registry decides `is_admin` at
    /// admission time.
    pub fn new(
        name: UserName,
        outbound: mpsc::UnboundedSender<String>,
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
    ) -> Self {
        Self {
            name,
            outbound,
            addr,
            connected_at: Local::now(),
            is_admin: false,
            shutdown,
        }
    }

    /// Push a line onto this client's outbound queue
    ///
    /// A closed queue (writer already gone) is ignored: the dead socket
    /// surfaces as a read failure in the connection handler, which owns
    /// the teardown.
    pub fn push(&self, line: String) {
        let _ = self.outbound.send(line);
    }
}
