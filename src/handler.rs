//! Connection handling
//!
//! One task per accepted connection runs `handle_connection` for the full
//! session lifecycle: identity handshake, admission, greeting, and the
//! line-read loop. One more task per admitted client runs `client_writer`,
//! draining that client's outbound queue to the socket.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::command::{self, Session};
use crate::error::AppError;
use crate::message::Message;
use crate::registry::{self, Admission, RegistryEvent};
use crate::types::{UserName, HANDSHAKE_LEN};

/// Rejection line sent when the requested name is already registered
const NAME_TAKEN_LINE: &str = "irc-server > Another user already exists with the same username\n";

/// Handle one accepted connection
///
/// Reads the identity handshake, admits the client with the registry,
/// runs the session until the peer disconnects, errors, or is kicked.
pub async fn handle_connection(
    stream: TcpStream,
    events: mpsc::Sender<RegistryEvent>,
) -> Result<(), AppError> {
    let addr = stream.peer_addr()?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Identity handshake: a fixed-size frame carrying the requested name,
    // no acknowledgement.
    let mut frame = [0u8; HANDSHAKE_LEN];
    reader.read_exact(&mut frame).await?;
    let name = UserName::from_handshake(&frame);

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let client = Client::new(name.clone(), outbound_tx, addr, shutdown_tx);

    let (reply_tx, reply_rx) = oneshot::channel();
    events
        .send(RegistryEvent::Admit {
            client,
            reply: reply_tx,
        })
        .await
        .map_err(|_| AppError::RegistryClosed)?;

    let is_admin = match reply_rx.await.map_err(|_| AppError::RegistryClosed)? {
        Admission::NameTaken => {
            // Rejected at the edge: one notice, then the session ends.
            // The client registered under this name is unaffected.
            warn!("rejected duplicate user [{}] from {}", name, addr);
            write_half.write_all(NAME_TAKEN_LINE.as_bytes()).await?;
            return Ok(());
        }
        Admission::Admitted { is_admin } => is_admin,
    };

    tokio::spawn(client_writer(write_half, outbound_rx));

    info!("New connected user [{}]", name);
    registry::deliver(
        &events,
        Message::server_broadcast_excluding(name.clone(), format!("New connected user [{}]", name)),
    )
    .await?;
    registry::deliver(
        &events,
        Message::server_to(name.clone(), "Welcome to the Simple IRC Server"),
    )
    .await?;
    registry::deliver(
        &events,
        Message::server_to(
            name.clone(),
            format!("Your user [{}] is successfully logged", name),
        ),
    )
    .await?;
    if is_admin {
        info!("[{}] was promoted as the channel ADMIN", name);
        registry::deliver(
            &events,
            Message::server_to(name.clone(), "Congrats, you were the first user"),
        )
        .await?;
        registry::deliver(
            &events,
            Message::server_to(name.clone(), "You're the new IRC Server ADMIN"),
        )
        .await?;
    }

    let session = Session {
        name: name.clone(),
        is_admin,
    };
    let mut lines = reader.lines();
    loop {
        tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        command::dispatch(&line, &session, &events).await?;
                    }
                    // Clean EOF or a dead connection: either way the
                    // session is over, no retry.
                    Ok(None) => break,
                    Err(e) => {
                        debug!("read error for [{}]: {}", name, e);
                        break;
                    }
                }
            }
            _ = &mut shutdown_rx => {
                // Kicked: the registry already removed this client and
                // announced it; dropping the read half finishes the close.
                debug!("session for [{}] force-closed", name);
                return Ok(());
            }
        }
    }

    events
        .send(RegistryEvent::Remove { name: name.clone() })
        .await
        .map_err(|_| AppError::RegistryClosed)?;
    info!("[{}] left", name);
    registry::deliver(
        &events,
        Message::server_broadcast(format!("[{}] left channel", name)),
    )
    .await?;
    Ok(())
}

/// Per-client output pump
///
/// Drains the outbound queue in order, one wire line per item. Ends when
/// the registry closes the queue on removal or kick; anything queued
/// before the close is still flushed. Write errors end the pump early and
/// are otherwise ignored: the dead socket surfaces as a read failure in
/// the connection handler, which owns the teardown.
pub async fn client_writer(mut conn: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = outbound.recv().await {
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        if conn.write_all(&bytes).await.is_err() {
            break;
        }
    }
}
