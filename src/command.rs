//! Command parsing and dispatch
//!
//! `parse` is a pure mapping from one line of client input to a
//! `Command`; `dispatch` turns the parsed command into registry events on
//! behalf of the invoking session. Registry lookups and authorization
//! live in dispatch, so parsing stays side-effect free and testable.

use chrono::Local;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::AppError;
use crate::message::Message;
use crate::registry::{self, RegistryEvent};
use crate::types::UserName;

/// Timestamp format used by `/users` and `/user`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed line of client input
///
/// The first whitespace-delimited token selects the command; anything
/// unrecognized is a public broadcast of the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every connected user with their connection time
    Users,
    /// Private message to one named user
    DirectMessage { to: UserName, text: String },
    /// Report the server's local time to the invoker
    Time,
    /// Show one user's profile
    UserInfo { name: UserName },
    /// Forcibly disconnect a user (admin only); `None` when the target
    /// argument is missing, so authorization can still be checked first
    Kick { name: Option<UserName> },
    /// Plain chat line, broadcast to everyone else
    Broadcast(String),
    /// Malformed command; the usage line to send back to the invoker
    Usage(&'static str),
    /// Nothing to do (line is empty after trimming)
    Empty,
}

/// The invoking session, as the dispatcher sees it
#[derive(Debug, Clone)]
pub struct Session {
    pub name: UserName,
    pub is_admin: bool,
}

/// Parse one line of client input
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    let mut words = trimmed.split_whitespace();
    let head = words.next().unwrap_or_default();
    match head {
        "/users" => Command::Users,
        "/msg" => {
            let to = words.next();
            let text = words.collect::<Vec<_>>().join(" ");
            match to {
                Some(to) if !text.is_empty() => Command::DirectMessage {
                    to: UserName::new(to),
                    text,
                },
                _ => Command::Usage("Command usage: /msg <user> <msg>"),
            }
        }
        "/time" => Command::Time,
        "/user" => match words.next() {
            Some(name) => Command::UserInfo {
                name: UserName::new(name),
            },
            None => Command::Usage("Command usage: /user <user>"),
        },
        "/kick" => Command::Kick {
            name: words.next().map(UserName::new),
        },
        _ => Command::Broadcast(trimmed.to_string()),
    }
}

/// Parse a line and emit the resulting registry events
///
/// Commands that consult the registry (`/users`, `/user`, `/kick`) take a
/// roster snapshot at call time; a name that disappears between the
/// snapshot and a later event silently no-ops in the actor.
pub async fn dispatch(
    line: &str,
    session: &Session,
    events: &mpsc::Sender<RegistryEvent>,
) -> Result<(), AppError> {
    match parse(line) {
        Command::Empty => Ok(()),
        Command::Broadcast(text) => {
            registry::deliver(events, Message::chat_broadcast(session.name.clone(), &text)).await
        }
        Command::DirectMessage { to, text } => {
            registry::deliver(
                events,
                Message::chat_direct(session.name.clone(), to, &text),
            )
            .await
        }
        Command::Usage(usage) => {
            registry::deliver(events, Message::server_to(session.name.clone(), usage)).await
        }
        Command::Time => {
            let now = Local::now();
            let text = format!("Local Time: {}", now.format("%Z %H:%M"));
            registry::deliver(events, Message::server_to(session.name.clone(), text)).await
        }
        Command::Users => {
            for entry in registry::roster(events).await? {
                let text = format!(
                    "{} - connected since {}",
                    entry.name,
                    entry.connected_at.format(TIMESTAMP_FORMAT)
                );
                registry::deliver(events, Message::server_to(session.name.clone(), text)).await?;
            }
            Ok(())
        }
        Command::UserInfo { name } => {
            let roster = registry::roster(events).await?;
            let text = match roster.iter().find(|entry| entry.name == name) {
                Some(entry) => format!(
                    "username: {}, IP: {}, connected since: {}",
                    entry.name,
                    entry.addr,
                    entry.connected_at.format(TIMESTAMP_FORMAT)
                ),
                None => format!("No user named {} found", name),
            };
            registry::deliver(events, Message::server_to(session.name.clone(), text)).await
        }
        Command::Kick { name } => dispatch_kick(name, session, events).await,
    }
}

/// The `/kick` ladder: authorization, arity, existence, self-kick
async fn dispatch_kick(
    name: Option<UserName>,
    session: &Session,
    events: &mpsc::Sender<RegistryEvent>,
) -> Result<(), AppError> {
    if !session.is_admin {
        return registry::deliver(
            events,
            Message::server_to(session.name.clone(), "Authorization required"),
        )
        .await;
    }
    let Some(name) = name else {
        return registry::deliver(
            events,
            Message::server_to(session.name.clone(), "Command usage: /kick <user>"),
        )
        .await;
    };
    let roster = registry::roster(events).await?;
    if !roster.iter().any(|entry| entry.name == name) {
        return registry::deliver(
            events,
            Message::server_to(session.name.clone(), format!("No user named {} found", name)),
        )
        .await;
    }
    if name == session.name {
        return registry::deliver(
            events,
            Message::server_to(session.name.clone(), "You can't kick yourself out"),
        )
        .await;
    }

    // Both notices are queued ahead of the kick event, so the target's
    // writer flushes them before its queue closes.
    registry::deliver(
        events,
        Message::server_to(name.clone(), "You're kicked from this channel"),
    )
    .await?;
    registry::deliver(
        events,
        Message::server_to(name.clone(), "Bad language is not allowed on this channel"),
    )
    .await?;
    events
        .send(RegistryEvent::Kick { name: name.clone() })
        .await
        .map_err(|_| AppError::RegistryClosed)?;
    registry::deliver(
        events,
        Message::server_broadcast(format!(
            "[{}] was kicked from channel for bad language policy violation",
            name
        )),
    )
    .await?;
    info!("[{}] was kicked", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RosterEntry;

    #[test]
    fn test_parse_users() {
        assert_eq!(parse("/users"), Command::Users);
    }

    #[test]
    fn test_parse_msg() {
        assert_eq!(
            parse("/msg bob hello there"),
            Command::DirectMessage {
                to: UserName::new("bob"),
                text: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_msg_rejoins_with_single_spaces() {
        assert_eq!(
            parse("/msg bob   hello    world"),
            Command::DirectMessage {
                to: UserName::new("bob"),
                text: "hello world".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_msg_usage() {
        let usage = Command::Usage("Command usage: /msg <user> <msg>");
        assert_eq!(parse("/msg"), usage);
        assert_eq!(parse("/msg bob"), usage);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse("/time"), Command::Time);
    }

    #[test]
    fn test_parse_user() {
        assert_eq!(
            parse("/user bob"),
            Command::UserInfo {
                name: UserName::new("bob"),
            }
        );
        assert_eq!(parse("/user"), Command::Usage("Command usage: /user <user>"));
    }

    #[test]
    fn test_parse_kick() {
        assert_eq!(
            parse("/kick bob"),
            Command::Kick {
                name: Some(UserName::new("bob")),
            }
        );
        assert_eq!(parse("/kick"), Command::Kick { name: None });
    }

    #[test]
    fn test_parse_plain_text_broadcasts() {
        assert_eq!(
            parse("hello everyone"),
            Command::Broadcast("hello everyone".to_string())
        );
        // Unknown slash commands are chat text too
        assert_eq!(
            parse("/dance badly"),
            Command::Broadcast("/dance badly".to_string())
        );
    }

    #[test]
    fn test_parse_empty_lines() {
        assert_eq!(parse(""), Command::Empty);
        assert_eq!(parse("   "), Command::Empty);
    }

    /// Events observed by a fake registry while one line is dispatched
    #[derive(Debug, PartialEq)]
    enum Observed {
        Deliver(Message),
        Kick(UserName),
    }

    /// Run dispatch against a scripted roster and record the event stream
    async fn run_dispatch(line: &str, session: &Session, roster: Vec<RosterEntry>) -> Vec<Observed> {
        let (event_tx, mut event_rx) = mpsc::channel(32);
        let collector = tokio::spawn(async move {
            let mut observed = Vec::new();
            while let Some(event) = event_rx.recv().await {
                match event {
                    RegistryEvent::Deliver(msg) => observed.push(Observed::Deliver(msg)),
                    RegistryEvent::Kick { name } => observed.push(Observed::Kick(name)),
                    RegistryEvent::Roster { reply } => {
                        let _ = reply.send(roster.clone());
                    }
                    _ => {}
                }
            }
            observed
        });

        dispatch(line, session, &event_tx).await.unwrap();
        drop(event_tx);
        collector.await.unwrap()
    }

    fn entry(name: &str) -> RosterEntry {
        RosterEntry {
            name: UserName::new(name),
            addr: "10.0.0.7:5555".parse().unwrap(),
            connected_at: Local::now(),
        }
    }

    fn admin(name: &str) -> Session {
        Session {
            name: UserName::new(name),
            is_admin: true,
        }
    }

    fn regular(name: &str) -> Session {
        Session {
            name: UserName::new(name),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_dispatch_broadcast() {
        let observed = run_dispatch("hi all", &regular("bob"), vec![]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::chat_broadcast(
                UserName::new("bob"),
                "hi all"
            ))]
        );
    }

    #[tokio::test]
    async fn test_dispatch_direct_message() {
        let observed = run_dispatch("/msg alice hello", &regular("bob"), vec![]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::chat_direct(
                UserName::new("bob"),
                UserName::new("alice"),
                "hello"
            ))]
        );
    }

    #[tokio::test]
    async fn test_dispatch_users_lists_each_entry() {
        let observed = run_dispatch(
            "/users",
            &regular("alice"),
            vec![entry("alice"), entry("bob")],
        )
        .await;

        assert_eq!(observed.len(), 2);
        for event in &observed {
            let Observed::Deliver(msg) = event else {
                panic!("expected a delivery, got {:?}", event);
            };
            assert_eq!(msg.to, Some(UserName::new("alice")));
            assert!(msg.text.contains(" - connected since "));
        }
    }

    #[tokio::test]
    async fn test_dispatch_user_info_found_and_missing() {
        let observed =
            run_dispatch("/user bob", &regular("alice"), vec![entry("bob")]).await;
        let [Observed::Deliver(msg)] = &observed[..] else {
            panic!("expected one delivery, got {:?}", observed);
        };
        assert!(msg.text.starts_with("irc-server > username: bob, IP: 10.0.0.7:5555"));

        let observed = run_dispatch("/user ghost", &regular("alice"), vec![entry("bob")]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::server_to(
                UserName::new("alice"),
                "No user named ghost found"
            ))]
        );
    }

    #[tokio::test]
    async fn test_dispatch_time_line_shape() {
        let observed = run_dispatch("/time", &regular("alice"), vec![]).await;
        let [Observed::Deliver(msg)] = &observed[..] else {
            panic!("expected one delivery, got {:?}", observed);
        };
        assert!(msg.text.starts_with("irc-server > Local Time: "));
        assert_eq!(msg.to, Some(UserName::new("alice")));
    }

    #[tokio::test]
    async fn test_kick_denied_for_non_admin() {
        let observed = run_dispatch("/kick bob", &regular("mallory"), vec![entry("bob")]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::server_to(
                UserName::new("mallory"),
                "Authorization required"
            ))]
        );
    }

    #[tokio::test]
    async fn test_kick_self_rejected() {
        let observed = run_dispatch("/kick alice", &admin("alice"), vec![entry("alice")]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::server_to(
                UserName::new("alice"),
                "You can't kick yourself out"
            ))]
        );
    }

    #[tokio::test]
    async fn test_kick_unknown_target() {
        let observed = run_dispatch("/kick ghost", &admin("alice"), vec![entry("alice")]).await;
        assert_eq!(
            observed,
            [Observed::Deliver(Message::server_to(
                UserName::new("alice"),
                "No user named ghost found"
            ))]
        );
    }

    #[tokio::test]
    async fn test_kick_success_event_order() {
        let observed = run_dispatch(
            "/kick bob",
            &admin("alice"),
            vec![entry("alice"), entry("bob")],
        )
        .await;

        assert_eq!(
            observed,
            [
                Observed::Deliver(Message::server_to(
                    UserName::new("bob"),
                    "You're kicked from this channel"
                )),
                Observed::Deliver(Message::server_to(
                    UserName::new("bob"),
                    "Bad language is not allowed on this channel"
                )),
                Observed::Kick(UserName::new("bob")),
                Observed::Deliver(Message::server_broadcast(
                    "[bob] was kicked from channel for bad language policy violation"
                )),
            ]
        );
    }
}
