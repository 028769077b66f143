//! Message intents and wire-line formatting
//!
//! A `Message` is an in-flight delivery instruction for the registry
//! actor: the fully formatted wire line plus the routing information
//! needed to fan it out.

use crate::types::UserName;

/// Prefix carried by server-originated lines
pub const SERVER_PREFIX: &str = "irc-server";

/// An in-flight delivery instruction
///
/// `to` of `None` means broadcast to every registered client except
/// `from`; `Some(name)` means deliver to that one client, silently
/// dropped if it is not registered. `text` is the complete wire line
/// (prefix included, newline excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub from: Option<UserName>,
    pub to: Option<UserName>,
}

impl Message {
    /// Server-originated line addressed to a single user
    pub fn server_to(to: UserName, text: impl AsRef<str>) -> Self {
        Self {
            text: format!("{} > {}", SERVER_PREFIX, text.as_ref()),
            from: None,
            to: Some(to),
        }
    }

    /// Server-originated broadcast to every registered client
    pub fn server_broadcast(text: impl AsRef<str>) -> Self {
        Self {
            text: format!("{} > {}", SERVER_PREFIX, text.as_ref()),
            from: None,
            to: None,
        }
    }

    /// Server-originated broadcast that skips one client
    ///
    /// Used for arrival announcements, which everyone but the newcomer
    /// should see.
    pub fn server_broadcast_excluding(skip: UserName, text: impl AsRef<str>) -> Self {
        Self {
            text: format!("{} > {}", SERVER_PREFIX, text.as_ref()),
            from: Some(skip),
            to: None,
        }
    }

    /// Public chat line from one user to everyone else
    pub fn chat_broadcast(from: UserName, text: &str) -> Self {
        Self {
            text: format!("{} > {}", from, text),
            from: Some(from),
            to: None,
        }
    }

    /// Private chat line from one user to another
    pub fn chat_direct(from: UserName, to: UserName, text: &str) -> Self {
        Self {
            text: format!("{} > {}", from, text),
            from: Some(from),
            to: Some(to),
        }
    }

    /// Whether this message is addressed to every client
    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }
}
