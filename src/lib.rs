//! Simple IRC Server Library
//!
//! A line-oriented multi-user chat broadcast server built on tokio,
//! using the Actor pattern for state management.
//!
//! # Features
//! - Fixed-size identity handshake, then newline-delimited UTF-8 text
//! - Public broadcasts and private `/msg` messages
//! - `/users`, `/user`, and `/time` informational commands
//! - The first connected client becomes the admin and may `/kick`
//! - Duplicate display names are rejected at admission
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Registry` is the central actor owning the map of connected users
//! - Each connection has a handler task communicating with the registry
//! - Each admitted client has a writer task draining its outbound queue
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use irc_server::{handle_connection, Registry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:9000").await.unwrap();
//!     let (event_tx, event_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Registry::new(event_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let event_tx = event_tx.clone();
//!         tokio::spawn(handle_connection(stream, event_tx));
//!     }
//! }
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use command::{parse, Command, Session};
pub use error::AppError;
pub use handler::{client_writer, handle_connection};
pub use message::Message;
pub use registry::{Admission, Registry, RegistryEvent, RosterEntry};
pub use types::{UserName, HANDSHAKE_LEN};
