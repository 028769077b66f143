//! Error types for the chat server
//!
//! Uses thiserror for ergonomic error definitions. Every error here ends
//! at most one session; the registry actor itself has no failure path.

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the connection (handshake, read, or write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry actor's event channel is closed (server shutting down)
    #[error("registry channel closed")]
    RegistryClosed,
}
