use std::net::SocketAddr;
use thiserror::Error;

/// Result type for lightpad operations
pub type Result<T> = std::result::Result<T, PlumError>;

/// Errors that can occur when listening to or subscribing to lightpads
#[derive(Error, Debug)]
pub enum PlumError {
    /// Could not bind the announcement receiver
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Could not open the event stream to a lightpad
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The lightpad did not accept the connection in time
    #[error("timed out connecting to {0}")]
    ConnectTimeout(SocketAddr),

    /// The lightpad closed the event stream
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A listener task panicked or was aborted
    #[error("Listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A broadcast datagram was not a lightpad announcement
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),
}
