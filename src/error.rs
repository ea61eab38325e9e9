//! Error type shared by the decoder, renderers and display loop

use thiserror::Error;

/// Errors produced while decoding or rendering a progress stream
#[derive(Debug, Error)]
pub enum Error {
    /// The stream reported an operation failure with code 401
    #[error("authentication is required")]
    AuthenticationRequired,
    /// The stream reported an operation failure
    #[error("{message}")]
    Operation {
        /// Error code reported by the producer (0 when none was sent)
        code: i64,
        /// Human-readable failure text
        message: String,
    },
    /// The input could not be decoded as a sequence of JSON messages
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    /// Writing text or control sequences to the output failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A terminfo entry could not be found or parsed
    #[error("terminal database: {0}")]
    Terminfo(#[from] terminfo::Error),
    /// Display configuration was invalid
    #[error("invalid display configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
