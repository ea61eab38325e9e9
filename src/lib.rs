//! Progress stream - live rendering of JSON progress messages
//!
//! Renders the progress/status messages emitted by long-running operations
//! (pulls, pushes, builds) either as a scrolling log or, on an interactive
//! terminal, as a grid with one in-place-updated row per operation.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod display;
pub mod error;
pub mod render;
pub mod stream;

// Re-export commonly used types
pub use config::{DisplayConfig, OutputMode};
pub use display::{display_stream, display_to_output, Plain, StreamMultiplexer, TerminalOutput};
pub use error::{Error, Result};
pub use render::{resolve_capabilities, Capabilities, Clock, WidthQuery};
pub use stream::{ErrorDetail, Message, MessageDecoder, Progress};
