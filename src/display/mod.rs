//! Stream display
//!
//! Drives the renderers over a whole message stream: the live multi-row grid
//! on terminals, an append-only log everywhere else.

pub mod multiplexer;
pub mod output;

pub use multiplexer::{AuxCallback, RowLedger, StreamMultiplexer};
pub use output::{display_stream, display_to_output, Plain, TerminalOutput};
