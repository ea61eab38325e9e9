//! Progress message stream
//!
//! The decoded data model and the lazy JSON decoder that produces it.

pub mod decoder;
pub mod message;

pub use decoder::MessageDecoder;
pub use message::{ErrorDetail, Message, Progress};
