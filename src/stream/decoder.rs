//! Streaming decoder for concatenated JSON messages
//!
//! Producers write one JSON object per message, usually newline separated but
//! not necessarily. Messages are decoded lazily so a slow producer is rendered
//! as it goes.

use std::io::Read;

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;

use crate::error::Result;
use crate::stream::message::Message;

/// Iterator over the messages of a JSON byte stream.
///
/// Yields `Err` once for malformed or truncated input and then stops. A clean
/// end of input simply ends the iteration. A bare `null` decodes to an empty
/// message.
pub struct MessageDecoder<R: Read> {
    inner: StreamDeserializer<'static, IoRead<R>, Option<Message>>,
    failed: bool,
}

impl<R: Read> MessageDecoder<R> {
    /// Decode messages from `reader`
    pub fn new(reader: R) -> Self {
        Self {
            inner: serde_json::Deserializer::from_reader(reader).into_iter(),
            failed: false,
        }
    }
}

impl<R: Read> Iterator for MessageDecoder<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.inner.next()? {
            Ok(message) => Some(Ok(message.unwrap_or_default())),
            Err(err) => {
                self.failed = true;
                Some(Err(err.into()))
            }
        }
    }
}
