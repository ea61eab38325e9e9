//! Single-message line renderer
//!
//! Writes one [`Message`] as one line. On a terminal, progress lines are
//! cleared first and end in `\r` so the next render for the same row
//! overwrites them. Off a terminal, progress bars are dropped entirely and
//! only plain status and stream lines are written.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::render::terminal::{clear_line, Capabilities};
use crate::stream::message::Message;

/// Fixed-width RFC 3339 timestamp with zero-padded nanoseconds
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Format a timestamp so every rendering has the same width
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Render `message` to `out`.
///
/// `caps` is `Some` when `out` is an interactive terminal. A message carrying
/// an error renders nothing and returns the failure instead. Write errors
/// abort immediately and may leave a partial line behind.
pub fn render_message<W: Write + ?Sized>(
    out: &mut W,
    message: &Message,
    caps: Option<&dyn Capabilities>,
) -> Result<()> {
    if let Some(failure) = message.failure() {
        return Err(failure);
    }

    let fragment = message.progress.as_ref().map(|p| p.format());
    let live_row = message.stream.is_empty() && message.has_progress_content();

    let endl = match caps {
        Some(caps) if live_row => {
            clear_line(out, caps)?;
            out.write_all(b"\r")?;
            "\r"
        }
        _ => {
            if fragment.as_deref().is_some_and(|f| !f.is_empty()) {
                // progress bars are terminal-only
                return Ok(());
            }
            "\n"
        }
    };

    if let Some(at) = message.timestamp() {
        write!(out, "{} ", format_timestamp(at))?;
    }
    if !message.id.is_empty() {
        write!(out, "{}: ", message.id)?;
    }
    if !message.from.is_empty() {
        write!(out, "(from {}) ", message.from)?;
    }

    match (&fragment, caps) {
        (Some(fragment), Some(_)) => write!(out, "{} {fragment}{endl}", message.status)?,
        _ if !message.progress_message.is_empty() => {
            write!(out, "{} {}{endl}", message.status, message.progress_message)?;
        }
        _ if !message.stream.is_empty() => {
            out.write_all(message.stream.as_bytes())?;
            if !message.stream.ends_with('\n') {
                out.write_all(b"\n")?;
            }
        }
        _ => write!(out, "{}{endl}", message.status)?,
    }
    Ok(())
}
