//! Live multi-row display
//!
//! Each operation id that reports progress gets a row, assigned in first-seen
//! order. The cursor rests below the last row; to update a row we move up to
//! it, redraw it, and move back down. Any line that is not progress for an id
//! scrolls the grid away, so the row ledger is dropped and the next progress
//! message starts a fresh grid.

use std::collections::HashMap;
use std::io::{Read, Write};

use log::{debug, trace};

use crate::error::Result;
use crate::render::line::render_message;
use crate::render::progress::{Clock, RenderContext, WidthQuery};
use crate::render::terminal::{capabilities_from_env, cursor_down, cursor_up, Capabilities};
use crate::stream::decoder::MessageDecoder;
use crate::stream::message::Message;

/// Callback receiving messages that carry an out-of-band payload
pub type AuxCallback<'a> = Box<dyn FnMut(&Message) + 'a>;

/// Operation id to grid row mapping for the current grid
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RowLedger {
    rows: HashMap<String, usize>,
}

impl RowLedger {
    /// An empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in the grid
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are allocated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row assigned to `id`, if any
    #[must_use]
    pub fn row(&self, id: &str) -> Option<usize> {
        self.rows.get(id).copied()
    }

    /// Row for `id`, allocating the next one if unseen. Returns `(row, is_new)`.
    pub fn assign(&mut self, id: &str) -> (usize, bool) {
        if let Some(row) = self.row(id) {
            return (row, false);
        }
        let row = self.rows.len();
        self.rows.insert(id.to_string(), row);
        (row, true)
    }

    /// Forget every row
    pub fn reset(&mut self) {
        self.rows.clear();
    }
}

/// Renders a message stream, keeping one pinned row per operation id.
///
/// Without capabilities the output is append-only: no cursor movement, no
/// progress bars. Not safe to share between concurrent streams; give each
/// stream its own writer.
pub struct StreamMultiplexer<'a, W: Write> {
    out: W,
    caps: Option<Box<dyn Capabilities>>,
    context: RenderContext,
    aux_callback: Option<AuxCallback<'a>>,
    ledger: RowLedger,
}

impl<'a, W: Write> StreamMultiplexer<'a, W> {
    /// Append-only display writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            caps: None,
            context: RenderContext::default(),
            aux_callback: None,
            ledger: RowLedger::new(),
        }
    }

    /// Treat `out` as an interactive terminal with capability set `caps`
    #[must_use]
    pub fn terminal(mut self, caps: Box<dyn Capabilities>) -> Self {
        self.caps = Some(caps);
        self
    }

    /// Treat `out` as an interactive terminal when `is_terminal`, resolving
    /// capabilities from `TERM`
    #[must_use]
    pub fn with_terminal(self, is_terminal: bool) -> Self {
        if is_terminal {
            self.terminal(capabilities_from_env())
        } else {
            self
        }
    }

    /// Width query bound to every progress record
    #[must_use]
    pub fn with_width_query(mut self, query: WidthQuery) -> Self {
        self.context.width_query = Some(query);
        self
    }

    /// Fixed width bound to every progress record
    #[must_use]
    pub fn with_width(mut self, columns: usize) -> Self {
        self.context.width = Some(columns);
        self
    }

    /// Clock bound to every progress record
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.context.clock = Some(clock);
        self
    }

    /// Receive messages carrying an `aux` payload instead of rendering them
    #[must_use]
    pub fn with_aux_callback(mut self, callback: impl FnMut(&Message) + 'a) -> Self {
        self.aux_callback = Some(Box::new(callback));
        self
    }

    /// Whether cursor control is enabled
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.caps.is_some()
    }

    /// Rows of the current grid
    #[must_use]
    pub fn rows(&self) -> &RowLedger {
        &self.ledger
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Decode and render every message from `reader` until end of input
    pub fn display<R: Read>(&mut self, reader: R) -> Result<()> {
        self.display_messages(MessageDecoder::new(reader))
    }

    /// Render an already-decoded sequence, stopping at the first failure.
    ///
    /// The row ledger starts empty for every call. The cursor is left where
    /// the last message put it.
    pub fn display_messages<I>(&mut self, messages: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Message>>,
    {
        self.ledger.reset();
        for message in messages {
            self.display_message(message?)?;
        }
        Ok(())
    }

    fn display_message(&mut self, mut message: Message) -> Result<()> {
        if message.aux.is_some() {
            trace!("aux payload for '{}'", message.id);
            if let Some(callback) = self.aux_callback.as_mut() {
                callback(&message);
            }
            return Ok(());
        }

        if let Some(progress) = message.progress.as_mut() {
            self.bind(&mut progress.context);
        }

        let caps = self.caps.as_deref();
        let mut diff = 0;
        if message.is_grid_participant() {
            let (row, is_new) = self.ledger.assign(&message.id);
            if is_new {
                trace!("row {row} assigned to '{}'", message.id);
                if caps.is_some() {
                    self.out.write_all(b"\n")?;
                }
            }
            diff = self.ledger.len() - row;
            if let Some(caps) = caps {
                cursor_up(&mut self.out, caps, diff)?;
            }
        } else if !self.ledger.is_empty() {
            debug!("plain line after {} progress rows, starting a new grid", self.ledger.len());
            self.ledger.reset();
        }

        let rendered = render_message(&mut self.out, &message, caps);
        if let Some(caps) = caps {
            cursor_down(&mut self.out, caps, diff)?;
        }
        rendered?;
        self.out.flush()?;
        Ok(())
    }

    fn bind(&self, context: &mut RenderContext) {
        if self.context.width.is_some() {
            context.width = self.context.width;
        }
        if self.context.width_query.is_some() {
            context.width_query.clone_from(&self.context.width_query);
        }
        if self.context.clock.is_some() {
            context.clock.clone_from(&self.context.clock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::render::terminal::NoCapabilities;
    use crate::stream::message::{ErrorDetail, Progress};
    use std::io;

    const CLEAR: &str = "\x1b[1K\x1b[K";

    fn progress(id: &str, current: i64) -> Message {
        Message::progress(id, "Downloading", Progress::new(current, 100))
    }

    fn run(messages: Vec<Message>, terminal: bool) -> (Result<()>, String, RowLedger) {
        let mut out = Vec::new();
        let mut mux = StreamMultiplexer::new(&mut out).with_width(80);
        if terminal {
            mux = mux.terminal(Box::new(NoCapabilities));
        }
        let result = mux.display_messages(messages.into_iter().map(Ok));
        let rows = mux.rows().clone();
        drop(mux);
        (result, String::from_utf8(out).unwrap(), rows)
    }

    /// Writer that refuses a write once its budget is spent, or on an exact buffer
    struct FailingWriter {
        written: Vec<u8>,
        writes_left: usize,
        fail_on: Option<&'static str>,
    }

    impl FailingWriter {
        fn after(writes: usize) -> Self {
            Self {
                written: Vec::new(),
                writes_left: writes,
                fail_on: None,
            }
        }

        fn on(sequence: &'static str) -> Self {
            Self {
                written: Vec::new(),
                writes_left: usize::MAX,
                fail_on: Some(sequence),
            }
        }

        fn text(&self) -> String {
            String::from_utf8(self.written.clone()).unwrap()
        }
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes_left == 0 || self.fail_on.is_some_and(|s| s.as_bytes() == buf) {
                return Err(io::Error::other("sink closed"));
            }
            self.writes_left -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_failing(writer: &mut FailingWriter, messages: Vec<Message>) -> Result<()> {
        StreamMultiplexer::new(writer)
            .terminal(Box::new(NoCapabilities))
            .with_width(80)
            .display_messages(messages.into_iter().map(Ok))
    }

    fn line(id: &str, current: i64) -> String {
        format!("{CLEAR}\r{id}: Downloading {:>8}/100B\r", format!("{current}B"))
    }

    #[test]
    fn test_ledger_assigns_in_first_seen_order() {
        let mut ledger = RowLedger::new();
        assert_eq!(ledger.assign("a"), (0, true));
        assert_eq!(ledger.assign("b"), (1, true));
        assert_eq!(ledger.assign("a"), (0, false));
        assert_eq!(ledger.len(), 2);
        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.assign("b"), (0, true));
    }

    #[test]
    fn test_rows_are_reused() {
        let (result, text, rows) = run(
            vec![progress("a", 10), progress("b", 20), progress("a", 30), progress("b", 40)],
            true,
        );
        result.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.row("a"), Some(0));
        assert_eq!(rows.row("b"), Some(1));

        let expected = [
            // a: new row, one up, draw, one down
            format!("\n\x1b[1A{}\x1b[1B", line("a", 10)),
            // b: new row below a
            format!("\n\x1b[1A{}\x1b[1B", line("b", 20)),
            // a: two rows up
            format!("\x1b[2A{}\x1b[2B", line("a", 30)),
            // b: one row up
            format!("\x1b[1A{}\x1b[1B", line("b", 40)),
        ]
        .concat();
        assert_eq!(text, expected);
        assert_eq!(text.matches('\n').count(), 2);
    }

    #[test]
    fn test_plain_line_resets_grid() {
        let (result, text, rows) = run(
            vec![progress("a", 10), Message::status("Digest: sha256:1234"), progress("a", 20)],
            true,
        );
        result.unwrap();
        assert_eq!(rows.len(), 1);
        let expected = [
            format!("\n\x1b[1A{}\x1b[1B", line("a", 10)),
            "Digest: sha256:1234\n".to_string(),
            format!("\n\x1b[1A{}\x1b[1B", line("a", 20)),
        ]
        .concat();
        assert_eq!(text, expected);
    }

    #[test]
    fn test_id_without_progress_resets_grid() {
        let mut done = Message::status("Pull complete");
        done.id = "a".to_string();
        let (result, _, rows) = run(vec![progress("a", 10), progress("b", 10), done], true);
        result.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_non_terminal_is_append_only() {
        let mut done = Message::status("Pull complete");
        done.id = "a".to_string();
        let (result, text, _) = run(
            vec![
                Message::status("Pulling from library/alpine"),
                progress("a", 10),
                progress("a", 50),
                done,
            ],
            false,
        );
        result.unwrap();
        assert_eq!(text, "Pulling from library/alpine\na: Pull complete\n");
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_aux_messages_go_to_callback_only() {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        {
            let mut mux = StreamMultiplexer::new(&mut out)
                .terminal(Box::new(NoCapabilities))
                .with_aux_callback(|m: &Message| seen.push(m.clone()));
            let aux = Message {
                id: "abc".to_string(),
                status: "ignored".to_string(),
                progress: Some(Progress::new(1, 2)),
                aux: Some(serde_json::json!({"ID": "sha256:beef"})),
                ..Message::default()
            };
            mux.display_messages(vec![Ok(aux)]).unwrap();
            assert!(mux.rows().is_empty());
        }
        assert!(out.is_empty());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].aux.as_ref().unwrap()["ID"], "sha256:beef");
        assert_eq!(seen[0].status, "ignored");
    }

    #[test]
    fn test_aux_without_callback_is_dropped() {
        let aux = Message {
            aux: Some(serde_json::json!(1)),
            status: "hidden".to_string(),
            ..Message::default()
        };
        let (result, text, _) = run(vec![aux], false);
        result.unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_error_aborts_and_restores_cursor() {
        let mut failed = progress("b", 10);
        failed.error = Some(ErrorDetail {
            code: 500,
            message: "unexpected EOF".to_string(),
        });
        let (result, text, _) = run(
            vec![progress("a", 10), progress("b", 10), failed, progress("a", 90)],
            true,
        );
        assert_eq!(result.unwrap_err().to_string(), "unexpected EOF");
        assert!(text.ends_with("\x1b[1A\x1b[1B"));
        assert!(!text.contains("90B"));
    }

    #[test]
    fn test_decode_error_propagates() {
        let mut out = Vec::new();
        let mut mux = StreamMultiplexer::new(&mut out);
        let err = mux
            .display("{\"status\":\"one\"}\n{\"status\"".as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        drop(mux);
        assert_eq!(String::from_utf8(out).unwrap(), "one\n");
    }

    #[test]
    fn test_ledger_starts_empty_for_each_stream() {
        let mut out = Vec::new();
        let mut mux = StreamMultiplexer::new(&mut out).terminal(Box::new(NoCapabilities));
        mux.display_messages(vec![Ok(progress("a", 1))]).unwrap();
        mux.display_messages(vec![Ok(progress("b", 1))]).unwrap();
        assert_eq!(mux.rows().row("b"), Some(0));
        assert_eq!(mux.rows().row("a"), None);
    }

    #[test]
    fn test_binds_width_into_progress() {
        let mut out = Vec::new();
        let mut mux = StreamMultiplexer::new(&mut out)
            .terminal(Box::new(NoCapabilities))
            .with_width_query(WidthQuery::fixed(200));
        mux.display_messages(vec![Ok(progress("a", 50))]).unwrap();
        drop(mux);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("[{}>{}]", "=".repeat(25), " ".repeat(25))));
    }

    #[test]
    fn test_with_terminal_false_stays_plain() {
        let mux = StreamMultiplexer::new(Vec::new()).with_terminal(false);
        assert!(!mux.is_terminal());
    }

    #[test]
    fn test_row_reservation_failure_aborts() {
        let mut writer = FailingWriter::after(0);
        let err = run_failing(&mut writer, vec![progress("a", 10), Message::status("never")])
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(writer.written.is_empty());
    }

    #[test]
    fn test_cursor_up_failure_aborts() {
        let mut writer = FailingWriter::after(1);
        let err = run_failing(&mut writer, vec![progress("a", 10), Message::status("never")])
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(writer.text(), "\n");
    }

    #[test]
    fn test_cursor_down_failure_aborts() {
        let mut writer = FailingWriter::on("\x1b[1B");
        let err = run_failing(&mut writer, vec![progress("a", 10), Message::status("never")])
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        let text = writer.text();
        assert_eq!(text, format!("\n\x1b[1A{}", line("a", 10)));
        assert!(!text.contains("never"));
    }
}
