//! Output streams and top-level entry points

use std::io::{self, IsTerminal, Read, Stderr, Stdout, Write};

use crate::display::multiplexer::StreamMultiplexer;
use crate::error::Result;
use crate::render::progress::WidthQuery;
use crate::stream::message::Message;

/// A writer that knows whether it is an interactive terminal and how wide it is
pub trait TerminalOutput: Write {
    /// Whether cursor control should be used
    fn is_terminal(&self) -> bool;

    /// How to ask for the width of this output
    fn width_query(&self) -> WidthQuery;
}

impl TerminalOutput for Stdout {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }

    fn width_query(&self) -> WidthQuery {
        WidthQuery::terminal()
    }
}

impl TerminalOutput for Stderr {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }

    fn width_query(&self) -> WidthQuery {
        WidthQuery::terminal()
    }
}

/// Any writer, treated as a non-interactive log
#[derive(Debug, Default)]
pub struct Plain<W>(pub W);

impl<W: Write> Write for Plain<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> TerminalOutput for Plain<W> {
    fn is_terminal(&self) -> bool {
        false
    }

    fn width_query(&self) -> WidthQuery {
        WidthQuery::unavailable()
    }
}

/// Render the JSON message stream `reader` to `out`.
///
/// With `is_terminal` the live grid is drawn using capabilities for `TERM`;
/// otherwise only plain lines are written. `aux_callback` receives every
/// message carrying an out-of-band payload.
pub fn display_stream<R: Read, W: Write>(
    reader: R,
    out: W,
    is_terminal: bool,
    width_query: WidthQuery,
    aux_callback: Option<&mut dyn FnMut(&Message)>,
) -> Result<()> {
    let mut mux = StreamMultiplexer::new(out)
        .with_terminal(is_terminal)
        .with_width_query(width_query);
    if let Some(callback) = aux_callback {
        mux = mux.with_aux_callback(callback);
    }
    mux.display(reader)
}

/// [`display_stream`] with the terminal flag and width taken from `out`
pub fn display_to_output<R: Read, O: TerminalOutput>(
    reader: R,
    out: O,
    aux_callback: Option<&mut dyn FnMut(&Message)>,
) -> Result<()> {
    let is_terminal = out.is_terminal();
    let width_query = out.width_query();
    display_stream(reader, out, is_terminal, width_query, aux_callback)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{"status":"Pulling from library/alpine","id":"3.19"}
{"status":"Pulling fs layer","progressDetail":{},"id":"4abcf2066143"}
{"status":"Downloading","progressDetail":{"current":1024,"total":3400000},"id":"4abcf2066143"}
{"status":"Download complete","progressDetail":{},"id":"4abcf2066143"}
{"status":"Digest: sha256:c5b1261d6d3e43071626931fc004f70149baeba2c8ec672bd4f27761f8e1ad6b"}
{"aux":{"Digest":"sha256:c5b1"}}
"#;

    #[test]
    fn test_plain_output_is_a_log() {
        let mut out = Vec::new();
        display_to_output(INPUT.as_bytes(), Plain(&mut out), None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "3.19: Pulling from library/alpine\n\
             4abcf2066143: Pulling fs layer\n\
             4abcf2066143: Download complete\n\
             Digest: sha256:c5b1261d6d3e43071626931fc004f70149baeba2c8ec672bd4f27761f8e1ad6b\n"
        );
    }

    #[test]
    fn test_aux_callback_invoked_once() {
        let mut digests = Vec::new();
        let mut callback = |m: &Message| digests.push(m.aux.clone().unwrap());
        display_stream(
            INPUT.as_bytes(),
            io::sink(),
            false,
            WidthQuery::unavailable(),
            Some(&mut callback),
        )
        .unwrap();
        assert_eq!(digests, vec![serde_json::json!({"Digest": "sha256:c5b1"})]);
    }

    #[test]
    fn test_plain_wrapper_is_not_a_terminal() {
        let plain = Plain(Vec::new());
        assert!(!plain.is_terminal());
        assert_eq!(plain.width_query().query(), None);
    }
}
