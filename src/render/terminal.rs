//! Terminal capability set and cursor primitives
//!
//! The live display needs four escape sequences: clear to line start, clear
//! to line end, cursor up `n`, cursor down `n`. A [`Capabilities`] set answers
//! them for the active terminal type from the compiled terminfo database.
//! When it cannot, the primitives fall back to plain ANSI CSI sequences, so a
//! failed lookup degrades the output but never fails it.

use std::fmt;
use std::io::Write;
use std::path::Path;

use log::debug;
use terminfo::{capability as cap, Database};

use crate::error::Result;

/// Terminal type assumed when `TERM` is unset
pub const DEFAULT_TERM: &str = "vt102";

/// Environment variable naming the terminal type
pub const TERM_ENV: &str = "TERM";

/// An escape sequence the live display can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Erase from the start of the line to the cursor (`el1`)
    ClearToLineStart,
    /// Erase from the cursor to the end of the line (`el`)
    ClearToLineEnd,
    /// Move the cursor up `n` rows (`cuu`)
    CursorUp(usize),
    /// Move the cursor down `n` rows (`cud`)
    CursorDown(usize),
}

impl Capability {
    /// Hard-coded CSI sequence used when the capability set has no answer
    #[must_use]
    pub fn fallback(self) -> String {
        match self {
            Self::ClearToLineStart => "\x1b[1K".to_string(),
            Self::ClearToLineEnd => "\x1b[K".to_string(),
            Self::CursorUp(rows) => format!("\x1b[{rows}A"),
            Self::CursorDown(rows) => format!("\x1b[{rows}B"),
        }
    }
}

/// Escape-sequence lookup for one terminal type
pub trait Capabilities: fmt::Debug {
    /// The sequence for `capability`, or `None` when unsupported
    fn sequence(&self, capability: Capability) -> Option<String>;
}

/// Capability set read from a terminfo entry
#[derive(Debug, Clone)]
pub struct TermInfoCapabilities {
    database: Database,
}

impl TermInfoCapabilities {
    /// Look `term` up in the system terminfo directories
    pub fn from_name(term: &str) -> Result<Self> {
        Ok(Self {
            database: Database::from_name(term)?,
        })
    }

    /// Load a compiled terminfo entry from a file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            database: Database::from_path(path)?,
        })
    }

    /// Primary name of the terminfo entry
    #[must_use]
    pub fn name(&self) -> &str {
        self.database.name()
    }
}

impl Capabilities for TermInfoCapabilities {
    fn sequence(&self, capability: Capability) -> Option<String> {
        let expanded = match capability {
            Capability::ClearToLineStart => self.database.get::<cap::ClrBol>()?.expand().to_vec(),
            Capability::ClearToLineEnd => self.database.get::<cap::ClrEol>()?.expand().to_vec(),
            Capability::CursorUp(rows) => {
                let rows = u32::try_from(rows).ok()?;
                self.database
                    .get::<cap::ParmUpCursor>()?
                    .expand()
                    .parameters(rows)
                    .to_vec()
            }
            Capability::CursorDown(rows) => {
                let rows = u32::try_from(rows).ok()?;
                self.database
                    .get::<cap::ParmDownCursor>()?
                    .expand()
                    .parameters(rows)
                    .to_vec()
            }
        };
        String::from_utf8(strip_padding(&expanded.ok()?)).ok()
    }
}

/// Canary capability set: every lookup fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoCapabilities;

impl Capabilities for NoCapabilities {
    fn sequence(&self, _capability: Capability) -> Option<String> {
        None
    }
}

/// Remove `$<n>` delay specifications from an expanded string
fn strip_padding(sequence: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(sequence.len());
    let mut rest = sequence;
    while let Some((&byte, tail)) = rest.split_first() {
        if byte == b'$' && tail.first() == Some(&b'<') {
            if let Some(close) = tail.iter().position(|b| *b == b'>') {
                rest = &tail[close + 1..];
                continue;
            }
        }
        out.push(byte);
        rest = tail;
    }
    out
}

/// Resolve the capability set for terminal type `term` (`vt102` when unset).
///
/// Types with no terminfo entry get [`NoCapabilities`]; this never fails.
#[must_use]
pub fn resolve_capabilities(term: Option<&str>) -> Box<dyn Capabilities> {
    let term = term.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TERM);
    match TermInfoCapabilities::from_name(term) {
        Ok(caps) => {
            debug!("using terminfo entry '{}' for terminal type '{term}'", caps.name());
            Box::new(caps)
        }
        Err(err) => {
            debug!("no terminfo entry for '{term}' ({err}), using CSI fallbacks");
            Box::new(NoCapabilities)
        }
    }
}

/// Resolve the capability set from the `TERM` environment variable
#[must_use]
pub fn capabilities_from_env() -> Box<dyn Capabilities> {
    let term = std::env::var(TERM_ENV).ok();
    resolve_capabilities(term.as_deref())
}

fn emit<W: Write + ?Sized>(
    out: &mut W,
    caps: &dyn Capabilities,
    capability: Capability,
) -> std::io::Result<()> {
    let sequence = caps
        .sequence(capability)
        .unwrap_or_else(|| capability.fallback());
    out.write_all(sequence.as_bytes())
}

/// Erase the whole current line: to the start, then to the end
pub fn clear_line<W: Write + ?Sized>(out: &mut W, caps: &dyn Capabilities) -> std::io::Result<()> {
    emit(out, caps, Capability::ClearToLineStart)?;
    emit(out, caps, Capability::ClearToLineEnd)
}

/// Move the cursor up `rows` rows; zero rows writes nothing
pub fn cursor_up<W: Write + ?Sized>(
    out: &mut W,
    caps: &dyn Capabilities,
    rows: usize,
) -> std::io::Result<()> {
    if rows == 0 {
        return Ok(());
    }
    emit(out, caps, Capability::CursorUp(rows))
}

/// Move the cursor down `rows` rows; zero rows writes nothing
pub fn cursor_down<W: Write + ?Sized>(
    out: &mut W,
    caps: &dyn Capabilities,
    rows: usize,
) -> std::io::Result<()> {
    if rows == 0 {
        return Ok(());
    }
    emit(out, caps, Capability::CursorDown(rows))
}
