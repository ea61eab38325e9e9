//! Text rendering
//!
//! Progress fragments, single-message lines, and the terminal escape
//! sequences used to redraw them in place.

pub mod line;
pub mod progress;
pub mod terminal;
pub mod units;

pub use line::{format_timestamp, render_message};
pub use progress::{Clock, RenderContext, WidthQuery, DEFAULT_WIDTH};
pub use terminal::{
    capabilities_from_env, resolve_capabilities, Capabilities, Capability, NoCapabilities,
    TermInfoCapabilities,
};
