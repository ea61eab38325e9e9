//! Progress fragment formatter
//!
//! Turns a [`Progress`] record into the text shown after the status on a live
//! row: an optional 50-cell bar, the byte or unit counters, and a naive
//! linear estimate of the time left.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::render::units::{format_duration, human_size};
use crate::stream::message::Progress;

/// Width assumed when the terminal cannot be queried
pub const DEFAULT_WIDTH: usize = 200;

/// Number of cells in a full bar
const BAR_CELLS: i64 = 50;

/// Bars are only drawn on terminals wider than this
const BAR_MIN_WIDTH: usize = 110;

/// The time-left estimate is only drawn on terminals wider than this
const ETA_MIN_WIDTH: usize = 50;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Source of the current time
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>);

impl Clock {
    /// Wrap an arbitrary time source
    pub fn new(now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self(Arc::new(now))
    }

    /// The system clock in UTC
    #[must_use]
    pub fn system() -> Self {
        Self::new(Utc::now)
    }

    /// A clock frozen at `at`
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::new(move || at)
    }

    /// Read the clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Clock")
    }
}

/// Query for the width of the output terminal, in columns
#[derive(Clone)]
pub struct WidthQuery(Arc<dyn Fn() -> Option<usize> + Send + Sync>);

impl WidthQuery {
    /// Wrap an arbitrary width source
    pub fn new(query: impl Fn() -> Option<usize> + Send + Sync + 'static) -> Self {
        Self(Arc::new(query))
    }

    /// Ask the controlling terminal for its size
    #[must_use]
    pub fn terminal() -> Self {
        Self::new(|| {
            crossterm::terminal::size()
                .ok()
                .map(|(columns, _)| usize::from(columns))
        })
    }

    /// Always report `columns`
    #[must_use]
    pub fn fixed(columns: usize) -> Self {
        Self::new(move || Some(columns))
    }

    /// Never answer; formatting falls back to [`DEFAULT_WIDTH`]
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(|| None)
    }

    /// Run the query
    #[must_use]
    pub fn query(&self) -> Option<usize> {
        (self.0)()
    }
}

impl Default for WidthQuery {
    fn default() -> Self {
        Self::terminal()
    }
}

impl fmt::Debug for WidthQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WidthQuery")
    }
}

/// Environment a progress record is formatted in
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Fixed width; takes precedence over the query when non-zero
    pub width: Option<usize>,
    /// Terminal width query; the real terminal is asked when unset
    pub width_query: Option<WidthQuery>,
    /// Time source for the estimate; the system clock when unset
    pub clock: Option<Clock>,
}

impl RenderContext {
    /// Effective width in columns, never failing
    #[must_use]
    pub fn width(&self) -> usize {
        if let Some(width) = self.width.filter(|w| *w != 0) {
            return width;
        }
        let answer = match &self.width_query {
            Some(query) => query.query(),
            None => WidthQuery::terminal().query(),
        };
        answer.filter(|w| *w != 0).unwrap_or(DEFAULT_WIDTH)
    }

    /// Current time according to the configured clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.as_ref().map_or_else(Utc::now, Clock::now)
    }
}

impl Progress {
    /// Render the progress fragment. Empty when there is nothing to show.
    #[must_use]
    pub fn format(&self) -> String {
        if self.current <= 0 && self.total <= 0 {
            return String::new();
        }
        if self.total <= 0 {
            return self.current_only();
        }

        let width = self.context.width();
        let percentage = self.percentage();
        let mut fragment = String::new();

        if width > BAR_MIN_WIDTH {
            fragment.push_str(&progress_bar(percentage));
        }
        if !self.hide_counts {
            fragment.push_str(&self.counters());
        }
        if self.current > 0 && self.start > 0 && percentage < BAR_CELLS && width > ETA_MIN_WIDTH {
            fragment.push(' ');
            fragment.push_str(&format_duration(self.seconds_left()));
        }
        fragment
    }

    /// Half the completed percentage, capped at a full bar
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn percentage(&self) -> i64 {
        let percent = (self.current as f64 / self.total as f64 * 100.0) as i64;
        (percent / 2).min(BAR_CELLS)
    }

    fn current_only(&self) -> String {
        if self.units.is_empty() {
            format!("{:>8}", human_size(self.current))
        } else {
            format!("{} {}", self.current, self.units)
        }
    }

    /// `current/total`, or just `current` when the producer overshot the total
    fn counters(&self) -> String {
        if self.current > self.total {
            return self.current_only();
        }
        if self.units.is_empty() {
            format!(
                "{:>8}/{}",
                human_size(self.current),
                human_size(self.total)
            )
        } else {
            format!("{}/{} {}", self.current, self.total, self.units)
        }
    }

    /// Remaining time extrapolated from the average time per unit so far
    #[allow(clippy::cast_possible_truncation)]
    fn seconds_left(&self) -> i64 {
        let now = self.context.now();
        let now_nanos =
            i128::from(now.timestamp()) * NANOS_PER_SECOND + i128::from(now.timestamp_subsec_nanos());
        let elapsed = now_nanos - i128::from(self.start) * NANOS_PER_SECOND;
        let per_unit = elapsed / i128::from(self.current);
        let left = i128::from(self.total - self.current).saturating_mul(per_unit);
        (left / NANOS_PER_SECOND).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// `[====>     ] ` with `filled` cells out of 50, always 50 cells wide
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn progress_bar(filled: i64) -> String {
    let filled = filled.clamp(0, BAR_CELLS) as usize;
    let empty = BAR_CELLS as usize - filled;
    format!("[{}>{}] ", "=".repeat(filled), " ".repeat(empty))
}
