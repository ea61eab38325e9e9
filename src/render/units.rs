//! Human-readable sizes and durations

/// Decimal size suffixes, one per power of 1000
const DECIMAL_UNITS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

const SIGNIFICANT_DIGITS: i32 = 4;

/// Format a byte count with decimal units and four significant digits.
///
/// `50` → `50B`, `1_500_000` → `1.5MB`, `1_234_567` → `1.235MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(size: i64) -> String {
    let mut value = size as f64;
    let mut unit = DECIMAL_UNITS[0];
    for next in &DECIMAL_UNITS[1..] {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{}{unit}", significant(value))
}

/// Render `value` with at most four significant digits, trailing zeros trimmed
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn significant(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let integer_digits = value.abs().log10().floor() as i32 + 1;
    let decimals = (SIGNIFICANT_DIGITS - integer_digits).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Format whole seconds as a compact duration: `0s`, `45s`, `1m30s`, `2h0m5s`
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}
