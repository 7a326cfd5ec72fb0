//! Parsing of free-text time cells from the schedule sheet.
//!
//! Cells arrive as strings like `"2:30PM"`, `"9:00"`, `"TBD"` or blank.
//! A cell without any digits means "no time scheduled" and maps to the
//! end-of-day sentinel so such rows sort last and age out naturally.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Returned when a time cell carries no parseable digits at all.
pub const END_OF_DAY: (u32, u32) = (23, 59);

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    // hour before the colon, then whatever the sheet author typed after
    // it ("30PM", "00", "30 pm"); the tail is picked apart below
    Regex::new(r"^\s*(\d+):(.*)$").unwrap()
});

#[derive(Debug, Error, PartialEq)]
pub enum TimeFieldError {
    #[error("malformed time cell: {0:?}")]
    Malformed(String),
}

/// Check if a string has any digit in it.
pub fn has_digits(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Parse a time cell into `(hour, minute)` on a 24-hour clock.
///
/// A cell with no digits returns [`END_OF_DAY`]. A `PM` suffix
/// (case-insensitive) adds 12 to the hour unless the hour is already 12.
/// `12AM` is deliberately not mapped to hour 0: the sheet has never
/// encoded midnight that way, and the convention is preserved as-is.
pub fn parse(text: &str) -> Result<(u32, u32), TimeFieldError> {
    if !has_digits(text) {
        return Ok(END_OF_DAY);
    }

    let caps = TIME_RE
        .captures(text)
        .ok_or_else(|| TimeFieldError::Malformed(text.to_string()))?;

    let mut hour: u32 = caps[1]
        .parse()
        .map_err(|_| TimeFieldError::Malformed(text.to_string()))?;

    // Minute is the first two characters after the colon; the meridiem
    // is the last two ("2:30PM", "2:30 pm"). Anything that fails the
    // numeric conversion is reported so the caller can skip the row.
    let after_colon = &caps[2];
    let minute_str: String = after_colon.chars().take(2).collect();
    let minute: u32 = minute_str
        .parse()
        .map_err(|_| TimeFieldError::Malformed(text.to_string()))?;

    let suffix: String = {
        let chars: Vec<char> = after_colon.chars().collect();
        chars[chars.len().saturating_sub(2)..].iter().collect()
    };
    if suffix.eq_ignore_ascii_case("PM") && hour != 12 {
        hour += 12;
    }

    Ok((hour, minute))
}
