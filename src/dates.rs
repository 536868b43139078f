//! Due-date parsing and rendering.
//!
//! Formats are tried in a fixed order: `DD/MM/YYYY` first, then
//! `YYYY-MM-DD`. The format is never inferred from the content shape; the
//! first pattern that parses wins. Both formats require a four-digit year;
//! chrono's `%Y` alone would read `01/01/20` as year 20.

use chrono::NaiveDate;

use crate::constants::dates::{DISPLAY_FORMAT, ISO_FORMAT, PARSE_ORDER};

/// Parse a due date written as `DD/MM/YYYY` or `YYYY-MM-DD`.
///
/// Surrounding whitespace is ignored. Returns `None` when no format matches.
pub fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    PARSE_ORDER
        .iter()
        .find_map(|format| parse_with(trimmed, format))
}

/// Parse a user-entered date, which must use the `DD/MM/YYYY` display convention.
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    parse_with(value.trim(), DISPLAY_FORMAT)
}

fn parse_with(value: &str, format: &str) -> Option<NaiveDate> {
    if !has_four_digit_year(value, format) {
        return None;
    }
    NaiveDate::parse_from_str(value, format).ok()
}

/// Day-first dates carry the year last; ISO dates carry it first.
fn has_four_digit_year(value: &str, format: &str) -> bool {
    let (separator, year_idx) = if format == DISPLAY_FORMAT {
        ('/', 2)
    } else {
        ('-', 0)
    };
    let parts: Vec<&str> = value.split(separator).collect();
    parts.len() == 3
        && parts[year_idx].len() == 4
        && parts[year_idx].bytes().all(|byte| byte.is_ascii_digit())
}

/// Render a date using the `DD/MM/YYYY` display convention.
pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Render a date using the `YYYY-MM-DD` at-rest convention.
pub fn format_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Render a raw stored value for display, keeping it verbatim when unparseable.
pub fn display_raw(value: &str) -> String {
    match parse_due_date(value) {
        Some(date) => format_display(date),
        None => value.trim().to_string(),
    }
}

/// Normalize a raw stored value to ISO, keeping it verbatim when unparseable.
pub fn normalize_to_iso(value: &str) -> String {
    match parse_due_date(value) {
        Some(date) => format_iso(date),
        None => value.trim().to_string(),
    }
}
