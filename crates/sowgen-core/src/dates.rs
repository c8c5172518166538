//! Date parsing and display
//!
//! Dates travel through the model as plain strings. Workbooks may hold them as
//! serial numbers (days since 1899-12-30), which are converted to ISO form on
//! read. Documents show them long-form, e.g. `March 01, 2026`.

use chrono::{Duration, Local, NaiveDate};

/// Input formats tried in order
const INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Long display format
const DISPLAY_FORMAT: &str = "%B %d, %Y";

/// Parse a date string in any accepted input format
pub fn parse(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    // Timestamps written as "2026-03-01T00:00:00" or "2026-03-01 00:00:00"
    let value = value
        .split_once(|c| c == 'T' || c == ' ')
        .map(|(date, _)| date)
        .unwrap_or(value);
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Long-form display of a date string; unparseable input is returned unchanged
pub fn display_date(value: &str) -> String {
    match parse(value) {
        Some(date) => date.format(DISPLAY_FORMAT).to_string(),
        None => value.trim().to_string(),
    }
}

/// Convert a spreadsheet serial day number to an ISO date
pub fn serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.trunc() as i64))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Convert an ISO (or other accepted) date string to a spreadsheet serial day number
pub fn to_serial(value: &str) -> Option<f64> {
    let date = parse(value)?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days() as f64)
}

/// Today's date in display form
pub fn today() -> String {
    Local::now().date_naive().format(DISPLAY_FORMAT).to_string()
}
