use crate::error::{CompileError, Result};
use crate::models::DateRange;
use chrono::NaiveDate;
use std::path::Path;

/// Input date format for compile windows.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date string
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| CompileError::InvalidDateFormat(value.to_string()))
}

/// Parses both ends of an inclusive window. The start is checked first.
pub fn parse_date_range(start: &str, end: &str) -> Result<DateRange> {
    Ok(DateRange::new(parse_date(start)?, parse_date(end)?))
}

/// Local file name for an object key: the last `/`-separated segment.
///
/// Returns `None` for folder markers (`reports/`) and for segments that
/// would escape the staging directory (`.`, `..`).
pub fn staged_file_name(key: &str) -> Option<&str> {
    let name = key.rsplit('/').next().unwrap_or("");

    match name {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

/// Whether a staged file should be picked up by the loader
pub fn is_csv_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}
