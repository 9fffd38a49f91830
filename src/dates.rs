use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Result, SyncError};

/// Normalize an export timestamp such as `1/15/2023 10:00:00` to midnight UTC
/// of its calendar date.
///
/// The export always writes dates as `month/day/year`; the order is a format
/// contract and is never guessed. Anything after the first whitespace is
/// ignored. Two-digit years are read as 20YY; other lengths besides four are
/// rejected.
pub fn normalize(raw: &str) -> Result<DateTime<Utc>> {
    let malformed = || SyncError::MalformedDate(raw.to_string());

    let token = raw.split_whitespace().next().ok_or_else(malformed)?;
    let parts: Vec<&str> = token.split('/').collect();
    if parts.len() != 3 {
        return Err(malformed());
    }
    let m: u32 = parse_part(parts[0]).ok_or_else(malformed)?;
    let d: u32 = parse_part(parts[1]).ok_or_else(malformed)?;
    let y: i32 = parse_part(parts[2]).ok_or_else(malformed)?;
    let y = match parts[2].len() {
        2 => 2000 + y,
        4 => y,
        _ => return Err(malformed()),
    };

    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(malformed)
}

fn parse_part<T: std::str::FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
