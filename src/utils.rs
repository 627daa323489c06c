/// Utility functions for device ids and timestamp formatting
use log::warn;
use std::num::ParseIntError;
use thiserror::Error;
use time::{format_description, Date, OffsetDateTime, UtcOffset};

/// Upper-case hex form of a signed 32-bit id, negative values wrap to two's complement
pub fn tohex_i32(val: i32) -> String {
    format!("{:X}", val as u32)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("device id {0:?} must not carry a sign")]
    Signed(String),
    #[error(transparent)]
    Digits(#[from] ParseIntError),
}

/// Inverse of [`tohex_i32`], accepts 1 to 8 hex digits and an optional `0x` prefix
pub fn toint_i32(val: &str) -> Result<i32, IdParseError> {
    let val = val.trim();
    let digits = val
        .strip_prefix("0x")
        .or_else(|| val.strip_prefix("0X"))
        .unwrap_or(val);
    // from_str_radix tolerates a leading sign
    if digits.starts_with(['+', '-']) {
        return Err(IdParseError::Signed(val.to_string()));
    }
    Ok(u32::from_str_radix(digits, 16)? as i32)
}

/// Convert an epoch timestamp into wall-clock time at `offset`
///
/// Timestamps outside the representable range clamp to the epoch.
pub fn local_datetime(ts: i64, offset: UtcOffset) -> OffsetDateTime {
    match OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => dt.to_offset(offset),
        Err(e) => {
            warn!("Timestamp {} out of range: {}", ts, e);
            OffsetDateTime::UNIX_EPOCH.to_offset(offset)
        }
    }
}

/// Calendar date of `ts` at `offset`
pub fn local_date(ts: i64, offset: UtcOffset) -> Date {
    local_datetime(ts, offset).date()
}

/// Format a timestamp as YYYY/MM/DD HH:MM:SS
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[year]/[month]/[day] [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Format a date as YYYY/MM/DD
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}/{:02}/{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Hour and minute of `ts` at `offset`, used for chart axes
pub fn format_hour_minute(ts: i64, offset: UtcOffset) -> String {
    let dt = local_datetime(ts, offset);
    format!("{:02}:{:02}", dt.hour(), dt.minute())
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(s: &str) -> Result<Date, String> {
    let format = format_description::parse("[year]-[month]-[day]").map_err(|e| e.to_string())?;
    Date::parse(s.trim(), &format).map_err(|e| format!("invalid date '{}': {}", s, e))
}

/// Parse a `+HH:MM` / `-HH:MM` offset
pub fn parse_utc_offset(s: &str) -> Result<UtcOffset, String> {
    let format = format_description::parse("[offset_hour sign:mandatory]:[offset_minute]")
        .map_err(|e| e.to_string())?;
    UtcOffset::parse(s.trim(), &format).map_err(|e| format!("invalid UTC offset '{}': {}", s, e))
}
