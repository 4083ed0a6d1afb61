//! Fractional-year timestamps.
//!
//! A fractional year encodes `year + fraction_of_year_elapsed`, where the
//! fraction is measured against a fixed 365.25-day year. The approximation is
//! not calendar-aware and must stay that way so stored forecasts keep lining up.

use crate::error::AppError;
use time::{Date, Duration, Month, OffsetDateTime, Time};

pub const DAYS_PER_YEAR: f64 = 365.25;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Convert a fractional year into a UTC timestamp.
///
/// The offset is exactly `fraction × 365.25 days` from Jan 1, with no calendar
/// correction. The one exception: in a 365-day year, fractions above
/// `365 / 365.25` would land in the next year, so they are clamped to
/// Dec 31 23:59:59. Keeping the year is the invariant; the approximation is
/// preserved for every input that stays inside it.
pub fn reconstruct_date(fractional_year: f64) -> Result<OffsetDateTime, AppError> {
    if !fractional_year.is_finite() {
        return Err(AppError::DateConversion(format!(
            "fractional year must be finite, got {fractional_year}"
        )));
    }
    if fractional_year < 0.0 {
        return Err(AppError::DateConversion(format!(
            "fractional year must be non-negative, got {fractional_year}"
        )));
    }

    let year_floor = fractional_year.floor();
    if year_floor > i32::MAX as f64 {
        return Err(AppError::DateConversion(format!(
            "year out of range: {year_floor}"
        )));
    }
    let year = year_floor as i32;
    let remainder = fractional_year - year_floor;

    let start = year_start(year)?;
    let last_second = year_last_second(year)?;
    let offset = Duration::seconds_f64(remainder * DAYS_PER_YEAR * SECONDS_PER_DAY);

    match start.checked_add(offset) {
        Some(candidate) if candidate <= last_second => Ok(candidate),
        _ => Ok(last_second),
    }
}

fn year_last_second(year: i32) -> Result<OffsetDateTime, AppError> {
    let date = Date::from_calendar_date(year, Month::December, 31)
        .map_err(|err| AppError::DateConversion(format!("year {year}: {err}")))?;
    let time = Time::from_hms(23, 59, 59)
        .map_err(|err| AppError::DateConversion(format!("year {year}: {err}")))?;
    Ok(date.with_time(time).assume_utc())
}

/// Parse textual input (e.g. a CSV cell) and reconstruct its date.
pub fn parse_fractional_year(raw: &str) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| AppError::DateConversion(format!("not a number: {trimmed:?}")))?;
    reconstruct_date(value)
}

/// Midnight UTC on January 1st of `year`.
pub fn year_start(year: i32) -> Result<OffsetDateTime, AppError> {
    let date = Date::from_calendar_date(year, Month::January, 1)
        .map_err(|err| AppError::DateConversion(format!("year {year}: {err}")))?;
    Ok(date.with_time(Time::MIDNIGHT).assume_utc())
}
