//! Seasonal forecasting of visit counts.
//!
//! Callers depend on the `Forecaster` trait; `SeasonalAdditiveModel` is the only
//! backend today. Fitting is expensive relative to everything else in the crate
//! and is only run when explicitly requested.

use crate::dates::reconstruct_date;
use crate::error::AppError;
use serde::Deserialize;
use time::{Date, Month, OffsetDateTime, Time};

pub mod seasonal;

pub use seasonal::{SeasonalAdditiveModel, SeasonalitySettings};

pub const DEFAULT_HORIZON_PERIODS: usize = 3;
/// Ten years of month ends.
pub const MAX_HORIZON_PERIODS: usize = 120;
pub const MIN_DISTINCT_DATES: usize = 2;

/// One historical observation keyed by fractional year.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TimePoint {
    pub fractional_year: f64,
    pub visit_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub date: OffsetDateTime,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// True for points appended after the last observed date.
    pub is_forecast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HorizonFreq {
    #[default]
    MonthEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub periods: usize,
    pub freq: HorizonFreq,
}

impl Horizon {
    /// Reject horizons longer than `MAX_HORIZON_PERIODS` before anything is allocated for them.
    pub fn validate(self) -> Result<Self, AppError> {
        if self.periods > MAX_HORIZON_PERIODS {
            return Err(AppError::InvalidHorizon {
                requested: self.periods,
                max: MAX_HORIZON_PERIODS,
            });
        }
        Ok(self)
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self {
            periods: DEFAULT_HORIZON_PERIODS,
            freq: HorizonFreq::MonthEnd,
        }
    }
}

/// A backend able to fit a visit series and project it forward.
pub trait Forecaster: Send + Sync + std::fmt::Debug {
    /// Fit on `series` and return fitted history followed by `horizon` future points.
    fn fit_and_forecast(
        &self,
        series: &[TimePoint],
        horizon: Horizon,
    ) -> Result<Vec<ForecastPoint>, AppError>;
}

/// Fit the default seasonal-additive model and forecast `horizon_periods` ahead.
pub fn fit_and_forecast(
    series: &[TimePoint],
    horizon_periods: usize,
    freq: HorizonFreq,
) -> Result<Vec<ForecastPoint>, AppError> {
    let model = SeasonalAdditiveModel::with_defaults();
    model.fit_and_forecast(
        series,
        Horizon {
            periods: horizon_periods,
            freq,
        },
    )
}

/// Reconstruct dates and sort ascending. Non-finite visit counts are dropped.
pub(crate) fn prepare_observations(
    series: &[TimePoint],
) -> Result<Vec<(OffsetDateTime, f64)>, AppError> {
    let mut observations = Vec::with_capacity(series.len());
    let mut dropped = 0usize;
    for point in series {
        let date = reconstruct_date(point.fractional_year)?;
        if point.visit_count.is_finite() {
            observations.push((date, point.visit_count));
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, "Ignoring observations with non-finite visit counts");
    }
    observations.sort_by_key(|(date, _)| *date);
    Ok(observations)
}

pub(crate) fn count_distinct_dates(observations: &[(OffsetDateTime, f64)]) -> usize {
    let mut distinct = 0usize;
    let mut previous: Option<OffsetDateTime> = None;
    for (date, _) in observations {
        if previous != Some(*date) {
            distinct += 1;
            previous = Some(*date);
        }
    }
    distinct
}

/// Future timestamps strictly after `last` at the requested frequency.
pub fn future_dates(
    last: OffsetDateTime,
    horizon: Horizon,
) -> Result<Vec<OffsetDateTime>, AppError> {
    let horizon = horizon.validate()?;
    match horizon.freq {
        HorizonFreq::MonthEnd => month_ends_after(last, horizon.periods),
    }
}

fn month_ends_after(last: OffsetDateTime, periods: usize) -> Result<Vec<OffsetDateTime>, AppError> {
    let mut dates = Vec::with_capacity(periods);
    let (mut year, mut month) = (last.year(), last.month());
    let mut candidate = month_end(year, month)?;
    if candidate <= last {
        (year, month) = next_month(year, month);
        candidate = month_end(year, month)?;
    }
    while dates.len() < periods {
        dates.push(candidate);
        (year, month) = next_month(year, month);
        candidate = month_end(year, month)?;
    }
    Ok(dates)
}

fn month_end(year: i32, month: Month) -> Result<OffsetDateTime, AppError> {
    let day = time::util::days_in_year_month(year, month);
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|err| AppError::DateConversion(format!("month end {year}-{month}: {err}")))?;
    Ok(date.with_time(Time::MIDNIGHT).assume_utc())
}

fn next_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::December => (year + 1, Month::January),
        other => (year, other.next()),
    }
}
