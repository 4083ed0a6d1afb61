//! Additive trend + Fourier seasonality model.
//!
//! `y(t) = k * t + m + Σ seasonal(t)`, with `t` scaled to `[0, 1]` over the
//! history and each seasonal block expanded into `sin`/`cos` pairs of its period.
//! Coefficients come from a ridge-regularised least-squares fit; bounds use the
//! residual spread and widen with distance past the last observation.

use crate::error::AppError;
use crate::forecast::{
    Forecaster, ForecastPoint, Horizon, MIN_DISTINCT_DATES, TimePoint, count_distinct_dates,
    future_dates, prepare_observations,
};
use std::f64::consts::PI;
use time::OffsetDateTime;
use tracing::{debug, warn};

pub const YEARLY_PERIOD_DAYS: f64 = 365.25;
pub const WEEKLY_PERIOD_DAYS: f64 = 7.0;
pub const DAILY_PERIOD_DAYS: f64 = 1.0;

pub const DEFAULT_YEARLY_ORDER: usize = 10;
pub const DEFAULT_WEEKLY_ORDER: usize = 3;
pub const DEFAULT_DAILY_ORDER: usize = 4;
pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.80;
pub const DEFAULT_SEASONALITY_PRIOR_SCALE: f64 = 10.0;
/// Interval widths `z_score` has a quantile for.
pub const SUPPORTED_INTERVAL_WIDTHS: [f64; 5] = [0.50, 0.80, 0.90, 0.95, 0.99];
const DEFAULT_Z: f64 = 1.2816;

const TREND_PENALTY: f64 = 1e-8;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalitySettings {
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub daily_seasonality: bool,
    pub yearly_fourier_order: usize,
    pub interval_width: f64,
    pub seasonality_prior_scale: f64,
}

impl Default for SeasonalitySettings {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            weekly_seasonality: false,
            daily_seasonality: false,
            yearly_fourier_order: DEFAULT_YEARLY_ORDER,
            interval_width: DEFAULT_INTERVAL_WIDTH,
            seasonality_prior_scale: DEFAULT_SEASONALITY_PRIOR_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SeasonBlock {
    period_days: f64,
    order: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SeasonalAdditiveModel {
    settings: SeasonalitySettings,
}

impl SeasonalAdditiveModel {
    pub fn new(settings: SeasonalitySettings) -> Self {
        Self { settings }
    }

    pub fn with_defaults() -> Self {
        Self::new(SeasonalitySettings::default())
    }

    pub fn settings(&self) -> &SeasonalitySettings {
        &self.settings
    }

    fn season_blocks(&self) -> Vec<SeasonBlock> {
        let mut blocks = Vec::new();
        if self.settings.yearly_seasonality && self.settings.yearly_fourier_order > 0 {
            blocks.push(SeasonBlock {
                period_days: YEARLY_PERIOD_DAYS,
                order: self.settings.yearly_fourier_order,
            });
        }
        if self.settings.weekly_seasonality {
            blocks.push(SeasonBlock {
                period_days: WEEKLY_PERIOD_DAYS,
                order: DEFAULT_WEEKLY_ORDER,
            });
        }
        if self.settings.daily_seasonality {
            blocks.push(SeasonBlock {
                period_days: DAILY_PERIOD_DAYS,
                order: DEFAULT_DAILY_ORDER,
            });
        }
        blocks
    }
}

/// Fitted coefficients, kept in scaled units.
struct FittedModel {
    origin: OffsetDateTime,
    span_days: f64,
    y_scale: f64,
    blocks: Vec<SeasonBlock>,
    beta: Vec<f64>,
    sigma: f64,
}

impl FittedModel {
    fn design_row(&self, date: OffsetDateTime) -> Vec<f64> {
        design_row(date, self.origin, self.span_days, &self.blocks)
    }

    fn predict(&self, date: OffsetDateTime) -> f64 {
        let row = self.design_row(date);
        dot(&row, &self.beta) * self.y_scale
    }
}

impl Forecaster for SeasonalAdditiveModel {
    fn fit_and_forecast(
        &self,
        series: &[TimePoint],
        horizon: Horizon,
    ) -> Result<Vec<ForecastPoint>, AppError> {
        let horizon = horizon.validate()?;
        let observations = prepare_observations(series)?;
        let distinct = count_distinct_dates(&observations);
        if distinct < MIN_DISTINCT_DATES {
            return Err(AppError::InsufficientData {
                required: MIN_DISTINCT_DATES,
                actual: distinct,
            });
        }

        let fitted = self.fit(&observations);
        let z = z_score(self.settings.interval_width).unwrap_or_else(|| {
            warn!(
                interval_width = self.settings.interval_width,
                "Unsupported interval width, using 80% bounds"
            );
            DEFAULT_Z
        });
        debug!(
            observations = observations.len(),
            sigma = fitted.sigma,
            z,
            "Seasonal model fitted"
        );

        let mut points = Vec::with_capacity(observations.len() + horizon.periods);
        let history_margin = z * fitted.sigma;
        for (date, _) in &observations {
            let estimate = fitted.predict(*date);
            points.push(ForecastPoint {
                date: *date,
                point_estimate: estimate,
                lower_bound: estimate - history_margin,
                upper_bound: estimate + history_margin,
                is_forecast: false,
            });
        }

        let last = observations
            .last()
            .map(|(date, _)| *date)
            .ok_or(AppError::InsufficientData {
                required: MIN_DISTINCT_DATES,
                actual: 0,
            })?;
        let n = observations.len() as f64;
        for (step, date) in future_dates(last, horizon)?.into_iter().enumerate() {
            let estimate = fitted.predict(date);
            let h = (step + 1) as f64;
            let margin = z * fitted.sigma * (1.0 + h / n).sqrt();
            points.push(ForecastPoint {
                date,
                point_estimate: estimate,
                lower_bound: estimate - margin,
                upper_bound: estimate + margin,
                is_forecast: true,
            });
        }

        Ok(points)
    }
}

impl SeasonalAdditiveModel {
    fn fit(&self, observations: &[(OffsetDateTime, f64)]) -> FittedModel {
        let origin = observations[0].0;
        let end = observations[observations.len() - 1].0;
        let span_days = days_between(origin, end).max(f64::EPSILON);
        let y_scale = observations
            .iter()
            .map(|(_, y)| y.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let blocks = self.season_blocks();

        let x: Vec<Vec<f64>> = observations
            .iter()
            .map(|(date, _)| design_row(*date, origin, span_days, &blocks))
            .collect();
        let y: Vec<f64> = observations.iter().map(|(_, v)| v / y_scale).collect();

        let columns = x.first().map(Vec::len).unwrap_or(0);
        let seasonal_penalty = 1.0 / self.settings.seasonality_prior_scale.powi(2);
        let penalties: Vec<f64> = (0..columns)
            .map(|c| if c < 2 { TREND_PENALTY } else { seasonal_penalty })
            .collect();
        let beta = ridge_least_squares(&x, &y, &penalties);

        let sse: f64 = x
            .iter()
            .zip(&y)
            .map(|(row, yi)| {
                let resid = (yi - dot(row, &beta)) * y_scale;
                resid * resid
            })
            .sum();
        let sigma = (sse / observations.len() as f64).sqrt();

        FittedModel {
            origin,
            span_days,
            y_scale,
            blocks,
            beta,
            sigma,
        }
    }
}

fn days_between(from: OffsetDateTime, to: OffsetDateTime) -> f64 {
    (to - from).as_seconds_f64() / SECONDS_PER_DAY
}

/// `[1, t, sin(2π·1·d/P), cos(2π·1·d/P), ..]` for one timestamp.
fn design_row(
    date: OffsetDateTime,
    origin: OffsetDateTime,
    span_days: f64,
    blocks: &[SeasonBlock],
) -> Vec<f64> {
    let days = days_between(origin, date);
    let mut row = Vec::with_capacity(2 + blocks.iter().map(|b| 2 * b.order).sum::<usize>());
    row.push(1.0);
    row.push(days / span_days);
    for block in blocks {
        for n in 1..=block.order {
            let angle = 2.0 * PI * n as f64 * days / block.period_days;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
    row
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `(XᵀX + diag(penalties)) β = Xᵀy` by Gauss-Jordan elimination with
/// partial pivoting.
fn ridge_least_squares(x: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Vec<f64> {
    let p = penalties.len();
    if p == 0 {
        return Vec::new();
    }
    let mut a = vec![vec![0.0; p]; p];
    let mut b = vec![0.0; p];
    for (row, yi) in x.iter().zip(y) {
        for i in 0..p {
            b[i] += row[i] * yi;
            for j in 0..p {
                a[i][j] += row[i] * row[j];
            }
        }
    }
    for (d, penalty) in penalties.iter().enumerate() {
        a[d][d] += penalty;
    }

    for i in 0..p {
        let pivot_row = (i..p)
            .max_by(|&r, &s| a[r][i].abs().total_cmp(&a[s][i].abs()))
            .unwrap_or(i);
        if pivot_row != i {
            a.swap(i, pivot_row);
            b.swap(i, pivot_row);
        }
        let pivot = a[i][i];
        if pivot.abs() < 1e-12 {
            continue;
        }
        for j in i..p {
            a[i][j] /= pivot;
        }
        b[i] /= pivot;
        for r in 0..p {
            if r == i {
                continue;
            }
            let factor = a[r][i];
            if factor == 0.0 {
                continue;
            }
            for j in i..p {
                a[r][j] -= factor * a[i][j];
            }
            b[r] -= factor * b[i];
        }
    }
    b
}

/// Two-sided normal quantile for one of `SUPPORTED_INTERVAL_WIDTHS`.
pub fn z_score(interval_width: f64) -> Option<f64> {
    if !interval_width.is_finite() {
        return None;
    }
    match (interval_width * 100.0).round() as i32 {
        50 => Some(0.6745),
        80 => Some(DEFAULT_Z),
        90 => Some(1.6449),
        95 => Some(1.9600),
        99 => Some(2.5758),
        _ => None,
    }
}
