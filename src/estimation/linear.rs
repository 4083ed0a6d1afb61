//! Linear regression estimator for order preparation time.
//!
//! Formula: estimated_minutes = intercept + slope * quantity

use crate::error::AppError;
use crate::estimation::model::{EstimationModel, OrderSizeEstimate, RiskThresholds};
use serde::Deserialize;

pub const DEFAULT_INTERCEPT: f64 = -0.21;
pub const DEFAULT_SLOPE: f64 = 2.07;
pub const DEFAULT_MIN_QUANTITY: u32 = 1;
pub const DEFAULT_MAX_QUANTITY: u32 = 50;
/// Beyond this order size the regression underestimates real preparation time.
pub const DEFAULT_ADVISORY_ABOVE_QUANTITY: u32 = 12;

/// Linear model parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    pub intercept: f64,
    pub slope: f64,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub moderate_above_minutes: f64,
    pub critical_above_minutes: f64,
    pub advisory_above_quantity: u32,
}

impl Default for LinearParams {
    fn default() -> Self {
        let thresholds = RiskThresholds::default();
        Self {
            intercept: DEFAULT_INTERCEPT,
            slope: DEFAULT_SLOPE,
            min_quantity: DEFAULT_MIN_QUANTITY,
            max_quantity: DEFAULT_MAX_QUANTITY,
            moderate_above_minutes: thresholds.moderate_above_minutes,
            critical_above_minutes: thresholds.critical_above_minutes,
            advisory_above_quantity: DEFAULT_ADVISORY_ABOVE_QUANTITY,
        }
    }
}

/// Linear estimation model.
///
/// Computes preparation time using: `minutes = intercept + slope * quantity`
#[derive(Debug)]
pub struct LinearModel {
    pub params: LinearParams,
}

impl LinearModel {
    pub fn new(params: LinearParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(LinearParams::default())
    }

    fn thresholds(&self) -> RiskThresholds {
        RiskThresholds {
            moderate_above_minutes: self.params.moderate_above_minutes,
            critical_above_minutes: self.params.critical_above_minutes,
        }
    }
}

impl EstimationModel for LinearModel {
    fn estimate(&self, quantity: u32) -> Result<OrderSizeEstimate, AppError> {
        let (min, max) = self.quantity_range();
        if quantity < min || quantity > max {
            return Err(AppError::InvalidQuantity {
                quantity: i64::from(quantity),
                min,
                max,
            });
        }

        let estimated_minutes = self.params.intercept + self.params.slope * f64::from(quantity);

        Ok(OrderSizeEstimate {
            quantity,
            estimated_minutes,
            risk_tier: self.thresholds().classify(estimated_minutes),
            advisory: quantity > self.params.advisory_above_quantity,
        })
    }

    fn quantity_range(&self) -> (u32, u32) {
        (self.params.min_quantity, self.params.max_quantity)
    }
}
