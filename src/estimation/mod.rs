use crate::error::AppError;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub mod linear;
pub mod model;

use linear::{LinearModel, LinearParams};
use model::{EstimationModel, OrderSizeEstimate};

// Model Factory
pub fn create_model(
    config: &CalibrationFile,
) -> Result<Box<dyn EstimationModel>, CalibrationError> {
    match config.model.as_str() {
        "linear" => {
            let params: LinearParams = if config.params.is_null() {
                LinearParams::default()
            } else {
                serde_json::from_value(config.params.clone())?
            };
            validate_linear(&params)?;
            Ok(Box::new(LinearModel::new(params)))
        }
        other => Err(CalibrationError::Invalid(format!("unknown model: {other}"))),
    }
}

fn validate_linear(params: &LinearParams) -> Result<(), CalibrationError> {
    if params.min_quantity == 0 || params.min_quantity > params.max_quantity {
        return Err(CalibrationError::Invalid(format!(
            "quantity range [{}, {}] must be non-empty and start at 1 or above",
            params.min_quantity, params.max_quantity
        )));
    }
    if params.moderate_above_minutes > params.critical_above_minutes {
        return Err(CalibrationError::Invalid(
            "moderate threshold exceeds critical threshold".to_string(),
        ));
    }
    if !params.slope.is_finite() || !params.intercept.is_finite() {
        return Err(CalibrationError::Invalid(
            "slope and intercept must be finite".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CalibrationFile {
    pub model: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse calibration file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid calibration: {0}")]
    Invalid(String),
}

pub fn load_calibration_from_path(
    path: impl AsRef<Path>,
) -> Result<Box<dyn EstimationModel>, CalibrationError> {
    let contents = std::fs::read_to_string(path)?;
    let config: CalibrationFile = serde_json::from_str(&contents)?;
    create_model(&config)
}

/// Estimate with the default regression coefficients.
pub fn estimate_wait_time(quantity: u32) -> Result<OrderSizeEstimate, AppError> {
    LinearModel::with_defaults().estimate(quantity)
}

/// Estimate from an unvalidated, possibly negative, quantity.
pub fn estimate_raw_quantity(
    model: &dyn EstimationModel,
    quantity: i64,
) -> Result<OrderSizeEstimate, AppError> {
    match u32::try_from(quantity) {
        Ok(quantity) => model.estimate(quantity),
        Err(_) => {
            let (min, max) = model.quantity_range();
            Err(AppError::InvalidQuantity { quantity, min, max })
        }
    }
}
