//! Estimation model trait for order preparation time.
//!
//! Models are selected via the calibration file and loaded at startup.

use crate::error::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Optimal,
    Moderate,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSizeEstimate {
    pub quantity: u32,
    pub estimated_minutes: f64,
    pub risk_tier: RiskTier,
    /// Raised when the model is known to underestimate for this order size.
    pub advisory: bool,
}

/// Thresholds (minutes) separating the risk tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    /// Above this the estimate is at least `Moderate`.
    pub moderate_above_minutes: f64,
    /// Above this the estimate is `Critical`.
    pub critical_above_minutes: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate_above_minutes: 12.0,
            critical_above_minutes: 25.0,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, minutes: f64) -> RiskTier {
        if minutes > self.critical_above_minutes {
            RiskTier::Critical
        } else if minutes > self.moderate_above_minutes {
            RiskTier::Moderate
        } else {
            RiskTier::Optimal
        }
    }
}

/// Trait for models that map an order size to an estimated preparation time.
///
/// Implement this trait to add new estimation models. The model is selected
/// via the `model` field in `calibration.json`.
pub trait EstimationModel: Send + Sync + std::fmt::Debug {
    /// Estimate preparation time for an order of `quantity` items.
    fn estimate(&self, quantity: u32) -> Result<OrderSizeEstimate, AppError>;

    /// Inclusive range of quantities this model accepts.
    fn quantity_range(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exclusive_lower_inclusive_upper() {
        let thresholds = RiskThresholds::default();

        assert_eq!(thresholds.classify(12.0), RiskTier::Optimal);
        assert_eq!(thresholds.classify(12.01), RiskTier::Moderate);
        assert_eq!(thresholds.classify(25.0), RiskTier::Moderate);
        assert_eq!(thresholds.classify(25.01), RiskTier::Critical);
    }

    #[test]
    fn risk_tier_serializes_screaming_snake_case() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&RiskTier::Optimal)?, "\"OPTIMAL\"");
        assert_eq!(serde_json::to_string(&RiskTier::Critical)?, "\"CRITICAL\"");
        Ok(())
    }
}
