use crate::estimation::linear::LinearModel;
use crate::estimation::model::EstimationModel;
use crate::forecast::{DEFAULT_HORIZON_PERIODS, ForecastPoint, Forecaster, SeasonalAdditiveModel};
use std::sync::Arc;
use std::time::SystemTime;

/// Result of the most recent explicitly requested forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSnapshot {
    pub points: Vec<ForecastPoint>,
    pub observations: usize,
    pub computed_at: SystemTime,
}

#[derive(Debug)]
pub struct AppState {
    model: Arc<dyn EstimationModel>,
    forecaster: Arc<dyn Forecaster>,
    horizon_periods: usize,
    imputation_seed: Option<u64>,
    forecast: Option<ForecastSnapshot>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            model: Arc::new(LinearModel::with_defaults()),
            forecaster: Arc::new(SeasonalAdditiveModel::with_defaults()),
            horizon_periods: DEFAULT_HORIZON_PERIODS,
            imputation_seed: None,
            forecast: None,
        }
    }

    pub fn model(&self) -> &Arc<dyn EstimationModel> {
        &self.model
    }

    pub fn set_model(&mut self, model: Arc<dyn EstimationModel>) {
        self.model = model;
    }

    pub fn forecaster(&self) -> &Arc<dyn Forecaster> {
        &self.forecaster
    }

    pub fn set_forecaster(&mut self, forecaster: Arc<dyn Forecaster>) {
        self.forecaster = forecaster;
    }

    pub fn horizon_periods(&self) -> usize {
        self.horizon_periods
    }

    pub fn set_horizon_periods(&mut self, periods: usize) {
        self.horizon_periods = periods;
    }

    pub fn imputation_seed(&self) -> Option<u64> {
        self.imputation_seed
    }

    pub fn set_imputation_seed(&mut self, seed: Option<u64>) {
        self.imputation_seed = seed;
    }

    pub fn forecast(&self) -> Option<&ForecastSnapshot> {
        self.forecast.as_ref()
    }

    /// Replace the cached forecast served by `GET /api/forecast`.
    pub fn set_forecast(&mut self, snapshot: ForecastSnapshot) {
        self.forecast = Some(snapshot);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
