use crate::estimation::model::RiskTier;
use crate::imputation::{ImputationStrategy, QuantityRecord};
use crate::insights::{HistogramBin, SalesSummary};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoData,
    InsufficientData,
    InvalidQuantity,
    MissingColumn,
    DateConversion,
    InvalidStrategy,
    InvalidHorizon,
    InternalError,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub forecast_cached: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WaitTimeSuccessResponse {
    pub quantity: u32,
    pub estimated_minutes: f64,
    pub risk_tier: RiskTier,
    pub advisory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_message: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DateSuccessResponse {
    pub fractional_year: String,
    pub date: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ForecastPointResponse {
    pub date: String,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub is_forecast: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ForecastSuccessResponse {
    pub observations: usize,
    pub horizon_periods: usize,
    pub points: Vec<ForecastPointResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ImputationSuccessResponse {
    pub strategy: ImputationStrategy,
    pub filled: usize,
    pub imputed_histogram: Vec<HistogramBin>,
    pub zoom_histogram: Vec<HistogramBin>,
    pub records: Vec<QuantityRecord>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InsightsSuccessResponse {
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub timestamp: String,
}
