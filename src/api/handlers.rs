use crate::api::responses::{
    DateSuccessResponse, ErrorCode, ErrorResponse, ForecastPointResponse, ForecastSuccessResponse,
    HealthStatus, HealthSuccessResponse, ImputationSuccessResponse, InsightsSuccessResponse,
    WaitTimeSuccessResponse,
};
use crate::dates::parse_fractional_year;
use crate::error::AppError;
use crate::estimation::estimate_raw_quantity;
use crate::forecast::{Horizon, HorizonFreq, TimePoint};
use crate::imputation::{
    ImputationStrategy, QuantityRecord, RecordSet, imputed_histogram,
    reconstruct_missing_quantities,
};
use crate::insights::{
    DEFAULT_HISTOGRAM_MAX, HistogramBin, SalesTable, quantity_histogram, summarize_sales,
};
use crate::state::{AppState, ForecastSnapshot};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const ADVISORY_MESSAGE: &str =
    "The linear model tends to underestimate preparation time for orders of this size";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success(T),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WaitTimeQuery {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub fractional_year: String,
}

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub series: Vec<TimePoint>,
    #[serde(default)]
    pub horizon_periods: Option<usize>,
    #[serde(default)]
    pub horizon_freq: HorizonFreq,
}

#[derive(Debug, Deserialize)]
pub struct ImputationRequest {
    pub headers: Vec<String>,
    pub records: Vec<QuantityRecord>,
    pub strategy: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

pub async fn get_health(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_health_response(&state, SystemTime::now())
}

pub async fn get_wait_time(
    State(state): State<Arc<RwLock<AppState>>>,
    Query(query): Query<WaitTimeQuery>,
) -> impl IntoResponse {
    build_wait_time_response(&state, query.quantity, SystemTime::now())
}

pub async fn get_reconstructed_date(Query(query): Query<DateQuery>) -> impl IntoResponse {
    build_date_response(&query.fractional_year, SystemTime::now())
}

pub async fn get_forecast(State(state): State<Arc<RwLock<AppState>>>) -> impl IntoResponse {
    build_cached_forecast_response(&state, SystemTime::now())
}

pub async fn post_forecast(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(request): Json<ForecastRequest>,
) -> impl IntoResponse {
    build_forecast_response(&state, request, SystemTime::now())
}

pub async fn post_imputation(
    State(state): State<Arc<RwLock<AppState>>>,
    Json(request): Json<ImputationRequest>,
) -> impl IntoResponse {
    build_imputation_response(&state, request, SystemTime::now())
}

pub async fn post_insights(Json(table): Json<SalesTable>) -> impl IntoResponse {
    build_insights_response(&table, SystemTime::now())
}

fn build_health_response(
    state: &Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<HealthSuccessResponse> {
    let forecast_cached = match read_state(state) {
        Ok(guard) => guard.forecast().is_some(),
        Err(err) => return app_error_response("/api/health", err, now),
    };
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(HealthSuccessResponse {
            status: HealthStatus::Ok,
            forecast_cached,
            timestamp,
        }),
        Err(_) => internal_error("/api/health", "timestamp formatting failure"),
    }
}

fn build_wait_time_response(
    state: &Arc<RwLock<AppState>>,
    quantity: i64,
    now: SystemTime,
) -> ApiResponse<WaitTimeSuccessResponse> {
    const ROUTE: &str = "/api/wait-time";
    let model = match read_state(state) {
        Ok(guard) => Arc::clone(guard.model()),
        Err(err) => return app_error_response(ROUTE, err, now),
    };

    let estimate = match estimate_raw_quantity(model.as_ref(), quantity) {
        Ok(estimate) => estimate,
        Err(err) => return app_error_response(ROUTE, err, now),
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(WaitTimeSuccessResponse {
            quantity: estimate.quantity,
            estimated_minutes: estimate.estimated_minutes,
            risk_tier: estimate.risk_tier,
            advisory: estimate.advisory,
            advisory_message: estimate.advisory.then(|| ADVISORY_MESSAGE.to_string()),
            timestamp,
        }),
        Err(_) => internal_error(ROUTE, "timestamp formatting failure"),
    }
}

fn build_date_response(raw: &str, now: SystemTime) -> ApiResponse<DateSuccessResponse> {
    const ROUTE: &str = "/api/dates/reconstruct";
    let date = match parse_fractional_year(raw) {
        Ok(date) => date,
        Err(err) => return app_error_response(ROUTE, err, now),
    };
    match (format_datetime(date), format_timestamp(now)) {
        (Ok(date), Ok(timestamp)) => ApiResponse::Success(DateSuccessResponse {
            fractional_year: raw.trim().to_string(),
            date,
            timestamp,
        }),
        _ => internal_error(ROUTE, "timestamp formatting failure"),
    }
}

fn build_forecast_response(
    state: &Arc<RwLock<AppState>>,
    request: ForecastRequest,
    now: SystemTime,
) -> ApiResponse<ForecastSuccessResponse> {
    const ROUTE: &str = "/api/forecast";
    let (forecaster, default_periods) = match read_state(state) {
        Ok(guard) => (Arc::clone(guard.forecaster()), guard.horizon_periods()),
        Err(err) => return app_error_response(ROUTE, err, now),
    };
    let horizon = Horizon {
        periods: request.horizon_periods.unwrap_or(default_periods),
        freq: request.horizon_freq,
    };

    info!(
        observations = request.series.len(),
        periods = horizon.periods,
        "Fitting forecast on request"
    );
    let points = match forecaster.fit_and_forecast(&request.series, horizon) {
        Ok(points) => points,
        Err(err) => return app_error_response(ROUTE, err, now),
    };
    let snapshot = ForecastSnapshot {
        observations: points.iter().filter(|p| !p.is_forecast).count(),
        points,
        computed_at: now,
    };

    let body = match forecast_body(&snapshot) {
        Ok(body) => body,
        Err(_) => return internal_error(ROUTE, "timestamp formatting failure"),
    };

    match write_state(state) {
        Ok(mut guard) => guard.set_forecast(snapshot),
        Err(err) => return app_error_response(ROUTE, err, now),
    }

    ApiResponse::Success(body)
}

fn build_cached_forecast_response(
    state: &Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<ForecastSuccessResponse> {
    const ROUTE: &str = "/api/forecast";
    let snapshot = match read_state(state) {
        Ok(guard) => guard.forecast().cloned(),
        Err(err) => return app_error_response(ROUTE, err, now),
    };

    match snapshot {
        Some(snapshot) => match forecast_body(&snapshot) {
            Ok(body) => ApiResponse::Success(body),
            Err(_) => internal_error(ROUTE, "timestamp formatting failure"),
        },
        None => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::NoData,
            "No forecast computed yet".to_string(),
            now,
            ROUTE,
        ),
    }
}

fn forecast_body(snapshot: &ForecastSnapshot) -> Result<ForecastSuccessResponse, TimestampError> {
    let mut points = Vec::with_capacity(snapshot.points.len());
    for point in &snapshot.points {
        points.push(ForecastPointResponse {
            date: format_datetime(point.date)?,
            point_estimate: point.point_estimate,
            lower_bound: point.lower_bound,
            upper_bound: point.upper_bound,
            is_forecast: point.is_forecast,
        });
    }
    Ok(ForecastSuccessResponse {
        observations: snapshot.observations,
        horizon_periods: snapshot.points.iter().filter(|p| p.is_forecast).count(),
        points,
        timestamp: format_timestamp(snapshot.computed_at)?,
    })
}

fn build_imputation_response(
    state: &Arc<RwLock<AppState>>,
    request: ImputationRequest,
    now: SystemTime,
) -> ApiResponse<ImputationSuccessResponse> {
    const ROUTE: &str = "/api/imputation";
    let strategy: ImputationStrategy = match request.strategy.parse() {
        Ok(strategy) => strategy,
        Err(err) => return app_error_response(ROUTE, err, now),
    };
    let configured_seed = match read_state(state) {
        Ok(guard) => guard.imputation_seed(),
        Err(err) => return app_error_response(ROUTE, err, now),
    };
    let mut rng = match request.seed.or(configured_seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let set = RecordSet {
        headers: request.headers,
        records: request.records,
    };
    let records = match reconstruct_missing_quantities(&set, strategy, &mut rng) {
        Ok(records) => records,
        Err(err) => return app_error_response(ROUTE, err, now),
    };

    let imputed: Vec<HistogramBin> = imputed_histogram(&set.records, &records)
        .into_iter()
        .map(|(value, count)| HistogramBin { value, count })
        .collect();
    let filled = imputed.iter().map(|bin| bin.count).sum();
    let zoom_histogram = quantity_histogram(&records, DEFAULT_HISTOGRAM_MAX);

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(ImputationSuccessResponse {
            strategy,
            filled,
            imputed_histogram: imputed,
            zoom_histogram,
            records,
            timestamp,
        }),
        Err(_) => internal_error(ROUTE, "timestamp formatting failure"),
    }
}

fn build_insights_response(
    table: &SalesTable,
    now: SystemTime,
) -> ApiResponse<InsightsSuccessResponse> {
    let records = table.to_records();
    info!(rows = records.len(), "Summarizing sales table");
    let summary = summarize_sales(&records);
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(InsightsSuccessResponse { summary, timestamp }),
        Err(_) => internal_error("/api/insights", "timestamp formatting failure"),
    }
}

fn read_state(state: &RwLock<AppState>) -> Result<RwLockReadGuard<'_, AppState>, AppError> {
    state.read().map_err(|_| AppError::StateLock)
}

fn write_state(state: &RwLock<AppState>) -> Result<RwLockWriteGuard<'_, AppState>, AppError> {
    state.write().map_err(|_| AppError::StateLock)
}

/// Map a recoverable core error onto a client-facing response.
fn app_error_response<T>(route: &str, err: AppError, now: SystemTime) -> ApiResponse<T> {
    let (status, code) = match &err {
        AppError::InsufficientData { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InsufficientData)
        }
        AppError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, ErrorCode::InvalidQuantity),
        AppError::MissingColumn { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::MissingColumn)
        }
        AppError::DateConversion(_) => (StatusCode::BAD_REQUEST, ErrorCode::DateConversion),
        AppError::InvalidStrategy(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidStrategy),
        AppError::InvalidHorizon { .. } => (StatusCode::BAD_REQUEST, ErrorCode::InvalidHorizon),
        AppError::StateLock => return internal_error(route, "state lock poisoned"),
    };
    warn!(route = route, error = %err, "Request rejected");
    error_response(status, code, err.to_string(), now, route)
}

fn error_response<T>(
    status: StatusCode,
    error_code: ErrorCode,
    error_message: String,
    now: SystemTime,
    route: &str,
) -> ApiResponse<T> {
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status,
            body: ErrorResponse {
                error_code,
                error_message,
                timestamp,
            },
        },
        Err(_) => internal_error(route, "timestamp formatting failure"),
    }
}

fn internal_error<T>(route: &str, message: &str) -> ApiResponse<T> {
    error!(
        route = route,
        message = message,
        "Internal error while handling request"
    );
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    format_datetime(OffsetDateTime::from(timestamp))
}

fn format_datetime(datetime: OffsetDateTime) -> Result<String, TimestampError> {
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::linear::{LinearModel, LinearParams};
    use crate::estimation::model::RiskTier;
    use crate::forecast::MAX_HORIZON_PERIODS;
    use serde_json::json;
    use std::time::{Duration, UNIX_EPOCH};

    fn shared_state() -> Arc<RwLock<AppState>> {
        Arc::new(RwLock::new(AppState::new()))
    }

    fn poisoned_state() -> Arc<RwLock<AppState>> {
        let state = shared_state();
        let state_for_thread = Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _guard = state_for_thread.write().expect("lock for poison");
            panic!("poison lock");
        })
        .join();
        state
    }

    fn monthly_series(months: usize) -> Vec<TimePoint> {
        (0..months)
            .map(|i| TimePoint {
                fractional_year: 2021.0 + i as f64 / 12.0,
                visit_count: 80.0
                    + i as f64
                    + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).cos(),
            })
            .collect()
    }

    fn expect_error<T>(response: ApiResponse<T>) -> (StatusCode, ErrorResponse) {
        match response {
            ApiResponse::Error { status, body } => (status, body),
            ApiResponse::Success(_) => panic!("expected error response"),
        }
    }

    fn expect_success<T>(response: ApiResponse<T>) -> T {
        match response {
            ApiResponse::Success(body) => body,
            ApiResponse::Error { status, body } => {
                panic!("expected success response, got {status}: {body:?}")
            }
        }
    }

    #[test]
    fn health_reports_forecast_cache_state() {
        let state = shared_state();

        let body = expect_success(build_health_response(
            &state,
            UNIX_EPOCH + Duration::from_secs(3),
        ));

        assert_eq!(body.status, HealthStatus::Ok);
        assert!(!body.forecast_cached);
        assert_eq!(body.timestamp, "1970-01-01T00:00:03Z");
    }

    #[test]
    fn health_returns_internal_error_when_lock_poisoned() {
        let (status, body) = expect_error(build_health_response(
            &poisoned_state(),
            UNIX_EPOCH + Duration::from_secs(5),
        ));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_code, ErrorCode::InternalError);
        assert_eq!(body.error_message, "Internal server error");
    }

    #[test]
    fn wait_time_flags_large_orders() {
        let body = expect_success(build_wait_time_response(
            &shared_state(),
            13,
            UNIX_EPOCH + Duration::from_secs(1),
        ));

        assert_eq!(body.quantity, 13);
        assert!((body.estimated_minutes - 26.70).abs() < 1e-9);
        assert_eq!(body.risk_tier, RiskTier::Critical);
        assert!(body.advisory);
        assert!(body.advisory_message.is_some());
    }

    #[test]
    fn wait_time_rejects_out_of_range_quantity() {
        let (status, body) = expect_error(build_wait_time_response(
            &shared_state(),
            0,
            UNIX_EPOCH + Duration::from_secs(2),
        ));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, ErrorCode::InvalidQuantity);
        assert_eq!(body.timestamp, "1970-01-01T00:00:02Z");
    }

    #[test]
    fn wait_time_uses_model_from_state() {
        let state = shared_state();
        state
            .write()
            .expect("state lock")
            .set_model(Arc::new(LinearModel::new(LinearParams {
                max_quantity: 30,
                ..LinearParams::default()
            })));

        let (status, _) = expect_error(build_wait_time_response(
            &state,
            31,
            UNIX_EPOCH + Duration::from_secs(2),
        ));

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn date_endpoint_formats_reconstructed_date() {
        let body = expect_success(build_date_response(
            "2021.5",
            UNIX_EPOCH + Duration::from_secs(4),
        ));

        assert_eq!(body.fractional_year, "2021.5");
        assert_eq!(body.date, "2021-07-02T15:00:00Z");
    }

    #[test]
    fn date_endpoint_rejects_non_numeric_input() {
        let (status, body) = expect_error(build_date_response(
            "soon",
            UNIX_EPOCH + Duration::from_secs(4),
        ));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, ErrorCode::DateConversion);
    }

    #[test]
    fn forecast_is_not_available_until_requested() {
        let (status, body) = expect_error(build_cached_forecast_response(
            &shared_state(),
            UNIX_EPOCH + Duration::from_secs(6),
        ));

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error_code, ErrorCode::NoData);
    }

    #[test]
    fn posted_forecast_is_cached_for_later_reads() {
        let state = shared_state();
        let request = ForecastRequest {
            series: monthly_series(36),
            horizon_periods: None,
            horizon_freq: HorizonFreq::MonthEnd,
        };

        let posted = expect_success(build_forecast_response(
            &state,
            request,
            UNIX_EPOCH + Duration::from_secs(7),
        ));
        let cached = expect_success(build_cached_forecast_response(
            &state,
            UNIX_EPOCH + Duration::from_secs(8),
        ));

        assert_eq!(posted.observations, 36);
        assert_eq!(posted.horizon_periods, 3);
        assert_eq!(posted.points.len(), 39);
        assert_eq!(cached.points, posted.points);
        assert_eq!(cached.timestamp, "1970-01-01T00:00:07Z");
        assert_eq!(posted.points[38].date, "2024-02-29T00:00:00Z");
    }

    #[test]
    fn forecast_with_one_date_is_unprocessable() {
        let state = shared_state();
        let request = ForecastRequest {
            series: monthly_series(1),
            horizon_periods: Some(3),
            horizon_freq: HorizonFreq::MonthEnd,
        };

        let (status, body) = expect_error(build_forecast_response(
            &state,
            request,
            UNIX_EPOCH + Duration::from_secs(9),
        ));

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error_code, ErrorCode::InsufficientData);
        assert!(state.read().expect("state lock").forecast().is_none());
    }

    #[test]
    fn imputation_with_seed_fills_every_gap() {
        let mut records: Vec<QuantityRecord> = (0..10)
            .map(|i| QuantityRecord {
                quantity: Some(i % 5 + 1),
                wait_time: 3.0,
            })
            .collect();
        records.push(QuantityRecord {
            quantity: None,
            wait_time: 5.0,
        });
        let request = ImputationRequest {
            headers: vec!["cantidad".to_string()],
            records,
            strategy: "knn-reproduction".to_string(),
            seed: Some(5),
        };

        let body = expect_success(build_imputation_response(
            &shared_state(),
            request,
            UNIX_EPOCH + Duration::from_secs(10),
        ));

        assert_eq!(body.filled, 1);
        assert_eq!(body.imputed_histogram, vec![HistogramBin { value: 3, count: 1 }]);
        assert!(body.records.iter().all(|r| r.quantity.is_some()));
        assert_eq!(body.zoom_histogram[2].count, 3);
    }

    #[test]
    fn imputation_rejects_unknown_strategy() {
        let request = ImputationRequest {
            headers: vec!["Cantidad".to_string()],
            records: Vec::new(),
            strategy: "mean".to_string(),
            seed: None,
        };

        let (status, body) = expect_error(build_imputation_response(
            &shared_state(),
            request,
            UNIX_EPOCH + Duration::from_secs(11),
        ));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, ErrorCode::InvalidStrategy);
    }

    #[test]
    fn imputation_without_quantity_column_is_unprocessable() {
        let request = ImputationRequest {
            headers: vec!["sede".to_string()],
            records: Vec::new(),
            strategy: "constant".to_string(),
            seed: None,
        };

        let (status, body) = expect_error(build_imputation_response(
            &shared_state(),
            request,
            UNIX_EPOCH + Duration::from_secs(12),
        ));

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error_code, ErrorCode::MissingColumn);
    }

    #[test]
    fn insights_resolve_loosely_named_columns() {
        let table = SalesTable {
            headers: vec![
                "SEDE".to_string(),
                "gasto_total".to_string(),
                "Visitas".to_string(),
                "propina".to_string(),
            ],
            rows: vec![
                vec![json!("Hurlingham"), json!(42.0), json!(3), json!(4.2)],
                vec![json!("Hurlingham"), json!(18.0), json!(5), json!(1.8)],
            ],
        };

        let body = expect_success(build_insights_response(
            &table,
            UNIX_EPOCH + Duration::from_secs(13),
        ));

        assert_eq!(body.summary.total_revenue, Some(60.0));
        assert_eq!(body.summary.top_site.as_deref(), Some("Hurlingham"));
        assert_eq!(body.summary.visitors_by_site.len(), 1);
        assert_eq!(body.summary.visitors_by_site[0].median, 4.0);
        assert_eq!(body.summary.spend_vs_tip.pairs.len(), 2);
        assert_eq!(body.timestamp, "1970-01-01T00:00:13Z");
    }

    #[test]
    fn oversized_forecast_horizon_is_a_bad_request() {
        let state = shared_state();
        let request = ForecastRequest {
            series: monthly_series(12),
            horizon_periods: Some(usize::MAX / 2),
            horizon_freq: HorizonFreq::MonthEnd,
        };

        let (status, body) = expect_error(build_forecast_response(
            &state,
            request,
            UNIX_EPOCH + Duration::from_secs(14),
        ));

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error_code, ErrorCode::InvalidHorizon);
        assert!(state.read().expect("state lock").forecast().is_none());
    }

    #[test]
    fn forecast_horizon_at_limit_is_accepted() {
        let request = ForecastRequest {
            series: monthly_series(12),
            horizon_periods: Some(MAX_HORIZON_PERIODS),
            horizon_freq: HorizonFreq::MonthEnd,
        };

        let body = expect_success(build_forecast_response(
            &shared_state(),
            request,
            UNIX_EPOCH + Duration::from_secs(15),
        ));

        assert_eq!(body.horizon_periods, MAX_HORIZON_PERIODS);
    }

    #[test]
    fn poisoned_lock_is_internal_error_on_every_state_route() {
        let state = poisoned_state();
        let now = UNIX_EPOCH + Duration::from_secs(16);

        let (wait_status, wait_body) = expect_error(build_wait_time_response(&state, 5, now));
        let (forecast_status, _) = expect_error(build_forecast_response(
            &state,
            ForecastRequest {
                series: monthly_series(12),
                horizon_periods: None,
                horizon_freq: HorizonFreq::MonthEnd,
            },
            now,
        ));
        let (cached_status, _) = expect_error(build_cached_forecast_response(&state, now));

        assert_eq!(wait_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(wait_body.error_code, ErrorCode::InternalError);
        assert_eq!(forecast_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cached_status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn state_lock_error_maps_to_internal_error() {
        let (status, body) = expect_error::<()>(app_error_response(
            "/api/forecast",
            AppError::StateLock,
            UNIX_EPOCH,
        ));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_message, "Internal server error");
    }
}
