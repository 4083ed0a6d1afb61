use cafe_ops::estimation::linear::LinearModel;
use cafe_ops::estimation::model::EstimationModel;
use cafe_ops::forecast::SeasonalAdditiveModel;
use cafe_ops::{api, config, estimation, state};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level());
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "cafe-ops starting"
    );

    let model: Box<dyn EstimationModel> = match config.calibration_path() {
        Some(path) => match estimation::load_calibration_from_path(path) {
            Ok(model) => {
                tracing::info!(path = %path.display(), "Estimation model loaded");
                model
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load calibration, using default");
                Box::new(LinearModel::with_defaults())
            }
        },
        None => {
            tracing::info!("No calibration path configured, using default model");
            Box::new(LinearModel::with_defaults())
        }
    };

    let settings = config.seasonality_settings();
    tracing::info!(
        yearly = settings.yearly_seasonality,
        weekly = settings.weekly_seasonality,
        daily = settings.daily_seasonality,
        interval_width = settings.interval_width,
        horizon_periods = config.horizon_periods(),
        "Forecaster configured"
    );

    let mut app_state = state::AppState::new();
    app_state.set_model(Arc::from(model));
    app_state.set_forecaster(Arc::new(SeasonalAdditiveModel::new(settings)));
    app_state.set_horizon_periods(config.horizon_periods());
    app_state.set_imputation_seed(config.imputation_seed());
    let state = Arc::new(RwLock::new(app_state));

    let app = api::router(state);
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
