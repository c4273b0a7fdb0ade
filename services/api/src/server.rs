use crate::cli::ServeArgs;
use crate::infra::{build_submission_service, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lamaran::config::{AppConfig, GoogleConfig};
use lamaran::error::AppError;
use lamaran::submission::SUBMIT_PATH;
use lamaran::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let google_config = GoogleConfig::load()?;
    let service = Arc::new(build_submission_service(&config, &google_config).await?);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_operational_routes(service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        path = SUBMIT_PATH,
        scratch_dir = %service.intake().scratch_dir().display(),
        max_file_bytes = service.intake().max_file_bytes(),
        "application intake ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
