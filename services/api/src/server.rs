use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredVerifier, InMemoryDocumentStore};
use crate::routes::with_rental_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_desk::config::AppConfig;
use rental_desk::error::AppError;
use rental_desk::rentals::RentalLifecycleService;
use rental_desk::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verifier = ConfiguredVerifier::from_config(&config.verification)?;
    info!(verifier = verifier.describe(), "verification client selected");

    let repository = Arc::new(InMemoryDocumentStore::default());
    let rental_service = Arc::new(
        RentalLifecycleService::new(repository, Arc::new(verifier))
            .with_verification_timeout(config.verification.timeout),
    );

    let app = with_rental_routes(rental_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rental desk ready");

    axum::serve(listener, app).await?;
    Ok(())
}
