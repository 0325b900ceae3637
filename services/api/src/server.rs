use crate::cli::ServeArgs;
use crate::infra::{load_resources, AppState, InMemoryArtefactRepository, InMemoryPayloadStore};
use crate::routes::with_publication_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use court_publications::config::AppConfig;
use court_publications::error::AppError;
use court_publications::publication::PublicationService;
use court_publications::telemetry;
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

    let resources = load_resources(&config.publication)?;
    let publication_service = Arc::new(PublicationService::new(
        Arc::new(resources.schemas),
        Arc::new(resources.search),
        Arc::new(InMemoryArtefactRepository::default()),
        Arc::new(InMemoryPayloadStore::default()),
        Arc::new(resources.locations),
        Arc::new(resources.users),
    ));

    let app = with_publication_routes(publication_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "publication service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
