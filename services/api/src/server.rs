use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_portfolio_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use portfolio_insights::client::cache::CacheService;
use portfolio_insights::client::HttpPmsClient;
use portfolio_insights::config::AppConfig;
use portfolio_insights::error::AppError;
use portfolio_insights::reporting::DatasetFetcher;
use portfolio_insights::telemetry;
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

    let client = Arc::new(HttpPmsClient::new(&config.backend));
    let cache = Arc::new(CacheService::new(
        config.backend.cache_ttl(),
        config.backend.max_concurrent_requests,
    ));
    let fetcher = Arc::new(DatasetFetcher::new(client, cache));

    let app = with_portfolio_routes(fetcher)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "portfolio insights service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
