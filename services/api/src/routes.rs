use crate::infra::{deserialize_optional_date, AppState};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use portfolio_insights::error::AppError;
use portfolio_insights::reporting::aggregate::{merge_forecasts, OccupancyForecastPoint};
use portfolio_insights::reporting::metrics::{
    ExpirationPeriod, PortfolioMetrics, RenewalSummary, TradeoutEntry,
};
use portfolio_insights::reporting::{
    AggregationMode, DatasetFetcher, FilteredData, Period, PropertyContext, Timeframe,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct PortfolioReportRequest {
    pub(crate) property_ids: Vec<String>,
    #[serde(
        default = "default_timeframe",
        deserialize_with = "deserialize_timeframe"
    )]
    pub(crate) timeframe: Timeframe,
    #[serde(default)]
    pub(crate) custom_range: Option<CustomRange>,
    #[serde(default = "default_aggregation")]
    pub(crate) aggregation: AggregationMode,
    /// Evaluation-date override for backdated reports; defaults to today.
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
    /// Include the drill-through record subsets alongside the counts.
    #[serde(default)]
    pub(crate) include_records: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomRange {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) end: NaiveDate,
}

fn default_timeframe() -> Timeframe {
    Timeframe::CurrentMonth
}

fn default_aggregation() -> AggregationMode {
    AggregationMode::RowMetrics
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    crate::infra::parse_date(&raw).map_err(serde::de::Error::custom)
}

/// Timeframes arrive as their short codes (`cm`, `pm`, `ytd`, `l30`, `l7`).
fn deserialize_timeframe<'de, D>(deserializer: D) -> Result<Timeframe, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Serialize)]
pub(crate) struct PeriodView {
    pub(crate) start: NaiveDate,
    pub(crate) end: NaiveDate,
}

impl From<Period> for PeriodView {
    fn from(period: Period) -> Self {
        Self {
            start: period.start.date(),
            end: period.end.date(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PortfolioReportResponse {
    pub(crate) property_ids: Vec<String>,
    pub(crate) timeframe: &'static str,
    pub(crate) aggregation: AggregationMode,
    pub(crate) period: Option<PeriodView>,
    pub(crate) prior_period: Option<PeriodView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    pub(crate) metrics: Option<PortfolioMetrics>,
    pub(crate) expirations: Vec<ExpirationPeriod>,
    pub(crate) renewal_summary: RenewalSummary,
    pub(crate) tradeouts: Vec<TradeoutEntry>,
    pub(crate) occupancy_forecast: Vec<OccupancyForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) records: Option<FilteredData>,
}

pub(crate) fn with_portfolio_routes(fetcher: Arc<DatasetFetcher>) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/portfolio/report",
            axum::routing::post(portfolio_report_endpoint),
        )
        .route(
            "/api/v1/properties/:property_id/watchpoints",
            axum::routing::post(create_watchpoint_endpoint),
        )
        .route(
            "/api/v1/properties/:property_id/watchpoints/:watchpoint_id",
            axum::routing::delete(delete_watchpoint_endpoint),
        )
        .layer(Extension(fetcher))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn portfolio_report_endpoint(
    Extension(fetcher): Extension<Arc<DatasetFetcher>>,
    Json(payload): Json<PortfolioReportRequest>,
) -> Result<Json<PortfolioReportResponse>, AppError> {
    let PortfolioReportRequest {
        property_ids,
        timeframe,
        custom_range,
        aggregation,
        today,
        include_records,
    } = payload;

    let mut context = PropertyContext::new(fetcher.clone(), aggregation);
    if let Some(today) = today {
        context = context.with_today(today);
    }

    let range = custom_range.map(|range| (range.start, range.end));
    context
        .apply_selection(property_ids.clone(), timeframe, range)
        .await;
    let snapshot = context.snapshot();

    let expirations = fetcher.expirations(&property_ids).await;
    let renewal_summary = fetcher.renewal_summary(&property_ids).await;
    let tradeouts = match snapshot.period {
        Some(period) => fetcher.tradeouts(&property_ids, &period).await,
        None => Vec::new(),
    };
    let mut forecasts = Vec::new();
    for id in &property_ids {
        match fetcher.occupancy_forecast(id).await {
            Ok(points) => forecasts.push(points),
            Err(error) => {
                tracing::debug!(property_id = %id, %error, "forecast unavailable");
            }
        }
    }

    let records = if include_records {
        snapshot.filtered.as_deref().cloned()
    } else {
        None
    };

    Ok(Json(PortfolioReportResponse {
        property_ids,
        timeframe: timeframe.as_code(),
        aggregation,
        period: snapshot.period.map(PeriodView::from),
        prior_period: snapshot.prior_period.map(PeriodView::from),
        error: snapshot.error,
        metrics: snapshot.metrics,
        expirations,
        renewal_summary,
        tradeouts,
        occupancy_forecast: merge_forecasts(&forecasts),
        records,
    }))
}

pub(crate) async fn create_watchpoint_endpoint(
    Extension(fetcher): Extension<Arc<DatasetFetcher>>,
    Path(property_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let created = fetcher.create_watchpoint(&property_id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn delete_watchpoint_endpoint(
    Extension(fetcher): Extension<Arc<DatasetFetcher>>,
    Path((property_id, watchpoint_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    fetcher
        .delete_watchpoint(&property_id, &watchpoint_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::StaticPmsClient;
    use portfolio_insights::client::cache::CacheService;
    use std::time::Duration;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 20).expect("valid date")
    }

    fn fetcher() -> Arc<DatasetFetcher> {
        let client = Arc::new(StaticPmsClient::new(anchor()));
        let cache = Arc::new(CacheService::new(Duration::from_secs(300), 6));
        Arc::new(DatasetFetcher::new(client, cache))
    }

    fn request(property_ids: Vec<&str>) -> PortfolioReportRequest {
        PortfolioReportRequest {
            property_ids: property_ids.into_iter().map(String::from).collect(),
            timeframe: Timeframe::CurrentMonth,
            custom_range: None,
            aggregation: AggregationMode::RowMetrics,
            today: Some(anchor()),
            include_records: false,
        }
    }

    #[tokio::test]
    async fn portfolio_report_endpoint_returns_combined_metrics() {
        let request = request(vec![
            StaticPmsClient::SUNSET_RIDGE,
            StaticPmsClient::HARBOR_POINT,
        ]);

        let Json(body) = portfolio_report_endpoint(Extension(fetcher()), Json(request))
            .await
            .expect("report builds");

        assert_eq!(body.timeframe, "cm");
        assert_eq!(body.error, None);
        assert!(body.records.is_none());

        let metrics = body.metrics.expect("metrics computed");
        // 22 in-inventory units at Sunset Ridge (the down unit drops out)
        // plus 16 at Harbor Point.
        assert_eq!(metrics.occupancy.total_units, 38);
        assert_eq!(metrics.occupancy.occupied_units, 33);
        assert_eq!(metrics.occupancy.vacant_units, 5);
        assert_eq!(metrics.occupancy.preleased_vacant, 2);
        assert_eq!(metrics.funnel.leads, 2);
        assert_eq!(metrics.funnel.tours, 1);

        let period = body.period.expect("period resolved");
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(period.end, anchor());
        assert!(body.prior_period.is_some());
    }

    #[tokio::test]
    async fn portfolio_report_endpoint_merges_expirations_and_forecast() {
        let request = request(vec![
            StaticPmsClient::SUNSET_RIDGE,
            StaticPmsClient::HARBOR_POINT,
        ]);

        let Json(body) = portfolio_report_endpoint(Extension(fetcher()), Json(request))
            .await
            .expect("report builds");

        let thirty = body
            .expirations
            .iter()
            .find(|period| period.label == "30_days")
            .expect("merged 30-day bucket");
        assert_eq!(thirty.expirations, 9);
        assert_eq!(thirty.renewals, 6);
        assert_eq!(thirty.renewal_pct, 66.7);

        assert_eq!(body.renewal_summary.expirations_next_90, 24);
        assert_eq!(body.renewal_summary.renewals_signed, 15);
        assert_eq!(body.renewal_summary.renewal_pct, 62.5);
        assert_eq!(body.tradeouts.len(), 1);

        let first = body
            .occupancy_forecast
            .first()
            .expect("merged forecast point");
        assert_eq!(first.month, "2026-08");
        assert_eq!(first.projected_occupancy_pct, 91.5);
    }

    #[tokio::test]
    async fn portfolio_report_endpoint_can_include_records() {
        let mut request = request(vec![StaticPmsClient::SUNSET_RIDGE]);
        request.include_records = true;
        request.aggregation = AggregationMode::WeightedAvg;

        let Json(body) = portfolio_report_endpoint(Extension(fetcher()), Json(request))
            .await
            .expect("report builds");

        let metrics = body.metrics.expect("metrics computed");
        let records = body.records.expect("records included");
        assert_eq!(records.occupied_units.len(), metrics.occupancy.occupied_units);
        assert_eq!(records.vacant_units.len(), metrics.occupancy.vacant_units);
        assert_eq!(records.leads.len(), metrics.funnel.leads);
    }

    #[tokio::test]
    async fn custom_range_overrides_the_timeframe_code() {
        let mut request = request(vec![StaticPmsClient::SUNSET_RIDGE]);
        request.custom_range = Some(CustomRange {
            start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 7, 15).unwrap(),
        });

        let Json(body) = portfolio_report_endpoint(Extension(fetcher()), Json(request))
            .await
            .expect("report builds");

        let period = body.period.expect("period resolved");
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2026, 7, 15).unwrap());
    }

    #[tokio::test]
    async fn watchpoint_endpoints_round_trip() {
        let fetcher = fetcher();
        let (status, Json(created)) = create_watchpoint_endpoint(
            Extension(fetcher.clone()),
            Path(StaticPmsClient::SUNSET_RIDGE.to_string()),
            Json(json!({ "metric": "physical_occupancy", "threshold": 90.0 })),
        )
        .await
        .expect("watchpoint created");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["metric"], "physical_occupancy");

        let status = delete_watchpoint_endpoint(
            Extension(fetcher),
            Path((StaticPmsClient::SUNSET_RIDGE.to_string(), "wp-1".to_string())),
        )
        .await
        .expect("watchpoint deleted");
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
