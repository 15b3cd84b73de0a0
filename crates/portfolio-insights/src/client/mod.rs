//! Read-only query client for the upstream property-management backend.
//! Every operation is a pure read; the only writes crossing this boundary
//! are the opaque watchpoint calls, whose sole core-visible effect is a
//! cache-prefix invalidation performed by the caller.

pub mod cache;
pub mod records;

use crate::config::BackendConfig;
use crate::reporting::aggregate::OccupancyForecastPoint;
use crate::reporting::metrics::{ExpirationPeriod, RenewalSummary, TradeoutEntry};
use crate::reporting::period::Period;
use async_trait::async_trait;
use records::{AmenityRecord, AvailabilityEntry, SourceProspect, SourceResident, SourceUnit};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 5xx or network-level failure that survived the retry budget.
    #[error("transient upstream failure after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },
    /// 401/403. Never retried; the stored credential is cleared so the next
    /// call starts from a clean reload.
    #[error("authorization expired")]
    AuthExpired,
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    fn retriable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// The fixed read-only query surface the metrics engine consumes.
#[async_trait]
pub trait PmsClient: Send + Sync {
    async fn units(&self, property_ids: &[String]) -> Result<Vec<SourceUnit>, ClientError>;

    async fn residents(
        &self,
        property_ids: &[String],
        status: &str,
    ) -> Result<Vec<SourceResident>, ClientError>;

    async fn prospects(
        &self,
        property_id: &str,
        period: &Period,
    ) -> Result<Vec<SourceProspect>, ClientError>;

    async fn expirations(&self, property_id: &str) -> Result<Vec<ExpirationPeriod>, ClientError>;

    async fn renewal_summary(&self, property_id: &str) -> Result<RenewalSummary, ClientError>;

    async fn tradeouts(
        &self,
        property_id: &str,
        period: &Period,
    ) -> Result<Vec<TradeoutEntry>, ClientError>;

    async fn availability(
        &self,
        property_ids: &[String],
    ) -> Result<Vec<AvailabilityEntry>, ClientError>;

    async fn occupancy_forecast(
        &self,
        property_id: &str,
    ) -> Result<Vec<OccupancyForecastPoint>, ClientError>;

    async fn amenities(&self, property_id: &str) -> Result<Vec<AmenityRecord>, ClientError>;

    /// Opaque write; callers must invalidate the `watchpoints:` cache prefix
    /// afterwards.
    async fn create_watchpoint(
        &self,
        property_id: &str,
        payload: Value,
    ) -> Result<Value, ClientError>;

    async fn delete_watchpoint(&self, property_id: &str, id: &str) -> Result<(), ClientError>;
}

/// `PmsClient` over HTTP with linear-backoff retry for transient failures.
pub struct HttpPmsClient {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
    retry_limit: u32,
    retry_backoff: Duration,
}

impl HttpPmsClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: Mutex::new(config.api_token.clone()),
            retry_limit: config.retry_limit,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    fn bearer(&self) -> Option<String> {
        self.token.lock().expect("token mutex poisoned").clone()
    }

    fn clear_token(&self) {
        self.token.lock().expect("token mutex poisoned").take();
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut request = self.http.request(method.clone(), &url).query(query);
            if let Some(token) = self.bearer() {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        // Delete endpoints reply with an empty body.
                        let text = response.text().await?;
                        if text.is_empty() {
                            return Ok(Value::Null);
                        }
                        return Ok(serde_json::from_str(&text)?);
                    }
                    if status.as_u16() == 401 || status.as_u16() == 403 {
                        warn!(%url, status = status.as_u16(), "authorization expired");
                        self.clear_token();
                        return Err(ClientError::AuthExpired);
                    }
                    let message = response.text().await.unwrap_or_default();
                    Err(ClientError::Status {
                        status: status.as_u16(),
                        message,
                    })
                }
                Err(err) => Err(ClientError::Http(err)),
            };

            match outcome {
                Err(err) if err.retriable() && attempt <= self.retry_limit => {
                    debug!(%url, attempt, error = %err, "retrying transient failure");
                    // Linear backoff: each retry waits one base interval
                    // longer than the previous.
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(err) if err.retriable() => {
                    return Err(ClientError::Transient {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
                Ok(value) => return Ok(value),
            }
        }
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let value = self.send(reqwest::Method::GET, path, query, None).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn ids_param(property_ids: &[String]) -> (&'static str, String) {
    ("property_ids", property_ids.join(","))
}

fn period_params(period: &Period) -> [(&'static str, String); 2] {
    [
        ("start", period.start.date().to_string()),
        ("end", period.end.date().to_string()),
    ]
}

#[async_trait]
impl PmsClient for HttpPmsClient {
    async fn units(&self, property_ids: &[String]) -> Result<Vec<SourceUnit>, ClientError> {
        self.get_typed("/api/v1/units", &[ids_param(property_ids)])
            .await
    }

    async fn residents(
        &self,
        property_ids: &[String],
        status: &str,
    ) -> Result<Vec<SourceResident>, ClientError> {
        self.get_typed(
            "/api/v1/residents",
            &[ids_param(property_ids), ("status", status.to_string())],
        )
        .await
    }

    async fn prospects(
        &self,
        property_id: &str,
        period: &Period,
    ) -> Result<Vec<SourceProspect>, ClientError> {
        let [start, end] = period_params(period);
        self.get_typed(
            "/api/v1/prospects",
            &[("property_id", property_id.to_string()), start, end],
        )
        .await
    }

    async fn expirations(&self, property_id: &str) -> Result<Vec<ExpirationPeriod>, ClientError> {
        self.get_typed(
            "/api/v1/expirations",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn renewal_summary(&self, property_id: &str) -> Result<RenewalSummary, ClientError> {
        self.get_typed(
            "/api/v1/renewals",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn tradeouts(
        &self,
        property_id: &str,
        period: &Period,
    ) -> Result<Vec<TradeoutEntry>, ClientError> {
        let [start, end] = period_params(period);
        self.get_typed(
            "/api/v1/tradeouts",
            &[("property_id", property_id.to_string()), start, end],
        )
        .await
    }

    async fn availability(
        &self,
        property_ids: &[String],
    ) -> Result<Vec<AvailabilityEntry>, ClientError> {
        self.get_typed("/api/v1/availability", &[ids_param(property_ids)])
            .await
    }

    async fn occupancy_forecast(
        &self,
        property_id: &str,
    ) -> Result<Vec<OccupancyForecastPoint>, ClientError> {
        self.get_typed(
            "/api/v1/occupancy-forecast",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn amenities(&self, property_id: &str) -> Result<Vec<AmenityRecord>, ClientError> {
        self.get_typed(
            "/api/v1/amenities",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn create_watchpoint(
        &self,
        property_id: &str,
        payload: Value,
    ) -> Result<Value, ClientError> {
        self.send(
            reqwest::Method::POST,
            "/api/v1/watchpoints",
            &[("property_id", property_id.to_string())],
            Some(&payload),
        )
        .await
    }

    async fn delete_watchpoint(&self, property_id: &str, id: &str) -> Result<(), ClientError> {
        self.send(
            reqwest::Method::DELETE,
            &format!("/api/v1/watchpoints/{id}"),
            &[("property_id", property_id.to_string())],
            None,
        )
        .await
        .map(|_| ())
    }
}
