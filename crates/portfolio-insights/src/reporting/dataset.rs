use crate::client::cache::CacheService;
use crate::client::records::{AmenityRecord, AvailabilityEntry, SourceProspect};
use crate::client::{ClientError, PmsClient};
use crate::reporting::aggregate::{merge_periods, merge_renewal_summaries, OccupancyForecastPoint};
use crate::reporting::domain::{LifecycleBucket, RawDataset, ResidentBuckets};
use crate::reporting::metrics::{ExpirationPeriod, RenewalSummary, TradeoutEntry};
use crate::reporting::period::Period;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// A required raw-data query failed; fatal to the fetch cycle, embedding the
/// first underlying failure.
#[derive(Debug, thiserror::Error)]
#[error("required {query} query failed: {source}")]
pub struct FetchError {
    pub query: &'static str,
    #[source]
    pub source: ClientError,
}

/// Retrieves and normalizes the raw operational records for one logical
/// property exactly once per refresh cycle, going through the cache and
/// coalescer for every endpoint.
pub struct DatasetFetcher {
    client: Arc<dyn PmsClient>,
    cache: Arc<CacheService>,
}

impl DatasetFetcher {
    pub fn new(client: Arc<dyn PmsClient>, cache: Arc<CacheService>) -> Self {
        Self { client, cache }
    }

    async fn cached<T, F, Fut>(&self, key: String, producer: F) -> Result<T, ClientError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let value = self
            .cache
            .get_with(&key, || async move {
                let data = producer().await?;
                Ok(serde_json::to_value(data)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch units, residents, and prospects for the given property id set.
    /// Unit and resident bucket queries run concurrently and are both
    /// required; prospect queries run concurrently per property and are
    /// best-effort — a property whose prospect query fails simply
    /// contributes zero prospects.
    pub async fn fetch_raw(
        &self,
        property_ids: &[String],
        period: &Period,
    ) -> Result<RawDataset, FetchError> {
        let ids_key = property_ids.join("+");

        let units_fut = self.cached(format!("units:{ids_key}"), || {
            self.client.units(property_ids)
        });
        let residents_fut = self.fetch_residents(property_ids, &ids_key);
        let prospects_fut = self.fetch_prospects(property_ids, period);

        let (units, residents, prospects) = tokio::join!(units_fut, residents_fut, prospects_fut);

        let units = units.map_err(|source| FetchError {
            query: "units",
            source,
        })?;
        let residents = residents?;

        let mut normalized_units = Vec::with_capacity(units.len());
        for unit in units {
            match unit.normalize() {
                Some(unit) => normalized_units.push(unit),
                None => debug!("dropping unit with unrecognized occupancy status"),
            }
        }

        Ok(RawDataset {
            property_ids: property_ids.to_vec(),
            units: normalized_units,
            residents,
            prospects,
        })
    }

    /// Fetch each property as its own dataset, for per-property metric
    /// computation under weighted aggregation. Single-id cache keys are
    /// shared with any other view of the same property.
    pub async fn fetch_each(
        &self,
        property_ids: &[String],
        period: &Period,
    ) -> Result<Vec<RawDataset>, FetchError> {
        let fetches = property_ids
            .iter()
            .map(|id| self.fetch_raw(std::slice::from_ref(id), period));
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_residents(
        &self,
        property_ids: &[String],
        ids_key: &str,
    ) -> Result<ResidentBuckets, FetchError> {
        let fetch_bucket = |bucket: LifecycleBucket| {
            let status = bucket.as_query();
            self.cached(format!("residents:{status}:{ids_key}"), move || {
                self.client.residents(property_ids, status)
            })
        };

        let batches = join_all(LifecycleBucket::all().map(fetch_bucket)).await;

        let mut buckets = ResidentBuckets::default();
        for batch in batches {
            let batch = batch.map_err(|source| FetchError {
                query: "residents",
                source,
            })?;
            for resident in batch {
                // Bucket by the record's own status, not the query
                // parameter; unrecognized statuses land in no bucket.
                match resident.lifecycle() {
                    Some(bucket) => buckets.bucket_mut(bucket).push(resident.normalize()),
                    None => debug!("dropping resident with unrecognized lifecycle status"),
                }
            }
        }
        Ok(buckets)
    }

    async fn fetch_prospects(
        &self,
        property_ids: &[String],
        period: &Period,
    ) -> Vec<crate::reporting::domain::Prospect> {
        let start = period.start.date();
        let end = period.end.date();
        let fetches = property_ids.iter().map(|id| {
            self.cached(format!("prospects:{id}:{start}:{end}"), move || {
                self.client.prospects(id, period)
            })
        });

        let mut prospects = Vec::new();
        for (id, result) in property_ids.iter().zip(join_all(fetches).await) {
            match result {
                Ok(batch) => prospects.extend(
                    batch
                        .into_iter()
                        .map(SourceProspect::normalize),
                ),
                Err(error) => debug!(
                    property_id = %id,
                    %error,
                    "prospect data unavailable; property contributes zero prospects"
                ),
            }
        }
        prospects
    }

    /// Server-aggregated expiration buckets, merged across properties from
    /// summed counts. Best-effort per property, like prospects.
    pub async fn expirations(&self, property_ids: &[String]) -> Vec<ExpirationPeriod> {
        let fetches = property_ids.iter().map(|id| {
            self.cached(format!("expirations:{id}"), move || {
                self.client.expirations(id)
            })
        });

        let mut groups: Vec<Vec<ExpirationPeriod>> = Vec::new();
        for (id, result) in property_ids.iter().zip(join_all(fetches).await) {
            match result {
                Ok(periods) => groups.push(periods),
                Err(error) => debug!(
                    property_id = %id,
                    %error,
                    "expiration data unavailable; property contributes zero expirations"
                ),
            }
        }
        merge_periods(&groups)
    }

    /// Cross-property renewal summary, merged from summed counts.
    /// Best-effort per property.
    pub async fn renewal_summary(&self, property_ids: &[String]) -> RenewalSummary {
        let fetches = property_ids.iter().map(|id| {
            self.cached(format!("renewals:{id}"), move || {
                self.client.renewal_summary(id)
            })
        });

        let mut summaries = Vec::new();
        for (id, result) in property_ids.iter().zip(join_all(fetches).await) {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(error) => debug!(
                    property_id = %id,
                    %error,
                    "renewal data unavailable; property contributes zero renewals"
                ),
            }
        }
        merge_renewal_summaries(&summaries)
    }

    /// Tradeout rows concatenated across properties. Best-effort per
    /// property.
    pub async fn tradeouts(
        &self,
        property_ids: &[String],
        period: &Period,
    ) -> Vec<TradeoutEntry> {
        let start = period.start.date();
        let end = period.end.date();
        let fetches = property_ids.iter().map(|id| {
            self.cached(format!("tradeouts:{id}:{start}:{end}"), move || {
                self.client.tradeouts(id, period)
            })
        });

        let mut entries = Vec::new();
        for (id, result) in property_ids.iter().zip(join_all(fetches).await) {
            match result {
                Ok(batch) => entries.extend(batch),
                Err(error) => debug!(
                    property_id = %id,
                    %error,
                    "tradeout data unavailable; property contributes zero tradeouts"
                ),
            }
        }
        entries
    }

    pub async fn availability(
        &self,
        property_ids: &[String],
    ) -> Result<Vec<AvailabilityEntry>, ClientError> {
        let ids_key = property_ids.join("+");
        self.cached(format!("availability:{ids_key}"), || {
            self.client.availability(property_ids)
        })
        .await
    }

    pub async fn amenities(&self, property_id: &str) -> Result<Vec<AmenityRecord>, ClientError> {
        self.cached(format!("amenities:{property_id}"), || {
            self.client.amenities(property_id)
        })
        .await
    }

    pub async fn occupancy_forecast(
        &self,
        property_id: &str,
    ) -> Result<Vec<OccupancyForecastPoint>, ClientError> {
        self.cached(format!("forecast:{property_id}"), || {
            self.client.occupancy_forecast(property_id)
        })
        .await
    }

    /// Opaque write. Invalidates the watchpoint cache prefix so the next
    /// read observes the new server state.
    pub async fn create_watchpoint(
        &self,
        property_id: &str,
        payload: Value,
    ) -> Result<Value, ClientError> {
        let created = self.client.create_watchpoint(property_id, payload).await?;
        self.cache
            .invalidate_prefix(&format!("watchpoints:{property_id}"));
        Ok(created)
    }

    pub async fn delete_watchpoint(
        &self,
        property_id: &str,
        id: &str,
    ) -> Result<(), ClientError> {
        self.client.delete_watchpoint(property_id, id).await?;
        self.cache
            .invalidate_prefix(&format!("watchpoints:{property_id}"));
        Ok(())
    }
}
