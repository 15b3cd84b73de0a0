use super::aggregate;
use super::dataset::DatasetFetcher;
use super::domain::{AggregationMode, RawDataset};
use super::filtered::FilteredData;
use super::metrics::{self, PortfolioMetrics};
use super::period::{Period, Timeframe};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// High-level lifecycle of a property context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPhase {
    Idle,
    Loading,
    Ready,
}

/// Read-only view handed to presentation collaborators. The raw dataset,
/// metrics, and filtered mirror all come from the same fetch cycle, so every
/// drill-through subset matches its displayed count.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub phase: ContextPhase,
    /// Stale-while-revalidate: true while a refresh is in flight and the
    /// previous Ready data is still being shown.
    pub refreshing: bool,
    pub error: Option<String>,
    pub property_ids: Vec<String>,
    pub timeframe: Timeframe,
    pub custom_range: Option<(NaiveDate, NaiveDate)>,
    pub aggregation_mode: AggregationMode,
    pub period: Option<Period>,
    pub prior_period: Option<Period>,
    #[serde(skip)]
    pub dataset: Option<Arc<RawDataset>>,
    pub metrics: Option<PortfolioMetrics>,
    #[serde(skip)]
    pub filtered: Option<Arc<FilteredData>>,
}

struct ContextState {
    phase: ContextPhase,
    refreshing: bool,
    error: Option<String>,
    property_ids: Vec<String>,
    timeframe: Timeframe,
    custom_range: Option<(NaiveDate, NaiveDate)>,
    period: Option<Period>,
    prior_period: Option<Period>,
    dataset: Option<Arc<RawDataset>>,
    metrics: Option<PortfolioMetrics>,
    filtered: Option<Arc<FilteredData>>,
}

/// Orchestrates one dashboard session: triggers fetches on property or
/// timeframe changes, holds the derived metrics, and guarantees that only
/// the most recent trigger's results are committed. Cancellation is
/// cooperative — an in-flight fetch is never aborted, its result is simply
/// discarded when a newer generation has taken over.
pub struct PropertyContext {
    fetcher: Arc<DatasetFetcher>,
    mode: AggregationMode,
    state: Mutex<ContextState>,
    generation: AtomicU64,
    fixed_today: Option<NaiveDate>,
}

impl PropertyContext {
    pub fn new(fetcher: Arc<DatasetFetcher>, mode: AggregationMode) -> Self {
        Self {
            fetcher,
            mode,
            state: Mutex::new(ContextState {
                phase: ContextPhase::Idle,
                refreshing: false,
                error: None,
                property_ids: Vec::new(),
                timeframe: Timeframe::CurrentMonth,
                custom_range: None,
                period: None,
                prior_period: None,
                dataset: None,
                metrics: None,
                filtered: None,
            }),
            generation: AtomicU64::new(0),
            fixed_today: None,
        }
    }

    /// Pin the evaluation date, for deterministic tests and backdated
    /// reports.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn now(&self) -> NaiveDateTime {
        match self.fixed_today {
            Some(date) => date.and_hms_opt(12, 0, 0).unwrap_or_default(),
            None => Local::now().naive_local(),
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.lock().expect("context state poisoned");
        ContextSnapshot {
            phase: state.phase,
            refreshing: state.refreshing,
            error: state.error.clone(),
            property_ids: state.property_ids.clone(),
            timeframe: state.timeframe,
            custom_range: state.custom_range,
            aggregation_mode: self.mode,
            period: state.period,
            prior_period: state.prior_period,
            dataset: state.dataset.clone(),
            metrics: state.metrics.clone(),
            filtered: state.filtered.clone(),
        }
    }

    /// Replace the selected property id set and refetch.
    pub async fn set_properties(&self, property_ids: Vec<String>) {
        {
            let mut state = self.state.lock().expect("context state poisoned");
            state.property_ids = property_ids;
        }
        self.run_fetch().await;
    }

    /// Switch the timeframe code and refetch. A custom range, when set,
    /// keeps overriding the code until explicitly cleared.
    pub async fn set_timeframe(&self, timeframe: Timeframe) {
        {
            let mut state = self.state.lock().expect("context state poisoned");
            state.timeframe = timeframe;
        }
        self.run_fetch().await;
    }

    /// Set an explicit date range that unconditionally overrides the
    /// timeframe code.
    pub async fn set_custom_range(&self, start: NaiveDate, end: NaiveDate) {
        {
            let mut state = self.state.lock().expect("context state poisoned");
            state.custom_range = Some((start, end));
        }
        self.run_fetch().await;
    }

    /// Clear the custom range, reverting to timeframe-driven resolution.
    pub async fn clear_custom_range(&self) {
        {
            let mut state = self.state.lock().expect("context state poisoned");
            state.custom_range = None;
        }
        self.run_fetch().await;
    }

    pub async fn refresh(&self) {
        self.run_fetch().await;
    }

    /// Apply a complete selection in one step with a single fetch, for
    /// one-shot callers that do not hold the context across interactions.
    pub async fn apply_selection(
        &self,
        property_ids: Vec<String>,
        timeframe: Timeframe,
        custom_range: Option<(NaiveDate, NaiveDate)>,
    ) {
        {
            let mut state = self.state.lock().expect("context state poisoned");
            state.property_ids = property_ids;
            state.timeframe = timeframe;
            state.custom_range = custom_range;
        }
        self.run_fetch().await;
    }

    async fn run_fetch(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.now();
        let today = self.today();

        let (property_ids, timeframe, custom_range) = {
            let mut state = self.state.lock().expect("context state poisoned");
            if state.phase == ContextPhase::Ready {
                state.refreshing = true;
            } else {
                state.phase = ContextPhase::Loading;
            }
            (
                state.property_ids.clone(),
                state.timeframe,
                state.custom_range,
            )
        };

        let period = match custom_range {
            Some((start, end)) => Period::from_dates(start, end),
            None => timeframe.resolve(now),
        };
        let prior_period = timeframe.prior(now);

        let outcome = self.compute(&property_ids, &period, today).await;

        let mut state = self.state.lock().expect("context state poisoned");
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer trigger superseded this fetch while it was in flight;
            // last-write-wins by trigger order, not resolution order.
            debug!(generation, "discarding superseded fetch result");
            return;
        }

        state.refreshing = false;
        state.phase = ContextPhase::Ready;
        state.period = Some(period);
        state.prior_period = Some(prior_period);
        match outcome {
            Ok((dataset, metrics, filtered)) => {
                state.error = None;
                state.dataset = Some(Arc::new(dataset));
                state.metrics = Some(metrics);
                state.filtered = Some(Arc::new(filtered));
            }
            Err(message) => {
                // Previous data, if any, stays visible under the error.
                state.error = Some(message);
            }
        }
    }

    async fn compute(
        &self,
        property_ids: &[String],
        period: &Period,
        today: NaiveDate,
    ) -> Result<(RawDataset, PortfolioMetrics, FilteredData), String> {
        match self.mode {
            AggregationMode::RowMetrics => {
                let dataset = self
                    .fetcher
                    .fetch_raw(property_ids, period)
                    .await
                    .map_err(|err| err.to_string())?;
                let metrics = metrics::calculate_all(&dataset, period, today);
                let filtered = FilteredData::build(&dataset, period, today);
                Ok((dataset, metrics, filtered))
            }
            AggregationMode::WeightedAvg => {
                let datasets = self
                    .fetcher
                    .fetch_each(property_ids, period)
                    .await
                    .map_err(|err| err.to_string())?;
                let per_property: Vec<PortfolioMetrics> = datasets
                    .iter()
                    .map(|dataset| metrics::calculate_all(dataset, period, today))
                    .collect();
                let combined = aggregate::combine_all(&per_property);
                // The mirror follows each property's own availability
                // branch, so it is built per property and concatenated
                // rather than rebuilt over the union.
                let mut filtered = FilteredData::default();
                for dataset in &datasets {
                    filtered.extend(FilteredData::build(dataset, period, today));
                }
                let union = aggregate::merge_datasets(datasets);
                Ok((union, combined, filtered))
            }
        }
    }
}
