//! The bottom-up metrics engine: raw records are fetched exactly once per
//! refresh cycle, every displayed metric is derived from that raw data
//! through shared pure predicates, and the filtered-data mirror exposes the
//! exact record subsets behind each count for drill-through views.

pub mod aggregate;
pub mod context;
pub mod dataset;
pub mod domain;
pub mod filtered;
pub mod filters;
pub mod metrics;
pub mod period;

pub use context::{ContextPhase, ContextSnapshot, PropertyContext};
pub use dataset::{DatasetFetcher, FetchError};
pub use domain::{AggregationMode, RawDataset};
pub use filtered::FilteredData;
pub use metrics::PortfolioMetrics;
pub use period::{Period, Timeframe};
