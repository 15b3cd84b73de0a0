//! Pure metric calculators. Every calculator takes an already-validated
//! `RawDataset` (plus a resolved `Period` where dates matter) and never
//! fails, degrading to zero counts and zero rates on empty input.

pub mod expirations;
pub mod exposure;
pub mod funnel;
pub mod occupancy;

pub use expirations::{ExpirationPeriod, RenewalSummary, TradeoutEntry};
pub use exposure::ExposureMetrics;
pub use funnel::FunnelMetrics;
pub use occupancy::OccupancyMetrics;

use crate::reporting::domain::RawDataset;
use crate::reporting::period::Period;
use chrono::NaiveDate;
use serde::Serialize;

/// The full calculator output for one logical property and period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub occupancy: OccupancyMetrics,
    pub exposure: ExposureMetrics,
    pub funnel: FunnelMetrics,
}

pub fn calculate_all(dataset: &RawDataset, period: &Period, today: NaiveDate) -> PortfolioMetrics {
    PortfolioMetrics {
        occupancy: occupancy::calculate(dataset),
        exposure: exposure::calculate(dataset, period, today),
        funnel: funnel::calculate(dataset, period),
    }
}
