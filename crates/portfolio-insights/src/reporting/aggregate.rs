//! Multi-property aggregation. Two semantics are offered and must never
//! silently diverge for single-property requests: `RowMetrics` concatenates
//! raw records and lets the calculators run once over the union, while
//! `WeightedAvg` combines per-property metric objects by summing counts and
//! recomputing every percentage from the summed numerators/denominators.

use super::domain::RawDataset;
use super::filters;
use super::metrics::{ExposureMetrics, FunnelMetrics, OccupancyMetrics, PortfolioMetrics};
use serde::{Deserialize, Serialize};

pub use super::metrics::expirations::{merge_periods, merge_renewal_summaries};

/// Concatenate single-property datasets into one union dataset. For a single
/// input this is a structural no-op, which is what keeps the two aggregation
/// modes aligned at N=1.
pub fn merge_datasets(datasets: Vec<RawDataset>) -> RawDataset {
    let mut merged = RawDataset::default();
    for dataset in datasets {
        merged.property_ids.extend(dataset.property_ids);
        merged.units.extend(dataset.units);
        merged.residents.current.extend(dataset.residents.current);
        merged.residents.notice.extend(dataset.residents.notice);
        merged.residents.past.extend(dataset.residents.past);
        merged.residents.future.extend(dataset.residents.future);
        merged.prospects.extend(dataset.prospects);
    }
    merged
}

pub fn combine_occupancy(parts: &[OccupancyMetrics]) -> OccupancyMetrics {
    let mut combined = OccupancyMetrics::default();
    for part in parts {
        combined.total_units += part.total_units;
        combined.occupied_units += part.occupied_units;
        combined.vacant_units += part.vacant_units;
        combined.preleased_vacant += part.preleased_vacant;
        combined.leased_units += part.leased_units;
        combined.available_units += part.available_units;
        combined.vacant_ready += part.vacant_ready;
        combined.vacant_not_ready += part.vacant_not_ready;
        combined.aged_vacancy_90_plus += part.aged_vacancy_90_plus;
    }
    combined.physical_occupancy = filters::pct(combined.occupied_units, combined.total_units);
    combined.leased_percentage = filters::pct(combined.leased_units, combined.total_units);
    combined
}

pub fn combine_exposure(parts: &[ExposureMetrics]) -> ExposureMetrics {
    let mut combined = ExposureMetrics::default();
    for part in parts {
        combined.vacant_count += part.vacant_count;
        combined.move_ins += part.move_ins;
        combined.move_outs += part.move_outs;
        combined.notices_30_days += part.notices_30_days;
        combined.notices_60_days += part.notices_60_days;
        combined.pending_move_ins_30_days += part.pending_move_ins_30_days;
        combined.pending_move_ins_60_days += part.pending_move_ins_60_days;
        combined.exposure_30_days += part.exposure_30_days;
        combined.exposure_60_days += part.exposure_60_days;
        combined.scheduled_move_ins += part.scheduled_move_ins;
    }
    combined.net_absorption = combined.move_ins as i64 - combined.move_outs as i64;
    combined
}

pub fn combine_funnel(parts: &[FunnelMetrics]) -> FunnelMetrics {
    let mut combined = FunnelMetrics::default();
    for part in parts {
        combined.leads += part.leads;
        combined.tours += part.tours;
        combined.applications += part.applications;
        combined.leases_signed += part.leases_signed;
        combined.denials += part.denials;
    }
    combined.lead_to_tour_rate = filters::pct(combined.tours, combined.leads);
    combined.tour_to_application_rate = filters::pct(combined.applications, combined.tours);
    combined.application_to_lease_rate =
        filters::pct(combined.leases_signed, combined.applications);
    combined.lead_to_lease_rate = filters::pct(combined.leases_signed, combined.leads);
    combined
}

pub fn combine_all(parts: &[PortfolioMetrics]) -> PortfolioMetrics {
    let occupancy: Vec<OccupancyMetrics> =
        parts.iter().map(|part| part.occupancy.clone()).collect();
    let exposure: Vec<ExposureMetrics> = parts.iter().map(|part| part.exposure.clone()).collect();
    let funnel: Vec<FunnelMetrics> = parts.iter().map(|part| part.funnel.clone()).collect();
    PortfolioMetrics {
        occupancy: combine_occupancy(&occupancy),
        exposure: combine_exposure(&exposure),
        funnel: combine_funnel(&funnel),
    }
}

/// One projected occupancy point, as reported upstream. The forecast source
/// exposes only a percentage with no underlying unit counts, so merging
/// across properties has to fall back to an unweighted mean. Known precision
/// loss, not a design goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyForecastPoint {
    pub month: String,
    pub projected_occupancy_pct: f64,
}

pub fn merge_forecasts(groups: &[Vec<OccupancyForecastPoint>]) -> Vec<OccupancyForecastPoint> {
    let mut months: Vec<String> = Vec::new();
    for group in groups {
        for point in group {
            if !months.contains(&point.month) {
                months.push(point.month.clone());
            }
        }
    }

    months
        .into_iter()
        .map(|month| {
            let values: Vec<f64> = groups
                .iter()
                .flat_map(|group| group.iter())
                .filter(|point| point.month == month)
                .map(|point| point.projected_occupancy_pct)
                .collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                filters::round1(values.iter().sum::<f64>() / values.len() as f64)
            };
            OccupancyForecastPoint {
                month,
                projected_occupancy_pct: mean,
            }
        })
        .collect()
}
