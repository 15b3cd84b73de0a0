use crate::reporting::domain::{FunnelStage, RawDataset};
use crate::reporting::filters;
use crate::reporting::period::Period;
use serde::Serialize;

/// Leasing-funnel roll-up for a period. Stage counts carry "reached at
/// least" semantics and a single prospect may appear in several stages.
/// TODO: confirm the non-exclusive binning against the intended product
/// definition of stage membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunnelMetrics {
    pub leads: usize,
    pub tours: usize,
    pub applications: usize,
    pub leases_signed: usize,
    pub denials: usize,
    pub lead_to_tour_rate: f64,
    pub tour_to_application_rate: f64,
    pub application_to_lease_rate: f64,
    pub lead_to_lease_rate: f64,
}

pub fn calculate(dataset: &RawDataset, period: &Period) -> FunnelMetrics {
    let count = |stage: FunnelStage| {
        dataset
            .prospects
            .iter()
            .filter(|prospect| filters::counts_in_stage(prospect, stage, period))
            .count()
    };

    let leads = count(FunnelStage::Lead);
    let tours = count(FunnelStage::Tour);
    let applications = count(FunnelStage::Application);
    let leases_signed = count(FunnelStage::LeaseSigned);
    let denials = count(FunnelStage::Denied);

    FunnelMetrics {
        leads,
        tours,
        applications,
        leases_signed,
        denials,
        lead_to_tour_rate: filters::pct(tours, leads),
        tour_to_application_rate: filters::pct(applications, tours),
        application_to_lease_rate: filters::pct(leases_signed, applications),
        lead_to_lease_rate: filters::pct(leases_signed, leads),
    }
}
