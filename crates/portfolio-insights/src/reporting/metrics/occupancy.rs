use crate::reporting::domain::RawDataset;
use crate::reporting::filters;
use serde::Serialize;

/// Occupancy roll-up for one logical property.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OccupancyMetrics {
    pub total_units: usize,
    pub occupied_units: usize,
    pub vacant_units: usize,
    pub preleased_vacant: usize,
    pub leased_units: usize,
    pub available_units: usize,
    pub physical_occupancy: f64,
    pub leased_percentage: f64,
    pub vacant_ready: usize,
    pub vacant_not_ready: usize,
    pub aged_vacancy_90_plus: usize,
}

/// Compute occupancy from a raw dataset. Needs only the units and the
/// future-resident bucket; never fails, degrading to zeros on empty input.
pub fn calculate(dataset: &RawDataset) -> OccupancyMetrics {
    let preleased = filters::preleased_unit_ids(dataset);
    let inventory = dataset.units.iter().filter(|unit| filters::in_inventory(unit));

    let mut metrics = OccupancyMetrics::default();
    for unit in inventory {
        metrics.total_units += 1;
        if filters::is_occupied(unit) {
            metrics.occupied_units += 1;
        }
        if filters::is_vacant(unit) {
            metrics.vacant_units += 1;
        }
        if filters::is_preleased_vacant(unit, &preleased) {
            metrics.preleased_vacant += 1;
        }
        if filters::is_vacant_ready(unit) {
            metrics.vacant_ready += 1;
        }
        if filters::is_vacant_not_ready(unit) {
            metrics.vacant_not_ready += 1;
        }
        if filters::is_aged_vacancy_90_plus(unit) {
            metrics.aged_vacancy_90_plus += 1;
        }
        if filters::has_availability_flag(unit) {
            metrics.available_units += 1;
        }
    }

    metrics.leased_units = metrics.occupied_units + metrics.preleased_vacant;

    // When no unit carries the availability flag the upstream source does
    // not emit it, and availability falls back to vacant minus preleased.
    // TODO: confirm with product whether the per-source divergence here is
    // intentional; both branches are preserved deliberately.
    if !filters::availability_flag_present(dataset) {
        metrics.available_units = metrics.vacant_units.saturating_sub(metrics.preleased_vacant);
    }

    metrics.physical_occupancy = filters::pct(metrics.occupied_units, metrics.total_units);
    metrics.leased_percentage = filters::pct(metrics.leased_units, metrics.total_units);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::domain::{OccupancyStatus, Resident, Unit};

    fn unit(id: &str, status: OccupancyStatus) -> Unit {
        Unit {
            id: id.to_string(),
            property_id: "p1".to_string(),
            floorplan: "A1".to_string(),
            bedrooms: 1,
            bathrooms: 1.0,
            square_feet: None,
            market_rent: None,
            occupancy_status: status,
            ready_status: None,
            ready: None,
            available: None,
            days_vacant: None,
        }
    }

    fn future_resident(unit_id: &str) -> Resident {
        Resident {
            id: format!("r-{unit_id}"),
            unit_id: unit_id.to_string(),
            property_id: "p1".to_string(),
            rent: None,
            move_in_date: None,
            move_out_date: None,
            lease_start: None,
            lease_end: None,
            notice_date: None,
        }
    }

    fn reference_property() -> RawDataset {
        // 100 in-inventory units: 90 occupied, 5 vacant ready, 5 vacant
        // not-ready, 2 of the vacant units preleased by future residents.
        let mut units = Vec::new();
        for i in 0..90 {
            units.push(unit(&format!("occ-{i}"), OccupancyStatus::Occupied));
        }
        for i in 0..5 {
            let mut vacant = unit(&format!("vr-{i}"), OccupancyStatus::Vacant);
            vacant.ready = Some(true);
            units.push(vacant);
        }
        for i in 0..5 {
            units.push(unit(&format!("vn-{i}"), OccupancyStatus::Vacant));
        }

        let mut dataset = RawDataset {
            property_ids: vec!["p1".to_string()],
            units,
            ..Default::default()
        };
        dataset.residents.future.push(future_resident("vr-0"));
        dataset.residents.future.push(future_resident("vn-0"));
        dataset
    }

    #[test]
    fn reference_scenario_matches_expected_counts() {
        let metrics = calculate(&reference_property());
        assert_eq!(metrics.total_units, 100);
        assert_eq!(metrics.occupied_units, 90);
        assert_eq!(metrics.vacant_units, 10);
        assert_eq!(metrics.preleased_vacant, 2);
        assert_eq!(metrics.leased_units, 92);
        assert_eq!(metrics.physical_occupancy, 90.0);
        assert_eq!(metrics.leased_percentage, 92.0);
        assert_eq!(metrics.vacant_ready, 5);
        assert_eq!(metrics.vacant_not_ready, 5);
    }

    #[test]
    fn down_and_model_units_leave_the_denominator() {
        let mut dataset = reference_property();
        dataset.units.push(unit("down-1", OccupancyStatus::Down));
        dataset.units.push(unit("model-1", OccupancyStatus::Model));

        let metrics = calculate(&dataset);
        assert_eq!(metrics.total_units, 100);
        assert!(metrics.occupied_units + metrics.vacant_units <= metrics.total_units);
    }

    #[test]
    fn notice_units_count_toward_occupied() {
        let mut dataset = reference_property();
        dataset.units.push(unit("n-1", OccupancyStatus::Notice));

        let metrics = calculate(&dataset);
        assert_eq!(metrics.total_units, 101);
        assert_eq!(metrics.occupied_units, 91);
        assert_eq!(metrics.vacant_units, 10);
    }

    #[test]
    fn availability_falls_back_when_no_flag_is_emitted() {
        let metrics = calculate(&reference_property());
        // vacant (10) minus preleased (2)
        assert_eq!(metrics.available_units, 8);
    }

    #[test]
    fn availability_uses_explicit_flags_when_present() {
        let mut dataset = reference_property();
        for unit in dataset.units.iter_mut().take(3) {
            unit.available = Some(false);
        }
        dataset
            .units
            .iter_mut()
            .find(|unit| unit.id == "vn-1")
            .expect("unit present")
            .available = Some(true);

        let metrics = calculate(&dataset);
        assert_eq!(metrics.available_units, 1);
    }

    #[test]
    fn preleased_counts_units_not_future_residents() {
        let mut dataset = reference_property();
        // Second future lease on an already-preleased unit must not double
        // count.
        dataset.residents.future.push(future_resident("vr-0"));

        let metrics = calculate(&dataset);
        assert_eq!(metrics.preleased_vacant, 2);
        assert_eq!(metrics.leased_units, 92);
    }

    #[test]
    fn empty_dataset_degrades_to_zeros() {
        let metrics = calculate(&RawDataset::default());
        assert_eq!(metrics.total_units, 0);
        assert_eq!(metrics.physical_occupancy, 0.0);
        assert_eq!(metrics.leased_percentage, 0.0);
    }
}
