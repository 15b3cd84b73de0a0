//! Shared filter predicates. Both the metric calculators and the
//! filtered-data mirror call these exact functions, which is what guarantees
//! every drill-through subset matches its displayed count.

use super::domain::{FunnelStage, Prospect, RawDataset, Resident, Unit};
use super::period::Period;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// Round to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of `numerator` over `denominator`, rounded to one decimal.
/// Zero denominators yield 0.0, never NaN.
pub fn pct(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round1(numerator as f64 / denominator as f64 * 100.0)
    }
}

pub fn in_inventory(unit: &Unit) -> bool {
    unit.occupancy_status.in_inventory()
}

pub fn is_occupied(unit: &Unit) -> bool {
    unit.occupancy_status.physically_occupied()
}

pub fn is_vacant(unit: &Unit) -> bool {
    unit.occupancy_status == super::domain::OccupancyStatus::Vacant
}

/// Unit ids already claimed by a signed-but-not-moved-in lease. Set
/// semantics: a unit with several future residents still counts once.
pub fn preleased_unit_ids(dataset: &RawDataset) -> HashSet<&str> {
    dataset
        .residents
        .future
        .iter()
        .map(|resident| resident.unit_id.as_str())
        .collect()
}

pub fn is_preleased_vacant(unit: &Unit, preleased: &HashSet<&str>) -> bool {
    is_vacant(unit) && preleased.contains(unit.id.as_str())
}

/// Make-ready heuristic: explicit ready flag, or a free-text status
/// containing "ready" (case-insensitive).
pub fn is_ready(unit: &Unit) -> bool {
    unit.ready.unwrap_or(false)
        || unit
            .ready_status
            .as_deref()
            .is_some_and(|status| status.to_lowercase().contains("ready"))
}

pub fn is_vacant_ready(unit: &Unit) -> bool {
    is_vacant(unit) && is_ready(unit)
}

pub fn is_vacant_not_ready(unit: &Unit) -> bool {
    is_vacant(unit) && !is_ready(unit)
}

pub fn is_aged_vacancy_90_plus(unit: &Unit) -> bool {
    is_vacant(unit) && unit.days_vacant.is_some_and(|days| days > 90)
}

pub fn has_availability_flag(unit: &Unit) -> bool {
    unit.available == Some(true)
}

/// Whether any unit in the dataset carries the explicit availability flag at
/// all; when none does, availability falls back to vacant minus preleased.
pub fn availability_flag_present(dataset: &RawDataset) -> bool {
    dataset.units.iter().any(|unit| unit.available.is_some())
}

pub fn moved_in_within(resident: &Resident, period: &Period) -> bool {
    resident
        .move_in_date
        .is_some_and(|date| period.contains(date))
}

pub fn moved_out_within(resident: &Resident, period: &Period) -> bool {
    resident
        .move_out_date
        .is_some_and(|date| period.contains(date))
}

/// Projected departure date for a notice resident: the move-out date when
/// recorded, otherwise the lease end.
pub fn departure_date(resident: &Resident) -> Option<NaiveDate> {
    resident.move_out_date.or(resident.lease_end)
}

/// Departure falls within `horizon_days` forward of `today`. Horizons are
/// always relative to evaluation time, not the reporting period.
pub fn departing_within(resident: &Resident, today: NaiveDate, horizon_days: i64) -> bool {
    departure_date(resident)
        .is_some_and(|date| date >= today && date <= today + Duration::days(horizon_days))
}

/// Scheduled arrival date for a future resident: the move-in date when
/// recorded, otherwise the lease start.
pub fn arrival_date(resident: &Resident) -> Option<NaiveDate> {
    resident.move_in_date.or(resident.lease_start)
}

pub fn arriving_within(resident: &Resident, today: NaiveDate, horizon_days: i64) -> bool {
    arrival_date(resident)
        .is_some_and(|date| date >= today && date <= today + Duration::days(horizon_days))
}

pub fn matches_stage(prospect: &Prospect, stage: FunnelStage) -> bool {
    let event = prospect.last_event.to_lowercase();
    stage
        .keywords()
        .iter()
        .any(|keyword| event.contains(keyword))
}

/// Funnel membership: event label matches the stage keywords and the event
/// date falls inside the period. Stages are not mutually exclusive.
pub fn counts_in_stage(prospect: &Prospect, stage: FunnelStage, period: &Period) -> bool {
    prospect
        .event_date
        .is_some_and(|date| period.contains(date))
        && matches_stage(prospect, stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::domain::OccupancyStatus;

    fn unit(id: &str, status: OccupancyStatus) -> Unit {
        Unit {
            id: id.to_string(),
            property_id: "p1".to_string(),
            floorplan: "A1".to_string(),
            bedrooms: 2,
            bathrooms: 1.0,
            square_feet: Some(880),
            market_rent: Some(1450.0),
            occupancy_status: status,
            ready_status: None,
            ready: None,
            available: None,
            days_vacant: None,
        }
    }

    #[test]
    fn round1_is_half_away_from_zero() {
        assert_eq!(round1(92.45), 92.5);
        assert_eq!(round1(92.44), 92.4);
        assert_eq!(round1(-1.25), -1.3);
    }

    #[test]
    fn pct_never_produces_nan() {
        assert_eq!(pct(3, 0), 0.0);
        assert_eq!(pct(90, 100), 90.0);
        assert_eq!(pct(1, 3), 33.3);
    }

    #[test]
    fn ready_heuristic_accepts_flag_or_free_text() {
        let mut flagged = unit("u1", OccupancyStatus::Vacant);
        flagged.ready = Some(true);
        assert!(is_vacant_ready(&flagged));

        let mut text = unit("u2", OccupancyStatus::Vacant);
        text.ready_status = Some("Made Ready".to_string());
        assert!(is_vacant_ready(&text));

        let bare = unit("u3", OccupancyStatus::Vacant);
        assert!(is_vacant_not_ready(&bare));
    }

    #[test]
    fn aged_vacancy_requires_strictly_more_than_90_days() {
        let mut aged = unit("u1", OccupancyStatus::Vacant);
        aged.days_vacant = Some(91);
        assert!(is_aged_vacancy_90_plus(&aged));

        aged.days_vacant = Some(90);
        assert!(!is_aged_vacancy_90_plus(&aged));

        let occupied = unit("u2", OccupancyStatus::Occupied);
        assert!(!is_aged_vacancy_90_plus(&occupied));
    }

    #[test]
    fn stage_matching_is_case_insensitive_and_non_exclusive() {
        let prospect = Prospect {
            property_id: "p1".to_string(),
            last_event: "Lease Signed after Tour".to_string(),
            event_date: NaiveDate::from_ymd_opt(2026, 8, 10),
        };
        assert!(matches_stage(&prospect, FunnelStage::LeaseSigned));
        assert!(matches_stage(&prospect, FunnelStage::Tour));
        assert!(!matches_stage(&prospect, FunnelStage::Denied));
    }
}
