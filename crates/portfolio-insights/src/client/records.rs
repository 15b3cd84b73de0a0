//! Wire-level records for the two property-management systems feeding the
//! dashboard, plus the canonical normalizer. Each source keeps its own
//! explicitly typed shape; normalization is exhaustive over the tagged enum
//! rather than defensively coded against untyped maps.

use crate::reporting::domain::{
    LifecycleBucket, OccupancyStatus, Prospect, Resident, Unit,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A unit as one of the upstream systems reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceUnit {
    Appfolio(AppfolioUnit),
    Rentvine(RentvineUnit),
}

/// AppFolio emits availability and make-ready flags directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppfolioUnit {
    pub unit_id: String,
    pub property_id: String,
    pub floorplan: String,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub square_feet: Option<u32>,
    pub market_rent: Option<f64>,
    pub status: String,
    pub unit_status: Option<String>,
    pub is_available: Option<bool>,
    pub days_vacant: Option<u32>,
}

/// Rentvine reports neither an availability flag nor a ready boolean, only a
/// free-text condition string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentvineUnit {
    pub id: String,
    pub property: String,
    pub unit_type: String,
    pub beds: u8,
    pub baths: f32,
    pub sqft: Option<u32>,
    pub asking_rent: Option<f64>,
    pub occupancy: String,
    pub condition: Option<String>,
    pub vacant_days: Option<u32>,
}

fn parse_occupancy_status(raw: &str) -> Option<OccupancyStatus> {
    let status = raw.trim().to_ascii_lowercase();
    if status.contains("notice") {
        Some(OccupancyStatus::Notice)
    } else if status.contains("occupied") {
        Some(OccupancyStatus::Occupied)
    } else if status.contains("vacant") {
        Some(OccupancyStatus::Vacant)
    } else if status.contains("down") {
        Some(OccupancyStatus::Down)
    } else if status.contains("model") {
        Some(OccupancyStatus::Model)
    } else {
        None
    }
}

impl SourceUnit {
    /// Normalize into the canonical shape. Units with a status outside the
    /// taxonomy are dropped rather than guessed into a bucket.
    pub fn normalize(self) -> Option<Unit> {
        match self {
            Self::Appfolio(unit) => {
                let occupancy_status = parse_occupancy_status(&unit.status)?;
                Some(Unit {
                    id: unit.unit_id,
                    property_id: unit.property_id,
                    floorplan: unit.floorplan,
                    bedrooms: unit.bedrooms,
                    bathrooms: unit.bathrooms,
                    square_feet: unit.square_feet,
                    market_rent: unit.market_rent,
                    occupancy_status,
                    ready_status: unit.unit_status.clone(),
                    ready: unit
                        .unit_status
                        .as_deref()
                        .map(|status| status.eq_ignore_ascii_case("ready")),
                    available: unit.is_available,
                    days_vacant: unit.days_vacant,
                })
            }
            Self::Rentvine(unit) => {
                let occupancy_status = parse_occupancy_status(&unit.occupancy)?;
                Some(Unit {
                    id: unit.id,
                    property_id: unit.property,
                    floorplan: unit.unit_type,
                    bedrooms: unit.beds,
                    bathrooms: unit.baths,
                    square_feet: unit.sqft,
                    market_rent: unit.asking_rent,
                    occupancy_status,
                    ready_status: unit.condition,
                    ready: None,
                    available: None,
                    days_vacant: unit.vacant_days,
                })
            }
        }
    }
}

/// A resident/lease row as reported upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceResident {
    Appfolio(AppfolioResident),
    Rentvine(RentvineResident),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppfolioResident {
    pub tenant_id: String,
    pub unit_id: String,
    pub property_id: String,
    pub rent: Option<f64>,
    pub status: String,
    pub move_in: Option<NaiveDate>,
    pub move_out: Option<NaiveDate>,
    pub lease_from: Option<NaiveDate>,
    pub lease_to: Option<NaiveDate>,
    pub notice_given: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentvineResident {
    pub lease_id: String,
    pub unit: String,
    pub property: String,
    pub monthly_rent: Option<f64>,
    pub lease_status: String,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notice_date: Option<NaiveDate>,
}

/// Bucket a raw lifecycle status. Case-insensitive; unrecognized statuses
/// fall into no bucket at all, an explicit non-match rather than a default.
pub fn bucket_for_status(raw: &str) -> Option<LifecycleBucket> {
    let status = raw.trim().to_ascii_lowercase();
    if status.contains("future") || status.contains("pending") {
        Some(LifecycleBucket::Future)
    } else if status.contains("notice") {
        Some(LifecycleBucket::Notice)
    } else if status.contains("past") || status.contains("previous") || status.contains("former") {
        Some(LifecycleBucket::Past)
    } else if status.contains("current") || status.contains("active") {
        Some(LifecycleBucket::Current)
    } else {
        None
    }
}

impl SourceResident {
    pub fn lifecycle(&self) -> Option<LifecycleBucket> {
        match self {
            Self::Appfolio(resident) => bucket_for_status(&resident.status),
            Self::Rentvine(resident) => bucket_for_status(&resident.lease_status),
        }
    }

    pub fn normalize(self) -> Resident {
        match self {
            Self::Appfolio(resident) => Resident {
                id: resident.tenant_id,
                unit_id: resident.unit_id,
                property_id: resident.property_id,
                rent: resident.rent,
                move_in_date: resident.move_in,
                move_out_date: resident.move_out,
                lease_start: resident.lease_from,
                lease_end: resident.lease_to,
                notice_date: resident.notice_given,
            },
            Self::Rentvine(resident) => Resident {
                id: resident.lease_id,
                unit_id: resident.unit,
                property_id: resident.property,
                rent: resident.monthly_rent,
                move_in_date: resident.move_in_date,
                move_out_date: resident.move_out_date,
                lease_start: resident.start_date,
                lease_end: resident.end_date,
                notice_date: resident.notice_date,
            },
        }
    }
}

/// Guest-card events. Only AppFolio exposes prospect data; the shape stays
/// permissive on field naming because exports disagree on the event column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProspect {
    pub property_id: String,
    #[serde(alias = "event", alias = "last_activity")]
    pub last_event: String,
    #[serde(alias = "activity_date")]
    pub event_date: Option<NaiveDate>,
}

impl SourceProspect {
    pub fn normalize(self) -> Prospect {
        Prospect {
            property_id: self.property_id,
            last_event: self.last_event,
            event_date: self.event_date,
        }
    }
}

/// Availability/ATR passthrough row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub unit_id: String,
    pub property_id: String,
    pub available_on: Option<NaiveDate>,
    pub market_rent: Option<f64>,
}

/// Amenity passthrough row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmenityRecord {
    pub property_id: String,
    pub name: String,
    pub monthly_amount: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appfolio_notice_units_keep_the_notice_status() {
        let unit = SourceUnit::Appfolio(AppfolioUnit {
            unit_id: "u-1".to_string(),
            property_id: "p-1".to_string(),
            floorplan: "A1".to_string(),
            bedrooms: 2,
            bathrooms: 1.5,
            square_feet: Some(900),
            market_rent: Some(1500.0),
            status: "Occupied - Notice".to_string(),
            unit_status: None,
            is_available: Some(false),
            days_vacant: None,
        });

        let normalized = unit.normalize().expect("normalizes");
        assert_eq!(normalized.occupancy_status, OccupancyStatus::Notice);
        assert!(normalized.occupancy_status.physically_occupied());
    }

    #[test]
    fn rentvine_units_never_carry_availability_flags() {
        let unit = SourceUnit::Rentvine(RentvineUnit {
            id: "rv-7".to_string(),
            property: "p-2".to_string(),
            unit_type: "2x2".to_string(),
            beds: 2,
            baths: 2.0,
            sqft: Some(1040),
            asking_rent: Some(1725.0),
            occupancy: "VACANT".to_string(),
            condition: Some("Make Ready complete".to_string()),
            vacant_days: Some(12),
        });

        let normalized = unit.normalize().expect("normalizes");
        assert_eq!(normalized.available, None);
        assert_eq!(normalized.ready, None);
        assert_eq!(normalized.occupancy_status, OccupancyStatus::Vacant);
    }

    #[test]
    fn units_with_unknown_statuses_are_dropped() {
        let unit = SourceUnit::Rentvine(RentvineUnit {
            id: "rv-9".to_string(),
            property: "p-2".to_string(),
            unit_type: "1x1".to_string(),
            beds: 1,
            baths: 1.0,
            sqft: None,
            asking_rent: None,
            occupancy: "under construction".to_string(),
            condition: None,
            vacant_days: None,
        });
        assert!(unit.normalize().is_none());
    }

    #[test]
    fn resident_bucketing_is_case_insensitive_and_strict() {
        assert_eq!(bucket_for_status("CURRENT"), Some(LifecycleBucket::Current));
        assert_eq!(
            bucket_for_status("Notice - Rentable"),
            Some(LifecycleBucket::Notice)
        );
        assert_eq!(bucket_for_status("Future Lease"), Some(LifecycleBucket::Future));
        assert_eq!(bucket_for_status("Former Tenant"), Some(LifecycleBucket::Past));
        assert_eq!(bucket_for_status("evicted??"), None);
    }

    #[test]
    fn source_units_round_trip_through_the_tag() {
        let json = serde_json::json!({
            "source": "appfolio",
            "unit_id": "u-3",
            "property_id": "p-1",
            "floorplan": "S0",
            "bedrooms": 0,
            "bathrooms": 1.0,
            "square_feet": null,
            "market_rent": null,
            "status": "vacant",
            "unit_status": "Ready",
            "is_available": true,
            "days_vacant": 30
        });
        let unit: SourceUnit = serde_json::from_value(json).expect("deserializes");
        let normalized = unit.normalize().expect("normalizes");
        assert_eq!(normalized.ready, Some(true));
        assert_eq!(normalized.available, Some(true));
    }
}
