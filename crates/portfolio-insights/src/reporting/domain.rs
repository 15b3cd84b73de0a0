use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snapshot occupancy taxonomy for a unit. A unit carries exactly one status
/// at a time; `Down` and `Model` units never count toward inventory
/// denominators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    Occupied,
    Vacant,
    Notice,
    Down,
    Model,
}

impl OccupancyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Occupied => "Occupied",
            Self::Vacant => "Vacant",
            Self::Notice => "Notice",
            Self::Down => "Down",
            Self::Model => "Model",
        }
    }

    /// Whether the unit belongs in total-inventory denominators.
    pub const fn in_inventory(self) -> bool {
        !matches!(self, Self::Down | Self::Model)
    }

    /// A resident on notice is still physically present, so `Notice` counts
    /// as occupied for occupancy accounting while staying separately
    /// queryable for exposure.
    pub const fn physically_occupied(self) -> bool {
        matches!(self, Self::Occupied | Self::Notice)
    }
}

/// One rentable unit in canonical form, after source normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub property_id: String,
    pub floorplan: String,
    pub bedrooms: u8,
    pub bathrooms: f32,
    pub square_feet: Option<u32>,
    pub market_rent: Option<f64>,
    pub occupancy_status: OccupancyStatus,
    /// Free-text make-ready status as reported upstream.
    pub ready_status: Option<String>,
    /// Explicit make-ready flag; only one upstream source emits it.
    pub ready: Option<bool>,
    /// Explicit availability flag; only one upstream source emits it.
    pub available: Option<bool>,
    pub days_vacant: Option<u32>,
}

/// Lifecycle bucket for a resident. Every fetched resident lands in exactly
/// one bucket; unrecognized upstream statuses land in none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleBucket {
    Current,
    Notice,
    Past,
    Future,
}

impl LifecycleBucket {
    pub const fn all() -> [Self; 4] {
        [Self::Current, Self::Notice, Self::Past, Self::Future]
    }

    pub const fn as_query(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Notice => "notice",
            Self::Past => "past",
            Self::Future => "future",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    pub id: String,
    pub unit_id: String,
    pub property_id: String,
    pub rent: Option<f64>,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    pub notice_date: Option<NaiveDate>,
}

/// Residents partitioned by lifecycle status, exactly as fetched. A `future`
/// resident is a signed-but-not-moved-in lease and is the sole signal that
/// marks a vacant unit as preleased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResidentBuckets {
    pub current: Vec<Resident>,
    pub notice: Vec<Resident>,
    pub past: Vec<Resident>,
    pub future: Vec<Resident>,
}

impl ResidentBuckets {
    pub fn bucket_mut(&mut self, bucket: LifecycleBucket) -> &mut Vec<Resident> {
        match bucket {
            LifecycleBucket::Current => &mut self.current,
            LifecycleBucket::Notice => &mut self.notice,
            LifecycleBucket::Past => &mut self.past,
            LifecycleBucket::Future => &mut self.future,
        }
    }
}

/// A leasing lead event. Prospects carry no stable identifier upstream; they
/// are classified into funnel stages by keyword match on `last_event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub property_id: String,
    pub last_event: String,
    pub event_date: Option<NaiveDate>,
}

/// Leasing-funnel stages. Membership is "reached at least this stage": a
/// prospect whose event label matches several stage keyword sets counts in
/// each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    Lead,
    Tour,
    Application,
    LeaseSigned,
    Denied,
}

impl FunnelStage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Lead,
            Self::Tour,
            Self::Application,
            Self::LeaseSigned,
            Self::Denied,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Tour => "Tour",
            Self::Application => "Application",
            Self::LeaseSigned => "Lease Signed",
            Self::Denied => "Denied",
        }
    }

    /// Keyword sets matched case-insensitively against a prospect's
    /// `last_event` label.
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Lead => &["lead", "inquiry", "guest card", "contact"],
            Self::Tour => &["tour", "showing", "visit", "appointment"],
            Self::Application => &["application", "applied", "screening"],
            Self::LeaseSigned => &["lease signed", "signed lease", "move in scheduled"],
            Self::Denied => &["denied", "declined", "cancelled", "lost"],
        }
    }
}

/// The unit of work for one logical property: a single id, or the union of
/// several ids in multi-select mode. Immutable once produced; a newer fetch
/// replaces it wholesale, never merges into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub property_ids: Vec<String>,
    pub units: Vec<Unit>,
    pub residents: ResidentBuckets,
    pub prospects: Vec<Prospect>,
}

/// How a multi-property portfolio view combines its members. Selected per
/// view session, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Compute metrics per property, then combine with unit-weighted sums.
    WeightedAvg,
    /// Concatenate raw records and compute metrics once over the union.
    RowMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_and_model_units_are_out_of_inventory() {
        assert!(!OccupancyStatus::Down.in_inventory());
        assert!(!OccupancyStatus::Model.in_inventory());
        assert!(OccupancyStatus::Vacant.in_inventory());
        assert!(OccupancyStatus::Notice.in_inventory());
    }

    #[test]
    fn notice_units_count_as_physically_occupied() {
        assert!(OccupancyStatus::Notice.physically_occupied());
        assert!(OccupancyStatus::Occupied.physically_occupied());
        assert!(!OccupancyStatus::Vacant.physically_occupied());
    }

    #[test]
    fn funnel_stages_expose_labels_and_keywords() {
        assert_eq!(FunnelStage::ordered().len(), 5);
        assert_eq!(FunnelStage::LeaseSigned.label(), "Lease Signed");
        assert!(FunnelStage::Tour.keywords().contains(&"showing"));
    }
}
