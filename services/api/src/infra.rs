use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use portfolio_insights::client::records::{
    AmenityRecord, AppfolioResident, AppfolioUnit, AvailabilityEntry, RentvineResident,
    RentvineUnit, SourceProspect, SourceResident, SourceUnit,
};
use portfolio_insights::client::{ClientError, PmsClient};
use portfolio_insights::reporting::aggregate::OccupancyForecastPoint;
use portfolio_insights::reporting::metrics::{ExpirationPeriod, RenewalSummary, TradeoutEntry};
use portfolio_insights::reporting::Period;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Deterministic in-memory backend used by the demo command and the route
/// tests. Two synthetic properties: `sunset-ridge` reports in the AppFolio
/// shape, `harbor-point` in the Rentvine shape (no availability or ready
/// flags, no prospects).
pub(crate) struct StaticPmsClient {
    anchor: NaiveDate,
}

impl StaticPmsClient {
    pub(crate) fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    pub(crate) const SUNSET_RIDGE: &'static str = "sunset-ridge";
    pub(crate) const HARBOR_POINT: &'static str = "harbor-point";

    fn sunset_units(&self) -> Vec<SourceUnit> {
        let mut units = Vec::new();
        for i in 0..18 {
            units.push(SourceUnit::Appfolio(AppfolioUnit {
                unit_id: format!("sr-{i:02}"),
                property_id: Self::SUNSET_RIDGE.to_string(),
                floorplan: if i % 3 == 0 { "A1" } else { "B2" }.to_string(),
                bedrooms: if i % 3 == 0 { 1 } else { 2 },
                bathrooms: if i % 3 == 0 { 1.0 } else { 2.0 },
                square_feet: Some(700 + 40 * (i % 5)),
                market_rent: Some(1250.0 + 50.0 * (i % 4) as f64),
                status: "occupied".to_string(),
                unit_status: None,
                is_available: Some(false),
                days_vacant: None,
            }));
        }
        units.push(SourceUnit::Appfolio(AppfolioUnit {
            unit_id: "sr-18".to_string(),
            property_id: Self::SUNSET_RIDGE.to_string(),
            floorplan: "B2".to_string(),
            bedrooms: 2,
            bathrooms: 2.0,
            square_feet: Some(940),
            market_rent: Some(1450.0),
            status: "occupied - notice".to_string(),
            unit_status: None,
            is_available: Some(true),
            days_vacant: None,
        }));
        for (i, ready) in [(19, true), (20, false), (21, false)] {
            units.push(SourceUnit::Appfolio(AppfolioUnit {
                unit_id: format!("sr-{i}"),
                property_id: Self::SUNSET_RIDGE.to_string(),
                floorplan: "A1".to_string(),
                bedrooms: 1,
                bathrooms: 1.0,
                square_feet: Some(710),
                market_rent: Some(1275.0),
                status: "vacant".to_string(),
                unit_status: Some(if ready { "Ready" } else { "Make Ready" }.to_string()),
                is_available: Some(true),
                days_vacant: Some(if i == 21 { 120 } else { 14 }),
            }));
        }
        units.push(SourceUnit::Appfolio(AppfolioUnit {
            unit_id: "sr-22".to_string(),
            property_id: Self::SUNSET_RIDGE.to_string(),
            floorplan: "B2".to_string(),
            bedrooms: 2,
            bathrooms: 2.0,
            square_feet: Some(960),
            market_rent: None,
            status: "down".to_string(),
            unit_status: Some("Renovation".to_string()),
            is_available: Some(false),
            days_vacant: None,
        }));
        units
    }

    fn harbor_units(&self) -> Vec<SourceUnit> {
        let mut units = Vec::new();
        for i in 0..14 {
            units.push(SourceUnit::Rentvine(RentvineUnit {
                id: format!("hp-{i:02}"),
                property: Self::HARBOR_POINT.to_string(),
                unit_type: "2x1".to_string(),
                beds: 2,
                baths: 1.0,
                sqft: Some(860),
                asking_rent: Some(1380.0),
                occupancy: "OCCUPIED".to_string(),
                condition: None,
                vacant_days: None,
            }));
        }
        for i in 14..16 {
            units.push(SourceUnit::Rentvine(RentvineUnit {
                id: format!("hp-{i}"),
                property: Self::HARBOR_POINT.to_string(),
                unit_type: "1x1".to_string(),
                beds: 1,
                baths: 1.0,
                sqft: Some(640),
                asking_rent: Some(1150.0),
                occupancy: "vacant".to_string(),
                condition: Some(if i == 14 { "Ready for showing" } else { "Paint pending" }.to_string()),
                vacant_days: Some(9),
            }));
        }
        units
    }

    fn residents_for(&self, status: &str) -> Vec<SourceResident> {
        let anchor = self.anchor;
        match status {
            "future" => vec![
                SourceResident::Appfolio(AppfolioResident {
                    tenant_id: "sr-fut-1".to_string(),
                    unit_id: "sr-19".to_string(),
                    property_id: Self::SUNSET_RIDGE.to_string(),
                    rent: Some(1300.0),
                    status: "Future".to_string(),
                    move_in: Some(anchor + Duration::days(12)),
                    move_out: None,
                    lease_from: Some(anchor + Duration::days(12)),
                    lease_to: Some(anchor + Duration::days(377)),
                    notice_given: None,
                }),
                SourceResident::Rentvine(RentvineResident {
                    lease_id: "hp-fut-1".to_string(),
                    unit: "hp-14".to_string(),
                    property: Self::HARBOR_POINT.to_string(),
                    monthly_rent: Some(1175.0),
                    lease_status: "Pending Move-In".to_string(),
                    move_in_date: Some(anchor + Duration::days(40)),
                    move_out_date: None,
                    start_date: Some(anchor + Duration::days(40)),
                    end_date: None,
                    notice_date: None,
                }),
            ],
            "notice" => vec![SourceResident::Appfolio(AppfolioResident {
                tenant_id: "sr-not-1".to_string(),
                unit_id: "sr-18".to_string(),
                property_id: Self::SUNSET_RIDGE.to_string(),
                rent: Some(1440.0),
                status: "Notice".to_string(),
                move_in: Some(anchor - Duration::days(400)),
                move_out: Some(anchor + Duration::days(21)),
                lease_from: None,
                lease_to: Some(anchor + Duration::days(21)),
                notice_given: Some(anchor - Duration::days(9)),
            })],
            "past" => vec![SourceResident::Rentvine(RentvineResident {
                lease_id: "hp-past-1".to_string(),
                unit: "hp-15".to_string(),
                property: Self::HARBOR_POINT.to_string(),
                monthly_rent: Some(1120.0),
                lease_status: "Former".to_string(),
                move_in_date: Some(anchor - Duration::days(390)),
                move_out_date: Some(anchor - Duration::days(6)),
                start_date: None,
                end_date: Some(anchor - Duration::days(6)),
                notice_date: Some(anchor - Duration::days(45)),
            })],
            "current" => vec![SourceResident::Appfolio(AppfolioResident {
                tenant_id: "sr-cur-1".to_string(),
                unit_id: "sr-00".to_string(),
                property_id: Self::SUNSET_RIDGE.to_string(),
                rent: Some(1260.0),
                status: "Current".to_string(),
                move_in: Some(anchor - Duration::days(3)),
                move_out: None,
                lease_from: Some(anchor - Duration::days(3)),
                lease_to: Some(anchor + Duration::days(362)),
                notice_given: None,
            })],
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl PmsClient for StaticPmsClient {
    async fn units(&self, property_ids: &[String]) -> Result<Vec<SourceUnit>, ClientError> {
        let mut units = Vec::new();
        for id in property_ids {
            match id.as_str() {
                Self::SUNSET_RIDGE => units.extend(self.sunset_units()),
                Self::HARBOR_POINT => units.extend(self.harbor_units()),
                _ => {}
            }
        }
        Ok(units)
    }

    async fn residents(
        &self,
        property_ids: &[String],
        status: &str,
    ) -> Result<Vec<SourceResident>, ClientError> {
        let wanted: Vec<SourceResident> = self
            .residents_for(status)
            .into_iter()
            .filter(|resident| {
                let property = match resident {
                    SourceResident::Appfolio(r) => r.property_id.as_str(),
                    SourceResident::Rentvine(r) => r.property.as_str(),
                };
                property_ids.iter().any(|id| id == property)
            })
            .collect();
        Ok(wanted)
    }

    /// Only the AppFolio-backed property exposes guest cards.
    async fn prospects(
        &self,
        property_id: &str,
        period: &Period,
    ) -> Result<Vec<SourceProspect>, ClientError> {
        if property_id != Self::SUNSET_RIDGE {
            return Ok(Vec::new());
        }
        let end = period.end.date();
        let events = [
            ("New lead from listing site", 2),
            ("Guest card created", 4),
            ("Tour completed", 3),
            ("Application submitted", 1),
            ("Lease signed", 1),
            ("Application denied", 5),
        ];
        Ok(events
            .iter()
            .map(|(event, days_back)| SourceProspect {
                property_id: property_id.to_string(),
                last_event: event.to_string(),
                event_date: Some(end - Duration::days(*days_back)),
            })
            .collect())
    }

    async fn expirations(&self, property_id: &str) -> Result<Vec<ExpirationPeriod>, ClientError> {
        let scale = if property_id == Self::SUNSET_RIDGE { 2 } else { 1 };
        Ok(vec![
            ExpirationPeriod {
                label: "30_days".to_string(),
                expirations: 3 * scale,
                renewals: 2 * scale,
                notices: scale,
                month_to_month: 0,
                renewal_pct: 0.0,
            },
            ExpirationPeriod {
                label: "60_days".to_string(),
                expirations: 5 * scale,
                renewals: 3 * scale,
                notices: scale,
                month_to_month: 1,
                renewal_pct: 0.0,
            },
            ExpirationPeriod {
                label: "90_days".to_string(),
                expirations: 8 * scale,
                renewals: 5 * scale,
                notices: 2 * scale,
                month_to_month: 1,
                renewal_pct: 0.0,
            },
        ])
    }

    async fn renewal_summary(&self, property_id: &str) -> Result<RenewalSummary, ClientError> {
        let scale = if property_id == Self::SUNSET_RIDGE { 2 } else { 1 };
        Ok(RenewalSummary {
            expirations_next_90: 8 * scale,
            renewals_signed: 5 * scale,
            renewal_pct: 62.5,
        })
    }

    async fn tradeouts(
        &self,
        property_id: &str,
        _period: &Period,
    ) -> Result<Vec<TradeoutEntry>, ClientError> {
        if property_id != Self::SUNSET_RIDGE {
            return Ok(Vec::new());
        }
        Ok(vec![TradeoutEntry {
            unit_id: "sr-07".to_string(),
            prior_rent: 1250.0,
            new_rent: 1325.0,
            tradeout_pct: 6.0,
        }])
    }

    async fn availability(
        &self,
        property_ids: &[String],
    ) -> Result<Vec<AvailabilityEntry>, ClientError> {
        if !property_ids.iter().any(|id| id == Self::SUNSET_RIDGE) {
            return Ok(Vec::new());
        }
        Ok(vec![
            AvailabilityEntry {
                unit_id: "sr-19".to_string(),
                property_id: Self::SUNSET_RIDGE.to_string(),
                available_on: Some(self.anchor + Duration::days(5)),
                market_rent: Some(1275.0),
            },
            AvailabilityEntry {
                unit_id: "sr-20".to_string(),
                property_id: Self::SUNSET_RIDGE.to_string(),
                available_on: Some(self.anchor + Duration::days(18)),
                market_rent: Some(1275.0),
            },
        ])
    }

    async fn occupancy_forecast(
        &self,
        property_id: &str,
    ) -> Result<Vec<OccupancyForecastPoint>, ClientError> {
        let base = if property_id == Self::SUNSET_RIDGE { 93.0 } else { 90.0 };
        let mut month = self.anchor;
        let mut points = Vec::new();
        for step in 0..3 {
            points.push(OccupancyForecastPoint {
                month: format!("{}-{:02}", month.year(), month.month()),
                projected_occupancy_pct: base + step as f64 * 0.5,
            });
            month = month + Duration::days(31);
        }
        Ok(points)
    }

    async fn amenities(&self, property_id: &str) -> Result<Vec<AmenityRecord>, ClientError> {
        Ok(vec![AmenityRecord {
            property_id: property_id.to_string(),
            name: "Covered parking".to_string(),
            monthly_amount: Some(45.0),
        }])
    }

    async fn create_watchpoint(
        &self,
        _property_id: &str,
        payload: Value,
    ) -> Result<Value, ClientError> {
        Ok(payload)
    }

    async fn delete_watchpoint(&self, _property_id: &str, _id: &str) -> Result<(), ClientError> {
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}
