use crate::infra::StaticPmsClient;
use chrono::{Local, NaiveDate};
use clap::Args;
use portfolio_insights::client::cache::CacheService;
use portfolio_insights::error::AppError;
use portfolio_insights::reporting::domain::FunnelStage;
use portfolio_insights::reporting::{
    AggregationMode, DatasetFetcher, PropertyContext, Timeframe,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Property ids to include (defaults to both demo properties)
    #[arg(long)]
    pub(crate) properties: Vec<String>,
    /// Timeframe code: cm, pm, ytd, l30, l7
    #[arg(long, default_value = "cm", value_parser = parse_timeframe)]
    pub(crate) timeframe: Timeframe,
    /// Combine properties with unit-weighted averages instead of row metrics
    #[arg(long)]
    pub(crate) weighted: bool,
    /// Override the evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// List the drill-through records behind each count
    #[arg(long)]
    pub(crate) list_records: bool,
}

fn parse_timeframe(raw: &str) -> Result<Timeframe, String> {
    raw.parse().map_err(|err| format!("{err}"))
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        properties,
        timeframe,
        weighted,
        today,
        list_records,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let property_ids = if properties.is_empty() {
        vec![
            StaticPmsClient::SUNSET_RIDGE.to_string(),
            StaticPmsClient::HARBOR_POINT.to_string(),
        ]
    } else {
        properties
    };
    let mode = if weighted {
        AggregationMode::WeightedAvg
    } else {
        AggregationMode::RowMetrics
    };

    let client = Arc::new(StaticPmsClient::new(today));
    let cache = Arc::new(CacheService::new(Duration::from_secs(300), 6));
    let fetcher = Arc::new(DatasetFetcher::new(client, cache));
    let context = PropertyContext::new(fetcher.clone(), mode).with_today(today);

    context
        .apply_selection(property_ids.clone(), timeframe, None)
        .await;
    let snapshot = context.snapshot();

    println!("Portfolio report for {}", property_ids.join(", "));
    if let Some(period) = snapshot.period {
        println!("Period: {period} (timeframe {})", timeframe.as_code());
    }
    if let Some(prior) = snapshot.prior_period {
        println!("Prior period: {prior}");
    }
    if let Some(error) = &snapshot.error {
        println!("Fetch failed: {error}");
        return Ok(());
    }

    let Some(metrics) = snapshot.metrics else {
        println!("No metrics available");
        return Ok(());
    };

    println!("\nOccupancy");
    println!(
        "- {} units | {} occupied ({:.1}% physical)",
        metrics.occupancy.total_units,
        metrics.occupancy.occupied_units,
        metrics.occupancy.physical_occupancy
    );
    println!(
        "- {} vacant ({} preleased) | {} leased ({:.1}%)",
        metrics.occupancy.vacant_units,
        metrics.occupancy.preleased_vacant,
        metrics.occupancy.leased_units,
        metrics.occupancy.leased_percentage
    );
    println!(
        "- {} available | {} vacant ready | {} vacant not ready | {} aged 90+ days",
        metrics.occupancy.available_units,
        metrics.occupancy.vacant_ready,
        metrics.occupancy.vacant_not_ready,
        metrics.occupancy.aged_vacancy_90_plus
    );

    println!("\nExposure");
    println!(
        "- {} move-ins | {} move-outs | net absorption {}",
        metrics.exposure.move_ins, metrics.exposure.move_outs, metrics.exposure.net_absorption
    );
    println!(
        "- 30-day: {} notices, {} pending move-ins, exposure {}",
        metrics.exposure.notices_30_days,
        metrics.exposure.pending_move_ins_30_days,
        metrics.exposure.exposure_30_days
    );
    println!(
        "- 60-day: {} notices, {} pending move-ins, exposure {}",
        metrics.exposure.notices_60_days,
        metrics.exposure.pending_move_ins_60_days,
        metrics.exposure.exposure_60_days
    );

    println!("\nLeasing funnel");
    println!(
        "- {} leads -> {} tours -> {} applications -> {} leases signed ({} denied)",
        metrics.funnel.leads,
        metrics.funnel.tours,
        metrics.funnel.applications,
        metrics.funnel.leases_signed,
        metrics.funnel.denials
    );
    println!(
        "- lead-to-tour {:.1}% | application-to-lease {:.1}%",
        metrics.funnel.lead_to_tour_rate, metrics.funnel.application_to_lease_rate
    );

    let expirations = fetcher.expirations(&property_ids).await;
    if !expirations.is_empty() {
        println!("\nLease expirations");
        for bucket in &expirations {
            println!(
                "- {}: {} expirations | {} renewals ({:.1}%) | {} notices | {} month-to-month",
                bucket.label,
                bucket.expirations,
                bucket.renewals,
                bucket.renewal_pct,
                bucket.notices,
                bucket.month_to_month
            );
        }
    }

    let renewals = fetcher.renewal_summary(&property_ids).await;
    if renewals.expirations_next_90 > 0 {
        println!(
            "\nRenewals: {} of {} expirations in the next 90 days signed ({:.1}%)",
            renewals.renewals_signed, renewals.expirations_next_90, renewals.renewal_pct
        );
    }

    if let Ok(availability) = fetcher.availability(&property_ids).await {
        if !availability.is_empty() {
            println!("\nAvailable to rent");
            for entry in &availability {
                match entry.available_on {
                    Some(date) => println!(
                        "- {} ({}) available {}",
                        entry.unit_id, entry.property_id, date
                    ),
                    None => println!("- {} ({}) available now", entry.unit_id, entry.property_id),
                }
            }
        }
    }

    let mut forecasts = Vec::new();
    for id in &property_ids {
        if let Ok(points) = fetcher.occupancy_forecast(id).await {
            forecasts.push(points);
        }
    }
    let forecast = portfolio_insights::reporting::aggregate::merge_forecasts(&forecasts);
    if !forecast.is_empty() {
        println!("\nOccupancy forecast");
        for point in &forecast {
            println!("- {}: {:.1}%", point.month, point.projected_occupancy_pct);
        }
    }

    if list_records {
        if let Some(filtered) = snapshot.filtered {
            println!("\nVacant units");
            for unit in &filtered.vacant_units {
                println!(
                    "- {} ({}) | {} | {} days vacant",
                    unit.id,
                    unit.property_id,
                    unit.occupancy_status.label(),
                    unit.days_vacant.unwrap_or(0)
                );
            }
            println!("\nUpcoming move-ins");
            for resident in &filtered.scheduled_move_ins {
                match resident.move_in_date {
                    Some(date) => println!("- {} -> unit {} on {}", resident.id, resident.unit_id, date),
                    None => println!("- {} -> unit {} (unscheduled)", resident.id, resident.unit_id),
                }
            }

            for stage in FunnelStage::ordered() {
                let records = filtered.funnel_records(stage);
                if records.is_empty() {
                    continue;
                }
                println!("\n{} events", stage.label());
                for prospect in records {
                    match prospect.event_date {
                        Some(date) => {
                            println!("- {} ({}) on {}", prospect.last_event, prospect.property_id, date)
                        }
                        None => println!("- {} ({})", prospect.last_event, prospect.property_id),
                    }
                }
            }
        }

        for id in &property_ids {
            if let Ok(amenities) = fetcher.amenities(id).await {
                if amenities.is_empty() {
                    continue;
                }
                println!("\nAmenities ({id})");
                for amenity in &amenities {
                    match amenity.monthly_amount {
                        Some(amount) => println!("- {} (${amount:.2}/mo)", amenity.name),
                        None => println!("- {}", amenity.name),
                    }
                }
            }
        }
    }

    Ok(())
}
