use chrono::{Duration, NaiveDate};
use portfolio_insights::reporting::domain::{
    OccupancyStatus, Prospect, RawDataset, Resident, Unit,
};
use portfolio_insights::reporting::{aggregate, metrics, FilteredData, Period, Timeframe};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn unit(id: &str, property_id: &str, status: OccupancyStatus) -> Unit {
    Unit {
        id: id.to_string(),
        property_id: property_id.to_string(),
        floorplan: "A1".to_string(),
        bedrooms: 2,
        bathrooms: 1.0,
        square_feet: Some(850),
        market_rent: Some(1400.0),
        occupancy_status: status,
        ready_status: None,
        ready: None,
        available: None,
        days_vacant: None,
    }
}

fn resident(id: &str, unit_id: &str, property_id: &str) -> Resident {
    Resident {
        id: id.to_string(),
        unit_id: unit_id.to_string(),
        property_id: property_id.to_string(),
        rent: Some(1350.0),
        move_in_date: None,
        move_out_date: None,
        lease_start: None,
        lease_end: None,
        notice_date: None,
    }
}

/// A mid-sized property exercising every record kind at once.
fn busy_property(property_id: &str, today: NaiveDate) -> RawDataset {
    let mut dataset = RawDataset {
        property_ids: vec![property_id.to_string()],
        ..Default::default()
    };

    for i in 0..40 {
        dataset
            .units
            .push(unit(&format!("{property_id}-o{i}"), property_id, OccupancyStatus::Occupied));
    }
    for i in 0..4 {
        let mut vacant = unit(&format!("{property_id}-v{i}"), property_id, OccupancyStatus::Vacant);
        if i % 2 == 0 {
            vacant.ready = Some(true);
        }
        if i == 3 {
            vacant.days_vacant = Some(140);
        }
        dataset.units.push(vacant);
    }
    dataset
        .units
        .push(unit(&format!("{property_id}-n0"), property_id, OccupancyStatus::Notice));
    dataset
        .units
        .push(unit(&format!("{property_id}-d0"), property_id, OccupancyStatus::Down));
    dataset
        .units
        .push(unit(&format!("{property_id}-m0"), property_id, OccupancyStatus::Model));

    let mut future = resident(&format!("{property_id}-fut"), &format!("{property_id}-v0"), property_id);
    future.move_in_date = Some(today + Duration::days(9));
    dataset.residents.future.push(future);

    let mut notice = resident(&format!("{property_id}-not"), &format!("{property_id}-n0"), property_id);
    notice.move_out_date = Some(today + Duration::days(25));
    dataset.residents.notice.push(notice);

    let mut arrived = resident(&format!("{property_id}-cur"), &format!("{property_id}-o0"), property_id);
    arrived.move_in_date = Some(today - Duration::days(4));
    dataset.residents.current.push(arrived);

    let mut departed = resident(&format!("{property_id}-pst"), &format!("{property_id}-o1"), property_id);
    departed.move_out_date = Some(today - Duration::days(6));
    dataset.residents.past.push(departed);

    for (event, offset) in [
        ("New lead created", 1),
        ("Tour completed", 2),
        ("Application submitted", 3),
        ("Lease signed", 4),
        ("Application denied", 5),
    ] {
        dataset.prospects.push(Prospect {
            property_id: property_id.to_string(),
            last_event: event.to_string(),
            event_date: Some(today - Duration::days(offset)),
        });
    }

    dataset
}

#[test]
fn mirror_lengths_always_equal_metric_counts() {
    let today = date(2026, 8, 19);
    let period = Timeframe::CurrentMonth.resolve(today.and_hms_opt(9, 0, 0).expect("time"));
    let dataset = busy_property("p1", today);

    let all = metrics::calculate_all(&dataset, &period, today);
    let filtered = FilteredData::build(&dataset, &period, today);

    assert_eq!(filtered.occupied_units.len(), all.occupancy.occupied_units);
    assert_eq!(filtered.vacant_units.len(), all.occupancy.vacant_units);
    assert_eq!(filtered.preleased_vacant.len(), all.occupancy.preleased_vacant);
    assert_eq!(filtered.available_units.len(), all.occupancy.available_units);
    assert_eq!(filtered.vacant_ready.len(), all.occupancy.vacant_ready);
    assert_eq!(filtered.vacant_not_ready.len(), all.occupancy.vacant_not_ready);
    assert_eq!(
        filtered.aged_vacancy_90_plus.len(),
        all.occupancy.aged_vacancy_90_plus
    );
    assert_eq!(filtered.move_ins.len(), all.exposure.move_ins);
    assert_eq!(filtered.move_outs.len(), all.exposure.move_outs);
    assert_eq!(filtered.notices_30_days.len(), all.exposure.notices_30_days);
    assert_eq!(filtered.notices_60_days.len(), all.exposure.notices_60_days);
    assert_eq!(
        filtered.pending_move_ins_30_days.len(),
        all.exposure.pending_move_ins_30_days
    );
    assert_eq!(
        filtered.scheduled_move_ins.len(),
        all.exposure.scheduled_move_ins
    );
    assert_eq!(filtered.leads.len(), all.funnel.leads);
    assert_eq!(filtered.tours.len(), all.funnel.tours);
    assert_eq!(filtered.applications.len(), all.funnel.applications);
    assert_eq!(filtered.leases_signed.len(), all.funnel.leases_signed);
    assert_eq!(filtered.denials.len(), all.funnel.denials);
}

#[test]
fn occupied_plus_vacant_never_exceeds_total() {
    let today = date(2026, 8, 19);
    let dataset = busy_property("p1", today);
    let occupancy = metrics::occupancy::calculate(&dataset);
    assert!(occupancy.occupied_units + occupancy.vacant_units <= occupancy.total_units);
}

#[test]
fn single_property_row_aggregation_is_identical_to_direct_calculation() {
    let today = date(2026, 8, 19);
    let period = Period::from_dates(date(2026, 8, 1), today);
    let dataset = busy_property("p1", today);

    let direct = metrics::calculate_all(&dataset, &period, today);
    let aggregated = metrics::calculate_all(
        &aggregate::merge_datasets(vec![dataset]),
        &period,
        today,
    );

    assert_eq!(direct, aggregated);
}

#[test]
fn two_property_union_and_weighted_combination_agree_on_counts() {
    let today = date(2026, 8, 19);
    let period = Period::from_dates(date(2026, 8, 1), today);
    let a = busy_property("p1", today);
    let b = busy_property("p2", today);

    let per_property = vec![
        metrics::calculate_all(&a, &period, today),
        metrics::calculate_all(&b, &period, today),
    ];
    let weighted = aggregate::combine_all(&per_property);
    let union = metrics::calculate_all(&aggregate::merge_datasets(vec![a, b]), &period, today);

    assert_eq!(weighted, union);
}

#[test]
fn previous_month_period_is_independent_of_today() {
    for day in [1, 10, 28] {
        let now = date(2026, 7, day).and_hms_opt(8, 15, 0).expect("time");
        let period = Timeframe::PreviousMonth.resolve(now);
        assert_eq!(period.start.date(), date(2026, 6, 1));
        assert_eq!(period.end.date(), date(2026, 6, 30));
    }
}

#[test]
fn zero_denominator_rates_are_zero() {
    let today = date(2026, 8, 19);
    let period = Period::from_dates(date(2026, 8, 1), today);
    let funnel = metrics::funnel::calculate(&RawDataset::default(), &period);
    assert_eq!(funnel.lead_to_tour_rate, 0.0);
    assert_eq!(funnel.application_to_lease_rate, 0.0);

    let occupancy = metrics::occupancy::calculate(&RawDataset::default());
    assert_eq!(occupancy.physical_occupancy, 0.0);
}
