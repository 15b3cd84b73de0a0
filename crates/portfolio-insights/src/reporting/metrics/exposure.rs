use crate::reporting::domain::RawDataset;
use crate::reporting::filters;
use crate::reporting::period::Period;
use chrono::NaiveDate;
use serde::Serialize;

/// Exposure and absorption roll-up. The 30/60-day horizons are always
/// relative to the evaluation date, not the reporting period; exposure can
/// legitimately go negative when signed inbound leases outnumber exposed
/// units, and is never floored at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExposureMetrics {
    pub vacant_count: usize,
    pub move_ins: usize,
    pub move_outs: usize,
    pub net_absorption: i64,
    pub notices_30_days: usize,
    pub notices_60_days: usize,
    pub pending_move_ins_30_days: usize,
    pub pending_move_ins_60_days: usize,
    pub exposure_30_days: i64,
    pub exposure_60_days: i64,
    pub scheduled_move_ins: usize,
}

pub fn calculate(dataset: &RawDataset, period: &Period, today: NaiveDate) -> ExposureMetrics {
    let vacant_count = dataset
        .units
        .iter()
        .filter(|unit| filters::is_vacant(unit))
        .count();

    let move_ins = dataset
        .residents
        .current
        .iter()
        .chain(dataset.residents.future.iter())
        .filter(|resident| filters::moved_in_within(resident, period))
        .count();

    let move_outs = dataset
        .residents
        .past
        .iter()
        .filter(|resident| filters::moved_out_within(resident, period))
        .count();

    let notices_30_days = dataset
        .residents
        .notice
        .iter()
        .filter(|resident| filters::departing_within(resident, today, 30))
        .count();
    let notices_60_days = dataset
        .residents
        .notice
        .iter()
        .filter(|resident| filters::departing_within(resident, today, 60))
        .count();

    let pending_move_ins_30_days = dataset
        .residents
        .future
        .iter()
        .filter(|resident| filters::arriving_within(resident, today, 30))
        .count();
    let pending_move_ins_60_days = dataset
        .residents
        .future
        .iter()
        .filter(|resident| filters::arriving_within(resident, today, 60))
        .count();

    ExposureMetrics {
        vacant_count,
        move_ins,
        move_outs,
        net_absorption: move_ins as i64 - move_outs as i64,
        notices_30_days,
        notices_60_days,
        pending_move_ins_30_days,
        pending_move_ins_60_days,
        exposure_30_days: (vacant_count + notices_30_days) as i64
            - pending_move_ins_30_days as i64,
        exposure_60_days: (vacant_count + notices_60_days) as i64
            - pending_move_ins_60_days as i64,
        scheduled_move_ins: dataset.residents.future.len(),
    }
}
