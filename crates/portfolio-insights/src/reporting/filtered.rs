use super::domain::{FunnelStage, Prospect, RawDataset, Resident, Unit};
use super::filters;
use super::period::Period;
use chrono::NaiveDate;
use serde::Serialize;

/// The drill-through mirror: for every count the calculators produce, the
/// literal record subset that produced it, built from the same predicates in
/// `reporting::filters`. The engine's central invariant is that
/// `filtered.X.len()` equals the corresponding metric count unconditionally.
/// A metric added to the calculators must gain its subset here in the same
/// change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilteredData {
    pub occupied_units: Vec<Unit>,
    pub vacant_units: Vec<Unit>,
    pub preleased_vacant: Vec<Unit>,
    pub available_units: Vec<Unit>,
    pub vacant_ready: Vec<Unit>,
    pub vacant_not_ready: Vec<Unit>,
    pub aged_vacancy_90_plus: Vec<Unit>,
    pub move_ins: Vec<Resident>,
    pub move_outs: Vec<Resident>,
    pub notices_30_days: Vec<Resident>,
    pub notices_60_days: Vec<Resident>,
    pub pending_move_ins_30_days: Vec<Resident>,
    pub pending_move_ins_60_days: Vec<Resident>,
    pub scheduled_move_ins: Vec<Resident>,
    pub leads: Vec<Prospect>,
    pub tours: Vec<Prospect>,
    pub applications: Vec<Prospect>,
    pub leases_signed: Vec<Prospect>,
    pub denials: Vec<Prospect>,
}

impl FilteredData {
    pub fn build(dataset: &RawDataset, period: &Period, today: NaiveDate) -> Self {
        let preleased = filters::preleased_unit_ids(dataset);
        let inventory: Vec<&Unit> = dataset
            .units
            .iter()
            .filter(|unit| filters::in_inventory(unit))
            .collect();

        let units_where = |predicate: &dyn Fn(&Unit) -> bool| -> Vec<Unit> {
            inventory
                .iter()
                .filter(|unit| predicate(unit))
                .map(|unit| (*unit).clone())
                .collect()
        };

        let preleased_vacant =
            units_where(&|unit| filters::is_preleased_vacant(unit, &preleased));
        let vacant_units = units_where(&filters::is_vacant);

        let available_units = if filters::availability_flag_present(dataset) {
            units_where(&filters::has_availability_flag)
        } else {
            // Mirror of the calculator fallback: vacant units not claimed by
            // a future lease.
            units_where(&|unit| {
                filters::is_vacant(unit) && !filters::is_preleased_vacant(unit, &preleased)
            })
        };

        let residents_where =
            |pool: &[Resident], predicate: &dyn Fn(&Resident) -> bool| -> Vec<Resident> {
                pool.iter()
                    .filter(|resident| predicate(resident))
                    .cloned()
                    .collect()
            };

        let move_in_pool: Vec<Resident> = dataset
            .residents
            .current
            .iter()
            .chain(dataset.residents.future.iter())
            .cloned()
            .collect();

        let prospects_in = |stage: FunnelStage| -> Vec<Prospect> {
            dataset
                .prospects
                .iter()
                .filter(|prospect| filters::counts_in_stage(prospect, stage, period))
                .cloned()
                .collect()
        };

        Self {
            occupied_units: units_where(&filters::is_occupied),
            vacant_units,
            preleased_vacant,
            available_units,
            vacant_ready: units_where(&filters::is_vacant_ready),
            vacant_not_ready: units_where(&filters::is_vacant_not_ready),
            aged_vacancy_90_plus: units_where(&filters::is_aged_vacancy_90_plus),
            move_ins: residents_where(&move_in_pool, &|resident| {
                filters::moved_in_within(resident, period)
            }),
            move_outs: residents_where(&dataset.residents.past, &|resident| {
                filters::moved_out_within(resident, period)
            }),
            notices_30_days: residents_where(&dataset.residents.notice, &|resident| {
                filters::departing_within(resident, today, 30)
            }),
            notices_60_days: residents_where(&dataset.residents.notice, &|resident| {
                filters::departing_within(resident, today, 60)
            }),
            pending_move_ins_30_days: residents_where(&dataset.residents.future, &|resident| {
                filters::arriving_within(resident, today, 30)
            }),
            pending_move_ins_60_days: residents_where(&dataset.residents.future, &|resident| {
                filters::arriving_within(resident, today, 60)
            }),
            scheduled_move_ins: dataset.residents.future.clone(),
            leads: prospects_in(FunnelStage::Lead),
            tours: prospects_in(FunnelStage::Tour),
            applications: prospects_in(FunnelStage::Application),
            leases_signed: prospects_in(FunnelStage::LeaseSigned),
            denials: prospects_in(FunnelStage::Denied),
        }
    }

    /// Append another mirror's subsets. Weighted aggregation builds one
    /// mirror per property and concatenates them, so that each property's
    /// availability branch is the one its own metrics took.
    pub fn extend(&mut self, other: FilteredData) {
        self.occupied_units.extend(other.occupied_units);
        self.vacant_units.extend(other.vacant_units);
        self.preleased_vacant.extend(other.preleased_vacant);
        self.available_units.extend(other.available_units);
        self.vacant_ready.extend(other.vacant_ready);
        self.vacant_not_ready.extend(other.vacant_not_ready);
        self.aged_vacancy_90_plus.extend(other.aged_vacancy_90_plus);
        self.move_ins.extend(other.move_ins);
        self.move_outs.extend(other.move_outs);
        self.notices_30_days.extend(other.notices_30_days);
        self.notices_60_days.extend(other.notices_60_days);
        self.pending_move_ins_30_days
            .extend(other.pending_move_ins_30_days);
        self.pending_move_ins_60_days
            .extend(other.pending_move_ins_60_days);
        self.scheduled_move_ins.extend(other.scheduled_move_ins);
        self.leads.extend(other.leads);
        self.tours.extend(other.tours);
        self.applications.extend(other.applications);
        self.leases_signed.extend(other.leases_signed);
        self.denials.extend(other.denials);
    }

    /// The prospect records behind one funnel-stage count.
    pub fn funnel_records(&self, stage: FunnelStage) -> &[Prospect] {
        match stage {
            FunnelStage::Lead => &self.leads,
            FunnelStage::Tour => &self.tours,
            FunnelStage::Application => &self.applications,
            FunnelStage::LeaseSigned => &self.leases_signed,
            FunnelStage::Denied => &self.denials,
        }
    }
}
