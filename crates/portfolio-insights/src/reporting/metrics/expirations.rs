use crate::reporting::filters;
use serde::{Deserialize, Serialize};

/// One server-aggregated expiration bucket: a rolling window ("30_days",
/// "60_days", "90_days") or a calendar month label ("2026-09").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationPeriod {
    pub label: String,
    pub expirations: u64,
    pub renewals: u64,
    pub notices: u64,
    pub month_to_month: u64,
    pub renewal_pct: f64,
}

impl ExpirationPeriod {
    fn recompute_pct(&mut self) {
        self.renewal_pct = filters::pct(self.renewals as usize, self.expirations as usize);
    }
}

/// Server-aggregated renewal summary for one property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewalSummary {
    pub expirations_next_90: u64,
    pub renewals_signed: u64,
    pub renewal_pct: f64,
}

/// One lease tradeout row: the rent delta between the departing and the
/// incoming lease on a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoutEntry {
    pub unit_id: String,
    pub prior_rent: f64,
    pub new_rent: f64,
    pub tradeout_pct: f64,
}

/// Merge per-property expiration buckets by label. Counts are summed and
/// `renewal_pct` is recomputed from the summed renewals/expirations; merged
/// percentages are never averaged, which would distort mixed-size
/// portfolios.
pub fn merge_periods(groups: &[Vec<ExpirationPeriod>]) -> Vec<ExpirationPeriod> {
    let mut merged: Vec<ExpirationPeriod> = Vec::new();
    for group in groups {
        for period in group {
            match merged.iter_mut().find(|existing| existing.label == period.label) {
                Some(existing) => {
                    existing.expirations += period.expirations;
                    existing.renewals += period.renewals;
                    existing.notices += period.notices;
                    existing.month_to_month += period.month_to_month;
                }
                None => merged.push(period.clone()),
            }
        }
    }
    for period in &mut merged {
        period.recompute_pct();
    }
    merged
}

/// Merge renewal summaries with the same summed-counts rule.
pub fn merge_renewal_summaries(summaries: &[RenewalSummary]) -> RenewalSummary {
    let mut merged = RenewalSummary {
        expirations_next_90: summaries.iter().map(|s| s.expirations_next_90).sum(),
        renewals_signed: summaries.iter().map(|s| s.renewals_signed).sum(),
        renewal_pct: 0.0,
    };
    merged.renewal_pct = filters::pct(
        merged.renewals_signed as usize,
        merged.expirations_next_90 as usize,
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(label: &str, expirations: u64, renewals: u64) -> ExpirationPeriod {
        ExpirationPeriod {
            label: label.to_string(),
            expirations,
            renewals,
            notices: 0,
            month_to_month: 0,
            renewal_pct: filters::pct(renewals as usize, expirations as usize),
        }
    }

    #[test]
    fn merge_sums_counts_and_recomputes_pct() {
        // Per-property percentages are 50% and 90%; the merged figure must
        // come from the summed counts, not an average of the percentages.
        let merged = merge_periods(&[
            vec![period("30_days", 10, 5)],
            vec![period("30_days", 100, 90)],
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].expirations, 110);
        assert_eq!(merged[0].renewals, 95);
        assert_eq!(merged[0].renewal_pct, 86.4);
    }

    #[test]
    fn merged_pct_stays_within_bounds() {
        let merged = merge_periods(&[
            vec![period("60_days", 7, 7), period("90_days", 3, 0)],
            vec![period("60_days", 13, 2)],
        ]);

        for bucket in &merged {
            assert!(bucket.renewal_pct >= 0.0 && bucket.renewal_pct <= 100.0);
        }
    }

    #[test]
    fn unmatched_labels_pass_through() {
        let merged = merge_periods(&[
            vec![period("2026-09", 4, 2)],
            vec![period("2026-10", 6, 3)],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].label, "2026-09");
        assert_eq!(merged[1].label, "2026-10");
    }

    #[test]
    fn zero_expirations_merge_to_zero_pct() {
        let merged = merge_periods(&[vec![period("30_days", 0, 0)]]);
        assert_eq!(merged[0].renewal_pct, 0.0);
    }

    #[test]
    fn renewal_summaries_merge_from_summed_counts() {
        let merged = merge_renewal_summaries(&[
            RenewalSummary {
                expirations_next_90: 20,
                renewals_signed: 10,
                renewal_pct: 50.0,
            },
            RenewalSummary {
                expirations_next_90: 5,
                renewals_signed: 5,
                renewal_pct: 100.0,
            },
        ]);
        assert_eq!(merged.renewal_pct, 60.0);
    }
}
