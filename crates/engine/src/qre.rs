//! QRE (Qualified Research Expense) aggregation.
//!
//! [`summarize`] is a pure function of a ledger snapshot. It never fails:
//! zero fields count as zero and negative inputs are summed as they are
//! (rejecting them is the entry form's job, see [`crate::validation`]).

use crate::{
    Money,
    ledger::{Category, ExpenseLedger},
};

/// Per-category qualified totals of one ledger snapshot.
///
/// The grand total is computed on demand, so it can't drift from the
/// category totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QreSummary {
    pub wages_total: Money,
    pub contractors_total: Money,
    pub supplies_total: Money,
    pub cloud_software_total: Money,
}

impl QreSummary {
    /// Sum of the four category totals.
    #[must_use]
    pub fn grand_total(&self) -> Money {
        self.wages_total + self.contractors_total + self.supplies_total + self.cloud_software_total
    }

    #[must_use]
    pub fn total_for(&self, category: Category) -> Money {
        match category {
            Category::Wages => self.wages_total,
            Category::Contractors => self.contractors_total,
            Category::Supplies => self.supplies_total,
            Category::CloudSoftware => self.cloud_software_total,
        }
    }
}

/// Recompute the QRE summary of `ledger`.
#[must_use]
pub fn summarize(ledger: &ExpenseLedger) -> QreSummary {
    QreSummary {
        wages_total: ledger.wages().iter().map(|e| e.qualified_amount()).sum(),
        contractors_total: ledger.contractors().iter().map(|e| e.qualified_amount()).sum(),
        supplies_total: ledger.supplies().iter().map(|e| e.qualified_amount()).sum(),
        cloud_software_total: ledger
            .cloud_software()
            .iter()
            .map(|e| e.annual_qualified_amount())
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CloudSoftwarePatch, ContractorPatch, SupplyPatch, WagePatch};

    #[test]
    fn empty_ledger_sums_to_zero() {
        let summary = summarize(&ExpenseLedger::new());
        assert_eq!(summary, QreSummary::default());
        assert_eq!(summary.grand_total(), Money::ZERO);
    }

    #[test]
    fn wages_and_contractors_scenario() {
        let mut ledger = ExpenseLedger::new();
        let wage = ledger.add_entry(Category::Wages);
        ledger.update_entry(
            &wage,
            WagePatch::default()
                .annual_salary(Money::from_dollars(100_000))
                .rd_percentage(50.0),
        );
        assert_eq!(summarize(&ledger).wages_total, Money::from_dollars(50_000));

        let contractor = ledger.add_entry(Category::Contractors);
        ledger.update_entry(
            &contractor,
            ContractorPatch::default().amount(Money::from_dollars(40_000)),
        );

        let summary = summarize(&ledger);
        assert_eq!(summary.contractors_total, Money::from_dollars(26_000));
        assert_eq!(summary.grand_total(), Money::from_dollars(76_000));
    }

    #[test]
    fn grand_total_is_sum_of_categories() {
        let mut ledger = ExpenseLedger::new();
        for (salary, pct) in [(80_000, 10.0), (95_500, 33.3), (61_000, 100.0)] {
            let id = ledger.add_entry(Category::Wages);
            ledger.update_entry(
                &id,
                WagePatch::default()
                    .annual_salary(Money::from_dollars(salary))
                    .rd_percentage(pct),
            );
        }
        let supply = ledger.add_entry(Category::Supplies);
        ledger.update_entry(
            &supply,
            SupplyPatch::default()
                .amount(Money::new(1_234_56))
                .rd_percentage(75.0),
        );
        let cloud = ledger.add_entry(Category::CloudSoftware);
        ledger.update_entry(
            &cloud,
            CloudSoftwarePatch::default().monthly_cost(Money::from_dollars(2_500)),
        );

        let summary = summarize(&ledger);
        let by_category: Money = Category::ALL.iter().map(|c| summary.total_for(*c)).sum();
        assert_eq!(summary.grand_total(), by_category);
        assert_eq!(summary.supplies_total, Money::new(92_592));
        assert_eq!(summary.cloud_software_total, Money::from_dollars(30_000));
    }

    #[test]
    fn negative_inputs_are_not_rejected() {
        let mut ledger = ExpenseLedger::new();
        let supply = ledger.add_entry(Category::Supplies);
        ledger.update_entry(&supply, SupplyPatch::default().amount(Money::from_dollars(-100)));
        assert_eq!(summarize(&ledger).grand_total(), Money::from_dollars(-100));
    }

    #[test]
    fn totals_do_not_depend_on_order() {
        let mut forward = ExpenseLedger::new();
        let mut backward = ExpenseLedger::new();
        let amounts = [1_000, 2_000, 3_000];
        for amount in amounts {
            let id = forward.add_entry(Category::Contractors);
            forward.update_entry(&id, ContractorPatch::default().amount(Money::new(amount)));
        }
        for amount in amounts.iter().rev() {
            let id = backward.add_entry(Category::Contractors);
            backward.update_entry(&id, ContractorPatch::default().amount(Money::new(*amount)));
        }
        assert_eq!(summarize(&forward), summarize(&backward));
    }
}
