//! Quick estimate for the public calculator.
//!
//! The calculator takes one aggregate figure per category and runs them
//! through the same ledger rules, aggregator and resolver as the dashboard.

use serde::{Deserialize, Serialize};

use crate::{
    Money,
    ledger::{
        CloudSoftwareEntry, ContractorEntry, DEFAULT_RD_PERCENTAGE, EntryId, ExpenseLedger,
        SupplyEntry, WageEntry,
    },
    pricing::{self, CreditEstimate, CreditRate},
    qre::{self, QreSummary},
};

/// Aggregate inputs of the calculator form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickEstimateInput {
    pub annual_wages: Money,
    pub wage_rd_percentage: f64,
    pub contractor_costs: Money,
    pub supply_costs: Money,
    pub supply_rd_percentage: f64,
    pub monthly_cloud_costs: Money,
    pub cloud_rd_percentage: f64,
    pub additional_years: u32,
}

impl Default for QuickEstimateInput {
    fn default() -> Self {
        Self {
            annual_wages: Money::ZERO,
            wage_rd_percentage: 0.0,
            contractor_costs: Money::ZERO,
            supply_costs: Money::ZERO,
            supply_rd_percentage: DEFAULT_RD_PERCENTAGE,
            monthly_cloud_costs: Money::ZERO,
            cloud_rd_percentage: DEFAULT_RD_PERCENTAGE,
            additional_years: 0,
        }
    }
}

impl QuickEstimateInput {
    /// The equivalent one-entry-per-category ledger.
    #[must_use]
    pub fn to_ledger(&self) -> ExpenseLedger {
        let mut ledger = ExpenseLedger::new();

        let mut wage = WageEntry::new(EntryId::generate());
        wage.employee_name = "All employees".to_string();
        wage.annual_salary = self.annual_wages;
        wage.rd_percentage = self.wage_rd_percentage;
        ledger.insert(wage);

        let mut contractor = ContractorEntry::new(EntryId::generate());
        contractor.contractor_name = "All contractors".to_string();
        contractor.amount = self.contractor_costs;
        ledger.insert(contractor);

        let mut supply = SupplyEntry::new(EntryId::generate());
        supply.supply_type = "All supplies".to_string();
        supply.amount = self.supply_costs;
        supply.rd_percentage = self.supply_rd_percentage;
        ledger.insert(supply);

        let mut cloud = CloudSoftwareEntry::new(EntryId::generate());
        cloud.service_name = "All cloud & software".to_string();
        cloud.monthly_cost = self.monthly_cloud_costs;
        cloud.rd_percentage = self.cloud_rd_percentage;
        ledger.insert(cloud);

        ledger
    }
}

/// Calculator result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuickEstimate {
    pub summary: QreSummary,
    pub estimate: CreditEstimate,
}

/// Run the calculator.
#[must_use]
pub fn quick_estimate(input: &QuickEstimateInput, rate: CreditRate) -> QuickEstimate {
    let summary = qre::summarize(&input.to_ledger());
    QuickEstimate {
        summary,
        estimate: pricing::estimate(&summary, rate, input.additional_years),
    }
}
