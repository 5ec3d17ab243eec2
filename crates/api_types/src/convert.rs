//! Conversions between wire types and engine types.

use engine::{
    CreditEstimate, DocumentJob, EntryIssue, EntryId, ExpenseLedger, JobOutcome, JobState,
    JobStatus, Money, QreSummary, QuickEstimate, QuickEstimateInput, Review,
};

use crate::{
    calculator::{CalculatorRequest, CalculatorResponse},
    documents::{DocumentJobView, DocumentState, DocumentStatus, JobOutcomeView},
    ledger::{
        CloudSoftwareEntry, CloudSoftwarePatch, ContractorEntry, ContractorPatch, LedgerSnapshot,
        SupplyEntry, SupplyPatch, WageEntry, WagePatch,
    },
    review::{IssueView, ReviewView},
    summary::{CreditEstimateView, QreSummaryView},
};

impl From<&ExpenseLedger> for LedgerSnapshot {
    fn from(ledger: &ExpenseLedger) -> Self {
        LedgerSnapshot {
            wages: ledger
                .wages()
                .iter()
                .map(|e| WageEntry {
                    id: e.id.to_string(),
                    employee_name: e.employee_name.clone(),
                    role: e.role.clone(),
                    annual_salary: e.annual_salary.cents(),
                    rd_percentage: e.rd_percentage,
                    qualified_amount: e.qualified_amount().cents(),
                })
                .collect(),
            contractors: ledger
                .contractors()
                .iter()
                .map(|e| ContractorEntry {
                    id: e.id.to_string(),
                    contractor_name: e.contractor_name.clone(),
                    amount: e.amount.cents(),
                    description: e.description.clone(),
                    qualified_amount: e.qualified_amount().cents(),
                })
                .collect(),
            supplies: ledger
                .supplies()
                .iter()
                .map(|e| SupplyEntry {
                    id: e.id.to_string(),
                    supply_type: e.supply_type.clone(),
                    amount: e.amount.cents(),
                    rd_percentage: e.rd_percentage,
                    qualified_amount: e.qualified_amount().cents(),
                })
                .collect(),
            cloud_software: ledger
                .cloud_software()
                .iter()
                .map(|e| CloudSoftwareEntry {
                    id: e.id.to_string(),
                    service_name: e.service_name.clone(),
                    monthly_cost: e.monthly_cost.cents(),
                    rd_percentage: e.rd_percentage,
                    annual_qualified_amount: e.annual_qualified_amount().cents(),
                })
                .collect(),
        }
    }
}

/// Entry id from a stored snapshot. Blank ids get a fresh one.
fn stored_id(raw: &str) -> EntryId {
    raw.parse().unwrap_or_else(|_| EntryId::generate())
}

impl LedgerSnapshot {
    /// Rebuild the engine ledger.
    ///
    /// Stored qualified amounts are ignored and recomputed. The second and
    /// later entries sharing an id within a category are dropped.
    pub fn into_ledger(self) -> ExpenseLedger {
        let mut ledger = ExpenseLedger::new();
        let mut dropped = 0usize;

        for e in self.wages {
            let mut entry = engine::WageEntry::new(stored_id(&e.id));
            entry.employee_name = e.employee_name;
            entry.role = e.role;
            entry.annual_salary = Money::new(e.annual_salary);
            entry.rd_percentage = e.rd_percentage;
            dropped += usize::from(!ledger.insert(entry));
        }
        for e in self.contractors {
            let mut entry = engine::ContractorEntry::new(stored_id(&e.id));
            entry.contractor_name = e.contractor_name;
            entry.amount = Money::new(e.amount);
            entry.description = e.description;
            dropped += usize::from(!ledger.insert(entry));
        }
        for e in self.supplies {
            let mut entry = engine::SupplyEntry::new(stored_id(&e.id));
            entry.supply_type = e.supply_type;
            entry.amount = Money::new(e.amount);
            entry.rd_percentage = e.rd_percentage;
            dropped += usize::from(!ledger.insert(entry));
        }
        for e in self.cloud_software {
            let mut entry = engine::CloudSoftwareEntry::new(stored_id(&e.id));
            entry.service_name = e.service_name;
            entry.monthly_cost = Money::new(e.monthly_cost);
            entry.rd_percentage = e.rd_percentage;
            dropped += usize::from(!ledger.insert(entry));
        }

        if dropped > 0 {
            tracing::warn!(dropped, "snapshot contained duplicate entry ids");
        }
        ledger
    }
}

impl From<WagePatch> for engine::WagePatch {
    fn from(p: WagePatch) -> Self {
        engine::WagePatch {
            employee_name: p.employee_name,
            role: p.role,
            annual_salary: p.annual_salary.map(Money::new),
            rd_percentage: p.rd_percentage,
        }
    }
}

impl From<ContractorPatch> for engine::ContractorPatch {
    fn from(p: ContractorPatch) -> Self {
        engine::ContractorPatch {
            contractor_name: p.contractor_name,
            amount: p.amount.map(Money::new),
            description: p.description,
        }
    }
}

impl From<SupplyPatch> for engine::SupplyPatch {
    fn from(p: SupplyPatch) -> Self {
        engine::SupplyPatch {
            supply_type: p.supply_type,
            amount: p.amount.map(Money::new),
            rd_percentage: p.rd_percentage,
        }
    }
}

impl From<CloudSoftwarePatch> for engine::CloudSoftwarePatch {
    fn from(p: CloudSoftwarePatch) -> Self {
        engine::CloudSoftwarePatch {
            service_name: p.service_name,
            monthly_cost: p.monthly_cost.map(Money::new),
            rd_percentage: p.rd_percentage,
        }
    }
}

impl From<&QreSummary> for QreSummaryView {
    fn from(s: &QreSummary) -> Self {
        QreSummaryView {
            wages_total: s.wages_total.cents(),
            contractors_total: s.contractors_total.cents(),
            supplies_total: s.supplies_total.cents(),
            cloud_software_total: s.cloud_software_total.cents(),
            grand_total: s.grand_total().cents(),
        }
    }
}

impl From<&CreditEstimate> for CreditEstimateView {
    fn from(e: &CreditEstimate) -> Self {
        CreditEstimateView {
            total_qre: e.total_qre.cents(),
            credit_rate: e.credit_rate.fraction(),
            federal_credit: e.federal_credit.cents(),
            price_tier: e.price_tier().to_string(),
            base_price: e.quote.base_price.cents(),
            additional_years: e.quote.additional_years,
            surcharge: e.quote.surcharge.cents(),
            price: e.price().cents(),
        }
    }
}

impl From<CalculatorRequest> for QuickEstimateInput {
    fn from(r: CalculatorRequest) -> Self {
        QuickEstimateInput {
            annual_wages: Money::new(r.annual_wages),
            wage_rd_percentage: r.wage_rd_percentage,
            contractor_costs: Money::new(r.contractor_costs),
            supply_costs: Money::new(r.supply_costs),
            supply_rd_percentage: r.supply_rd_percentage,
            monthly_cloud_costs: Money::new(r.monthly_cloud_costs),
            cloud_rd_percentage: r.cloud_rd_percentage,
            additional_years: r.additional_years,
        }
    }
}

impl From<&QuickEstimate> for CalculatorResponse {
    fn from(q: &QuickEstimate) -> Self {
        CalculatorResponse {
            summary: (&q.summary).into(),
            estimate: (&q.estimate).into(),
        }
    }
}

impl From<&EntryIssue> for IssueView {
    fn from(i: &EntryIssue) -> Self {
        IssueView {
            category: i.category.to_string(),
            id: i.id.to_string(),
            field: i.field.to_string(),
            message: i.problem.to_string(),
        }
    }
}

impl From<&Review> for ReviewView {
    fn from(r: &Review) -> Self {
        ReviewView {
            summary: (&r.summary).into(),
            issues: r.issues.iter().map(IssueView::from).collect(),
            ready: r.ready,
        }
    }
}

impl From<DocumentStatus> for JobStatus {
    fn from(s: DocumentStatus) -> Self {
        JobStatus {
            progress: u8::try_from(s.progress.min(100)).unwrap_or(100),
            current_step: s.current_step,
            estimated_time_remaining: s.estimated_time_remaining,
            state: match s.status {
                DocumentState::Pending => JobState::Pending,
                DocumentState::Completed => JobState::Completed,
            },
        }
    }
}

impl From<JobOutcome> for JobOutcomeView {
    fn from(o: JobOutcome) -> Self {
        match o {
            JobOutcome::Running => JobOutcomeView::Running,
            JobOutcome::Completed => JobOutcomeView::Completed,
            JobOutcome::Abandoned => JobOutcomeView::Abandoned,
        }
    }
}

impl From<&DocumentJob> for DocumentJobView {
    fn from(job: &DocumentJob) -> Self {
        DocumentJobView {
            tracking_id: job.tracking_id.to_string(),
            outcome: job.outcome.into(),
            submitted_at: job.submitted_at,
            progress: job.latest.as_ref().map_or(0, |s| s.progress),
            current_step: job.latest.as_ref().map(|s| s.current_step.clone()),
            estimated_time_remaining: job
                .latest
                .as_ref()
                .map(|s| s.estimated_time_remaining.clone()),
        }
    }
}
