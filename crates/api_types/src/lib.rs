//! Wire types shared by the HTTP server and the HTTP clients.
//!
//! JSON uses camelCase. Money fields hold integer cents, percentages are plain
//! numbers in `0..=100`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod convert;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod ledger {
    use super::*;

    fn full_rd_percentage() -> f64 {
        engine::ledger::DEFAULT_RD_PERCENTAGE
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WageEntry {
        pub id: String,
        #[serde(default)]
        pub employee_name: String,
        #[serde(default)]
        pub role: String,
        #[serde(default)]
        pub annual_salary: i64,
        #[serde(default)]
        pub rd_percentage: f64,
        /// Output only: recomputed from the other fields, ignored on input.
        #[serde(default)]
        pub qualified_amount: i64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ContractorEntry {
        pub id: String,
        #[serde(default)]
        pub contractor_name: String,
        #[serde(default)]
        pub amount: i64,
        #[serde(default)]
        pub description: String,
        /// Output only.
        #[serde(default)]
        pub qualified_amount: i64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SupplyEntry {
        pub id: String,
        #[serde(default)]
        pub supply_type: String,
        #[serde(default)]
        pub amount: i64,
        #[serde(default = "full_rd_percentage")]
        pub rd_percentage: f64,
        /// Output only.
        #[serde(default)]
        pub qualified_amount: i64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CloudSoftwareEntry {
        pub id: String,
        #[serde(default)]
        pub service_name: String,
        #[serde(default)]
        pub monthly_cost: i64,
        #[serde(default = "full_rd_percentage")]
        pub rd_percentage: f64,
        /// Output only.
        #[serde(default)]
        pub annual_qualified_amount: i64,
    }

    /// Full ledger of one customer, as stored in the record store and as
    /// returned by `GET /ledger`.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    pub struct LedgerSnapshot {
        pub wages: Vec<WageEntry>,
        pub contractors: Vec<ContractorEntry>,
        pub supplies: Vec<SupplyEntry>,
        pub cloud_software: Vec<CloudSoftwareEntry>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryCreated {
        pub id: String,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct WagePatch {
        pub employee_name: Option<String>,
        pub role: Option<String>,
        pub annual_salary: Option<i64>,
        pub rd_percentage: Option<f64>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct ContractorPatch {
        pub contractor_name: Option<String>,
        pub amount: Option<i64>,
        pub description: Option<String>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct SupplyPatch {
        pub supply_type: Option<String>,
        pub amount: Option<i64>,
        pub rd_percentage: Option<f64>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", deny_unknown_fields)]
    pub struct CloudSoftwarePatch {
        pub service_name: Option<String>,
        pub monthly_cost: Option<i64>,
        pub rd_percentage: Option<f64>,
    }
}

pub mod summary {
    use super::*;

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QreSummaryView {
        pub wages_total: i64,
        pub contractors_total: i64,
        pub supplies_total: i64,
        pub cloud_software_total: i64,
        pub grand_total: i64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct EstimateQuery {
        pub additional_years: Option<u32>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreditEstimateView {
        pub total_qre: i64,
        /// Fraction, e.g. `0.065`.
        pub credit_rate: f64,
        pub federal_credit: i64,
        pub price_tier: String,
        pub base_price: i64,
        pub additional_years: u32,
        pub surcharge: i64,
        pub price: i64,
    }
}

pub mod calculator {
    use super::*;
    use summary::{CreditEstimateView, QreSummaryView};

    /// Public calculator form. Missing fields count as zero; supply and cloud
    /// percentages default to 100.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CalculatorRequest {
        #[serde(default)]
        pub annual_wages: i64,
        #[serde(default)]
        pub wage_rd_percentage: f64,
        #[serde(default)]
        pub contractor_costs: i64,
        #[serde(default)]
        pub supply_costs: i64,
        #[serde(default = "ledger_default_percentage")]
        pub supply_rd_percentage: f64,
        #[serde(default)]
        pub monthly_cloud_costs: i64,
        #[serde(default = "ledger_default_percentage")]
        pub cloud_rd_percentage: f64,
        #[serde(default)]
        pub additional_years: u32,
    }

    fn ledger_default_percentage() -> f64 {
        engine::ledger::DEFAULT_RD_PERCENTAGE
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CalculatorResponse {
        pub summary: QreSummaryView,
        pub estimate: CreditEstimateView,
    }
}

pub mod review {
    use super::*;
    use summary::QreSummaryView;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct IssueView {
        pub category: String,
        pub id: String,
        pub field: String,
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReviewView {
        pub summary: QreSummaryView,
        pub issues: Vec<IssueView>,
        pub ready: bool,
    }
}

pub mod documents {
    use super::*;

    /// Body of the document service's submit endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SubmitDocuments {
        pub customer_email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DocumentsSubmitted {
        pub tracking_id: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DocumentState {
        Pending,
        Completed,
    }

    /// Job status as the document service reports it.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DocumentStatus {
        pub progress: u32,
        #[serde(default)]
        pub current_step: String,
        #[serde(default)]
        pub estimated_time_remaining: String,
        pub status: DocumentState,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum JobOutcomeView {
        Running,
        Completed,
        Abandoned,
    }

    /// A tracked job, as returned by `POST /documents` and
    /// `GET /documents/{trackingId}`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DocumentJobView {
        pub tracking_id: String,
        pub outcome: JobOutcomeView,
        pub submitted_at: DateTime<Utc>,
        pub progress: u8,
        pub current_step: Option<String>,
        pub estimated_time_remaining: Option<String>,
    }
}
