//! CSV export of the ledger, one row per entry.

use axum::{
    Extension,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use engine::{CustomerId, ExpenseLedger, Money};
use serde::Serialize;

use crate::{ServerError, server::ServerState};

const HEADER: [&str; 7] = [
    "category",
    "id",
    "name",
    "detail",
    "amount",
    "rdPercentage",
    "qualifiedAmount",
];

/// Field order must match [`HEADER`].
#[derive(Serialize)]
struct Row<'a> {
    category: &'static str,
    id: &'a str,
    name: &'a str,
    detail: &'a str,
    amount: String,
    rd_percentage: Option<f64>,
    qualified_amount: String,
}

fn rows(ledger: &ExpenseLedger) -> Vec<Row<'_>> {
    let money = |m: Money| m.to_string();
    let mut rows = Vec::with_capacity(ledger.len());

    rows.extend(ledger.wages().iter().map(|e| Row {
        category: "wages",
        id: e.id.as_str(),
        name: &e.employee_name,
        detail: &e.role,
        amount: money(e.annual_salary),
        rd_percentage: Some(e.rd_percentage),
        qualified_amount: money(e.qualified_amount()),
    }));
    rows.extend(ledger.contractors().iter().map(|e| Row {
        category: "contractors",
        id: e.id.as_str(),
        name: &e.contractor_name,
        detail: &e.description,
        amount: money(e.amount),
        rd_percentage: None,
        qualified_amount: money(e.qualified_amount()),
    }));
    rows.extend(ledger.supplies().iter().map(|e| Row {
        category: "supplies",
        id: e.id.as_str(),
        name: &e.supply_type,
        detail: "",
        amount: money(e.amount),
        rd_percentage: Some(e.rd_percentage),
        qualified_amount: money(e.qualified_amount()),
    }));
    // Cloud amounts are monthly; the qualified amount is annual.
    rows.extend(ledger.cloud_software().iter().map(|e| Row {
        category: "cloudSoftware",
        id: e.id.as_str(),
        name: &e.service_name,
        detail: "monthly",
        amount: money(e.monthly_cost),
        rd_percentage: Some(e.rd_percentage),
        qualified_amount: money(e.annual_qualified_amount()),
    }));

    rows
}

fn to_csv(ledger: &ExpenseLedger) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for row in rows(ledger) {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Handle requests for downloading the ledger as CSV
pub async fn csv(
    Extension(customer): Extension<CustomerId>,
    State(state): State<ServerState>,
) -> Result<Response, ServerError> {
    let ledger = state.engine.ledger(&customer).await?;
    let body = to_csv(&ledger)
        .map_err(|err| ServerError::Internal(format!("csv export for {customer} failed: {err}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"qre-ledger.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
