//! Entry validation for the review screen.
//!
//! The aggregator accepts anything; this module reports what the entry form
//! should have caught, without changing the ledger.

use std::fmt;

use crate::{
    Money,
    ledger::{Category, EntryId, ExpenseLedger},
    qre::{self, QreSummary},
};

/// What is wrong with an entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Problem {
    MissingName,
    NegativeAmount(Money),
    PercentageOutOfRange(f64),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::MissingName => f.write_str("name is required"),
            Problem::NegativeAmount(amount) => write!(f, "amount {amount} is negative"),
            Problem::PercentageOutOfRange(pct) => {
                write!(f, "R&D percentage {pct} is outside 0-100")
            }
        }
    }
}

/// One problem on one entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryIssue {
    pub category: Category,
    pub id: EntryId,
    pub field: &'static str,
    pub problem: Problem,
}

/// Review screen data: totals, issues and whether the ledger can be filed.
#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    pub summary: QreSummary,
    pub issues: Vec<EntryIssue>,
    pub ready: bool,
}

struct Collector {
    issues: Vec<EntryIssue>,
}

impl Collector {
    fn name(&mut self, category: Category, id: &EntryId, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(category, id, field, Problem::MissingName);
        }
    }

    fn amount(&mut self, category: Category, id: &EntryId, field: &'static str, value: Money) {
        if value.is_negative() {
            self.push(category, id, field, Problem::NegativeAmount(value));
        }
    }

    fn percentage(&mut self, category: Category, id: &EntryId, value: f64) {
        if !(0.0..=100.0).contains(&value) {
            self.push(category, id, "rdPercentage", Problem::PercentageOutOfRange(value));
        }
    }

    fn push(&mut self, category: Category, id: &EntryId, field: &'static str, problem: Problem) {
        self.issues.push(EntryIssue {
            category,
            id: id.clone(),
            field,
            problem,
        });
    }
}

/// List every problem in `ledger`, in display order.
#[must_use]
pub fn validate(ledger: &ExpenseLedger) -> Vec<EntryIssue> {
    let mut c = Collector { issues: Vec::new() };

    for e in ledger.wages() {
        c.name(Category::Wages, &e.id, "employeeName", &e.employee_name);
        c.amount(Category::Wages, &e.id, "annualSalary", e.annual_salary);
        c.percentage(Category::Wages, &e.id, e.rd_percentage);
    }
    for e in ledger.contractors() {
        c.name(Category::Contractors, &e.id, "contractorName", &e.contractor_name);
        c.amount(Category::Contractors, &e.id, "amount", e.amount);
    }
    for e in ledger.supplies() {
        c.name(Category::Supplies, &e.id, "supplyType", &e.supply_type);
        c.amount(Category::Supplies, &e.id, "amount", e.amount);
        c.percentage(Category::Supplies, &e.id, e.rd_percentage);
    }
    for e in ledger.cloud_software() {
        c.name(Category::CloudSoftware, &e.id, "serviceName", &e.service_name);
        c.amount(Category::CloudSoftware, &e.id, "monthlyCost", e.monthly_cost);
        c.percentage(Category::CloudSoftware, &e.id, e.rd_percentage);
    }

    c.issues
}

/// Build the review of `ledger`.
#[must_use]
pub fn review(ledger: &ExpenseLedger) -> Review {
    let issues = validate(ledger);
    let ready = !ledger.is_empty() && issues.is_empty();
    Review {
        summary: qre::summarize(ledger),
        issues,
        ready,
    }
}
