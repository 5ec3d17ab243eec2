//! The `ExpenseLedger` holds a customer's R&D expense entries, grouped in four
//! categories. Each category has its own qualification rule:
//!
//! | category        | qualified amount                          |
//! |-----------------|-------------------------------------------|
//! | wages           | `annual_salary × rd_percentage / 100`     |
//! | contractors     | `amount × 65 / 100` (fixed, no percentage) |
//! | supplies        | `amount × rd_percentage / 100`            |
//! | cloud/software  | `monthly_cost × 12 × rd_percentage / 100` |
//!
//! Qualified amounts are always derived from the raw fields, so a patched
//! entry reflects its new qualified amount immediately.
//!
//! Lookup misses (updating or removing an id that isn't there) are silent
//! no-ops: the mutating methods report whether something changed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money};

/// Share of a contractor invoice that qualifies.
pub const CONTRACTOR_QUALIFIED_PERCENTAGE: f64 = 65.0;

/// Default `rd_percentage` of new supply and cloud/software entries.
pub const DEFAULT_RD_PERCENTAGE: f64 = 100.0;

const MONTHS_PER_YEAR: i64 = 12;

/// Expense category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Wages,
    Contractors,
    Supplies,
    CloudSoftware,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Wages,
        Category::Contractors,
        Category::Supplies,
        Category::CloudSoftware,
    ];

    /// Canonical name, as used in the wire format and in URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Wages => "wages",
            Category::Contractors => "contractors",
            Category::Supplies => "supplies",
            Category::CloudSoftware => "cloudSoftware",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "wages" => Ok(Category::Wages),
            "contractors" => Ok(Category::Contractors),
            "supplies" => Ok(Category::Supplies),
            "cloudSoftware" | "cloud-software" | "cloud_software" => Ok(Category::CloudSoftware),
            other => Err(EngineError::InvalidCategory(other.to_string())),
        }
    }
}

/// Opaque entry identifier, unique within its category.
///
/// Fresh ids are UUIDs, but ids coming back from the record store are kept
/// verbatim whatever their shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntryId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidId("empty entry id".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// An employee's wages.
#[derive(Clone, Debug, PartialEq)]
pub struct WageEntry {
    pub id: EntryId,
    pub employee_name: String,
    pub role: String,
    pub annual_salary: Money,
    pub rd_percentage: f64,
}

impl WageEntry {
    #[must_use]
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            employee_name: String::new(),
            role: String::new(),
            annual_salary: Money::ZERO,
            rd_percentage: 0.0,
        }
    }

    #[must_use]
    pub fn qualified_amount(&self) -> Money {
        self.annual_salary.percent(self.rd_percentage)
    }
}

/// A contract research invoice.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractorEntry {
    pub id: EntryId,
    pub contractor_name: String,
    pub amount: Money,
    pub description: String,
}

impl ContractorEntry {
    #[must_use]
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            contractor_name: String::new(),
            amount: Money::ZERO,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn qualified_amount(&self) -> Money {
        self.amount.percent(CONTRACTOR_QUALIFIED_PERCENTAGE)
    }
}

/// Supplies consumed by research.
#[derive(Clone, Debug, PartialEq)]
pub struct SupplyEntry {
    pub id: EntryId,
    pub supply_type: String,
    pub amount: Money,
    pub rd_percentage: f64,
}

impl SupplyEntry {
    #[must_use]
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            supply_type: String::new(),
            amount: Money::ZERO,
            rd_percentage: DEFAULT_RD_PERCENTAGE,
        }
    }

    #[must_use]
    pub fn qualified_amount(&self) -> Money {
        self.amount.percent(self.rd_percentage)
    }
}

/// A cloud or software subscription, billed monthly.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudSoftwareEntry {
    pub id: EntryId,
    pub service_name: String,
    pub monthly_cost: Money,
    pub rd_percentage: f64,
}

impl CloudSoftwareEntry {
    #[must_use]
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            service_name: String::new(),
            monthly_cost: Money::ZERO,
            rd_percentage: DEFAULT_RD_PERCENTAGE,
        }
    }

    /// Monthly cost annualized first, then qualified.
    #[must_use]
    pub fn annual_qualified_amount(&self) -> Money {
        self.monthly_cost
            .times(MONTHS_PER_YEAR)
            .percent(self.rd_percentage)
    }
}

/// Any entry, tagged with its category.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Wage(WageEntry),
    Contractor(ContractorEntry),
    Supply(SupplyEntry),
    CloudSoftware(CloudSoftwareEntry),
}

impl Entry {
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Entry::Wage(_) => Category::Wages,
            Entry::Contractor(_) => Category::Contractors,
            Entry::Supply(_) => Category::Supplies,
            Entry::CloudSoftware(_) => Category::CloudSoftware,
        }
    }

    #[must_use]
    pub fn id(&self) -> &EntryId {
        match self {
            Entry::Wage(e) => &e.id,
            Entry::Contractor(e) => &e.id,
            Entry::Supply(e) => &e.id,
            Entry::CloudSoftware(e) => &e.id,
        }
    }

    /// Qualified amount under the category's rule (annual for cloud/software).
    #[must_use]
    pub fn qualified_amount(&self) -> Money {
        match self {
            Entry::Wage(e) => e.qualified_amount(),
            Entry::Contractor(e) => e.qualified_amount(),
            Entry::Supply(e) => e.qualified_amount(),
            Entry::CloudSoftware(e) => e.annual_qualified_amount(),
        }
    }
}

impl From<WageEntry> for Entry {
    fn from(value: WageEntry) -> Self {
        Entry::Wage(value)
    }
}

impl From<ContractorEntry> for Entry {
    fn from(value: ContractorEntry) -> Self {
        Entry::Contractor(value)
    }
}

impl From<SupplyEntry> for Entry {
    fn from(value: SupplyEntry) -> Self {
        Entry::Supply(value)
    }
}

impl From<CloudSoftwareEntry> for Entry {
    fn from(value: CloudSoftwareEntry) -> Self {
        Entry::CloudSoftware(value)
    }
}

/// Field patch for a wage entry. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WagePatch {
    pub employee_name: Option<String>,
    pub role: Option<String>,
    pub annual_salary: Option<Money>,
    pub rd_percentage: Option<f64>,
}

impl WagePatch {
    #[must_use]
    pub fn employee_name(mut self, name: impl Into<String>) -> Self {
        self.employee_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn annual_salary(mut self, salary: Money) -> Self {
        self.annual_salary = Some(salary);
        self
    }

    #[must_use]
    pub fn rd_percentage(mut self, percentage: f64) -> Self {
        self.rd_percentage = Some(percentage);
        self
    }

    fn apply(self, entry: &mut WageEntry) {
        if let Some(name) = self.employee_name {
            entry.employee_name = name;
        }
        if let Some(role) = self.role {
            entry.role = role;
        }
        if let Some(salary) = self.annual_salary {
            entry.annual_salary = salary;
        }
        if let Some(percentage) = self.rd_percentage {
            entry.rd_percentage = percentage;
        }
    }
}

/// Field patch for a contractor entry. There is no percentage to patch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContractorPatch {
    pub contractor_name: Option<String>,
    pub amount: Option<Money>,
    pub description: Option<String>,
}

impl ContractorPatch {
    #[must_use]
    pub fn contractor_name(mut self, name: impl Into<String>) -> Self {
        self.contractor_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn apply(self, entry: &mut ContractorEntry) {
        if let Some(name) = self.contractor_name {
            entry.contractor_name = name;
        }
        if let Some(amount) = self.amount {
            entry.amount = amount;
        }
        if let Some(description) = self.description {
            entry.description = description;
        }
    }
}

/// Field patch for a supply entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SupplyPatch {
    pub supply_type: Option<String>,
    pub amount: Option<Money>,
    pub rd_percentage: Option<f64>,
}

impl SupplyPatch {
    #[must_use]
    pub fn supply_type(mut self, supply_type: impl Into<String>) -> Self {
        self.supply_type = Some(supply_type.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn rd_percentage(mut self, percentage: f64) -> Self {
        self.rd_percentage = Some(percentage);
        self
    }

    fn apply(self, entry: &mut SupplyEntry) {
        if let Some(supply_type) = self.supply_type {
            entry.supply_type = supply_type;
        }
        if let Some(amount) = self.amount {
            entry.amount = amount;
        }
        if let Some(percentage) = self.rd_percentage {
            entry.rd_percentage = percentage;
        }
    }
}

/// Field patch for a cloud/software entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CloudSoftwarePatch {
    pub service_name: Option<String>,
    pub monthly_cost: Option<Money>,
    pub rd_percentage: Option<f64>,
}

impl CloudSoftwarePatch {
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn monthly_cost(mut self, cost: Money) -> Self {
        self.monthly_cost = Some(cost);
        self
    }

    #[must_use]
    pub fn rd_percentage(mut self, percentage: f64) -> Self {
        self.rd_percentage = Some(percentage);
        self
    }

    fn apply(self, entry: &mut CloudSoftwareEntry) {
        if let Some(name) = self.service_name {
            entry.service_name = name;
        }
        if let Some(cost) = self.monthly_cost {
            entry.monthly_cost = cost;
        }
        if let Some(percentage) = self.rd_percentage {
            entry.rd_percentage = percentage;
        }
    }
}

/// A patch for one entry. The variant selects the category.
#[derive(Clone, Debug, PartialEq)]
pub enum EntryPatch {
    Wage(WagePatch),
    Contractor(ContractorPatch),
    Supply(SupplyPatch),
    CloudSoftware(CloudSoftwarePatch),
}

impl EntryPatch {
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            EntryPatch::Wage(_) => Category::Wages,
            EntryPatch::Contractor(_) => Category::Contractors,
            EntryPatch::Supply(_) => Category::Supplies,
            EntryPatch::CloudSoftware(_) => Category::CloudSoftware,
        }
    }
}

impl From<WagePatch> for EntryPatch {
    fn from(value: WagePatch) -> Self {
        EntryPatch::Wage(value)
    }
}

impl From<ContractorPatch> for EntryPatch {
    fn from(value: ContractorPatch) -> Self {
        EntryPatch::Contractor(value)
    }
}

impl From<SupplyPatch> for EntryPatch {
    fn from(value: SupplyPatch) -> Self {
        EntryPatch::Supply(value)
    }
}

impl From<CloudSoftwarePatch> for EntryPatch {
    fn from(value: CloudSoftwarePatch) -> Self {
        EntryPatch::CloudSoftware(value)
    }
}

/// One customer's expense entries.
///
/// Insertion order is kept for display; totals don't depend on it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpenseLedger {
    wages: Vec<WageEntry>,
    contractors: Vec<ContractorEntry>,
    supplies: Vec<SupplyEntry>,
    cloud_software: Vec<CloudSoftwareEntry>,
}

impl ExpenseLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wages(&self) -> &[WageEntry] {
        &self.wages
    }

    pub fn contractors(&self) -> &[ContractorEntry] {
        &self.contractors
    }

    pub fn supplies(&self) -> &[SupplyEntry] {
        &self.supplies
    }

    pub fn cloud_software(&self) -> &[CloudSoftwareEntry] {
        &self.cloud_software
    }

    /// Number of entries in one category.
    #[must_use]
    pub fn len_of(&self, category: Category) -> usize {
        match category {
            Category::Wages => self.wages.len(),
            Category::Contractors => self.contractors.len(),
            Category::Supplies => self.supplies.len(),
            Category::CloudSoftware => self.cloud_software.len(),
        }
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.len_of(*c)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `id` exists in `category`.
    #[must_use]
    pub fn contains(&self, category: Category, id: &EntryId) -> bool {
        match category {
            Category::Wages => self.wages.iter().any(|e| &e.id == id),
            Category::Contractors => self.contractors.iter().any(|e| &e.id == id),
            Category::Supplies => self.supplies.iter().any(|e| &e.id == id),
            Category::CloudSoftware => self.cloud_software.iter().any(|e| &e.id == id),
        }
    }

    /// Appends a zero-valued entry with a fresh id.
    pub fn add_entry(&mut self, category: Category) -> EntryId {
        let mut id = EntryId::generate();
        while self.contains(category, &id) {
            id = EntryId::generate();
        }
        match category {
            Category::Wages => self.wages.push(WageEntry::new(id.clone())),
            Category::Contractors => self.contractors.push(ContractorEntry::new(id.clone())),
            Category::Supplies => self.supplies.push(SupplyEntry::new(id.clone())),
            Category::CloudSoftware => self.cloud_software.push(CloudSoftwareEntry::new(id.clone())),
        }
        id
    }

    /// Appends an existing entry (e.g. loaded from the record store).
    ///
    /// Returns `false`, leaving the ledger unchanged, if the id is already
    /// taken in that category.
    pub fn insert(&mut self, entry: impl Into<Entry>) -> bool {
        let entry = entry.into();
        if self.contains(entry.category(), entry.id()) {
            return false;
        }
        match entry {
            Entry::Wage(e) => self.wages.push(e),
            Entry::Contractor(e) => self.contractors.push(e),
            Entry::Supply(e) => self.supplies.push(e),
            Entry::CloudSoftware(e) => self.cloud_software.push(e),
        }
        true
    }

    /// Applies `patch` to the entry `id` of the patch's category.
    ///
    /// Returns `false` if no such entry exists; the ledger is then unchanged.
    pub fn update_entry(&mut self, id: &EntryId, patch: impl Into<EntryPatch>) -> bool {
        match patch.into() {
            EntryPatch::Wage(patch) => match self.wages.iter_mut().find(|e| &e.id == id) {
                Some(entry) => patch.apply(entry),
                None => return false,
            },
            EntryPatch::Contractor(patch) => {
                match self.contractors.iter_mut().find(|e| &e.id == id) {
                    Some(entry) => patch.apply(entry),
                    None => return false,
                }
            }
            EntryPatch::Supply(patch) => match self.supplies.iter_mut().find(|e| &e.id == id) {
                Some(entry) => patch.apply(entry),
                None => return false,
            },
            EntryPatch::CloudSoftware(patch) => {
                match self.cloud_software.iter_mut().find(|e| &e.id == id) {
                    Some(entry) => patch.apply(entry),
                    None => return false,
                }
            }
        }
        true
    }

    /// Removes the entry `id` from `category`. Idempotent.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_entry(&mut self, category: Category, id: &EntryId) -> bool {
        let before = self.len_of(category);
        match category {
            Category::Wages => self.wages.retain(|e| &e.id != id),
            Category::Contractors => self.contractors.retain(|e| &e.id != id),
            Category::Supplies => self.supplies.retain(|e| &e.id != id),
            Category::CloudSoftware => self.cloud_software.retain(|e| &e.id != id),
        }
        self.len_of(category) != before
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
