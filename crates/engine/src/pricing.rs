//! Credit & pricing resolution.
//!
//! Maps an aggregated QRE to a federal credit estimate, and a credit amount to
//! the service price. Every function here is pure and total: negative inputs
//! are clamped to zero at this boundary instead of being propagated.
//!
//! Price tiers are half-open intervals and each breakpoint belongs to the
//! upper tier:
//!
//! | credit                 | tier           | base price |
//! |------------------------|----------------|------------|
//! | `[0, 10 000)`          | `Basic`        | $500       |
//! | `[10 000, 50 000)`     | `Standard`     | $750       |
//! | `[50 000, 100 000)`    | `Professional` | $1 000     |
//! | `[100 000, ∞)`         | `Enterprise`   | $1 500     |
//!
//! Each filing year beyond the current one adds [`ADDITIONAL_YEAR_SURCHARGE`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Money, qre::QreSummary};

/// Surcharge per filing year beyond the current year.
pub const ADDITIONAL_YEAR_SURCHARGE: Money = Money::from_dollars(297);

const STANDARD_FROM: Money = Money::from_dollars(10_000);
const PROFESSIONAL_FROM: Money = Money::from_dollars(50_000);
const ENTERPRISE_FROM: Money = Money::from_dollars(100_000);

/// Federal credit rate applied to the total QRE, as a fraction (`0.065` is
/// 6.5%).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CreditRate(f64);

impl CreditRate {
    /// Rate used by the calculator flow.
    pub const DEFAULT: CreditRate = CreditRate(0.065);

    /// Builds a rate, clamped to `[0, 1]`. A non-finite value becomes zero.
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        if !fraction.is_finite() {
            return Self(0.0);
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    #[must_use]
    pub const fn fraction(self) -> f64 {
        self.0
    }
}

impl Default for CreditRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CreditRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 * 100.0)
    }
}

impl TryFrom<f64> for CreditRate {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(format!("credit rate must be a fraction in [0, 1], got {value}"));
        }
        Ok(Self(value))
    }
}

impl From<CreditRate> for f64 {
    fn from(value: CreditRate) -> Self {
        value.0
    }
}

/// Service price bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Basic,
    Standard,
    Professional,
    Enterprise,
}

impl PriceTier {
    /// Tier for a credit amount. Negative credits count as zero.
    #[must_use]
    pub fn for_credit(credit: Money) -> Self {
        let credit = credit.clamp_non_negative();
        if credit < STANDARD_FROM {
            PriceTier::Basic
        } else if credit < PROFESSIONAL_FROM {
            PriceTier::Standard
        } else if credit < ENTERPRISE_FROM {
            PriceTier::Professional
        } else {
            PriceTier::Enterprise
        }
    }

    /// Price for the current filing year only.
    #[must_use]
    pub const fn base_price(self) -> Money {
        match self {
            PriceTier::Basic => Money::from_dollars(500),
            PriceTier::Standard => Money::from_dollars(750),
            PriceTier::Professional => Money::from_dollars(1_000),
            PriceTier::Enterprise => Money::from_dollars(1_500),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PriceTier::Basic => "basic",
            PriceTier::Standard => "standard",
            PriceTier::Professional => "professional",
            PriceTier::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Price of a filing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub tier: PriceTier,
    pub base_price: Money,
    pub additional_years: u32,
    pub surcharge: Money,
    pub total: Money,
}

/// Price a filing for `credit`, plus `additional_years` prior years.
#[must_use]
pub fn quote(credit: Money, additional_years: u32) -> Quote {
    let tier = PriceTier::for_credit(credit);
    let base_price = tier.base_price();
    let surcharge = ADDITIONAL_YEAR_SURCHARGE.times(i64::from(additional_years));
    Quote {
        tier,
        base_price,
        additional_years,
        surcharge,
        total: base_price + surcharge,
    }
}

/// Federal credit for a total QRE. Negative QRE counts as zero.
#[must_use]
pub fn federal_credit(total_qre: Money, rate: CreditRate) -> Money {
    total_qre.clamp_non_negative().scale(rate.fraction())
}

/// Credit estimate and price for one ledger snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreditEstimate {
    pub total_qre: Money,
    pub credit_rate: CreditRate,
    pub federal_credit: Money,
    pub quote: Quote,
}

impl CreditEstimate {
    /// Total price, surcharges included.
    #[must_use]
    pub fn price(&self) -> Money {
        self.quote.total
    }

    #[must_use]
    pub fn price_tier(&self) -> PriceTier {
        self.quote.tier
    }
}

/// Resolve the credit estimate of a QRE summary.
#[must_use]
pub fn estimate(summary: &QreSummary, rate: CreditRate, additional_years: u32) -> CreditEstimate {
    let total_qre = summary.grand_total().clamp_non_negative();
    let federal_credit = federal_credit(total_qre, rate);
    CreditEstimate {
        total_qre,
        credit_rate: rate,
        federal_credit,
        quote: quote(federal_credit, additional_years),
    }
}
