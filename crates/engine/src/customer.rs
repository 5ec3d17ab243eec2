//! Customer identity.
//!
//! Every ledger is owned by exactly one customer, identified by the email
//! address the external access check was performed against. The engine never
//! reads the identity from ambient state: callers pass a [`CustomerId`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Normalized (trimmed, lowercase) customer email.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(String);

impl CustomerId {
    /// Validate and normalize an email address.
    pub fn parse(raw: &str) -> ResultEngine<Self> {
        let email = raw.trim().to_ascii_lowercase();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(EngineError::InvalidCustomer(format!(
                "\"{email}\" is not an email address"
            )));
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || email.chars().any(char::is_whitespace)
        {
            return Err(EngineError::InvalidCustomer(format!(
                "\"{email}\" is not an email address"
            )));
        }
        Ok(Self(email))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CustomerId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerId> for String {
    fn from(value: CustomerId) -> Self {
        value.0
    }
}
