use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A registered user account. Role is not stored here; it is structural,
/// derived from the presence of a business or customer profile row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Business,
    Customer,
}

impl ProfileKind {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "business" => Ok(Self::Business),
            "customer" => Ok(Self::Customer),
            _ => Err(DomainError::validation("type", "Unknown profile type.")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Customer => "customer",
        }
    }
}

/// 1:1 extension of an account marking it as a seller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub account_id: AccountId,
    pub company_name: String,
    pub company_address: String,
    pub description: Option<String>,
    pub tel: Option<String>,
    pub location: Option<String>,
    pub working_hours: Option<String>,
    pub email: Option<String>,
    /// Opaque image URL managed by the external file store.
    pub file: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 1:1 extension of an account marking it as a buyer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub account_id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub file: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::ProfileKind;

    #[test]
    fn profile_kind_parses_case_insensitively() {
        assert_eq!(ProfileKind::parse("Business").expect("parse"), ProfileKind::Business);
        assert_eq!(ProfileKind::parse(" customer ").expect("parse"), ProfileKind::Customer);
    }

    #[test]
    fn unknown_profile_kind_is_a_validation_error() {
        let error = ProfileKind::parse("vendor").expect_err("vendor is not a profile kind");
        assert_eq!(error.field(), Some("type"));
    }
}
