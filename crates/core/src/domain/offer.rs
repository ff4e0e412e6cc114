use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

impl VariantId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// The three pricing tiers an offer carries. Unique per offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Basic,
    Standard,
    Premium,
}

impl OfferType {
    pub const ALL: [OfferType; 3] = [Self::Basic, Self::Standard, Self::Premium];

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            _ => Err(DomainError::validation(
                "offer_type",
                "offer_type must be one of basic, standard or premium.",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl std::fmt::Display for OfferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pricing tier of an offer. Lifetime is tied to the parent offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferVariant {
    pub id: VariantId,
    pub offer_id: OfferId,
    pub title: String,
    pub price: Decimal,
    pub delivery_time_in_days: i64,
    pub revisions: i64,
    pub offer_type: OfferType,
    pub features: Vec<String>,
}

/// A seller's listing. The base price/delivery fields are legacy and
/// superseded by the variant set; aggregates are derived from variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub owner: AccountId,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub base_price: Option<Decimal>,
    pub base_delivery_time_in_days: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
