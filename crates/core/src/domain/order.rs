use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::offer::{OfferId, OfferType, VariantId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::validation("status", "Invalid status value.")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable form used by display-facing payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order materialized from a chosen variant at creation time.
///
/// The title/price/delivery/revisions/features/offer_type columns are a
/// snapshot: copied once when the order is created and never re-derived,
/// even if the source variant later changes or is deleted. `variant_id`
/// goes null when the source variant is deleted; the snapshot survives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: AccountId,
    pub business_id: AccountId,
    pub offer_id: OfferId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub price: Decimal,
    pub delivery_time_in_days: i64,
    pub revisions: i64,
    pub features: Vec<String>,
    pub offer_type: OfferType,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Statuses transition freely: any recognized value may follow any
    /// other. Only unknown values are rejected, at parse time. Stricter
    /// lifecycle enforcement is an open product question.
    pub fn set_status(&mut self, next: OrderStatus, now: DateTime<Utc>) {
        self.status = next;
        self.updated_at = now;
    }
}
