use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::offer::OfferId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl ReviewId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A customer's review of a business user. The rating is an unclamped
/// integer; one review per (reviewer, business) pair is enforced before
/// insert rather than by a stored constraint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rating: i64,
    pub description: String,
    pub reviewer_id: AccountId,
    pub business_id: AccountId,
    pub offer_id: Option<OfferId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
