use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use tradepost_core::access::Actor;
use tradepost_core::domain::account::{Account, AccountId, BusinessProfile, CustomerProfile};
use tradepost_core::domain::offer::{Offer, OfferId, OfferVariant, VariantId};
use tradepost_core::domain::order::{Order, OrderId, OrderStatus};
use tradepost_core::domain::review::{Review, ReviewId};
use tradepost_core::reconcile::{ReconcilePlan, VariantSpec};

pub mod account;
pub mod offer;
pub mod order;
pub mod review;

pub use account::SqlAccountRepository;
pub use offer::SqlOfferRepository;
pub use order::SqlOrderRepository;
pub use review::SqlReviewRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Partial update of account-level fields; `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Partial update of profile-level fields; `None` keeps the stored value.
#[derive(Clone, Debug, Default)]
pub struct ProfilePatch {
    pub location: Option<String>,
    pub tel: Option<String>,
    pub description: Option<String>,
    pub working_hours: Option<String>,
    pub file: Option<String>,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create_account(
        &self,
        account: &Account,
        password_hash: &str,
    ) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Account plus its stored password hash, for credential checks.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(Account, String)>, RepositoryError>;

    async fn username_exists(&self, username: &str) -> Result<bool, RepositoryError>;
    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError>;

    /// Get-or-create semantics: an existing token for the account is
    /// returned unchanged, otherwise `fresh` is stored.
    async fn upsert_token(
        &self,
        account_id: &AccountId,
        fresh: &str,
        now: DateTime<Utc>,
    ) -> Result<String, RepositoryError>;

    async fn account_for_token(&self, token: &str) -> Result<Option<Account>, RepositoryError>;

    /// Resolve the structural role flags for an account.
    async fn load_actor(&self, account: &Account) -> Result<Actor, RepositoryError>;

    async fn create_business_profile(
        &self,
        profile: &BusinessProfile,
    ) -> Result<(), RepositoryError>;
    async fn create_customer_profile(
        &self,
        profile: &CustomerProfile,
    ) -> Result<(), RepositoryError>;

    async fn business_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<BusinessProfile>, RepositoryError>;
    async fn customer_profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;

    async fn list_business_profiles(
        &self,
    ) -> Result<Vec<(BusinessProfile, Account)>, RepositoryError>;
    async fn list_customer_profiles(
        &self,
    ) -> Result<Vec<(CustomerProfile, Account)>, RepositoryError>;

    async fn count_business_profiles(&self) -> Result<i64, RepositoryError>;

    async fn update_account(
        &self,
        id: &AccountId,
        patch: &AccountPatch,
    ) -> Result<(), RepositoryError>;
    async fn update_business_profile(
        &self,
        id: &AccountId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError>;
    async fn update_customer_profile(
        &self,
        id: &AccountId,
        patch: &ProfilePatch,
    ) -> Result<(), RepositoryError>;
}

/// Simple equality filters for the offer list; aggregate-derived filters
/// (min price bounds, delivery ceiling) are applied by the caller on top
/// of the variant sets, which it needs for the response anyway.
#[derive(Clone, Debug, Default)]
pub struct OfferListFilter {
    pub creator_id: Option<AccountId>,
    pub search: Option<String>,
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Insert the offer and its three tiers in one transaction; nothing is
    /// visible unless all rows land.
    async fn create(
        &self,
        offer: &Offer,
        specs: &[VariantSpec],
    ) -> Result<Vec<OfferVariant>, RepositoryError>;

    async fn find(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;

    /// Owner-scoped lookup: someone else's offer reads as absent.
    async fn find_for_owner(
        &self,
        id: &OfferId,
        owner: &AccountId,
    ) -> Result<Option<Offer>, RepositoryError>;

    /// Offers matching the flat filters, most recently updated first.
    async fn list(&self, filter: &OfferListFilter) -> Result<Vec<Offer>, RepositoryError>;

    async fn variants_for(&self, id: &OfferId) -> Result<Vec<OfferVariant>, RepositoryError>;
    async fn variants_for_offers(
        &self,
        ids: &[OfferId],
    ) -> Result<Vec<OfferVariant>, RepositoryError>;
    async fn variant(&self, id: &VariantId) -> Result<Option<OfferVariant>, RepositoryError>;

    /// Apply offer-field changes and a reconciliation plan in one
    /// transaction.
    async fn update(&self, offer: &Offer, plan: &ReconcilePlan) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &OfferId) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError>;
    async fn find(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    async fn list_for_customer(&self, id: &AccountId) -> Result<Vec<Order>, RepositoryError>;
    async fn list_for_business(&self, id: &AccountId) -> Result<Vec<Order>, RepositoryError>;
    async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &OrderId) -> Result<bool, RepositoryError>;
    async fn count_for_business(
        &self,
        id: &AccountId,
        status: OrderStatus,
    ) -> Result<i64, RepositoryError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReviewOrdering {
    #[default]
    UpdatedAtAsc,
    UpdatedAtDesc,
    RatingAsc,
    RatingDesc,
}

#[derive(Clone, Debug, Default)]
pub struct ReviewListFilter {
    pub business_id: Option<AccountId>,
    pub reviewer_id: Option<AccountId>,
    pub ordering: ReviewOrdering,
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<(), RepositoryError>;
    async fn find(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    async fn exists_for_pair(
        &self,
        reviewer: &AccountId,
        business: &AccountId,
    ) -> Result<bool, RepositoryError>;
    async fn list(&self, filter: &ReviewListFilter) -> Result<Vec<Review>, RepositoryError>;
    async fn update(&self, review: &Review) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ReviewId) -> Result<bool, RepositoryError>;
    async fn ratings_for_business(&self, id: &AccountId) -> Result<Vec<i64>, RepositoryError>;
    async fn all_ratings(&self) -> Result<Vec<i64>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

pub(crate) fn decode_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("bad decimal `{raw}`: {error}")))
}

pub(crate) fn decode_string_list(raw: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("bad string list `{raw}`: {error}")))
}

pub(crate) fn encode_string_list(values: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(values)
        .map_err(|error| RepositoryError::Decode(format!("unencodable string list: {error}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use tradepost_core::domain::account::{Account, AccountId, BusinessProfile, CustomerProfile};

    use crate::{connect_with_settings, migrations, DbPool};

    use super::{AccountRepository, SqlAccountRepository};

    pub async fn test_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    pub fn account(id: &str) -> Account {
        Account {
            id: AccountId(id.to_string()),
            username: format!("user-{id}"),
            email: format!("{id}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            date_joined: Utc::now(),
        }
    }

    pub async fn seed_business(pool: &DbPool, id: &str) -> Account {
        let repo = SqlAccountRepository::new(pool.clone());
        let account = account(id);
        repo.create_account(&account, "hash").await.expect("create account");
        repo.create_business_profile(&BusinessProfile {
            account_id: account.id.clone(),
            company_name: "Test Co".to_string(),
            company_address: "1 Test Street".to_string(),
            description: None,
            tel: None,
            location: None,
            working_hours: None,
            email: None,
            file: None,
            created_at: Utc::now(),
        })
        .await
        .expect("create business profile");
        account
    }

    pub async fn seed_customer(pool: &DbPool, id: &str) -> Account {
        let repo = SqlAccountRepository::new(pool.clone());
        let account = account(id);
        repo.create_account(&account, "hash").await.expect("create account");
        repo.create_customer_profile(&CustomerProfile {
            account_id: account.id.clone(),
            first_name: "Test".to_string(),
            last_name: "Customer".to_string(),
            file: None,
            created_at: Utc::now(),
        })
        .await
        .expect("create customer profile");
        account
    }
}
