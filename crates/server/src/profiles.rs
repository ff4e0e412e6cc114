//! Profile endpoints: the flat per-user profile view over either profile
//! kind, owner-or-staff guarded updates, and the two role listings.
//!
//! The business flat view carries `avg_rating` (with the `"-"` empty-set
//! sentinel) and `pending_orders` (a count of `in_progress` orders; the
//! name is historical and intentionally unchanged).

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use tradepost_core::domain::account::{Account, AccountId, BusinessProfile, CustomerProfile};
use tradepost_core::domain::order::OrderStatus;
use tradepost_core::ratings::average_rating;
use tradepost_db::repositories::{
    AccountPatch, AccountRepository, OrderRepository, ProfilePatch, ReviewRepository,
    SqlAccountRepository, SqlOrderRepository, SqlReviewRepository,
};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::state::AppState;

fn joined_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

enum ProfileData {
    Business(BusinessProfile),
    Customer(CustomerProfile),
}

async fn load_profile(
    repo: &SqlAccountRepository,
    id: &AccountId,
) -> Result<Option<ProfileData>, ApiError> {
    if let Some(profile) = repo.business_profile(id).await? {
        return Ok(Some(ProfileData::Business(profile)));
    }
    if let Some(profile) = repo.customer_profile(id).await? {
        return Ok(Some(ProfileData::Customer(profile)));
    }
    Ok(None)
}

async fn flat_profile_json(
    state: &AppState,
    account: &Account,
    profile: &ProfileData,
) -> Result<Value, ApiError> {
    let mut body = serde_json::Map::new();
    body.insert("user".to_string(), json!(account.id.0));
    body.insert("username".to_string(), json!(account.username));
    body.insert("first_name".to_string(), json!(account.first_name));
    body.insert("last_name".to_string(), json!(account.last_name));
    body.insert("email".to_string(), json!(account.email));
    body.insert("created_at".to_string(), json!(joined_timestamp(account.date_joined)));

    match profile {
        ProfileData::Business(profile) => {
            body.insert("type".to_string(), json!("business"));
            body.insert("file".to_string(), json!(profile.file));
            body.insert("location".to_string(), json!(profile.location));
            body.insert("tel".to_string(), json!(profile.tel));
            body.insert("description".to_string(), json!(profile.description));
            body.insert("working_hours".to_string(), json!(profile.working_hours));

            let review_repo = SqlReviewRepository::new(state.db_pool.clone());
            let ratings = review_repo.ratings_for_business(&account.id).await?;
            let rating_value = match average_rating(&ratings) {
                Some(value) => json!(value),
                None => json!("-"),
            };
            body.insert("avg_rating".to_string(), rating_value);

            let order_repo = SqlOrderRepository::new(state.db_pool.clone());
            let pending = order_repo
                .count_for_business(&account.id, OrderStatus::InProgress)
                .await?;
            body.insert("pending_orders".to_string(), json!(pending));
        }
        ProfileData::Customer(profile) => {
            body.insert("type".to_string(), json!("customer"));
            body.insert("file".to_string(), json!(profile.file));
            body.insert("location".to_string(), Value::Null);
            body.insert("tel".to_string(), Value::Null);
            body.insert("description".to_string(), Value::Null);
            body.insert("working_hours".to_string(), Value::Null);
        }
    }

    Ok(Value::Object(body))
}

pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(pk): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let account = repo
        .find_by_id(&AccountId(pk))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    let profile = load_profile(&repo, &account.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

    Ok(Json(flat_profile_json(&state, &account, &profile).await?))
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub tel: Option<String>,
    pub description: Option<String>,
    pub working_hours: Option<String>,
    pub file: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(pk): Path<String>,
    Json(body): Json<ProfileUpdateBody>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let account = repo
        .find_by_id(&AccountId(pk))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    load_profile(&repo, &account.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

    if user.account.id != account.id && !user.actor.is_staff {
        return Err(ApiError::Forbidden(
            "You do not have permission to modify this profile.".to_string(),
        ));
    }

    repo.update_account(
        &account.id,
        &AccountPatch {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
        },
    )
    .await?;

    let profile_patch = ProfilePatch {
        location: body.location,
        tel: body.tel,
        description: body.description,
        working_hours: body.working_hours,
        file: body.file,
    };
    repo.update_business_profile(&account.id, &profile_patch).await?;
    repo.update_customer_profile(&account.id, &profile_patch).await?;

    let account = repo
        .find_by_id(&account.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    let profile = load_profile(&repo, &account.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

    Ok(Json(flat_profile_json(&state, &account, &profile).await?))
}

pub async fn business_list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let profiles = repo.list_business_profiles().await?;
    let results = profiles
        .iter()
        .map(|(profile, account)| {
            json!({
                "user": {
                    "pk": account.id.0,
                    "username": account.username,
                    "first_name": account.first_name,
                    "last_name": account.last_name,
                },
                "file": profile.file,
                "location": profile.location,
                "tel": profile.tel,
                "description": profile.description,
                "working_hours": profile.working_hours,
                "type": "business",
            })
        })
        .collect();

    Ok(Json(results))
}

pub async fn customer_list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let profiles = repo.list_customer_profiles().await?;
    let results = profiles
        .iter()
        .map(|(profile, account)| {
            json!({
                "user": {
                    "pk": account.id.0,
                    "username": account.username,
                    "first_name": account.first_name,
                    "last_name": account.last_name,
                },
                "file": profile.file,
                "uploaded_at": joined_timestamp(profile.created_at),
                "type": "customer",
            })
        })
        .collect();

    Ok(Json(results))
}
