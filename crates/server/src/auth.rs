//! Registration, login, and bearer-token resolution.
//!
//! Tokens are opaque 40-hex-char values stored one-per-account and created
//! lazily on first registration or login. Both `Token <key>` and
//! `Bearer <key>` authorization schemes are accepted.

use std::collections::BTreeMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rand::RngCore;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tradepost_core::access::Actor;
use tradepost_core::domain::account::{
    Account, AccountId, BusinessProfile, CustomerProfile, ProfileKind,
};
use tradepost_db::repositories::{AccountRepository, SqlAccountRepository};

use crate::errors::ApiError;
use crate::state::AppState;

/// The authenticated caller: the account row plus its structural role
/// flags, resolved once per request.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub account: Account,
    pub actor: Actor,
}

/// Optional authentication for read-open endpoints: an absent header is
/// anonymous, but a present-and-invalid token is still rejected.
pub struct MaybeAuthUser(pub Option<AuthUser>);

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Token ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

async fn resolve_token(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());
    let account = repo
        .account_for_token(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token.".to_string()))?;
    let actor = repo.load_actor(&account).await?;
    Ok(AuthUser { account, actor })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;
        resolve_token(state, &token).await
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(Self(Some(resolve_token(state, &token).await?))),
            None => Ok(Self(None)),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::Internal)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

fn generate_token() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub repeated_password: String,
    #[serde(rename = "type", alias = "profile_type")]
    pub profile_type: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn registration(
    State(state): State<AppState>,
    Json(body): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if repo.username_exists(&body.username).await? {
        errors
            .entry("username".to_string())
            .or_default()
            .push("This username is already taken.".to_string());
    }
    if repo.email_exists(&body.email).await? {
        errors
            .entry("email".to_string())
            .or_default()
            .push("This email address is already in use.".to_string());
    }
    if body.password != body.repeated_password {
        errors
            .entry("password".to_string())
            .or_default()
            .push("The password does not match the repeated password.".to_string());
    }

    let profile_kind = match &body.profile_type {
        Some(raw) => match ProfileKind::parse(raw) {
            Ok(kind) => Some(kind),
            Err(error) => {
                let field = error.field().unwrap_or("type").to_string();
                errors.entry(field).or_default().push(error.to_string());
                None
            }
        },
        None => {
            errors.entry("type".to_string()).or_default().push("Unknown profile type.".to_string());
            None
        }
    };

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let Some(profile_kind) = profile_kind else {
        return Err(ApiError::field("type", "Unknown profile type."));
    };

    let now = Utc::now();
    let account = Account {
        id: AccountId::generate(),
        username: body.username.clone(),
        email: body.email.clone(),
        first_name: body.first_name.clone().unwrap_or_default(),
        last_name: body.last_name.clone().unwrap_or_default(),
        is_staff: false,
        date_joined: now,
    };
    let password_hash = hash_password(&body.password)?;
    repo.create_account(&account, &password_hash).await?;

    match profile_kind {
        ProfileKind::Customer => {
            repo.create_customer_profile(&CustomerProfile {
                account_id: account.id.clone(),
                first_name: body.first_name.unwrap_or_default(),
                last_name: body.last_name.unwrap_or_default(),
                file: None,
                created_at: now,
            })
            .await?;
        }
        ProfileKind::Business => {
            repo.create_business_profile(&BusinessProfile {
                account_id: account.id.clone(),
                company_name: "Default Company".to_string(),
                company_address: "Default Address".to_string(),
                description: None,
                tel: None,
                location: None,
                working_hours: None,
                email: None,
                file: None,
                created_at: now,
            })
            .await?;
        }
    }

    let token = repo.upsert_token(&account.id, &generate_token(), now).await?;

    info!(
        event_name = "system.auth.registered",
        account_id = %account.id.0,
        profile_type = profile_kind.as_str(),
        "account registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "user_id": account.id.0,
            "username": account.username,
            "email": account.email,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());

    let Some((account, password_hash)) = repo.find_by_username(&body.username).await? else {
        return Err(ApiError::Invalid("Incorrect credentials.".to_string()));
    };
    if !verify_password(&body.password, &password_hash) {
        return Err(ApiError::Invalid("Incorrect credentials.".to_string()));
    }

    let token = repo.upsert_token(&account.id, &generate_token(), Utc::now()).await?;

    info!(event_name = "system.auth.login", account_id = %account.id.0, "login succeeded");

    Ok(Json(json!({
        "token": token,
        "username": account.username,
        "email": account.email,
        "user_id": account.id.0,
    })))
}
