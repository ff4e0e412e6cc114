//! Offer endpoints: list/create, detail/update/delete, and single-variant
//! retrieval.
//!
//! Listing is read-open; every write requires a business account. Mutating
//! someone else's offer reads as not-found rather than forbidden, so the
//! existence of other sellers' rows is never confirmed.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tradepost_core::domain::account::{Account, AccountId};
use tradepost_core::domain::offer::{Offer, OfferId, OfferType, OfferVariant, VariantId};
use tradepost_core::errors::DomainError;
use tradepost_core::pagination::{Page, PageParams};
use tradepost_core::pricing::{min_delivery_time, min_price};
use tradepost_core::reconcile::{plan_update, validate_create, VariantPayload};
use tradepost_db::repositories::{
    AccountRepository, OfferListFilter, OfferRepository, SqlAccountRepository, SqlOfferRepository,
};

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OfferListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub creator_id: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub max_delivery_time: Option<i64>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VariantBody {
    pub offer_type: String,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub revisions: Option<i64>,
    pub delivery_time_in_days: Option<i64>,
    pub features: Option<Vec<String>>,
}

impl VariantBody {
    fn into_payload(self) -> Result<VariantPayload, DomainError> {
        Ok(VariantPayload {
            offer_type: OfferType::parse(&self.offer_type)?,
            title: self.title,
            price: self.price,
            revisions: self.revisions,
            delivery_time_in_days: self.delivery_time_in_days,
            features: self.features,
        })
    }
}

fn into_payloads(bodies: Vec<VariantBody>) -> Result<Vec<VariantPayload>, ApiError> {
    bodies
        .into_iter()
        .map(|body| body.into_payload().map_err(ApiError::from))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct OfferCreateBody {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    #[serde(default)]
    pub details: Vec<VariantBody>,
}

#[derive(Debug, Deserialize)]
pub struct OfferUpdateBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub details: Option<Vec<VariantBody>>,
}

pub(crate) fn price_value(price: Decimal) -> f64 {
    price.round_dp(2).to_f64().unwrap_or(0.0)
}

pub(crate) fn variant_full(variant: &OfferVariant) -> Value {
    json!({
        "id": variant.id.0,
        "title": variant.title,
        "revisions": variant.revisions,
        "delivery_time_in_days": variant.delivery_time_in_days,
        "price": price_value(variant.price),
        "features": variant.features,
        "offer_type": variant.offer_type.as_str(),
    })
}

fn variant_link(variant: &OfferVariant) -> Value {
    json!({ "id": variant.id.0, "url": format!("/offerdetails/{}/", variant.id.0) })
}

fn user_details(account: Option<&Account>) -> Value {
    match account {
        Some(account) => json!({
            "first_name": account.first_name,
            "last_name": account.last_name,
            "username": account.username,
        }),
        None => Value::Null,
    }
}

fn offer_json(
    offer: &Offer,
    variants: &[OfferVariant],
    owner: Option<&Account>,
    full_details: bool,
) -> Value {
    let details: Vec<Value> = if full_details {
        variants.iter().map(variant_full).collect()
    } else {
        variants.iter().map(variant_link).collect()
    };

    json!({
        "id": offer.id.0,
        "user": offer.owner.0,
        "title": offer.title,
        "image": offer.image,
        "description": offer.description,
        "created_at": offer.created_at.to_rfc3339(),
        "updated_at": offer.updated_at.to_rfc3339(),
        "details": details,
        "min_price": min_price(variants).map(price_value),
        "min_delivery_time": min_delivery_time(variants),
        "user_details": user_details(owner),
    })
}

/// The `ordering` parameter keeps its historical quirk: `updated_at` sorts
/// newest-first and `-updated_at` oldest-first, matching the contract
/// clients already rely on.
fn apply_ordering(entries: &mut [(Offer, Vec<OfferVariant>)], ordering: Option<&str>) {
    match ordering {
        Some("-updated_at") => entries.sort_by_key(|(offer, _)| offer.updated_at),
        Some("min_price") => entries.sort_by_key(|(_, variants)| min_price(variants)),
        Some("-min_price") => {
            entries.sort_by_key(|(_, variants)| min_price(variants));
            entries.reverse();
        }
        _ => entries.sort_by_key(|(offer, _)| std::cmp::Reverse(offer.updated_at)),
    }
}

pub async fn list(
    State(state): State<AppState>,
    _user: MaybeAuthUser,
    Query(query): Query<OfferListQuery>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOfferRepository::new(state.db_pool.clone());

    let filter = OfferListFilter {
        creator_id: query.creator_id.clone().map(AccountId),
        search: query.search.clone().filter(|needle| !needle.trim().is_empty()),
    };
    let offers = repo.list(&filter).await?;

    let ids: Vec<OfferId> = offers.iter().map(|offer| offer.id.clone()).collect();
    let mut variants_by_offer: HashMap<String, Vec<OfferVariant>> = HashMap::new();
    for variant in repo.variants_for_offers(&ids).await? {
        variants_by_offer.entry(variant.offer_id.0.clone()).or_default().push(variant);
    }

    let mut entries: Vec<(Offer, Vec<OfferVariant>)> = offers
        .into_iter()
        .map(|offer| {
            let variants = variants_by_offer.remove(&offer.id.0).unwrap_or_default();
            (offer, variants)
        })
        .collect();

    if let Some(bound) = query.min_price {
        entries.retain(|(_, variants)| min_price(variants).is_some_and(|price| price >= bound));
    }
    if let Some(bound) = query.max_price {
        entries.retain(|(_, variants)| min_price(variants).is_some_and(|price| price <= bound));
    }
    if let Some(bound) = query.max_delivery_time {
        entries
            .retain(|(_, variants)| min_delivery_time(variants).is_some_and(|days| days <= bound));
    }

    apply_ordering(&mut entries, query.ordering.as_deref());

    let params = PageParams::resolve(query.page, query.page_size, state.pagination.offers());
    let page = Page::from_items(entries, params);

    let account_repo = SqlAccountRepository::new(state.db_pool.clone());
    let mut owners: HashMap<String, Account> = HashMap::new();
    let mut results = Vec::with_capacity(page.results.len());
    for (offer, variants) in &page.results {
        if !owners.contains_key(&offer.owner.0) {
            if let Some(account) = account_repo.find_by_id(&offer.owner).await? {
                owners.insert(offer.owner.0.clone(), account);
            }
        }
        results.push(offer_json(offer, variants, owners.get(&offer.owner.0), false));
    }

    Ok(Json(json!({
        "count": page.count,
        "total_pages": page.total_pages,
        "current_page": page.current_page,
        "results": results,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OfferCreateBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !user.actor.is_business() {
        return Err(ApiError::Forbidden("Only business users can create offers.".to_string()));
    }

    let payloads = into_payloads(body.details)?;
    let specs = validate_create(&payloads).map_err(|error| match error {
        // The exactly-three-tiers rule surfaces as a `detail` message, not
        // a field map, matching the established response shape.
        DomainError::Validation { ref field, ref message } if field == "details" => {
            ApiError::Invalid(message.clone())
        }
        other => other.into(),
    })?;

    let now = Utc::now();
    let offer = Offer {
        id: OfferId::generate(),
        owner: user.account.id.clone(),
        title: body.title,
        description: body.description,
        image: body.image,
        base_price: None,
        base_delivery_time_in_days: None,
        created_at: now,
        updated_at: now,
    };

    let repo = SqlOfferRepository::new(state.db_pool.clone());
    let variants = repo.create(&offer, &specs).await?;

    info!(
        event_name = "system.offer.created",
        offer_id = %offer.id.0,
        owner_id = %offer.owner.0,
        "offer created with three tiers"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": offer.id.0,
            "title": offer.title,
            "image": offer.image,
            "description": offer.description,
            "details": variants.iter().map(variant_full).collect::<Vec<_>>(),
        })),
    ))
}

pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOfferRepository::new(state.db_pool.clone());

    let offer = repo
        .find(&OfferId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found.".to_string()))?;
    let variants = repo.variants_for(&offer.id).await?;

    let account_repo = SqlAccountRepository::new(state.db_pool.clone());
    let owner = account_repo.find_by_id(&offer.owner).await?;

    Ok(Json(offer_json(&offer, &variants, owner.as_ref(), true)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<OfferUpdateBody>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOfferRepository::new(state.db_pool.clone());

    let mut offer = repo.find_for_owner(&OfferId(id), &user.account.id).await?.ok_or_else(|| {
        ApiError::NotFound("Offer not found or you do not own this offer.".to_string())
    })?;

    if let Some(title) = body.title {
        offer.title = title;
    }
    if let Some(description) = body.description {
        offer.description = description;
    }
    if let Some(image) = body.image {
        offer.image = Some(image);
    }
    offer.updated_at = Utc::now();

    let existing = repo.variants_for(&offer.id).await?;
    let payloads = into_payloads(body.details.unwrap_or_default())?;
    let plan = plan_update(&existing, &payloads)?;
    repo.update(&offer, &plan).await?;

    info!(
        event_name = "system.offer.updated",
        offer_id = %offer.id.0,
        writes = plan.writes.len(),
        deletes = plan.deletes.len(),
        "offer reconciled"
    );

    let variants = repo.variants_for(&offer.id).await?;
    Ok(Json(json!({
        "id": offer.id.0,
        "title": offer.title,
        "details": variants.iter().map(variant_full).collect::<Vec<_>>(),
    })))
}

pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOfferRepository::new(state.db_pool.clone());

    let offer = repo.find_for_owner(&OfferId(id), &user.account.id).await?.ok_or_else(|| {
        ApiError::NotFound(
            "Offer not found or you do not have permission to delete this offer.".to_string(),
        )
    })?;

    repo.delete(&offer.id).await?;
    info!(event_name = "system.offer.deleted", offer_id = %offer.id.0, "offer deleted");

    Ok(Json(json!({})))
}

pub async fn variant_detail(
    State(state): State<AppState>,
    _user: MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOfferRepository::new(state.db_pool.clone());

    let variant = repo
        .variant(&VariantId(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    Ok(Json(variant_full(&variant)))
}
