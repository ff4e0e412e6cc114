//! Order endpoints: role-scoped listing, the "buy now" creation path,
//! status updates, deletion, and per-business status counts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tradepost_core::access::is_owner_or_admin;
use tradepost_core::domain::account::AccountId;
use tradepost_core::domain::offer::VariantId;
use tradepost_core::domain::order::{Order, OrderId, OrderStatus};
use tradepost_core::errors::DomainError;
use tradepost_core::snapshot::{create_order, CreationPath};
use tradepost_db::repositories::{
    AccountRepository, OfferRepository, OrderRepository, SqlAccountRepository, SqlOfferRepository,
    SqlOrderRepository,
};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::offers::price_value;
use crate::state::AppState;

fn order_json(order: &Order) -> Value {
    json!({
        "id": order.id.0,
        "customer_user": order.customer_id.0,
        "business_user": order.business_id.0,
        "title": order.title,
        "revisions": order.revisions,
        "delivery_time_in_days": order.delivery_time_in_days,
        "price": price_value(order.price),
        "features": order.features,
        "offer_type": order.offer_type.as_str(),
        "status": order.status.as_str(),
        "created_at": order.created_at.to_rfc3339(),
        "updated_at": order.updated_at.to_rfc3339(),
    })
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Value>>, ApiError> {
    let repo = SqlOrderRepository::new(state.db_pool.clone());

    let orders = if user.actor.is_business() {
        repo.list_for_business(&user.account.id).await?
    } else {
        repo.list_for_customer(&user.account.id).await?
    };

    Ok(Json(orders.iter().map(order_json).collect()))
}

#[derive(Debug, Deserialize)]
pub struct OrderCreateBody {
    pub offer_detail_id: String,
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OrderCreateBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !user.actor.is_customer() {
        return Err(ApiError::Forbidden("Only customers can create orders.".to_string()));
    }

    let offer_repo = SqlOfferRepository::new(state.db_pool.clone());
    let variant = offer_repo
        .variant(&VariantId(body.offer_detail_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;
    let offer = offer_repo
        .find(&variant.offer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    let order = create_order(&user.actor, &offer, &variant, CreationPath::Direct, Utc::now())?;

    let order_repo = SqlOrderRepository::new(state.db_pool.clone());
    order_repo.create(&order).await?;

    info!(
        event_name = "system.order.created",
        order_id = %order.id.0,
        business_id = %order.business_id.0,
        offer_type = order.offer_type.as_str(),
        "order snapshot materialized"
    );

    Ok((StatusCode::CREATED, Json(order_json(&order))))
}

pub async fn detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOrderRepository::new(state.db_pool.clone());

    let order = repo
        .find(&OrderId(order_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    Ok(Json(order_json(&order)))
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusBody {
    pub status: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
    Json(body): Json<OrderStatusBody>,
) -> Result<Json<Value>, ApiError> {
    if !user.actor.is_business() && !user.actor.is_staff {
        return Err(ApiError::Forbidden("Only business can update orders.".to_string()));
    }

    let repo = SqlOrderRepository::new(state.db_pool.clone());
    let mut order = repo
        .find(&OrderId(order_id))
        .await?
        .filter(|order| is_owner_or_admin(&user.actor, &order.business_id))
        .ok_or_else(|| ApiError::NotFound("Order not found or not authorized.".to_string()))?;

    let raw = body.status.unwrap_or_default();
    let status = OrderStatus::parse(&raw).map_err(|error| match error {
        DomainError::Validation { message, .. } => ApiError::BadRequest(message),
        other => other.into(),
    })?;

    let now = Utc::now();
    repo.update_status(&order.id, status, now).await?;
    order.set_status(status, now);

    info!(
        event_name = "system.order.status_changed",
        order_id = %order.id.0,
        status = status.as_str(),
        "order status updated"
    );

    Ok(Json(order_json(&order)))
}

pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = SqlOrderRepository::new(state.db_pool.clone());

    let order = repo
        .find(&OrderId(order_id))
        .await?
        .filter(|order| is_owner_or_admin(&user.actor, &order.business_id))
        .ok_or_else(|| ApiError::NotFound("Order not found or not authorized.".to_string()))?;

    repo.delete(&order.id).await?;
    info!(event_name = "system.order.deleted", order_id = %order.id.0, "order deleted");

    Ok(Json(json!({})))
}

async fn business_user_or_404(
    state: &AppState,
    business_user_id: &str,
) -> Result<AccountId, ApiError> {
    let repo = SqlAccountRepository::new(state.db_pool.clone());
    let account = repo
        .find_by_id(&AccountId(business_user_id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound("Business user not found.".to_string()))?;
    Ok(account.id)
}

/// Count of `in_progress` orders. The route keeps its historical
/// `order-count` name even though it never counted `pending` orders.
pub async fn in_progress_count(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(business_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let business = business_user_or_404(&state, &business_user_id).await?;

    let repo = SqlOrderRepository::new(state.db_pool.clone());
    let count = repo.count_for_business(&business, OrderStatus::InProgress).await?;

    Ok(Json(json!({ "order_count": count })))
}

pub async fn completed_count(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(business_user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let business = business_user_or_404(&state, &business_user_id).await?;

    let repo = SqlOrderRepository::new(state.db_pool.clone());
    let count = repo.count_for_business(&business, OrderStatus::Completed).await?;

    Ok(Json(json!({ "completed_order_count": count })))
}
